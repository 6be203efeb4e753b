//! Declarative-style validation for the three form payloads: product,
//! login, and registration.
//!
//! Validators are pure functions with no I/O. Every field is checked
//! independently and all failures are returned together, keyed by field
//! name, so a form can annotate each invalid input at once. The same
//! functions back the client forms and the server handlers: a payload that
//! fails here never reaches the store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Field name -> human-readable message. Ordered so rendering and test
/// output are deterministic.
pub type FieldErrors = BTreeMap<String, String>;

/// Unvalidated product input, as submitted by a form or API client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// A product payload that passed validation. Description and image are
/// optional; blank strings are normalized to absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductForm {
    pub name: String,
    pub slug: String,
    pub price: f64,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// Unvalidated registration input.
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub display_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

pub fn validate_product(draft: &ProductDraft) -> Result<ProductForm, FieldErrors> {
    let mut errors = FieldErrors::new();

    let name = draft.name.trim();
    if name.is_empty() {
        errors.insert("name".into(), "Name is required".into());
    }

    let slug = draft.slug.trim();
    if !is_valid_slug(slug) {
        errors.insert(
            "slug".into(),
            "Slug must be lowercase words separated by hyphens".into(),
        );
    }

    if !(draft.price > 0.0) {
        errors.insert("price".into(), "Price must be greater than 0".into());
    }

    let description = normalize_optional(&draft.description);

    let image = normalize_optional(&draft.image);
    if let Some(image) = &image {
        if url::Url::parse(image).is_err() {
            errors.insert("image".into(), "Image must be a valid URL".into());
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ProductForm {
        name: name.to_string(),
        slug: slug.to_string(),
        price: draft.price,
        description,
        image,
    })
}

pub fn validate_login(email: &str, password: &str) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    check_email(&mut errors, email);
    check_password(&mut errors, "password", password);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// The server-side subset of registration: everything except the
/// password/confirmation cross-check, which only exists on the form.
pub fn validate_signup(
    email: &str,
    password: &str,
    display_name: Option<&str>,
) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    check_email(&mut errors, email);
    check_password(&mut errors, "password", password);

    if let Some(display_name) = display_name {
        if display_name.trim().chars().count() < 2 {
            errors.insert(
                "display_name".into(),
                "Display name must be at least 2 characters".into(),
            );
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn validate_registration(form: &RegistrationForm) -> Result<(), FieldErrors> {
    let mut errors = match validate_signup(&form.email, &form.password, Some(&form.display_name)) {
        Ok(()) => FieldErrors::new(),
        Err(errors) => errors,
    };

    // Cross-field check, attached to the confirmation field.
    if form.password != form.confirm_password {
        errors.insert("confirm_password".into(), "Passwords don't match".into());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// `^[a-z0-9]+(-[a-z0-9]+)*$` without pulling in a regex engine.
fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .split('-')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()))
}

fn check_email(errors: &mut FieldErrors, email: &str) {
    if !looks_like_email(email) {
        errors.insert("email".into(), "Invalid email address".into());
    }
}

fn check_password(errors: &mut FieldErrors, field: &str, password: &str) {
    let min = crate::config::config().security.password_min_length;
    if password.chars().count() < min {
        errors.insert(
            field.into(),
            format!("Password must be at least {} characters", min),
        );
    }
}

/// Shape check only; deliverability is the mail provider's problem.
fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

fn normalize_optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

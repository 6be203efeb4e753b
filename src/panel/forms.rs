//! Mutation form flows: login, registration, product create/edit/delete.
//!
//! Each flow validates locally first (field errors never reach the
//! gateway), refuses duplicate submission while a call is in flight, and on
//! success reports where to navigate. Cache invalidation is signalled by
//! feeding the returned [`Mutation`] into the list controller.

use uuid::Uuid;

use crate::validation::{
    validate_login, validate_product, validate_registration, FieldErrors, ProductDraft,
    RegistrationForm,
};

use super::gateway::{GatewayError, IdentityGateway, ProductGateway};
use super::listing::Mutation;
use super::{Route, Session};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormStatus {
    Idle,
    Submitting,
}

/// Outcome of one submit attempt.
#[derive(Debug)]
pub enum SubmitOutcome<T> {
    /// Local validation failed; annotate the form, nothing was sent.
    Invalid(FieldErrors),
    /// The gateway rejected the call; show a single top-level message.
    Rejected(String),
    Completed(T),
}

/// Product create/edit/delete flow against a [`ProductGateway`].
pub struct ProductFormFlow<'a> {
    products: &'a dyn ProductGateway,
    status: FormStatus,
}

impl<'a> ProductFormFlow<'a> {
    pub fn new(products: &'a dyn ProductGateway) -> Self {
        Self {
            products,
            status: FormStatus::Idle,
        }
    }

    pub fn status(&self) -> &FormStatus {
        &self.status
    }

    /// Create a product. On success the caller navigates to the list view
    /// and applies the returned mutation to its caches.
    pub async fn submit_create(
        &mut self,
        draft: &ProductDraft,
    ) -> SubmitOutcome<(Mutation, Route)> {
        let form = match validate_product(draft) {
            Ok(form) => form,
            Err(errors) => return SubmitOutcome::Invalid(errors),
        };

        if self.status == FormStatus::Submitting {
            return SubmitOutcome::Rejected("A submission is already in progress".into());
        }
        self.status = FormStatus::Submitting;

        let result = self.products.create(&form).await;
        self.status = FormStatus::Idle;

        match result {
            Ok(_) => SubmitOutcome::Completed((Mutation::Created, Route::ProductList)),
            Err(e) => Self::reject(e),
        }
    }

    /// Full-replace edit. On success the caller navigates to the detail view.
    pub async fn submit_update(
        &mut self,
        id: Uuid,
        draft: &ProductDraft,
    ) -> SubmitOutcome<(Mutation, Route)> {
        let form = match validate_product(draft) {
            Ok(form) => form,
            Err(errors) => return SubmitOutcome::Invalid(errors),
        };

        if self.status == FormStatus::Submitting {
            return SubmitOutcome::Rejected("A submission is already in progress".into());
        }
        self.status = FormStatus::Submitting;

        let result = self.products.update(id, &form).await;
        self.status = FormStatus::Idle;

        match result {
            Ok(()) => SubmitOutcome::Completed((Mutation::Updated(id), Route::ProductDetail(id))),
            Err(e) => Self::reject(e),
        }
    }

    pub async fn submit_delete(&mut self, id: Uuid) -> SubmitOutcome<(Mutation, Route)> {
        if self.status == FormStatus::Submitting {
            return SubmitOutcome::Rejected("A submission is already in progress".into());
        }
        self.status = FormStatus::Submitting;

        let result = self.products.delete(id).await;
        self.status = FormStatus::Idle;

        match result {
            Ok(()) => SubmitOutcome::Completed((Mutation::Deleted(id), Route::ProductList)),
            Err(e) => Self::reject(e),
        }
    }

    fn reject<T>(error: GatewayError) -> SubmitOutcome<T> {
        match error {
            GatewayError::Validation(errors) => SubmitOutcome::Invalid(errors),
            other => SubmitOutcome::Rejected(other.to_string()),
        }
    }
}

/// Login form flow.
pub struct LoginFlow<'a> {
    identity: &'a dyn IdentityGateway,
    status: FormStatus,
}

impl<'a> LoginFlow<'a> {
    pub fn new(identity: &'a dyn IdentityGateway) -> Self {
        Self {
            identity,
            status: FormStatus::Idle,
        }
    }

    /// On success the caller holds a session and navigates to the dashboard.
    pub async fn submit(&mut self, email: &str, password: &str) -> SubmitOutcome<(Session, Route)> {
        if let Err(errors) = validate_login(email, password) {
            return SubmitOutcome::Invalid(errors);
        }

        if self.status == FormStatus::Submitting {
            return SubmitOutcome::Rejected("A submission is already in progress".into());
        }
        self.status = FormStatus::Submitting;

        let result = self.identity.sign_in(email, password).await;
        self.status = FormStatus::Idle;

        match result {
            Ok(session) => SubmitOutcome::Completed((session, Route::Dashboard)),
            Err(GatewayError::Validation(errors)) => SubmitOutcome::Invalid(errors),
            Err(e) => SubmitOutcome::Rejected(e.to_string()),
        }
    }
}

/// Registration form flow. Success does not establish a session; the
/// outcome carries the provider's confirmation message.
pub struct RegisterFlow<'a> {
    identity: &'a dyn IdentityGateway,
    status: FormStatus,
}

impl<'a> RegisterFlow<'a> {
    pub fn new(identity: &'a dyn IdentityGateway) -> Self {
        Self {
            identity,
            status: FormStatus::Idle,
        }
    }

    pub async fn submit(&mut self, form: &RegistrationForm) -> SubmitOutcome<String> {
        if let Err(errors) = validate_registration(form) {
            return SubmitOutcome::Invalid(errors);
        }

        if self.status == FormStatus::Submitting {
            return SubmitOutcome::Rejected("A submission is already in progress".into());
        }
        self.status = FormStatus::Submitting;

        let display_name = if form.display_name.trim().is_empty() {
            None
        } else {
            Some(form.display_name.trim())
        };
        let result = self
            .identity
            .sign_up(&form.email, &form.password, display_name)
            .await;
        self.status = FormStatus::Idle;

        match result {
            Ok(message) => SubmitOutcome::Completed(message),
            Err(GatewayError::Validation(errors)) => SubmitOutcome::Invalid(errors),
            Err(e) => SubmitOutcome::Rejected(e.to_string()),
        }
    }
}

/// Sign out: always succeeds from the caller's point of view.
pub async fn sign_out(identity: &dyn IdentityGateway) -> Route {
    identity.sign_out().await;
    Route::Login
}

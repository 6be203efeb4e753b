//! In-memory gateway fakes for unit tests.
//!
//! [`FakeProducts`] implements the product repository contract faithfully
//! (owner-scoping aside, since a fake holds one user's rows): substring
//! search, newest-first ordering, offset pagination with a filter-wide
//! total, full-replace updates, and NotFound on double delete. Tests that
//! pass against it describe the same behavior the integration suite checks
//! against the real store.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use uuid::Uuid;

use crate::database::models::{Product, ProductPage};
use crate::panel::gateway::{
    GatewayError, IdentityGateway, ListRequest, ProductGateway,
};
use crate::panel::{PanelUser, Session};
use crate::validation::ProductForm;

/// Identity gateway fake with a settable current user.
pub struct FakeIdentity {
    user: Mutex<Option<PanelUser>>,
    sign_in_calls: AtomicUsize,
}

impl FakeIdentity {
    pub fn anonymous() -> Self {
        Self {
            user: Mutex::new(None),
            sign_in_calls: AtomicUsize::new(0),
        }
    }

    pub fn signed_in(user: PanelUser) -> Self {
        Self {
            user: Mutex::new(Some(user)),
            sign_in_calls: AtomicUsize::new(0),
        }
    }

    /// Simulate a sign-out from another tab.
    pub fn sign_out_locally(&self) {
        *self.user.lock().expect("lock") = None;
    }

    pub fn sign_in_calls(&self) -> usize {
        self.sign_in_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityGateway for FakeIdentity {
    async fn sign_up(
        &self,
        _email: &str,
        _password: &str,
        _display_name: Option<&str>,
    ) -> Result<String, GatewayError> {
        Ok("Registration successful! Please check your email.".to_string())
    }

    async fn sign_in(&self, email: &str, _password: &str) -> Result<Session, GatewayError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        let user = self.user.lock().expect("lock").clone();
        match user {
            Some(user) if user.email == email => Ok(Session {
                token: "fake-token".to_string(),
                user,
            }),
            _ => Err(GatewayError::Auth("Invalid email or password".to_string())),
        }
    }

    async fn sign_out(&self) {
        self.sign_out_locally();
    }

    async fn current_user(&self) -> Result<Option<PanelUser>, GatewayError> {
        Ok(self.user.lock().expect("lock").clone())
    }
}

/// Product gateway fake backed by an in-memory row set.
pub struct FakeProducts {
    rows: Mutex<Vec<(u64, Product)>>,
    next_seq: AtomicU64,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    owner_id: Uuid,
}

impl FakeProducts {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            next_seq: AtomicU64::new(1),
            list_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            owner_id: Uuid::new_v4(),
        }
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Seed rows directly, bypassing the gateway counters.
    pub fn seed(&self, names: &[&str]) {
        for name in names {
            self.push(name);
        }
    }

    fn push(&self, name: &str) -> Product {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let product = Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: name.to_lowercase().replace(' ', "-"),
            price: 9.99,
            description: None,
            image: None,
            user_id: self.owner_id,
            // Distinct, increasing creation times so ordering is observable.
            created_at: Utc.timestamp_opt(seq as i64, 0).single().expect("timestamp"),
        };
        self.rows.lock().expect("lock").push((seq, product.clone()));
        product
    }
}

impl Default for FakeProducts {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProductGateway for FakeProducts {
    async fn list(&self, request: &ListRequest) -> Result<ProductPage, GatewayError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let rows = self.rows.lock().expect("lock");
        let needle = request.search.to_lowercase();
        let mut matching: Vec<(u64, Product)> = rows
            .iter()
            .filter(|(_, p)| needle.is_empty() || p.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();

        // Newest first.
        matching.sort_by(|a, b| b.0.cmp(&a.0));

        let total_count = matching.len() as i64;
        let offset = ((request.page.max(1) - 1) as usize) * (request.limit as usize);
        let items = matching
            .into_iter()
            .map(|(_, p)| p)
            .skip(offset)
            .take(request.limit as usize)
            .collect();

        Ok(ProductPage { items, total_count })
    }

    async fn get(&self, id: Uuid) -> Result<Product, GatewayError> {
        self.rows
            .lock()
            .expect("lock")
            .iter()
            .find(|(_, p)| p.id == id)
            .map(|(_, p)| p.clone())
            .ok_or_else(|| GatewayError::NotFound(format!("Product {} not found", id)))
    }

    async fn create(&self, form: &ProductForm) -> Result<Product, GatewayError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut product = self.push(&form.name);
        product.slug = form.slug.clone();
        product.price = form.price;
        product.description = form.description.clone();
        product.image = form.image.clone();
        if let Some((_, stored)) = self
            .rows
            .lock()
            .expect("lock")
            .iter_mut()
            .find(|(_, p)| p.id == product.id)
        {
            *stored = product.clone();
        }
        Ok(product)
    }

    async fn update(&self, id: Uuid, form: &ProductForm) -> Result<(), GatewayError> {
        let mut rows = self.rows.lock().expect("lock");
        let row = rows
            .iter_mut()
            .find(|(_, p)| p.id == id)
            .ok_or_else(|| GatewayError::NotFound(format!("Product {} not found", id)))?;

        // Full replace of the mutable fields only.
        row.1.name = form.name.clone();
        row.1.slug = form.slug.clone();
        row.1.price = form.price;
        row.1.description = form.description.clone();
        row.1.image = form.image.clone();
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), GatewayError> {
        let mut rows = self.rows.lock().expect("lock");
        let before = rows.len();
        rows.retain(|(_, p)| p.id != id);
        if rows.len() == before {
            return Err(GatewayError::NotFound(format!("Product {} not found", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, slug: &str, price: f64) -> ProductForm {
        ProductForm {
            name: name.into(),
            slug: slug.into(),
            price,
            description: Some("desc".into()),
            image: None,
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips_visible_fields() {
        let store = FakeProducts::new();
        let created = store
            .create(&form("Espresso Cup", "espresso-cup", 12.5))
            .await
            .expect("create");

        let fetched = store.get(created.id).await.expect("get");
        assert_eq!(fetched.name, "Espresso Cup");
        assert_eq!(fetched.slug, "espresso-cup");
        assert_eq!(fetched.price, 12.5);
        assert_eq!(fetched.user_id, store.owner_id);
    }

    #[tokio::test]
    async fn update_is_a_full_replace() {
        let store = FakeProducts::new();
        let created = store
            .create(&form("Espresso Cup", "espresso-cup", 12.5))
            .await
            .expect("create");

        store
            .update(created.id, &form("Lungo Cup", "lungo-cup", 14.0))
            .await
            .expect("update");

        let fetched = store.get(created.id).await.expect("get");
        assert_eq!(fetched.name, "Lungo Cup");
        assert_eq!(fetched.slug, "lungo-cup");
        assert_eq!(fetched.price, 14.0);
        // Untouchable fields survive.
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.created_at, created.created_at);
    }

    #[tokio::test]
    async fn second_delete_reports_not_found() {
        let store = FakeProducts::new();
        let created = store
            .create(&form("Espresso Cup", "espresso-cup", 12.5))
            .await
            .expect("create");

        store.delete(created.id).await.expect("first delete");
        assert!(matches!(
            store.delete(created.id).await,
            Err(GatewayError::NotFound(_))
        ));
        assert!(matches!(
            store.get(created.id).await,
            Err(GatewayError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn paginates_23_rows_at_page_size_10() {
        let store = FakeProducts::new();
        let names: Vec<String> = (1..=23).map(|i| format!("Product {:02}", i)).collect();
        store.seed(&names.iter().map(String::as_str).collect::<Vec<_>>());

        let page1 = store
            .list(&ListRequest {
                page: 1,
                limit: 10,
                search: String::new(),
            })
            .await
            .expect("list");
        assert_eq!(page1.items.len(), 10);
        assert_eq!(page1.total_count, 23);
        // Newest first: the last seeded row leads.
        assert_eq!(page1.items[0].name, "Product 23");

        let page3 = store
            .list(&ListRequest {
                page: 3,
                limit: 10,
                search: String::new(),
            })
            .await
            .expect("list");
        assert_eq!(page3.items.len(), 3);
        assert_eq!(page3.total_count, 23);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_substring_on_name() {
        let store = FakeProducts::new();
        store.seed(&["Coffee Mug", "Espresso Cup", "Moka Pot", "Mug Rack"]);

        let found = store
            .list(&ListRequest {
                page: 1,
                limit: 10,
                search: "MUG".into(),
            })
            .await
            .expect("list");

        let names: Vec<&str> = found.items.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Mug Rack", "Coffee Mug"]);
        assert_eq!(found.total_count, 2);
    }
}

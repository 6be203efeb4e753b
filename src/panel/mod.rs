//! The application layer of the admin panel, independent of any rendering
//! framework: gateway clients for the identity provider and product store,
//! the session guard, the product list state controller, and the mutation
//! form flows. The terminal client in `cli/` is one consumer; tests drive
//! the same types with in-memory gateways.

pub mod cache;
pub mod forms;
pub mod gateway;
pub mod listing;
pub mod query;
pub mod session;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The signed-in identity as seen by the panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelUser {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
}

impl PanelUser {
    /// Display name with the fallback used across all views.
    pub fn display_label(&self) -> &str {
        self.display_name.as_deref().unwrap_or("User")
    }
}

/// An established session: the bearer token plus the user it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: PanelUser,
}

/// Navigation targets of the panel. Mutation flows and the session guard
/// report one of these; the view layer decides how to get there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
    ProductList,
    ProductDetail(Uuid),
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub price: f64,
    pub description: Option<String>,
    pub image: Option<String>,
    /// Owner. Stamped at creation from the authenticated identity, never
    /// user-editable afterwards.
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// One page of the product listing plus the filter-wide row count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    pub items: Vec<Product>,
    /// Rows matching the (search + owner) filter, independent of pagination.
    pub total_count: i64,
}

//! Client-side cache of list pages and product details.
//!
//! Mutations never patch cached data in place; they invalidate it so the
//! next read goes back to the source of truth.

use std::collections::HashMap;

use uuid::Uuid;

use crate::database::models::{Product, ProductPage};

use super::listing::FetchKey;

#[derive(Debug, Default)]
pub struct PanelCache {
    lists: HashMap<FetchKey, ProductPage>,
    details: HashMap<Uuid, Product>,
}

impl PanelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_list(&self, key: &FetchKey) -> Option<&ProductPage> {
        self.lists.get(key)
    }

    pub fn put_list(&mut self, key: FetchKey, page: ProductPage) {
        self.lists.insert(key, page);
    }

    pub fn get_detail(&self, id: &Uuid) -> Option<&Product> {
        self.details.get(id)
    }

    pub fn put_detail(&mut self, product: Product) {
        self.details.insert(product.id, product);
    }

    /// Any mutation makes every cached page stale: a created row can land on
    /// any page, a delete shifts rows across page boundaries.
    pub fn invalidate_lists(&mut self) {
        self.lists.clear();
    }

    pub fn invalidate_detail(&mut self, id: &Uuid) {
        self.details.remove(id);
    }
}

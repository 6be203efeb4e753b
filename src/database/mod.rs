pub mod manager;
pub mod models;
pub mod products;
pub mod users;

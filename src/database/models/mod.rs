pub mod product;
pub mod user;

pub use product::{Product, ProductPage};
pub use user::User;

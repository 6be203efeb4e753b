// Public handlers: no session required. Everything else lives under
// /api/* behind the JWT middleware.

pub mod auth;

pub mod access;
pub mod auth;

pub use access::access_control_middleware;
pub use auth::{service_auth_middleware, AuthenticatedUser};

//! JWT authentication

pub mod jwt;
pub mod middleware;

pub use jwt::{create_token, verify_token, Claims, JwtConfig};
pub use middleware::{auth_middleware, AuthState, AuthenticatedUser, BearerToken};

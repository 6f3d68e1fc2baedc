//! Authentication
//!
//! Validates platform access tokens and exposes the caller's user id to
//! handlers. Token issuance lives in the platform's account service.

mod error;
pub mod jwt;
mod middleware;

pub use error::{AuthError, AuthResult, ErrorResponse};
pub use middleware::{require_auth, AuthUser};

//! Authentication primitives for shelf: password hashing, bearer tokens, and
//! the middleware that guards protected routes.

pub mod identity;
pub mod middleware;
pub mod password;
pub mod token;

pub use identity::{Identity, IdentityLookup};
pub use middleware::{require_bearer, AuthState};
pub use password::PasswordHasher;
pub use token::{Claims, TokenError, TokenService};

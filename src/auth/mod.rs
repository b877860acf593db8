pub mod extractors;
pub mod gate;
pub mod middleware;
pub mod password;
pub mod token;

use serde::Serialize;

use crate::models::User;

// Re-export necessary items
pub use extractors::AuthenticatedUser;
pub use gate::{authenticate, AuthContext, AuthFailure};
pub use middleware::AuthMiddleware;
pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenError, TokenService};

/// Response body after signup or login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    /// The newly issued session token.
    pub token: String,
}


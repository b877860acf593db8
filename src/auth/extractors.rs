use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::auth::gate::AuthContext;
use crate::error::AppError;

/// The authenticated caller, as resolved by `AuthMiddleware`.
///
/// Handlers take this instead of reading ids from the request, so ownership is
/// always derived from the session and never from client input.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub AuthContext);

impl FromRequest for AuthenticatedUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthContext>().cloned() {
            Some(ctx) => ready(Ok(AuthenticatedUser(ctx))),
            None => {
                let err = AppError::Unauthorized(
                    "No AuthContext in request. Ensure AuthMiddleware is active.".to_string(),
                );
                ready(Err(err.into()))
            }
        }
    }
}

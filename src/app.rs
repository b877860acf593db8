//! Application state shared by every worker.
//!
//! Built once at startup from `Config` and handed to actix as `web::Data`.
//! Nothing in the request path reads process environment.

use std::sync::Arc;

use actix_web::{error::InternalError, web, HttpResponse, ResponseError};

use crate::auth::TokenService;
use crate::config::{Config, DEFAULT_AVATAR_MAX_BYTES};
use crate::error::AppError;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: TokenService,
    pub avatar_max_bytes: usize,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, tokens: TokenService) -> Self {
        Self {
            store,
            tokens,
            avatar_max_bytes: DEFAULT_AVATAR_MAX_BYTES,
        }
    }

    pub fn from_config(config: &Config, store: Arc<dyn Store>) -> Self {
        Self {
            store,
            tokens: TokenService::new(&config.jwt_secret, config.token_ttl_hours),
            avatar_max_bytes: config.avatar_max_bytes,
        }
    }

    pub fn with_avatar_limit(mut self, max_bytes: usize) -> Self {
        self.avatar_max_bytes = max_bytes;
        self
    }
}

/// JSON bodies that fail to parse become `{"error": ...}` 400s.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let app_err = AppError::BadRequest(err.to_string());
        InternalError::from_response(err, app_err.error_response()).into()
    })
}

/// Unparseable path ids are indistinguishable from ids that do not exist.
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| {
        InternalError::from_response(err, not_found_response()).into()
    })
}

fn not_found_response() -> HttpResponse {
    AppError::NotFound("Not found".into()).error_response()
}

#![doc = "The `taskkeeper` library crate."]
#![doc = ""]
#![doc = "Users, their tasks, and the session tokens that tie the two together."]
#![doc = "Every task operation is scoped to the user resolved from the bearer token;"]
#![doc = "the binary (`main.rs`) wires configuration, logging and storage around it."]

pub mod app;
pub mod auth;
pub mod avatar;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod routes;
pub mod store;

pub use app::AppState;
pub use error::AppError;

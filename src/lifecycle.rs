//! Credential lifecycle hooks, called explicitly by the user handlers.
//!
//! - before a user is first saved, the plaintext password is replaced by its hash;
//! - on later saves the password is re-hashed only when the update carries a new one;
//! - removing a user removes that user's tasks in the same store operation.

use uuid::Uuid;

use crate::auth::hash_password;
use crate::error::AppError;
use crate::models::{User, UserInput, UserUpdate};
use crate::store::Store;

/// Builds a storable user from validated signup input.
pub fn new_user(input: &UserInput) -> Result<User, AppError> {
    let password_hash = hash_password(&input.password)?;
    Ok(User::new(input, password_hash))
}

/// Applies a validated profile update. Returns whether the password changed.
pub fn apply_user_update(user: &mut User, update: UserUpdate) -> Result<bool, AppError> {
    if let Some(name) = update.name {
        user.name = name;
    }
    if let Some(email) = update.email {
        user.email = email;
    }
    if let Some(age) = update.age {
        user.age = age;
    }
    match update.password {
        Some(password) => {
            user.password_hash = hash_password(&password)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Deletes a user together with every task they authored.
pub async fn remove_user(store: &dyn Store, id: Uuid) -> Result<Option<User>, AppError> {
    let removed = store.delete_user(id).await?;
    if removed.is_some() {
        log::info!("Deleted user {} and their tasks", id);
    }
    Ok(removed)
}

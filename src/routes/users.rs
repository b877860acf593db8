use crate::{
    app::AppState,
    auth::{verify_password, AuthResponse, AuthenticatedUser},
    avatar,
    error::AppError,
    lifecycle,
    models::{user::normalize_email, LoginRequest, UserInput, UserUpdate},
};
use actix_multipart::Multipart;
use actix_web::{delete, get, http::header, patch, post, web, HttpResponse, Responder};
use futures::TryStreamExt;
use serde_json::{json, Map, Value};
use uuid::Uuid;
use validator::Validate;

/// Sign up
///
/// Creates a user, issues a first session token and returns both.
///
/// ## Responses:
/// - `201 Created`: `{ "user": User, "token": String }`.
/// - `400 Bad Request`: invalid input or email already registered.
#[post("")]
pub async fn signup(
    state: web::Data<AppState>,
    body: web::Json<UserInput>,
) -> Result<impl Responder, AppError> {
    let input = body.into_inner().normalize();
    input.validate()?;

    if state.store.find_user_by_email(&input.email).await?.is_some() {
        return Err(AppError::BadRequest("Email already registered".into()));
    }

    let mut user = lifecycle::new_user(&input)?;
    let token = state.tokens.issue(user.id)?;
    // The account and its first session are stored together.
    user.tokens.push(token.clone());
    state.store.insert_user(&user).await?;
    log::info!("User {} signed up", user.id);

    Ok(HttpResponse::Created().json(AuthResponse { user, token }))
}

/// Log in
///
/// Checks credentials and appends a new token to the user's token set.
/// Unknown email and wrong password produce the same response.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let credentials = body.into_inner();
    let email = normalize_email(&credentials.email);
    let unable = || AppError::BadRequest("Unable to login".into());

    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(unable)?;

    if !verify_password(credentials.password.trim(), &user.password_hash)? {
        return Err(unable());
    }

    let token = state.tokens.issue(user.id)?;
    state.store.push_token(user.id, &token).await?;

    Ok(HttpResponse::Ok().json(AuthResponse { user, token }))
}

/// Log out the current session: only the presented token is revoked.
#[post("/logout")]
pub async fn logout(
    state: web::Data<AppState>,
    AuthenticatedUser(ctx): AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    state.store.remove_token(ctx.user.id, &ctx.token).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Logged out" })))
}

/// Log out everywhere: every token of the user is revoked.
#[post("/logoutAll")]
pub async fn logout_all(
    state: web::Data<AppState>,
    AuthenticatedUser(ctx): AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    state.store.clear_tokens(ctx.user.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Logged out of all sessions" })))
}

#[get("/me")]
pub async fn me(AuthenticatedUser(ctx): AuthenticatedUser) -> impl Responder {
    HttpResponse::Ok().json(ctx.user)
}

/// Update profile
///
/// Only `name`, `email`, `password` and `age` may be sent. Any other key
/// rejects the whole update with `400` and nothing is written.
#[patch("/me")]
pub async fn update_me(
    state: web::Data<AppState>,
    AuthenticatedUser(ctx): AuthenticatedUser,
    body: web::Json<Map<String, Value>>,
) -> Result<impl Responder, AppError> {
    let update = UserUpdate::from_payload(body.into_inner())?;

    let mut user = ctx.user;
    if let Some(email) = update.email.as_deref() {
        if let Some(existing) = state.store.find_user_by_email(email).await? {
            if existing.id != user.id {
                return Err(AppError::BadRequest("Email already registered".into()));
            }
        }
    }

    lifecycle::apply_user_update(&mut user, update)?;
    let updated = state
        .store
        .update_profile(&user)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(HttpResponse::Ok().json(updated))
}

/// Delete account, together with every task the user authored.
#[delete("/me")]
pub async fn delete_me(
    state: web::Data<AppState>,
    AuthenticatedUser(ctx): AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let removed = lifecycle::remove_user(state.store.as_ref(), ctx.user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(HttpResponse::Ok().json(removed))
}

/// Upload avatar
///
/// Expects a multipart form with an `avatar` file field.
#[post("/me/avatar")]
pub async fn upload_avatar(
    state: web::Data<AppState>,
    AuthenticatedUser(ctx): AuthenticatedUser,
    mut payload: Multipart,
) -> Result<impl Responder, AppError> {
    let mut upload: Option<Vec<u8>> = None;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let disposition = field.content_disposition();
        if disposition.get_name() != Some("avatar") {
            continue;
        }
        let filename = disposition.get_filename().unwrap_or_default().to_string();
        avatar::check_filename(&filename)?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            bytes.extend_from_slice(&chunk);
            avatar::check_size(bytes.len(), state.avatar_max_bytes)?;
        }
        upload = Some(bytes);
    }

    let bytes = upload.ok_or_else(|| AppError::BadRequest("Please upload an avatar".into()))?;
    let png = web::block(move || avatar::normalize(&bytes))
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))??;

    state.store.set_avatar(ctx.user.id, Some(png)).await?;
    Ok(HttpResponse::Ok().finish())
}

#[delete("/me/avatar")]
pub async fn delete_avatar(
    state: web::Data<AppState>,
    AuthenticatedUser(ctx): AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    state.store.set_avatar(ctx.user.id, None).await?;
    Ok(HttpResponse::Ok().finish())
}

/// Serve a user's avatar as PNG. Public.
#[get("/{id}/avatar")]
pub async fn get_avatar(
    state: web::Data<AppState>,
    user_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let avatar = state
        .store
        .find_user(user_id.into_inner())
        .await?
        .and_then(|user| user.avatar)
        .ok_or_else(|| AppError::NotFound("Avatar not found".into()))?;

    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, avatar::AVATAR_CONTENT_TYPE))
        .body(avatar))
}

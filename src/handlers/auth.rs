use axum::{extract::State, http::StatusCode, Json};
use log::{info, warn};
use serde_json::{json, Value};
use tower_cookies::{Cookie, Cookies};
use validator::Validate;

use crate::{
    errors::AppError,
    middleware::auth::AUTH_COOKIE,
    models::{LoginRequest, RegisterUser, TokenResponse, UserResponse},
    state::AppState,
    utils::{hash_password, verify_password},
};

pub async fn register(
    State(state): State<AppState>,
    Json(form): Json<RegisterUser>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    form.validate()?;

    let password_hash = hash_password(&form.password)?;
    let user = state
        .store
        .create_user(&form.username, &form.email, &password_hash)
        .await?;

    info!("Registered user {} ({})", user.username, user.id);
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(form): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let user = state
        .store
        .find_user_by_email(&form.email)
        .await?
        .filter(|user| user.is_active && verify_password(&form.password, &user.password_hash))
        .ok_or_else(|| {
            warn!("Failed login attempt for {}", form.email);
            AppError::Unauthorized("invalid email or password".to_string())
        })?;

    let token = state.tokens.create_token(user.id, &user.username)?;

    // Set HTTP-only cookie with JWT token for browser clients
    let max_age = time::Duration::seconds(state.tokens.ttl().num_seconds());
    let cookie = Cookie::build((AUTH_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .max_age(max_age)
        .build();
    cookies.add(cookie);

    info!("User {} logged in", user.username);
    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        user_id: user.id,
    }))
}

pub async fn logout(cookies: Cookies) -> Json<Value> {
    cookies.remove(Cookie::build((AUTH_COOKIE, "")).path("/").build());
    Json(json!({ "message": "logged out" }))
}

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::dtos::auth::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use crate::models::User;
use crate::services::metrics::record_auth_attempt;
use crate::startup::AppState;
use crate::utils::{hash_password, verify_password, Password, PasswordHashString, ValidatedJson};

/// Create a shop account.
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let username = req.username;
    let password = Password::new(req.password);

    // Argon2 is CPU-bound; keep it off the async workers.
    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| anyhow::anyhow!("Password hashing task failed: {}", e))??;

    let user = User::new(username, hash.into_string(), req.name);
    if let Err(e) = state.users.insert(&user).await {
        record_auth_attempt("register", "error");
        return Err(e);
    }

    record_auth_attempt("register", "success");
    tracing::info!(user_id = %user.user_id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: user.into(),
            message: "Registration successful".to_string(),
        }),
    ))
}

/// Exchange username and password for an access token.
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let invalid = || AppError::Unauthorized(anyhow::anyhow!("Invalid username or password"));

    let Some(user) = state.users.find_by_username(&req.username).await? else {
        record_auth_attempt("login", "unknown_user");
        return Err(invalid());
    };

    let password = Password::new(req.password);
    let stored = PasswordHashString::new(user.password_hash.clone());
    let verified = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| anyhow::anyhow!("Password verification task failed: {}", e))?;

    if verified.is_err() {
        record_auth_attempt("login", "bad_password");
        return Err(invalid());
    }

    let access_token = state
        .jwt
        .generate_access_token(&user.user_id, &user.username)?;

    record_auth_attempt("login", "success");
    tracing::info!(user_id = %user.user_id, "User logged in");

    Ok((
        StatusCode::OK,
        Json(LoginResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: state.jwt.access_token_expiry_seconds(),
            user: user.into(),
        }),
    ))
}

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use service_core::error::AppError;

use crate::{services::AccessTokenClaims, startup::AppState};

/// Caller authenticated by a bearer access token. The subject is the owner of
/// every bill the request reads or writes.
#[derive(Debug, Clone)]
pub struct AuthUser(pub AccessTokenClaims);

impl AuthUser {
    pub fn owner_id(&self) -> &str {
        &self.0.sub
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                AppError::Unauthorized(anyhow::anyhow!("Missing or invalid Authorization header"))
            })?;

        let claims = state.jwt.validate_access_token(token).inspect_err(|e| {
            tracing::debug!(error = %e, "Rejected access token");
        })?;

        tracing::Span::current().record("user_id", claims.sub.as_str());
        Ok(AuthUser(claims))
    }
}

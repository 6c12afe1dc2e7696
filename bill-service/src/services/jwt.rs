use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;

use crate::config::JwtConfig;

/// Issues and validates shop access tokens.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry_minutes: i64,
}

/// Claims for access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user ID, also the owner of every bill the caller touches)
    pub sub: String,
    pub username: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub jti: String,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Result<Self, anyhow::Error> {
        let secret = config.secret.expose_secret();
        if secret.len() < 32 {
            anyhow::bail!("JWT secret must be at least 32 bytes");
        }

        tracing::info!("JWT service initialized with HS256 secret");

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_expiry_minutes: config.access_token_expiry_minutes,
        })
    }

    pub fn generate_access_token(
        &self,
        user_id: &str,
        username: &str,
    ) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::minutes(self.access_token_expiry_minutes);

        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            username: username.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode access token: {}", e))
    }

    /// Expired, tampered and malformed tokens all surface as
    /// [`AppError::InvalidToken`].
    pub fn validate_access_token(&self, token: &str) -> Result<AccessTokenClaims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let token_data = decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)?;

        Ok(token_data.claims)
    }

    /// Access token lifetime in seconds (for client info)
    pub fn access_token_expiry_seconds(&self) -> i64 {
        self.access_token_expiry_minutes * 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    fn config(expiry_minutes: i64) -> JwtConfig {
        JwtConfig {
            secret: Secret::new("test-secret-that-is-long-enough-for-hs256".to_string()),
            access_token_expiry_minutes: expiry_minutes,
        }
    }

    #[test]
    fn test_token_round_trip() {
        let service = JwtService::new(&config(60)).unwrap();
        let token = service.generate_access_token("user-1", "shop").unwrap();

        let claims = service.validate_access_token(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.username, "shop");
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(service.access_token_expiry_seconds(), 3600);
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = JwtService::new(&config(-10)).unwrap();
        let token = service.generate_access_token("user-1", "shop").unwrap();
        let err = service.validate_access_token(&token).unwrap_err();
        assert!(matches!(err, AppError::InvalidToken(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_malformed_token_rejected() {
        let service = JwtService::new(&config(60)).unwrap();
        let err = service.validate_access_token("not-a-jwt").unwrap_err();
        assert!(matches!(err, AppError::InvalidToken(_)));
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let service = JwtService::new(&config(60)).unwrap();
        let other = JwtService::new(&JwtConfig {
            secret: Secret::new("a-completely-different-secret-of-32-bytes".to_string()),
            access_token_expiry_minutes: 60,
        })
        .unwrap();

        let token = other.generate_access_token("user-1", "shop").unwrap();
        assert!(matches!(
            service.validate_access_token(&token),
            Err(AppError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_short_secret_rejected() {
        let result = JwtService::new(&JwtConfig {
            secret: Secret::new("short".to_string()),
            access_token_expiry_minutes: 60,
        });
        assert!(result.is_err());
    }
}

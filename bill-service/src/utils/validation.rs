use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use service_core::error::AppError;
use validator::{Validate, ValidationError};

/// JSON body that has passed `validator` checks. Malformed JSON is a 400,
/// failed validation a 422.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Json parse error: {}", e)))?;

        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Serde helper that strips surrounding whitespace before validation sees
/// the value.
pub fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(value.trim().to_string())
}

/// Rejects empty and whitespace-only strings.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_strings_fail() {
        assert!(not_blank("").is_err());
        assert!(not_blank("  \t").is_err());
        assert!(not_blank(" Ravi ").is_ok());
    }

    #[derive(Deserialize)]
    struct Named {
        #[serde(deserialize_with = "trimmed")]
        name: String,
    }

    #[test]
    fn trimmed_strips_surrounding_whitespace() {
        let named: Named = serde_json::from_str(r#"{ "name": "  ab \t" }"#).unwrap();
        assert_eq!(named.name, "ab");
    }
}

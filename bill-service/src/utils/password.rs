use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Plain-text password. `Debug` is redacted so it never lands in logs.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: String) -> Self {
        Self(password)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Argon2id PHC string as stored on the user record.
#[derive(Debug, Clone)]
pub struct PasswordHashString(String);

impl PasswordHashString {
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Hash with Argon2id and a fresh random salt.
pub fn hash_password(password: &Password) -> Result<PasswordHashString, anyhow::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_str().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(PasswordHashString::new(hash))
}

/// Constant-time check of `password` against a stored hash.
pub fn verify_password(
    password: &Password,
    password_hash: &PasswordHashString,
) -> Result<(), anyhow::Error> {
    let parsed = PasswordHash::new(password_hash.as_str())
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;

    Argon2::default()
        .verify_password(password.as_str().as_bytes(), &parsed)
        .map_err(|_| anyhow::anyhow!("Password verification failed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_salted_argon2id() {
        let password = Password::new("counter-top-42".to_string());
        let first = hash_password(&password).unwrap();
        let second = hash_password(&password).unwrap();

        assert!(first.as_str().starts_with("$argon2id$"));
        assert_ne!(first.as_str(), second.as_str());
    }

    #[test]
    fn verify_accepts_only_the_right_password() {
        let hash = hash_password(&Password::new("counter-top-42".to_string())).unwrap();

        assert!(verify_password(&Password::new("counter-top-42".to_string()), &hash).is_ok());
        assert!(verify_password(&Password::new("counter-top-43".to_string()), &hash).is_err());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        let bogus = PasswordHashString::new("not-a-hash".to_string());
        assert!(verify_password(&Password::new("x".to_string()), &bogus).is_err());
    }

    #[test]
    fn debug_output_hides_the_password() {
        let password = Password::new("secret".to_string());
        assert!(!format!("{password:?}").contains("secret"));
    }
}

//! Admin authentication settings.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

/// Prefix of every PHC-encoded argon2 hash.
const ARGON2_PREFIX: &str = "$argon2";

/// Admin credentials. Only the argon2 hash of the secret is kept in memory.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub secret_hash: String,
}

impl AdminConfig {
    pub fn new(secret_hash: String) -> Self {
        Self { secret_hash }
    }

    /// Whether a configured secret is already an argon2 hash rather than
    /// plaintext awaiting hashing.
    pub fn is_hashed(secret: &str) -> bool {
        secret.starts_with(ARGON2_PREFIX)
    }

    /// Hash a plaintext secret with a fresh salt.
    pub fn hash_secret(plaintext: &str) -> Result<String, argon2::password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
    }

    /// Check the value of the `Dispatch-Admin-Authorization` header.
    ///
    /// A malformed stored hash rejects every secret.
    pub fn verify_secret(&self, plaintext: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(&self.secret_hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = AdminConfig::hash_secret("dispatch-admin").unwrap();
        assert!(AdminConfig::is_hashed(&hash));

        let admin = AdminConfig::new(hash);
        assert!(admin.verify_secret("dispatch-admin"));
        assert!(!admin.verify_secret("dispatch-admin "));
        assert!(!admin.verify_secret(""));
    }

    #[test]
    fn test_malformed_hash_rejects_everything() {
        let admin = AdminConfig::new("$argon2id$not-a-real-hash".to_string());
        assert!(!admin.verify_secret("anything"));
        assert!(!AdminConfig::is_hashed("plaintext-secret"));
    }
}

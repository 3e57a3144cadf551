//! Password hashing - argon2id with per-hash random salts.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Newtype for a cleartext password to keep it out of logs.
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

/// Newtype for an encoded password hash.
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

/// Hash a password with argon2id; the salt is generated per call and
/// embedded in the encoded hash.
pub fn hash_password(password: &Password) -> Result<PasswordHashString, anyhow::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_str().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?
        .to_string();
    Ok(PasswordHashString::new(hash))
}

/// Verify a password against an encoded hash.
///
/// Returns `Ok(false)` on a mismatch and `Err` only when the stored hash
/// itself cannot be parsed, so callers can separate bad credentials from
/// backend corruption. Comparison inside argon2 is constant-time.
pub fn verify_password(
    password: &Password,
    hash: &PasswordHashString,
) -> Result<bool, anyhow::Error> {
    let parsed = PasswordHash::new(hash.as_str())
        .map_err(|e| anyhow::anyhow!("invalid password hash: {e}"))?;
    match Argon2::default().verify_password(password.as_str().as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("password verification failed: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let password = Password::new("correct horse battery".to_string());
        let hash = hash_password(&password).unwrap();
        assert!(hash.as_str().starts_with("$argon2"));
        assert!(verify_password(&password, &hash).unwrap());
    }

    #[test]
    fn wrong_password_is_a_clean_mismatch() {
        let hash = hash_password(&Password::new("right".to_string())).unwrap();
        let result = verify_password(&Password::new("wrong".to_string()), &hash);
        assert!(matches!(result, Ok(false)));
    }

    #[test]
    fn corrupt_hash_is_an_error_not_a_mismatch() {
        let result = verify_password(
            &Password::new("whatever".to_string()),
            &PasswordHashString::new("not-a-hash".to_string()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn salts_differ_between_hashes() {
        let password = Password::new("same input".to_string());
        let a = hash_password(&password).unwrap();
        let b = hash_password(&password).unwrap();
        assert_ne!(a.as_str(), b.as_str());
    }

    #[test]
    fn debug_never_prints_the_password() {
        let password = Password::new("hunter2".to_string());
        assert!(!format!("{password:?}").contains("hunter2"));
    }
}

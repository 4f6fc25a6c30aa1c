/// Password hashing module using Argon2id
///
/// Passwords are hashed with the `argon2` crate's default parameters
/// (Argon2id, v19). A fresh random salt is generated for every call and is
/// embedded in the resulting PHC string together with the parameters, so
/// verification needs nothing but the stored string.
///
/// # Stored credentials
///
/// User documents carry a single `password` field. New accounts hold an
/// Argon2 PHC hash. Accounts imported from the legacy data set hold either a
/// bcrypt hash (`$2b$...`) or plaintext. The three shapes are modelled by
/// [`StoredCredential`], which dispatches verification on the prefix.
///
/// # Example
///
/// ```
/// use globetrotter_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("jack@1234")?;
/// assert!(verify_password("jack@1234", &hash)?);
/// assert!(!verify_password("wrongpassword", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use subtle::ConstantTimeEq;

/// Prefix shared by every Argon2 PHC string (`$argon2id$`, `$argon2i$`, ...)
pub const HASH_PREFIX: &str = "$argon2";

/// Prefix shared by bcrypt modular-crypt strings (`$2a$`, `$2b$`, `$2y$`, ...)
pub const BCRYPT_PREFIX: &str = "$2";

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Stored hash could not be parsed
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),

    /// Hash parsed but verification failed for a reason other than mismatch
    #[error("Failed to verify password: {0}")]
    VerifyError(String),
}

/// Hashes a password with Argon2id and a fresh salt
///
/// # Returns
///
/// PHC string, e.g. `$argon2id$v=19$m=19456,t=2,p=1$<salt>$<hash>`
///
/// # Errors
///
/// Returns `PasswordError::HashError` if hashing fails
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a PHC hash
///
/// Parameters and salt come from the hash itself.
///
/// # Returns
///
/// `Ok(true)` on match, `Ok(false)` on mismatch
///
/// # Errors
///
/// `PasswordError::InvalidHash` if `hash` is not a valid PHC string,
/// `PasswordError::VerifyError` for any other verification failure
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    if parsed_hash.salt.is_none() || parsed_hash.hash.is_none() {
        return Err(PasswordError::InvalidHash(
            "Hash is missing its salt or digest".to_string(),
        ));
    }

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// Verifies a password against a legacy bcrypt hash
///
/// # Errors
///
/// `PasswordError::InvalidHash` if `hash` is not a valid bcrypt string
pub fn verify_bcrypt(password: &str, hash: &str) -> Result<bool, PasswordError> {
    bcrypt::verify(password, hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse bcrypt hash: {}", e)))
}

/// The shapes a stored `password` field can take
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredCredential<'a> {
    /// Argon2 PHC string
    Argon2(&'a str),

    /// bcrypt hash carried over from the legacy data set
    Bcrypt(&'a str),

    /// Legacy plaintext value
    Plaintext(&'a str),
}

impl<'a> StoredCredential<'a> {
    /// Classifies a stored value by its prefix
    ///
    /// Anything starting with `$2` is treated as bcrypt, so a malformed
    /// bcrypt value is reported as corrupted rather than compared as text.
    pub fn parse(stored: &'a str) -> Self {
        if stored.starts_with(HASH_PREFIX) {
            StoredCredential::Argon2(stored)
        } else if stored.starts_with(BCRYPT_PREFIX) {
            StoredCredential::Bcrypt(stored)
        } else {
            StoredCredential::Plaintext(stored)
        }
    }

    pub fn is_plaintext(&self) -> bool {
        matches!(self, StoredCredential::Plaintext(_))
    }

    /// Checks a login attempt against this credential
    ///
    /// Plaintext credentials compare in constant time.
    ///
    /// # Errors
    ///
    /// `PasswordError::InvalidHash` / `VerifyError` for corrupted hashes
    pub fn verify(&self, password: &str) -> Result<bool, PasswordError> {
        match self {
            StoredCredential::Argon2(hash) => verify_password(password, hash),
            StoredCredential::Bcrypt(hash) => verify_bcrypt(password, hash),
            StoredCredential::Plaintext(value) => {
                Ok(value.as_bytes().ct_eq(password.as_bytes()).into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_format() {
        let hash = hash_password("pw1").expect("Hash should succeed");

        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("v=19"));
    }

    #[test]
    fn test_hash_password_produces_different_salts() {
        let hash1 = hash_password("same_password").expect("Hash 1 should succeed");
        let hash2 = hash_password("same_password").expect("Hash 2 should succeed");

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_password_correct_and_incorrect() {
        let hash = hash_password("jack@1234").expect("Hash should succeed");

        assert!(verify_password("jack@1234", &hash).unwrap());
        assert!(!verify_password("wrongpassword", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_malformed_hash() {
        assert!(matches!(
            verify_password("password", "invalid_hash"),
            Err(PasswordError::InvalidHash(_))
        ));
        assert!(matches!(
            verify_password("password", "$argon2id$v=19$m=19456,t=2,p=1$!!!!$!!!!"),
            Err(PasswordError::InvalidHash(_))
        ));
        assert!(verify_password("password", "$argon2id$v=19$c2FsdHNhbHQ").is_err());
    }

    #[test]
    fn test_hash_verify_roundtrip() {
        let passwords = [
            "simple",
            "with spaces",
            "with-special-chars!@#$%",
            "unicode-密码-パスワード",
        ];

        for password in passwords {
            let hash = hash_password(password).expect("Hash should succeed");
            assert!(
                verify_password(password, &hash).unwrap(),
                "Password '{}' should verify",
                password
            );
        }
    }

    #[test]
    fn test_stored_credential_parse() {
        let hash = hash_password("pw").unwrap();
        assert!(matches!(StoredCredential::parse(&hash), StoredCredential::Argon2(_)));

        let legacy = StoredCredential::parse("jack@1234");
        assert_eq!(legacy, StoredCredential::Plaintext("jack@1234"));
        assert!(legacy.is_plaintext());

        for bcrypt_hash in ["$2a$04$abc", "$2b$12$abc", "$2y$10$abc"] {
            assert_eq!(
                StoredCredential::parse(bcrypt_hash),
                StoredCredential::Bcrypt(bcrypt_hash)
            );
        }
    }

    #[test]
    fn test_bcrypt_credential_verify() {
        let hash = bcrypt::hash("jack@1234", 4).unwrap();
        assert!(hash.starts_with("$2b$04$"));

        let credential = StoredCredential::parse(&hash);
        assert!(!credential.is_plaintext());
        assert!(credential.verify("jack@1234").unwrap());
        assert!(!credential.verify("wrongpassword").unwrap());

        // The stored hash itself is not a valid password
        assert!(!credential.verify(&hash).unwrap());
    }

    #[test]
    fn test_malformed_bcrypt_is_an_error() {
        let credential = StoredCredential::parse("$2b$12$truncated");
        assert!(matches!(
            credential.verify("$2b$12$truncated"),
            Err(PasswordError::InvalidHash(_))
        ));
    }

    #[test]
    fn test_plaintext_compares_whole_value() {
        let plain = StoredCredential::parse("secret");
        assert!(plain.verify("secret").unwrap());
        assert!(!plain.verify("secre").unwrap());
        assert!(!plain.verify("secret!").unwrap());
        assert!(!plain.verify("").unwrap());
    }

    #[test]
    fn test_stored_credential_verify() {
        let hash = hash_password("pw1").unwrap();
        let hashed = StoredCredential::parse(&hash);
        assert!(hashed.verify("pw1").unwrap());
        assert!(!hashed.verify("pw2").unwrap());

        let plain = StoredCredential::parse("pw1");
        assert!(plain.verify("pw1").unwrap());
        assert!(!plain.verify("PW1").unwrap());
    }

    #[test]
    fn test_corrupted_hash_is_an_error_not_a_mismatch() {
        let corrupted = StoredCredential::parse("$argon2id$v=19$garbage");
        assert!(!corrupted.is_plaintext());
        assert!(corrupted.verify("anything").is_err());
    }
}

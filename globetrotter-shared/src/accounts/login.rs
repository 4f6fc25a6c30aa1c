/// Login verification
///
/// Looks the user up by email and checks the password against the stored
/// credential. Nothing is written, on success or failure.
///
/// Stored credentials come in three shapes (see
/// [`StoredCredential`](crate::auth::password::StoredCredential)): Argon2
/// hashes, and bcrypt hashes or plaintext left over from imported legacy
/// accounts. Plaintext matching can be switched off with `allow_plaintext`.

use super::{AccountError, AccountResult};
use crate::{auth::password::StoredCredential, models::user::User, store::DocumentStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Identity returned by a successful login
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub user_name: String,
}

/// Checks email/password pairs against the user collection
#[derive(Clone)]
pub struct LoginVerifier {
    store: Arc<dyn DocumentStore>,
    allow_plaintext: bool,
}

impl LoginVerifier {
    pub fn new(store: Arc<dyn DocumentStore>, allow_plaintext: bool) -> Self {
        Self {
            store,
            allow_plaintext,
        }
    }

    /// Authenticates a login attempt
    ///
    /// # Errors
    ///
    /// - `UserNotFound` if no user has this email
    /// - `InvalidCredentials` if the password does not match
    /// - `HashCorrupted` if the stored hash cannot be parsed
    /// - `StorageFault` if the lookup fails
    pub async fn login(&self, email: &str, password: &str) -> AccountResult<AuthenticatedUser> {
        let matches = User::find_by_email(self.store.as_ref(), email).await?;
        if matches.len() > 1 {
            warn!(
                email = %email,
                count = matches.len(),
                "Multiple users share one email, using the lowest ID"
            );
        }

        // IDs are numeric strings; pick the smallest number, not the smallest string
        let user = matches
            .into_iter()
            .min_by_key(|user| (user.id.parse::<i64>().unwrap_or(i64::MAX), user.id.clone()))
            .ok_or(AccountError::UserNotFound)?;

        let credential = StoredCredential::parse(&user.record.password);
        let verified = match credential {
            StoredCredential::Argon2(_) | StoredCredential::Bcrypt(_) => {
                credential.verify(password).map_err(|e| {
                    warn!(user_id = %user.id, error = %e, "Stored password hash is corrupted");
                    AccountError::from(e)
                })?
            }
            StoredCredential::Plaintext(_) if self.allow_plaintext => {
                warn!(
                    user_id = %user.id,
                    "Verifying legacy plaintext password; account should be re-hashed"
                );
                credential.verify(password)?
            }
            StoredCredential::Plaintext(_) => {
                warn!(user_id = %user.id, "Rejected login against plaintext password");
                false
            }
        };

        if !verified {
            debug!(user_id = %user.id, "Login rejected: wrong password");
            return Err(AccountError::InvalidCredentials);
        }

        debug!(user_id = %user.id, "Login succeeded");
        Ok(AuthenticatedUser {
            user_id: user.id,
            user_name: user.record.user_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        accounts::signup::{NewUser, SignupConfig, SignupTransactor},
        models::user::UserRecord,
        store::memory::MemoryStore,
    };
    use chrono::Utc;

    async fn seed_user(store: &MemoryStore, id: &str, email: &str, password: &str) {
        let user = User {
            id: id.to_string(),
            record: UserRecord {
                user_name: format!("user{}", id),
                email: email.to_string(),
                password: password.to_string(),
                created_at: Utc::now(),
            },
        };
        store
            .set(&User::key(id), user.to_document_data().unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_login_after_signup() {
        let store = Arc::new(MemoryStore::new());
        let signup = SignupTransactor::new(store.clone(), SignupConfig::default());
        let verifier = LoginVerifier::new(store, true);

        let user_id = signup
            .signup(&NewUser {
                user_name: "jack".to_string(),
                email: "jackman01@gmail.com".to_string(),
                password: "jack@1234".to_string(),
            })
            .await
            .unwrap();

        let user = verifier.login("jackman01@gmail.com", "jack@1234").await.unwrap();
        assert_eq!(
            user,
            AuthenticatedUser {
                user_id,
                user_name: "jack".to_string(),
            }
        );

        let err = verifier
            .login("jackman01@gmail.com", "wrongpassword")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_unknown_email() {
        let verifier = LoginVerifier::new(Arc::new(MemoryStore::new()), true);
        let err = verifier.login("nobody@x.com", "pw").await.unwrap_err();
        assert!(matches!(err, AccountError::UserNotFound));
    }

    #[tokio::test]
    async fn test_plaintext_fallback() {
        let store = MemoryStore::new();
        seed_user(&store, "1005", "legacy@x.com", "jack@1234").await;

        let verifier = LoginVerifier::new(Arc::new(store.clone()), true);
        let user = verifier.login("legacy@x.com", "jack@1234").await.unwrap();
        assert_eq!(user.user_id, "1005");
        assert!(matches!(
            verifier.login("legacy@x.com", "nope").await,
            Err(AccountError::InvalidCredentials)
        ));

        let strict = LoginVerifier::new(Arc::new(store), false);
        assert!(matches!(
            strict.login("legacy@x.com", "jack@1234").await,
            Err(AccountError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_corrupted_hash() {
        let store = MemoryStore::new();
        seed_user(&store, "1001", "broken@x.com", "$argon2id$v=19$corrupted").await;

        let verifier = LoginVerifier::new(Arc::new(store), true);
        let err = verifier.login("broken@x.com", "pw").await.unwrap_err();
        assert!(matches!(err, AccountError::HashCorrupted(_)));
    }

    #[tokio::test]
    async fn test_legacy_bcrypt_login() {
        let store = MemoryStore::new();
        let hash = bcrypt::hash("jack@1234", 4).unwrap();
        seed_user(&store, "1005", "legacy@x.com", &hash).await;

        for allow_plaintext in [true, false] {
            let verifier = LoginVerifier::new(Arc::new(store.clone()), allow_plaintext);

            let user = verifier.login("legacy@x.com", "jack@1234").await.unwrap();
            assert_eq!(user.user_id, "1005");

            assert!(matches!(
                verifier.login("legacy@x.com", "wrongpassword").await,
                Err(AccountError::InvalidCredentials)
            ));
            // Knowing the stored hash is not enough to log in
            assert!(matches!(
                verifier.login("legacy@x.com", &hash).await,
                Err(AccountError::InvalidCredentials)
            ));
        }
    }

    #[tokio::test]
    async fn test_malformed_bcrypt_hash_is_corrupted() {
        let store = MemoryStore::new();
        seed_user(&store, "1006", "cut@x.com", "$2b$12$KIXQtruncated").await;

        let verifier = LoginVerifier::new(Arc::new(store), true);
        let err = verifier
            .login("cut@x.com", "$2b$12$KIXQtruncated")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::HashCorrupted(_)));
    }

    #[tokio::test]
    async fn test_duplicate_emails_use_numerically_lowest_id() {
        let store = MemoryStore::new();
        seed_user(&store, "10000", "twin@x.com", "second").await;
        seed_user(&store, "1001", "twin@x.com", "first").await;

        let verifier = LoginVerifier::new(Arc::new(store), true);
        let user = verifier.login("twin@x.com", "first").await.unwrap();
        assert_eq!(user.user_id, "1001");
    }

    #[tokio::test]
    async fn test_duplicate_emails_use_lowest_id() {
        let store = MemoryStore::new();
        seed_user(&store, "1002", "twin@x.com", "second").await;
        seed_user(&store, "1001", "twin@x.com", "first").await;

        let verifier = LoginVerifier::new(Arc::new(store), true);
        let user = verifier.login("twin@x.com", "first").await.unwrap();
        assert_eq!(user.user_id, "1001");
    }
}

/// Transactional signup with sequential user IDs
///
/// A signup runs as one transaction against the document store:
///
/// ```text
/// begin
///   ├─> query users where email == input.email   (non-empty → DuplicateEmail)
///   ├─> read counters/user_count                  (absent → 1001, else count + 1)
///   ├─> stage counters/user_count = { count: new_id }
///   ├─> stage users/{new_id} = { user_name, email, password, created_at }
/// commit
/// ```
///
/// The email query and the counter read are both part of the transaction's
/// read set. If a concurrent signup commits first, this commit fails with a
/// store conflict and the whole attempt is re-run, up to
/// [`SignupConfig::max_attempts`] times. Nothing is written by an attempt that
/// does not commit.
///
/// The password is hashed once per call, before the first attempt.
///
/// # Example
///
/// ```
/// use globetrotter_shared::accounts::signup::{NewUser, SignupConfig, SignupTransactor};
/// use globetrotter_shared::store::memory::MemoryStore;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let signup = SignupTransactor::new(Arc::new(MemoryStore::new()), SignupConfig::default());
///
/// let user_id = signup
///     .signup(&NewUser {
///         user_name: "jack".to_string(),
///         email: "jack@x.com".to_string(),
///         password: "pw1".to_string(),
///     })
///     .await?;
/// assert_eq!(user_id, "1001");
/// # Ok(())
/// # }
/// ```

use super::{AccountError, AccountResult};
use crate::{
    auth::password::hash_password,
    models::{
        counter::UserCounter,
        user::{User, UserRecord},
    },
    store::{DocumentStore, StoreError},
};
use chrono::Utc;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

/// Retry policy for signup transactions
#[derive(Debug, Clone)]
pub struct SignupConfig {
    /// Total attempts before giving up with `TransactionConflict`
    ///
    /// Default: 5. Values below 1 are treated as 1.
    pub max_attempts: u32,

    /// Delay before retry `n` is `retry_backoff * n`
    ///
    /// Default: 10ms
    pub retry_backoff: Duration,
}

impl Default for SignupConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_backoff: Duration::from_millis(10),
        }
    }
}

/// Signup input
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_name: String,
    pub email: String,
    /// Plaintext password, hashed before storage
    pub password: String,
}

/// Outcome of a single transaction attempt
#[derive(Debug)]
enum AttemptError {
    /// Final answer, do not retry
    Rejected(AccountError),

    /// Store failure, retried only if it is a conflict
    Store(StoreError),
}

impl From<StoreError> for AttemptError {
    fn from(err: StoreError) -> Self {
        AttemptError::Store(err)
    }
}

/// Allocates user IDs and creates user documents atomically
#[derive(Clone)]
pub struct SignupTransactor {
    store: Arc<dyn DocumentStore>,
    config: SignupConfig,
}

impl SignupTransactor {
    pub fn new(store: Arc<dyn DocumentStore>, config: SignupConfig) -> Self {
        Self { store, config }
    }

    /// Creates a user and returns its newly allocated ID
    ///
    /// # Errors
    ///
    /// - `DuplicateEmail` if an existing user has the same email
    /// - `TransactionConflict` if every attempt lost to a concurrent writer
    /// - `StorageFault` / `HashingFailed` for server-side failures
    pub async fn signup(&self, new_user: &NewUser) -> AccountResult<String> {
        let password_hash = hash_password(&new_user.password)?;
        let max_attempts = self.config.max_attempts.max(1);

        let mut attempt = 0;
        loop {
            attempt += 1;

            match self.attempt(new_user, &password_hash).await {
                Ok(user_id) => {
                    info!(user_id = %user_id, attempt, "User signed up");
                    return Ok(user_id);
                }
                Err(AttemptError::Rejected(err)) => {
                    debug!(email = %new_user.email, error = %err, "Signup rejected");
                    return Err(err);
                }
                Err(AttemptError::Store(err)) if err.is_conflict() => {
                    if attempt >= max_attempts {
                        warn!(
                            email = %new_user.email,
                            attempts = attempt,
                            "Signup gave up after repeated transaction conflicts"
                        );
                        return Err(AccountError::TransactionConflict { attempts: attempt });
                    }

                    debug!(attempt, error = %err, "Signup transaction conflicted, retrying");
                    tokio::time::sleep(self.config.retry_backoff * attempt).await;
                }
                Err(AttemptError::Store(err)) => {
                    warn!(error = %err, "Signup failed on store error");
                    return Err(err.into());
                }
            }
        }
    }

    async fn attempt(&self, new_user: &NewUser, password_hash: &str) -> Result<String, AttemptError> {
        let mut tx = self.store.begin().await?;

        let existing = User::find_by_email_in(tx.as_mut(), &new_user.email).await?;
        if !existing.is_empty() {
            if let Err(e) = tx.rollback().await {
                warn!(error = %e, "Failed to roll back rejected signup");
            }
            return Err(AttemptError::Rejected(AccountError::DuplicateEmail));
        }

        let counter = UserCounter::load(tx.as_mut()).await?;
        let new_id = UserCounter::next_id(counter)?;

        let user = User {
            id: new_id.to_string(),
            record: UserRecord {
                user_name: new_user.user_name.clone(),
                email: new_user.email.clone(),
                password: password_hash.to_string(),
                created_at: Utc::now(),
            },
        };

        UserCounter { count: new_id }.stage(tx.as_mut())?;
        tx.set(User::key(&user.id), user.to_document_data()?);
        tx.commit().await?;

        Ok(user.id)
    }
}

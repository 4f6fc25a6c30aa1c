/// Account services: signup and login
///
/// - [`signup::SignupTransactor`] allocates a sequential user ID and creates
///   the user document in one transaction, rejecting duplicate emails.
/// - [`login::LoginVerifier`] checks an email/password pair against the
///   stored credential.
///
/// Both resolve every internal failure into an [`AccountError`], whose
/// [`ErrorKind`] tells the caller whether the problem is the client's, a
/// transient conflict, or a server fault.

pub mod login;
pub mod signup;

use crate::{auth::password::PasswordError, store::StoreError};

/// Account service result type alias
pub type AccountResult<T> = Result<T, AccountError>;

/// Coarse classification used to pick a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// User-correctable, retrying the same request will not help
    Client,

    /// Transient, the same request may succeed if retried
    Conflict,

    /// Not user-correctable
    Server,
}

/// Errors returned by the account services
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// Another account already uses this email
    #[error("User already exists")]
    DuplicateEmail,

    /// No account matches this email
    #[error("User not found")]
    UserNotFound,

    /// Email exists but the password does not match
    #[error("Incorrect password")]
    InvalidCredentials,

    /// Signup lost every optimistic retry to concurrent writers
    #[error("Signup conflicted with concurrent updates after {attempts} attempts")]
    TransactionConflict { attempts: u32 },

    /// Backing store failure
    #[error("Storage failure: {0}")]
    StorageFault(String),

    /// Password could not be hashed
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    /// Stored password hash could not be parsed or checked
    #[error("Stored password hash is corrupted: {0}")]
    HashCorrupted(String),
}

impl AccountError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AccountError::DuplicateEmail
            | AccountError::UserNotFound
            | AccountError::InvalidCredentials => ErrorKind::Client,
            AccountError::TransactionConflict { .. } => ErrorKind::Conflict,
            AccountError::StorageFault(_)
            | AccountError::HashingFailed(_)
            | AccountError::HashCorrupted(_) => ErrorKind::Server,
        }
    }
}

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        AccountError::StorageFault(err.to_string())
    }
}

impl From<PasswordError> for AccountError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::HashError(msg) => AccountError::HashingFailed(msg),
            PasswordError::InvalidHash(msg) | PasswordError::VerifyError(msg) => {
                AccountError::HashCorrupted(msg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(AccountError::DuplicateEmail.kind(), ErrorKind::Client);
        assert_eq!(AccountError::UserNotFound.kind(), ErrorKind::Client);
        assert_eq!(AccountError::InvalidCredentials.kind(), ErrorKind::Client);
        assert_eq!(
            AccountError::TransactionConflict { attempts: 5 }.kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            AccountError::StorageFault("down".to_string()).kind(),
            ErrorKind::Server
        );
        assert_eq!(
            AccountError::HashCorrupted("bad".to_string()).kind(),
            ErrorKind::Server
        );
    }

    #[test]
    fn test_password_errors_map_to_hash_corrupted() {
        let err: AccountError = PasswordError::InvalidHash("nope".to_string()).into();
        assert!(matches!(err, AccountError::HashCorrupted(_)));
    }

    #[test]
    fn test_store_errors_map_to_storage_fault() {
        let err: AccountError = StoreError::TransactionClosed.into();
        assert!(matches!(err, AccountError::StorageFault(_)));
    }
}

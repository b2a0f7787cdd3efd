//! Local validation run before any confirmation reaches the backend.

use crate::code_entry::CodeEntry;

/// Default minimum length for a new password.
pub const DEFAULT_MIN_SECRET_LEN: usize = 6;

/// A rule that blocked a submission.
///
/// Display strings are the messages shown inline on the current step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please enter the complete {length}-digit code.")]
    IncompleteCode { length: usize },

    #[error("Password must be at least {min_len} characters.")]
    SecretTooShort { min_len: usize },

    #[error("Passwords do not match.")]
    SecretMismatch,
}

impl ValidationError {
    /// Returns an error code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::IncompleteCode { .. } => "INCOMPLETE_CODE",
            ValidationError::SecretTooShort { .. } => "PASSWORD_TOO_SHORT",
            ValidationError::SecretMismatch => "PASSWORD_MISMATCH",
        }
    }
}

/// Checks that every cell of the code holds a digit.
pub fn validate_code(code: &CodeEntry) -> Result<(), ValidationError> {
    if code.is_complete() {
        Ok(())
    } else {
        Err(ValidationError::IncompleteCode { length: code.len() })
    }
}

/// Checks a new password and its confirmation.
pub fn validate_new_secret(
    new_secret: &str,
    confirm_secret: &str,
    min_len: usize,
) -> Result<(), ValidationError> {
    if new_secret.chars().count() < min_len {
        return Err(ValidationError::SecretTooShort { min_len });
    }
    if new_secret != confirm_secret {
        return Err(ValidationError::SecretMismatch);
    }
    Ok(())
}

/// Runs every reset-flow rule in order; the first failure wins.
pub fn validate_reset(
    code: &CodeEntry,
    new_secret: &str,
    confirm_secret: &str,
    min_len: usize,
) -> Result<(), ValidationError> {
    validate_code(code)?;
    validate_new_secret(new_secret, confirm_secret, min_len)
}

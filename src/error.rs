use thiserror::Error;

/// Application-level error types
#[derive(Error, Debug)]
pub enum ClientError {
    /// Operation attempted outside its legal lifecycle phase
    #[error("Invalid market phase: {0}")]
    InvalidPhase(String),

    /// Attempt to re-run a state transition that already happened
    #[error("Duplicate transition: {0}")]
    DuplicateTransition(String),

    /// The finalization waiter exhausted its polling budget
    #[error("Finalization timed out after {attempts} attempts, offsets still pending: {missing:?}")]
    FinalizationTimeout { attempts: u32, missing: Vec<u64> },

    /// Ciphertext/nonce/key mismatch during decryption
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Malformed input, caught before any network interaction
    #[error("Validation error: {0}")]
    Validation(String),

    /// Confidential computation reported an attempted overdraft
    #[error("Insufficient vote-credit balance")]
    InsufficientBalance,

    /// Confidential computation was aborted by the cluster
    #[error("Computation aborted by cluster")]
    AbortedComputation,

    /// Signer is not allowed to perform the operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Entity not found at its derived address
    #[error("Account not found: {0}")]
    NotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Ledger/RPC interaction errors
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Whether re-invoking the same logical operation is safe.
    ///
    /// Timeouts mean the computation may still land; duplicate transitions
    /// mean the work already happened. Everything else is terminal for the
    /// attempted operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::FinalizationTimeout { .. } | ClientError::DuplicateTransition(_)
        )
    }

    /// Check if error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }

    /// Check if the error was raised before any network interaction
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ClientError::Validation(_) | ClientError::Config(_) | ClientError::InvalidPhase(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let timeout = ClientError::FinalizationTimeout {
            attempts: 120,
            missing: vec![42],
        };
        assert!(timeout.is_retryable());

        let duplicate = ClientError::DuplicateTransition("tally".to_string());
        assert!(duplicate.is_retryable());

        assert!(!ClientError::InsufficientBalance.is_retryable());
        assert!(!ClientError::Decryption("bad tag".to_string()).is_retryable());
    }

    #[test]
    fn test_timeout_names_missing_offsets() {
        let err = ClientError::FinalizationTimeout {
            attempts: 3,
            missing: vec![7, 9],
        };
        let msg = format!("{}", err);
        assert!(msg.contains('7'));
        assert!(msg.contains('9'));
    }

    #[test]
    fn test_local_errors_never_touch_network() {
        assert!(ClientError::Validation("zero amount".to_string()).is_local());
        assert!(!ClientError::Ledger("rpc".to_string()).is_local());
    }
}

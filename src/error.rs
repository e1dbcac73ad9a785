/// Coarse classification an outer layer maps to its own response codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The referenced resource does not exist
    NotFound,
    /// The caller supplied a malformed record
    InvalidInput,
}

/// Error type for transaction operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionError {
    #[error("Transaction not found with ID: {0}")]
    NotFound(String),

    /// The transfer object could not be mapped to a record
    #[error("Invalid transaction: {0}")]
    Invalid(#[from] ValidationError),
}

impl TransactionError {
    /// Returns the classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransactionError::NotFound(_) => ErrorKind::NotFound,
            TransactionError::Invalid(err) => err.kind(),
        }
    }
}

/// Result type for transaction operations
pub type TransactionResult<T> = Result<T, TransactionError>;

/// Error type for field-level validation of incoming records
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("amount must not be empty")]
    MissingAmount,

    #[error("amount must be positive")]
    NonPositiveAmount,

    #[error("description must not be blank")]
    BlankDescription,

    #[error("transaction type must not be empty")]
    MissingType,

    #[error("category must not be blank")]
    BlankCategory,
}

impl ValidationError {
    /// Returns the classification of this error
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidInput
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_and_kind() {
        let err = TransactionError::NotFound("999".to_string());
        assert_eq!(err.to_string(), "Transaction not found with ID: 999");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_validation_error_converts() {
        let err: TransactionError = ValidationError::MissingType.into();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(err.to_string(), "Invalid transaction: transaction type must not be empty");
    }

    #[test]
    fn test_validation_errors_are_invalid_input() {
        assert_eq!(ValidationError::BlankCategory.kind(), ErrorKind::InvalidInput);
        assert_eq!(ValidationError::NonPositiveAmount.to_string(), "amount must be positive");
    }
}

use std::fmt;
use thiserror::Error;

/// The six operator-supplied transaction fields, in validation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionField {
    AccountId,
    Amount,
    Location,
    Hour,
    TransactionsToday,
    DaysSinceLast,
}

impl TransactionField {
    pub fn name(self) -> &'static str {
        match self {
            TransactionField::AccountId         => "account_id",
            TransactionField::Amount            => "amount",
            TransactionField::Location          => "location",
            TransactionField::Hour              => "hour",
            TransactionField::TransactionsToday => "transactions_today",
            TransactionField::DaysSinceLast     => "days_since_last",
        }
    }
}

impl fmt::Display for TransactionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Missing { field: TransactionField },

    #[error("Field '{field}' is invalid: {reason} (got {value:?})")]
    Malformed {
        field:  TransactionField,
        value:  String,
        reason: &'static str,
    },
}

impl ValidationError {
    /// The first offending field.
    pub fn field(&self) -> TransactionField {
        match self {
            ValidationError::Missing { field } | ValidationError::Malformed { field, .. } => *field,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Rule engine timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("Rule engine '{binary}' not found; install it and add it to PATH")]
    NotFound { binary: String },

    #[error("Rule engine failed to launch: {reason}")]
    Launch { reason: String },
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid transaction: {0}")]
    Validation(#[from] ValidationError),

    #[error("Analysis failed: {0}")]
    Engine(#[from] EngineError),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

use rust_decimal::{Decimal, Error as DECIMAL_ERROR};
use serde_json::Error as JSON_ERROR;
use std::{env::VarError, io::Error as IO_ERROR};
use thiserror::Error;
use tracing::subscriber::SetGlobalDefaultError as TRACING_GLOBAL_DEFAULT_ERROR;

use crate::settlement::Stage;

/// Infrastructure failures: storage, serialization, configuration.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] IO_ERROR),

    #[error("{0}")]
    Json(#[from] JSON_ERROR),

    #[error("{0}")]
    Var(#[from] VarError),

    #[error("{0}")]
    Decimal(#[from] DECIMAL_ERROR),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("{0}")]
    TracingGlobalDefault(#[from] TRACING_GLOBAL_DEFAULT_ERROR),

    #[error("{0}")]
    Ledger(Box<LedgerError>),
}

impl From<LedgerError> for Error {
    fn from(error: LedgerError) -> Self {
        Error::Ledger(Box::new(error))
    }
}

/// Ledger-level failures. Validation and precondition errors leave state untouched.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Trade amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    #[error("Listing not found: {0}")]
    ListingNotFound(String),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Decimal, available: Decimal },

    #[error("Listing {0} has no positive price")]
    UnpricedListing(String),

    #[error("Amount overflows the ledger's arithmetic")]
    ArithmeticOverflow,

    #[error("{0} is not supported")]
    NotSupported(&'static str),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] Error),
}

#[derive(Error, Debug)]
pub enum SettlementError {
    #[error("Trade amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    #[error("{0}")]
    Ledger(#[from] LedgerError),

    #[error("{stage} step failed: {reason}")]
    StepFailed { stage: Stage, reason: String },

    #[error("{0} step timed out")]
    StepTimedOut(Stage),

    #[error("Settlement cancelled during {0}")]
    Cancelled(Stage),

    #[error("Settlement cannot be cancelled once {0} has started")]
    NotCancellable(Stage),

    #[error("Settlement already completed")]
    AlreadyCompleted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_errors_convert_into_infrastructure_errors() {
        let error: Error = LedgerError::ListingNotFound("LST-404".into()).into();
        assert!(matches!(&error, Error::Ledger(inner) if matches!(**inner, LedgerError::ListingNotFound(_))));
        assert_eq!(error.to_string(), "Listing not found: LST-404");
    }

    #[test]
    fn persistence_failures_keep_their_source() {
        let io = Error::Io(std::io::Error::other("disk full"));
        let error: Error = LedgerError::Persistence(io).into();
        assert_eq!(error.to_string(), "Persistence failure: disk full");
    }
}

//! Errors raised while validating, building or posting a voucher.

use rust_decimal::Decimal;
use thiserror::Error;

use journalplus_core::DomainError;

use crate::ledger::LedgerError;

pub type PostingResult<T> = Result<T, PostingError>;

/// User-facing failures of the expense lifecycle.
///
/// All are raised before anything reaches the ledger. Line numbers are
/// 1-based, matching what the user sees in the detail table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PostingError {
    #[error("amount must be positive for row {line}")]
    InvalidAmount { line: usize },

    #[error("no detail lines found")]
    NoDetailLines,

    #[error("account paid from is required")]
    MissingAccount,

    #[error("expense account is required for row {line}")]
    MissingExpenseAccount { line: usize },

    #[error("company is required")]
    MissingCompany,

    #[error("you don't have permission to post this document")]
    PermissionDenied,

    /// The builder's own arithmetic failed to balance.
    #[error("GL entries are not balanced: debit {debit} != credit {credit}")]
    UnbalancedLedger { debit: Decimal, credit: Decimal },

    #[error("{0} is mandatory for Profit and Loss")]
    MandatoryDimension(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl PostingError {
    /// True when the error signals a defect rather than bad input.
    pub fn is_defect(&self) -> bool {
        matches!(self, PostingError::UnbalancedLedger { .. })
    }
}

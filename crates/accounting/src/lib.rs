//! Accounting module: Expense Entry vouchers and their general-ledger postings.
//!
//! Pure domain logic behind host ports: the ledger, permission checks,
//! configuration lookups and custom-field installation are traits with
//! in-memory implementations.

pub mod dimension;
pub mod document;
pub mod error;
pub mod expense;
pub mod ledger;
pub mod posting;
pub mod settings;

pub use dimension::{
    AccountingDimension, CustomField, CustomFieldInstaller, FieldInstallError, FieldType,
    InMemoryFieldRegistry, SyncOutcome, sync_accounting_dimension, validate_mandatory_dimensions,
};
pub use document::{AccountingDocument, PostingHost};
pub use error::{PostingError, PostingResult};
pub use expense::{ExpenseDocument, ExpenseEntry, ExpenseLine};
pub use ledger::{GlRow, InMemoryLedger, LedgerEntry, LedgerError, LedgerPoster, PostingOptions};
pub use posting::{PostingContext, build_expense_entries, non_blank};
pub use settings::{AccountsSettings, CompanyConfig, CompanyDefaults, DefaultsLookup, ResolverChain};

//! `journalplus-core` — domain building blocks shared by every crate.
//!
//! This crate contains **pure domain** primitives (no host or ledger concerns).

pub mod document;
pub mod error;
pub mod id;
pub mod money;

pub use document::{DocAction, DocStatus, Document};
pub use error::{DomainError, DomainResult};
pub use id::VoucherId;

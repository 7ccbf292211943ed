//! Document lifecycle shared by every submittable voucher.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::VoucherId;

/// Where a document sits in its lifecycle.
///
/// Drafts are editable. Submitted documents are immutable and have ledger
/// rows. Cancelled documents keep their rows, offset by reversals.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocStatus {
    #[default]
    Draft,
    Submitted,
    Cancelled,
}

/// Lifecycle actions a host can request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocAction {
    Validate,
    Submit,
    Cancel,
    Delete,
}

impl core::fmt::Display for DocStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            DocStatus::Draft => "draft",
            DocStatus::Submitted => "submitted",
            DocStatus::Cancelled => "cancelled",
        })
    }
}

impl core::fmt::Display for DocAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            DocAction::Validate => "validate",
            DocAction::Submit => "submit",
            DocAction::Cancel => "cancel",
            DocAction::Delete => "delete",
        })
    }
}

impl DocStatus {
    /// Whether `action` is allowed from this state.
    pub fn permits(self, action: DocAction) -> bool {
        matches!(
            (self, action),
            (DocStatus::Draft, DocAction::Validate)
                | (DocStatus::Draft, DocAction::Submit)
                | (DocStatus::Draft, DocAction::Delete)
                | (DocStatus::Submitted, DocAction::Cancel)
                | (DocStatus::Cancelled, DocAction::Delete)
        )
    }

    pub fn check(self, action: DocAction) -> DomainResult<()> {
        if self.permits(action) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "cannot {action} a {self} document"
            )))
        }
    }

    /// State reached after `action` succeeds. Deletion has no successor state,
    /// so it maps to `None`, as does any forbidden action.
    pub fn after(self, action: DocAction) -> Option<DocStatus> {
        if !self.permits(action) {
            return None;
        }
        match action {
            DocAction::Validate => Some(DocStatus::Draft),
            DocAction::Submit => Some(DocStatus::Submitted),
            DocAction::Cancel => Some(DocStatus::Cancelled),
            DocAction::Delete => None,
        }
    }
}

/// Identity + lifecycle state of a voucher.
pub trait Document {
    /// Document type name as the host knows it (e.g. "Expense Entry").
    const DOCTYPE: &'static str;

    fn name(&self) -> VoucherId;

    fn status(&self) -> DocStatus;
}

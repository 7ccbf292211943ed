use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// What a principal wants to do with a document type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionAction {
    Read,
    Write,
    Submit,
    Cancel,
    Delete,
}

impl PermissionAction {
    pub fn as_str(self) -> &'static str {
        match self {
            PermissionAction::Read => "read",
            PermissionAction::Write => "write",
            PermissionAction::Submit => "submit",
            PermissionAction::Cancel => "cancel",
            PermissionAction::Delete => "delete",
        }
    }
}

/// Permission identifier.
///
/// Permissions are opaque strings of the form `"<doctype>.<action>"`, with the
/// doctype scrubbed (e.g. `"expense_entry.write"`). The wildcard `"*"` grants
/// everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn wildcard() -> Self {
        Self::new("*")
    }

    /// Permission for `action` on `doctype` ("Expense Entry" + Write →
    /// "expense_entry.write").
    pub fn for_doctype(doctype: &str, action: PermissionAction) -> Self {
        let scrubbed = doctype.trim().to_lowercase().replace([' ', '-'], "_");
        Self::new(format!("{scrubbed}.{}", action.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

use thiserror::Error;

use journalplus_core::VoucherId;

use crate::{CompanyMembership, Permission, PermissionAction, PrincipalId};

/// A fully resolved principal for authorization decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub principal_id: PrincipalId,
    pub active_company: String,
    pub membership: CompanyMembership,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("company mismatch")]
    CompanyMismatch,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Authorize a principal within its active company.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    if principal.active_company != principal.membership.company {
        return Err(AuthzError::CompanyMismatch);
    }

    let granted = principal
        .membership
        .permissions
        .iter()
        .any(|p| p.is_wildcard() || p == required);

    if granted {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

/// The document a permission is being checked against.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DocRef<'a> {
    pub voucher: VoucherId,
    /// Company the document books into, when already known.
    pub company: Option<&'a str>,
}

/// Host permission check consulted before a document posts to the ledger.
pub trait PermissionCheck {
    fn has_permission(&self, doctype: &str, action: PermissionAction, doc: DocRef<'_>) -> bool;
}

impl PermissionCheck for Principal {
    fn has_permission(&self, doctype: &str, action: PermissionAction, doc: DocRef<'_>) -> bool {
        let required = Permission::for_doctype(doctype, action);
        if let Err(err) = authorize(self, &required) {
            tracing::debug!(
                principal = %self.principal_id,
                voucher = %doc.voucher,
                error = %err,
                "permission denied"
            );
            return false;
        }

        // Documents of another company are out of scope even with the permission.
        match doc.company {
            Some(company) if company != self.membership.company => {
                tracing::debug!(
                    principal = %self.principal_id,
                    voucher = %doc.voucher,
                    company,
                    "document belongs to another company"
                );
                false
            }
            _ => true,
        }
    }
}

/// Grants everything. For hosts that enforce permissions upstream, and tests.
#[derive(Debug, Default, Copy, Clone)]
pub struct AllowAll;

impl PermissionCheck for AllowAll {
    fn has_permission(&self, _: &str, _: PermissionAction, _: DocRef<'_>) -> bool {
        true
    }
}

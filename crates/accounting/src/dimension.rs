//! Accounting dimensions on expense vouchers.
//!
//! When the host defines a dimension (department, branch, ...), both the
//! voucher header and its detail rows get a link field for it, and dimensions
//! mandatory for Profit and Loss must be filled on every expense line.

use std::collections::BTreeMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{PostingError, PostingResult};

pub const EXPENSE_ENTRY: &str = "Expense Entry";
pub const EXPENSE_ENTRY_DETAIL: &str = "Expense Entry Detail";

/// A host-defined accounting dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountingDimension {
    pub name: String,
    pub label: String,
    /// Doctype the dimension's link field points at.
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub mandatory_for_pl: bool,
}

impl AccountingDimension {
    /// Fieldname the dimension is stored under.
    pub fn fieldname(&self) -> String {
        scrub(&self.name)
    }
}

/// Host-style fieldname: lowercase, spaces and hyphens become underscores.
pub fn scrub(name: &str) -> String {
    name.trim().replace([' ', '-'], "_").to_lowercase()
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Link,
}

/// A custom field definition handed to the installer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub fieldname: String,
    pub label: String,
    pub fieldtype: FieldType,
    pub options: String,
    pub insert_after: String,
    pub reqd: bool,
    pub ignore_user_permissions: bool,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldInstallError {
    #[error("host refused custom field {fieldname} on {doctype}: {reason}")]
    Rejected {
        doctype: String,
        fieldname: String,
        reason: String,
    },

    #[error("custom field registry lock poisoned")]
    Poisoned,
}

/// Host custom-field installer.
pub trait CustomFieldInstaller {
    fn field_exists(&self, doctype: &str, fieldname: &str) -> Result<bool, FieldInstallError>;

    /// Create or update `fields`, keyed by target doctype. Must be idempotent
    /// and install either every field or none.
    fn create_custom_fields(
        &self,
        fields: BTreeMap<String, Vec<CustomField>>,
    ) -> Result<(), FieldInstallError>;
}

/// In-memory installer keeping fields per doctype in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryFieldRegistry {
    fields: RwLock<BTreeMap<String, Vec<CustomField>>>,
}

impl InMemoryFieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(&self, doctype: &str) -> Vec<CustomField> {
        self.fields
            .read()
            .ok()
            .and_then(|f| f.get(doctype).cloned())
            .unwrap_or_default()
    }
}

impl CustomFieldInstaller for InMemoryFieldRegistry {
    fn field_exists(&self, doctype: &str, fieldname: &str) -> Result<bool, FieldInstallError> {
        let registry = self.fields.read().map_err(|_| FieldInstallError::Poisoned)?;
        Ok(registry
            .get(doctype)
            .is_some_and(|fields| fields.iter().any(|c| c.fieldname == fieldname)))
    }

    fn create_custom_fields(
        &self,
        fields: BTreeMap<String, Vec<CustomField>>,
    ) -> Result<(), FieldInstallError> {
        let mut registry = self.fields.write().map_err(|_| FieldInstallError::Poisoned)?;

        for (doctype, new_fields) in fields {
            let existing = registry.entry(doctype).or_default();
            for field in new_fields {
                match existing.iter_mut().find(|c| c.fieldname == field.fieldname) {
                    Some(slot) => *slot = field,
                    None => existing.push(field),
                }
            }
        }
        Ok(())
    }
}

/// Doctypes that received a new field during a sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub installed: Vec<String>,
}

impl SyncOutcome {
    pub fn is_noop(&self) -> bool {
        self.installed.is_empty()
    }
}

/// Make sure the voucher and its detail rows carry a link field for `dim`.
///
/// Disabled dimensions and dimensions without a document type are skipped.
/// Fields that already exist are left alone. Nothing is reported as
/// installed unless the installer accepted it.
pub fn sync_accounting_dimension(
    dim: &AccountingDimension,
    installer: &dyn CustomFieldInstaller,
) -> Result<SyncOutcome, FieldInstallError> {
    let Some(document_type) = dim.document_type.as_deref().filter(|_| !dim.disabled) else {
        return Ok(SyncOutcome::default());
    };

    let fieldname = dim.fieldname();
    let link = |label: &str, insert_after: &str| CustomField {
        fieldname: fieldname.clone(),
        label: label.to_string(),
        fieldtype: FieldType::Link,
        options: document_type.to_string(),
        insert_after: insert_after.to_string(),
        reqd: dim.mandatory_for_pl,
        ignore_user_permissions: true,
    };

    let mut pending: BTreeMap<String, Vec<CustomField>> = BTreeMap::new();
    if !installer.field_exists(EXPENSE_ENTRY, &fieldname)? {
        pending
            .entry(EXPENSE_ENTRY.to_string())
            .or_default()
            .push(link(&dim.label, "project"));
    }
    if !installer.field_exists(EXPENSE_ENTRY_DETAIL, &fieldname)? {
        pending
            .entry(EXPENSE_ENTRY_DETAIL.to_string())
            .or_default()
            .push(link(&fieldname, "cost_center"));
    }

    if pending.is_empty() {
        return Ok(SyncOutcome::default());
    }

    let installed: Vec<String> = pending.keys().cloned().collect();
    if let Err(err) = installer.create_custom_fields(pending) {
        tracing::error!(dimension = %dim.label, error = %err, "accounting dimension sync failed");
        return Err(err);
    }
    tracing::info!(dimension = %dim.label, ?installed, "accounting dimension synced to Expense Entry");

    Ok(SyncOutcome { installed })
}

/// Every enabled dimension mandatory for Profit and Loss must have a value
/// in `values` (the dimensions in effect for one expense line).
pub fn validate_mandatory_dimensions(
    values: &BTreeMap<String, String>,
    dimensions: &[AccountingDimension],
) -> PostingResult<()> {
    for dim in dimensions.iter().filter(|d| d.mandatory_for_pl && !d.disabled) {
        let filled = values
            .get(&dim.fieldname())
            .is_some_and(|v| !v.trim().is_empty());
        if !filled {
            return Err(PostingError::MandatoryDimension(dim.label.clone()));
        }
    }
    Ok(())
}

//! Expense Entry voucher: one debit per expense line, one aggregate credit
//! against the account the expenses were paid from.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use journalplus_auth::PermissionAction;
use journalplus_core::{DocAction, DocStatus, Document, DomainResult, VoucherId, money};

use crate::dimension;
use crate::document::{AccountingDocument, PostingHost};
use crate::error::{PostingError, PostingResult};
use crate::ledger::LedgerEntry;
use crate::posting::{self, PostingContext};

/// One expense detail row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseLine {
    /// Row name; used as the marker that keeps ledger rows distinct.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub expense_account: Option<String>,
    pub amount: Decimal,
    #[serde(default)]
    pub party_type: Option<String>,
    #[serde(default)]
    pub party: Option<String>,
    #[serde(default)]
    pub cost_center: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
    /// Accounting dimension values keyed by fieldname.
    #[serde(default)]
    pub dimensions: BTreeMap<String, String>,
}

impl ExpenseLine {
    pub fn new(expense_account: impl Into<String>, amount: Decimal) -> Self {
        Self {
            expense_account: Some(expense_account.into()),
            amount,
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_party(mut self, party_type: impl Into<String>, party: impl Into<String>) -> Self {
        self.party_type = Some(party_type.into());
        self.party = Some(party.into());
        self
    }

    pub fn with_cost_center(mut self, cost_center: impl Into<String>) -> Self {
        self.cost_center = Some(cost_center.into());
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }

    pub fn with_dimension(mut self, fieldname: impl Into<String>, value: impl Into<String>) -> Self {
        self.dimensions.insert(fieldname.into(), value.into());
        self
    }
}

/// Editable content of an expense voucher.
///
/// Every optional field has a defined fallback, applied by the accessors here
/// or by the posting builder's resolver chains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseDocument {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    /// Company currency as captured on the document; a late fallback.
    #[serde(default)]
    pub company_currency: Option<String>,
    #[serde(default)]
    pub exchange_rate: Option<Decimal>,
    #[serde(default)]
    pub posting_date: Option<NaiveDate>,
    #[serde(default)]
    pub required_date: Option<NaiveDate>,
    #[serde(default)]
    pub account_paid_from: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub cost_center: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub rounding_account: Option<String>,
    #[serde(default)]
    pub is_opening: bool,
    #[serde(default)]
    pub dimensions: BTreeMap<String, String>,
    #[serde(default)]
    pub details: Vec<ExpenseLine>,
}

impl ExpenseDocument {
    pub fn new(account_paid_from: impl Into<String>) -> Self {
        Self {
            account_paid_from: Some(account_paid_from.into()),
            ..Self::default()
        }
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_exchange_rate(mut self, rate: Decimal) -> Self {
        self.exchange_rate = Some(rate);
        self
    }

    pub fn with_posting_date(mut self, date: NaiveDate) -> Self {
        self.posting_date = Some(date);
        self
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }

    pub fn with_rounding_account(mut self, account: impl Into<String>) -> Self {
        self.rounding_account = Some(account.into());
        self
    }

    pub fn with_dimension(mut self, fieldname: impl Into<String>, value: impl Into<String>) -> Self {
        self.dimensions.insert(fieldname.into(), value.into());
        self
    }

    pub fn with_line(mut self, line: ExpenseLine) -> Self {
        self.details.push(line);
        self
    }

    /// Document-to-company conversion rate; 1 when not set.
    pub fn exchange_rate(&self) -> Decimal {
        self.exchange_rate.unwrap_or(Decimal::ONE)
    }

    /// Dimension values in effect for `line`: the line's own, falling back to
    /// the document's.
    pub fn line_dimensions(&self, line: &ExpenseLine) -> BTreeMap<String, String> {
        let mut merged = self.dimensions.clone();
        merged.extend(line.dimensions.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }
}

/// An expense voucher under lifecycle control.
///
/// Content is editable only while in draft; submission posts it to the ledger
/// and cancellation reverses that posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpenseEntry {
    name: VoucherId,
    status: DocStatus,
    document: ExpenseDocument,
    total: Decimal,
    qty: usize,
    posted_to_gl: bool,
}

impl ExpenseEntry {
    /// A new draft.
    pub fn new(name: VoucherId, document: ExpenseDocument) -> Self {
        Self::restore(name, document, DocStatus::Draft)
    }

    /// Rehydrate a voucher the host persisted in `status`.
    pub fn restore(name: VoucherId, document: ExpenseDocument, status: DocStatus) -> Self {
        let total = money::sum(document.details.iter().map(|l| l.amount));
        let qty = document.details.len();
        Self {
            name,
            status,
            document,
            total,
            qty,
            posted_to_gl: status != DocStatus::Draft,
        }
    }

    pub fn document(&self) -> &ExpenseDocument {
        &self.document
    }

    /// Mutable access to the content; drafts only.
    pub fn document_mut(&mut self) -> DomainResult<&mut ExpenseDocument> {
        self.status.check(DocAction::Validate)?;
        Ok(&mut self.document)
    }

    /// Sum of line amounts as of the last validation.
    pub fn total(&self) -> Decimal {
        self.total
    }

    /// Number of lines as of the last validation.
    pub fn qty(&self) -> usize {
        self.qty
    }

    pub fn posted_to_gl(&self) -> bool {
        self.posted_to_gl
    }

    /// Validate, then post forward entries and mark the voucher submitted.
    pub fn submit(&mut self, host: &PostingHost<'_>) -> PostingResult<Vec<LedgerEntry>> {
        self.status.check(DocAction::Submit)?;
        self.validate()?;

        let entries = self.post(host)?;
        self.pin_resolved(&entries, &host.posting_context());
        self.posted_to_gl = true;
        self.status = DocStatus::Submitted;

        tracing::info!(
            voucher = %self.name,
            rows = entries.len(),
            total = %self.total,
            "expense entry submitted"
        );
        Ok(entries)
    }

    /// Write the values the builder resolved from host state back onto the
    /// document, so a later rebuild yields the posted entry set unchanged.
    fn pin_resolved(&mut self, entries: &[LedgerEntry], ctx: &PostingContext<'_>) {
        let Some(first) = entries.first() else {
            return;
        };
        let doc = &mut self.document;
        doc.company = Some(first.company.clone());
        doc.currency = Some(first.account_currency.clone());
        doc.posting_date = Some(first.posting_date);
        doc.exchange_rate = Some(first.exchange_rate);
        if posting::non_blank(&doc.company_currency).is_none() {
            doc.company_currency = posting::resolve_company_currency(doc, &first.company, ctx);
        }
        if posting::non_blank(&doc.rounding_account).is_none() {
            doc.rounding_account = posting::resolve_rounding_account(doc, &first.company, ctx);
        }
    }

    /// Post reversal entries and mark the voucher cancelled.
    pub fn cancel(&mut self, host: &PostingHost<'_>) -> PostingResult<Vec<LedgerEntry>> {
        self.status.check(DocAction::Cancel)?;

        let entries = self.reverse(host)?;
        self.status = DocStatus::Cancelled;

        tracing::info!(voucher = %self.name, rows = entries.len(), "expense entry cancelled");
        Ok(entries)
    }

    /// Delete a draft or cancelled voucher. Ledger rows of a cancelled voucher
    /// go with it when the accounts settings ask for it; returns how many did.
    pub fn delete(self, host: &PostingHost<'_>) -> PostingResult<usize> {
        self.status.check(DocAction::Delete)?;

        let removed = if self.status == DocStatus::Cancelled
            && host.settings.delete_linked_ledger_entries
        {
            host.ledger.delete_for_voucher(Self::DOCTYPE, self.name)?
        } else {
            0
        };

        tracing::info!(voucher = %self.name, removed, "expense entry deleted");
        Ok(removed)
    }
}

impl Document for ExpenseEntry {
    const DOCTYPE: &'static str = "Expense Entry";

    fn name(&self) -> VoucherId {
        self.name
    }

    fn status(&self) -> DocStatus {
        self.status
    }
}

impl AccountingDocument for ExpenseEntry {
    const POST_PERMISSION: PermissionAction = PermissionAction::Write;

    fn company(&self) -> Option<&str> {
        self.document
            .company
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// Recompute `total` and `qty`; amounts may not be negative. Zero is left
    /// for the posting builder to reject.
    fn validate(&mut self) -> PostingResult<()> {
        self.status.check(DocAction::Validate)?;

        let mut total = Decimal::ZERO;
        for (idx, line) in self.document.details.iter().enumerate() {
            if line.amount < Decimal::ZERO {
                return Err(PostingError::InvalidAmount { line: idx + 1 });
            }
            total += line.amount;
        }

        self.total = total;
        self.qty = self.document.details.len();
        Ok(())
    }

    fn check_postable(&self, host: &PostingHost<'_>) -> PostingResult<()> {
        for line in &self.document.details {
            dimension::validate_mandatory_dimensions(
                &self.document.line_dimensions(line),
                host.dimensions,
            )?;
        }
        Ok(())
    }

    fn build_postings(&self, ctx: &PostingContext<'_>) -> PostingResult<Vec<LedgerEntry>> {
        posting::build_expense_entries(Self::DOCTYPE, self.name, &self.document, ctx)
    }
}

//! Ledger posting builder for expense vouchers.
//!
//! Turns expense lines into one debit per line plus a single aggregate credit,
//! absorbs rounding differences through the rounding account and refuses to
//! hand an unbalanced set to the ledger.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use journalplus_core::{VoucherId, money};

use crate::error::{PostingError, PostingResult};
use crate::expense::ExpenseDocument;
use crate::ledger::{LedgerEntry, totals};
use crate::settings::{AccountsSettings, DefaultsLookup, ResolverChain};

const DEFAULT_LINE_REMARKS: &str = "Expense";
const DEFAULT_CREDIT_REMARKS: &str = "Payment/Clearing";
const ROUNDING_REMARKS: &str = "Rounding adjustment";

/// Read-only configuration the builder consults.
#[derive(Clone, Copy)]
pub struct PostingContext<'a> {
    pub defaults: &'a dyn DefaultsLookup,
    pub settings: &'a AccountsSettings,
    pub today: NaiveDate,
}

/// Header values every entry of the voucher shares.
struct Header<'a> {
    voucher_type: &'a str,
    voucher_no: VoucherId,
    company: String,
    currency: String,
    exchange_rate: Decimal,
    posting_date: NaiveDate,
    is_opening: bool,
}

impl Header<'_> {
    /// An entry on `account` with every amount zero.
    fn entry(&self, account: &str, remarks: String) -> LedgerEntry {
        LedgerEntry {
            posting_date: self.posting_date,
            account: account.to_string(),
            debit: Decimal::ZERO,
            credit: Decimal::ZERO,
            debit_in_account_currency: Decimal::ZERO,
            credit_in_account_currency: Decimal::ZERO,
            account_currency: self.currency.clone(),
            exchange_rate: self.exchange_rate,
            company: self.company.clone(),
            voucher_type: self.voucher_type.to_string(),
            voucher_no: self.voucher_no,
            against: None,
            remarks,
            party_type: None,
            party: None,
            cost_center: None,
            project: None,
            dimensions: Default::default(),
            is_opening: self.is_opening,
        }
    }
}

/// Build the ordered entry set for an expense voucher: debits in line order,
/// the aggregate credit, then the rounding adjustment if one was needed.
pub fn build_expense_entries(
    voucher_type: &str,
    voucher_no: VoucherId,
    doc: &ExpenseDocument,
    ctx: &PostingContext<'_>,
) -> PostingResult<Vec<LedgerEntry>> {
    if doc.details.is_empty() {
        return Err(PostingError::NoDetailLines);
    }

    let credit_account = doc
        .account_paid_from
        .as_deref()
        .filter(|a| !a.trim().is_empty())
        .ok_or(PostingError::MissingAccount)?;

    let company = resolve_company(doc, ctx).ok_or(PostingError::MissingCompany)?;

    let currency = ResolverChain::new()
        .value(non_blank(&doc.currency))
        .then(|| non_blank(&ctx.defaults.company_default_currency(&company)))
        .value(non_blank(&doc.company_currency))
        .resolve()
        .unwrap_or_else(|| ctx.settings.fallback_currency.clone());

    let posting_date = resolve_posting_date(doc, ctx);

    let header = Header {
        voucher_type,
        voucher_no,
        company,
        currency,
        exchange_rate: doc.exchange_rate(),
        posting_date,
        is_opening: doc.is_opening,
    };

    let mut entries = Vec::with_capacity(doc.details.len() + 2);
    let mut expense_accounts = Vec::with_capacity(doc.details.len());
    let mut total = Decimal::ZERO;

    for (idx, line) in doc.details.iter().enumerate() {
        let line_no = idx + 1;
        let account = line
            .expense_account
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .ok_or(PostingError::MissingExpenseAccount { line: line_no })?;

        if line.amount <= Decimal::ZERO {
            return Err(PostingError::InvalidAmount { line: line_no });
        }
        total += line.amount;
        expense_accounts.push(account);

        // Distinct per row so the ledger never folds two lines together.
        let marker = non_blank(&line.name).unwrap_or_else(|| line_no.to_string());
        let remarks = non_blank(&line.remarks)
            .or_else(|| non_blank(&doc.remarks))
            .unwrap_or_else(|| DEFAULT_LINE_REMARKS.to_string());

        let mut debit = header.entry(account, format!("{remarks} [{marker}]"));
        debit.debit = money::quantize(line.amount * header.exchange_rate);
        debit.debit_in_account_currency = money::quantize(line.amount);
        debit.against = Some(format!("{credit_account}|{marker}"));
        debit.party_type = non_blank(&line.party_type);
        debit.party = non_blank(&line.party);
        debit.cost_center = non_blank(&line.cost_center).or_else(|| non_blank(&doc.cost_center));
        debit.project = non_blank(&line.project).or_else(|| non_blank(&doc.project));
        debit.dimensions = doc.line_dimensions(line);
        entries.push(debit);
    }

    let mut credit = header.entry(
        credit_account,
        non_blank(&doc.remarks).unwrap_or_else(|| DEFAULT_CREDIT_REMARKS.to_string()),
    );
    credit.credit = money::quantize(total * header.exchange_rate);
    credit.credit_in_account_currency = money::quantize(total);
    credit.against = Some(expense_accounts.join(", "));
    credit.cost_center = non_blank(&doc.cost_center);
    credit.project = non_blank(&doc.project);
    credit.dimensions = doc.dimensions.clone();
    entries.push(credit);

    let (mut debit_total, mut credit_total) = totals(&entries);

    if debit_total != credit_total {
        let diff = money::quantize(debit_total - credit_total);
        if let Some(account) = resolve_rounding_account(doc, &header.company, ctx) {
            tracing::warn!(
                voucher = %voucher_no,
                %diff,
                account = %account,
                "booking rounding adjustment"
            );
            let company_currency = resolve_company_currency(doc, &header.company, ctx)
                .unwrap_or_else(|| header.currency.clone());
            entries.push(rounding_entry(&header, &company_currency, &account, diff));
            (debit_total, credit_total) = totals(&entries);
        }
    }

    if debit_total != credit_total {
        tracing::error!(
            voucher = %voucher_no,
            debit = %debit_total,
            credit = %credit_total,
            "expense entry does not balance"
        );
        return Err(PostingError::UnbalancedLedger {
            debit: debit_total,
            credit: credit_total,
        });
    }

    tracing::debug!(
        voucher = %voucher_no,
        rows = entries.len(),
        total = %debit_total,
        "built ledger entries"
    );
    Ok(entries)
}

/// `value` with blank strings treated as absent.
pub fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Company the voucher books into: its own, else the host default.
pub fn resolve_company(doc: &ExpenseDocument, ctx: &PostingContext<'_>) -> Option<String> {
    ResolverChain::new()
        .value(non_blank(&doc.company))
        .then(|| non_blank(&ctx.defaults.default_company()))
        .resolve()
}

/// Posting date, else required date, else the host's today.
pub fn resolve_posting_date(doc: &ExpenseDocument, ctx: &PostingContext<'_>) -> NaiveDate {
    ResolverChain::new()
        .value(doc.posting_date)
        .value(doc.required_date)
        .resolve()
        .unwrap_or(ctx.today)
}

/// Company currency captured on the voucher, else the company's configured one.
pub fn resolve_company_currency(
    doc: &ExpenseDocument,
    company: &str,
    ctx: &PostingContext<'_>,
) -> Option<String> {
    ResolverChain::new()
        .value(non_blank(&doc.company_currency))
        .then(|| non_blank(&ctx.defaults.company_default_currency(company)))
        .resolve()
}

/// Rounding account named on the voucher, else the company's.
pub fn resolve_rounding_account(
    doc: &ExpenseDocument,
    company: &str,
    ctx: &PostingContext<'_>,
) -> Option<String> {
    ResolverChain::new()
        .value(non_blank(&doc.rounding_account))
        .then(|| non_blank(&ctx.defaults.company_rounding_account(company)))
        .resolve()
}

/// Adjustment booked in company currency: a credit when debits exceed
/// credits, a debit otherwise.
fn rounding_entry(
    header: &Header<'_>,
    company_currency: &str,
    account: &str,
    diff: Decimal,
) -> LedgerEntry {
    let mut entry = header.entry(account, ROUNDING_REMARKS.to_string());
    entry.account_currency = company_currency.to_string();
    entry.exchange_rate = Decimal::ONE;

    if diff > Decimal::ZERO {
        entry.credit = diff;
        entry.credit_in_account_currency = diff;
    } else {
        entry.debit = -diff;
        entry.debit_in_account_currency = -diff;
    }
    entry
}

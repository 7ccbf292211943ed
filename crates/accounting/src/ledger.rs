//! General-ledger rows and the port vouchers post them through.
//!
//! The host owns the real GL table. [`InMemoryLedger`] stands in for it in
//! tests and embedded use, with the same posting and reversal semantics.

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use journalplus_core::{VoucherId, money};

/// One debit or credit row attributed to a voucher.
///
/// `debit`/`credit` are in company currency; the `*_in_account_currency`
/// pair carries the document's own currency. Exactly one side is non-zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub posting_date: NaiveDate,
    pub account: String,
    pub debit: Decimal,
    pub credit: Decimal,
    pub debit_in_account_currency: Decimal,
    pub credit_in_account_currency: Decimal,
    pub account_currency: String,
    pub exchange_rate: Decimal,
    pub company: String,
    pub voucher_type: String,
    pub voucher_no: VoucherId,
    pub against: Option<String>,
    pub remarks: String,
    pub party_type: Option<String>,
    pub party: Option<String>,
    pub cost_center: Option<String>,
    pub project: Option<String>,
    /// Accounting dimension values keyed by fieldname.
    #[serde(default)]
    pub dimensions: BTreeMap<String, String>,
    #[serde(default)]
    pub is_opening: bool,
}

impl LedgerEntry {
    pub fn is_debit(&self) -> bool {
        self.debit > Decimal::ZERO
    }

    /// The same row with its sides swapped.
    pub fn reversed(&self) -> LedgerEntry {
        LedgerEntry {
            debit: self.credit,
            credit: self.debit,
            debit_in_account_currency: self.credit_in_account_currency,
            credit_in_account_currency: self.debit_in_account_currency,
            ..self.clone()
        }
    }

    fn merge_key(&self) -> MergeKey<'_> {
        (
            &self.account,
            &self.party_type,
            &self.party,
            &self.cost_center,
            &self.project,
            &self.against,
            &self.dimensions,
        )
    }
}

type MergeKey<'a> = (
    &'a String,
    &'a Option<String>,
    &'a Option<String>,
    &'a Option<String>,
    &'a Option<String>,
    &'a Option<String>,
    &'a BTreeMap<String, String>,
);

/// Exact (debit, credit) totals in company currency.
pub fn totals(entries: &[LedgerEntry]) -> (Decimal, Decimal) {
    (
        money::sum(entries.iter().map(|e| e.debit)),
        money::sum(entries.iter().map(|e| e.credit)),
    )
}

/// How the ledger should treat a batch.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingOptions {
    /// Post offsetting rows that cancel the voucher instead of new ones.
    pub reversed: bool,
    /// Allow posting into a frozen period (advance adjustments).
    pub allow_partial_adjustment: bool,
    /// Fold rows with identical account and dimensions into one.
    pub merge: bool,
}

impl PostingOptions {
    pub fn forward() -> Self {
        Self::default()
    }

    pub fn reversal() -> Self {
        Self {
            reversed: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("nothing to post: empty batch")]
    EmptyBatch,

    #[error("batch spans more than one voucher")]
    MixedVouchers,

    #[error("batch is not balanced: debit {debit} != credit {credit}")]
    Unbalanced { debit: Decimal, credit: Decimal },

    #[error("posting date {posting_date} falls in a period frozen until {frozen_until}")]
    PeriodFrozen {
        posting_date: NaiveDate,
        frozen_until: NaiveDate,
    },

    #[error("{voucher_type} {voucher_no} has no live ledger rows to reverse")]
    NothingToReverse {
        voucher_type: String,
        voucher_no: VoucherId,
    },

    /// Internal lock poisoning.
    #[error("ledger lock poisoned")]
    Poisoned,
}

/// Ledger posting API of the host.
///
/// A call either writes every row of the batch or none of them.
pub trait LedgerPoster {
    fn post(&self, entries: &[LedgerEntry], options: PostingOptions) -> Result<(), LedgerError>;

    /// Remove every row of a voucher, cancelled or not. Returns how many went.
    fn delete_for_voucher(&self, voucher_type: &str, voucher_no: VoucherId)
    -> Result<usize, LedgerError>;
}

/// A stored ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlRow {
    #[serde(flatten)]
    pub entry: LedgerEntry,
    pub is_cancelled: bool,
}

/// In-memory GL table.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    rows: RwLock<Vec<GlRow>>,
    frozen_until: Option<NaiveDate>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject postings dated on or before `date` unless the caller allows
    /// partial adjustments.
    pub fn with_frozen_until(mut self, date: NaiveDate) -> Self {
        self.frozen_until = Some(date);
        self
    }

    pub fn rows_for_voucher(
        &self,
        voucher_type: &str,
        voucher_no: VoucherId,
    ) -> Result<Vec<GlRow>, LedgerError> {
        let rows = self.rows.read().map_err(|_| LedgerError::Poisoned)?;
        Ok(rows
            .iter()
            .filter(|r| r.entry.voucher_type == voucher_type && r.entry.voucher_no == voucher_no)
            .cloned()
            .collect())
    }

    pub fn len(&self) -> Result<usize, LedgerError> {
        Ok(self.rows.read().map_err(|_| LedgerError::Poisoned)?.len())
    }

    pub fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.len()? == 0)
    }

    fn check_batch(
        &self,
        entries: &[LedgerEntry],
        options: PostingOptions,
    ) -> Result<(), LedgerError> {
        let first = entries.first().ok_or(LedgerError::EmptyBatch)?;
        if entries
            .iter()
            .any(|e| e.voucher_type != first.voucher_type || e.voucher_no != first.voucher_no)
        {
            return Err(LedgerError::MixedVouchers);
        }

        let (debit, credit) = totals(entries);
        if debit != credit {
            return Err(LedgerError::Unbalanced { debit, credit });
        }

        if let Some(frozen_until) = self.frozen_until {
            if !options.allow_partial_adjustment {
                if let Some(e) = entries.iter().find(|e| e.posting_date <= frozen_until) {
                    return Err(LedgerError::PeriodFrozen {
                        posting_date: e.posting_date,
                        frozen_until,
                    });
                }
            }
        }

        Ok(())
    }
}

impl LedgerPoster for InMemoryLedger {
    fn post(&self, entries: &[LedgerEntry], options: PostingOptions) -> Result<(), LedgerError> {
        self.check_batch(entries, options)?;

        let batch = if options.merge {
            merge_similar(entries)
        } else {
            entries.to_vec()
        };

        let mut rows = self.rows.write().map_err(|_| LedgerError::Poisoned)?;

        if !options.reversed {
            rows.extend(batch.into_iter().map(|entry| GlRow {
                entry,
                is_cancelled: false,
            }));
            return Ok(());
        }

        let voucher_type = &entries[0].voucher_type;
        let voucher_no = entries[0].voucher_no;
        let mut live = rows
            .iter_mut()
            .filter(|r| {
                !r.is_cancelled
                    && &r.entry.voucher_type == voucher_type
                    && r.entry.voucher_no == voucher_no
            })
            .peekable();

        if live.peek().is_none() {
            return Err(LedgerError::NothingToReverse {
                voucher_type: voucher_type.clone(),
                voucher_no,
            });
        }
        for row in live {
            row.is_cancelled = true;
        }

        rows.extend(batch.iter().map(|entry| GlRow {
            entry: entry.reversed(),
            is_cancelled: true,
        }));
        Ok(())
    }

    fn delete_for_voucher(
        &self,
        voucher_type: &str,
        voucher_no: VoucherId,
    ) -> Result<usize, LedgerError> {
        let mut rows = self.rows.write().map_err(|_| LedgerError::Poisoned)?;
        let before = rows.len();
        rows.retain(|r| !(r.entry.voucher_type == voucher_type && r.entry.voucher_no == voucher_no));
        Ok(before - rows.len())
    }
}

/// Fold rows sharing account, party, dimensions and `against`, keeping the
/// order in which each key first appears. Each merged row is netted onto a
/// single side; rows netting to zero are dropped.
fn merge_similar(entries: &[LedgerEntry]) -> Vec<LedgerEntry> {
    let mut merged: Vec<LedgerEntry> = Vec::with_capacity(entries.len());

    for entry in entries {
        match merged.iter_mut().find(|m| m.merge_key() == entry.merge_key()) {
            Some(existing) => {
                existing.debit += entry.debit;
                existing.credit += entry.credit;
                existing.debit_in_account_currency += entry.debit_in_account_currency;
                existing.credit_in_account_currency += entry.credit_in_account_currency;
            }
            None => merged.push(entry.clone()),
        }
    }

    for m in &mut merged {
        let net = m.debit - m.credit;
        let net_in_account_currency = m.debit_in_account_currency - m.credit_in_account_currency;
        (m.debit, m.credit) = split_sides(net);
        (m.debit_in_account_currency, m.credit_in_account_currency) =
            split_sides(net_in_account_currency);
    }

    merged.retain(|m| !(m.debit.is_zero() && m.credit.is_zero()));
    merged
}

fn split_sides(net: Decimal) -> (Decimal, Decimal) {
    if net >= Decimal::ZERO {
        (net, Decimal::ZERO)
    } else {
        (Decimal::ZERO, -net)
    }
}

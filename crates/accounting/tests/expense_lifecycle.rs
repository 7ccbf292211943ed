use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use journalplus_accounting::{
    AccountingDimension, AccountsSettings, CompanyConfig, CompanyDefaults, ExpenseDocument,
    ExpenseEntry, ExpenseLine, GlRow, InMemoryLedger, LedgerError, PostingError, PostingHost,
};
use journalplus_auth::{
    AllowAll, CompanyMembership, Permission, PermissionAction, Principal, PrincipalId,
};
use journalplus_core::{DocStatus, Document, DomainError, VoucherId};

const DOCTYPE: &str = "Expense Entry";

fn posting_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

fn defaults() -> CompanyDefaults {
    CompanyDefaults::new().with_default_company("Acme").with_company(
        "Acme",
        CompanyConfig {
            default_currency: Some("IDR".to_string()),
            rounding_account: Some("Round Off - A".to_string()),
        },
    )
}

fn clerk(permissions: Vec<Permission>) -> Principal {
    Principal {
        principal_id: PrincipalId::new(),
        active_company: "Acme".to_string(),
        membership: CompanyMembership {
            company: "Acme".to_string(),
            permissions,
        },
    }
}

fn expense(amount: Decimal) -> ExpenseEntry {
    let doc = ExpenseDocument::new("Cash - A")
        .with_company("Acme")
        .with_posting_date(posting_date())
        .with_remarks("Testing Expense Entry")
        .with_line(ExpenseLine::new("Travel - A", amount).with_remarks("Business trip"));
    ExpenseEntry::new(VoucherId::new(), doc)
}

fn net(rows: &[GlRow]) -> (Decimal, Decimal) {
    rows.iter().fold((Decimal::ZERO, Decimal::ZERO), |(d, c), r| {
        (d + r.entry.debit, c + r.entry.credit)
    })
}

#[test]
fn submit_posts_balanced_entries() {
    let ledger = InMemoryLedger::new();
    let defaults = defaults();
    let settings = AccountsSettings::default();
    let host = PostingHost::new(&ledger, &AllowAll, &defaults, &settings);

    let mut entry = expense(dec!(50000));
    let posted = entry.submit(&host).unwrap();

    assert_eq!(entry.status(), DocStatus::Submitted);
    assert!(entry.posted_to_gl());
    assert_eq!(entry.total(), dec!(50000));
    assert_eq!(entry.qty(), 1);

    let rows = ledger.rows_for_voucher(DOCTYPE, entry.name()).unwrap();
    assert_eq!(rows.len(), posted.len());
    assert_eq!(rows.len(), 2);

    let (debit, credit) = net(&rows);
    assert_eq!(debit, credit);
    assert_eq!(debit.to_string(), "50000.00");

    let accounts: Vec<&str> = rows.iter().map(|r| r.entry.account.as_str()).collect();
    assert_eq!(accounts, ["Travel - A", "Cash - A"]);
}

#[test]
fn cancel_posts_reversal_rows() {
    let ledger = InMemoryLedger::new();
    let defaults = defaults();
    let settings = AccountsSettings::default();
    let host = PostingHost::new(&ledger, &AllowAll, &defaults, &settings);

    let mut entry = expense(dec!(120000));
    let forward = entry.submit(&host).unwrap();
    let reversed = entry.cancel(&host).unwrap();
    assert_eq!(entry.status(), DocStatus::Cancelled);
    assert_eq!(forward, reversed);

    let rows = ledger.rows_for_voucher(DOCTYPE, entry.name()).unwrap();
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|r| r.is_cancelled));

    let originals = &rows[..2];
    let reversals = &rows[2..];
    for (original, reversal) in originals.iter().zip(reversals) {
        assert_eq!(original.entry.account, reversal.entry.account);
        assert_eq!(original.entry.debit, reversal.entry.credit);
        assert_eq!(original.entry.credit, reversal.entry.debit);
    }

    let (debit, credit) = net(&rows);
    assert_eq!(debit, credit);
}

#[test]
fn delete_removes_ledger_rows_only_when_enabled() {
    let ledger = InMemoryLedger::new();
    let defaults = defaults();

    let keep = AccountsSettings::default();
    let host = PostingHost::new(&ledger, &AllowAll, &defaults, &keep);
    let mut kept = expense(dec!(75000));
    kept.submit(&host).unwrap();
    kept.cancel(&host).unwrap();
    let kept_name = kept.name();
    assert_eq!(kept.delete(&host).unwrap(), 0);
    assert_eq!(ledger.rows_for_voucher(DOCTYPE, kept_name).unwrap().len(), 4);

    let purge = AccountsSettings {
        delete_linked_ledger_entries: true,
        ..AccountsSettings::default()
    };
    let host = PostingHost::new(&ledger, &AllowAll, &defaults, &purge);
    let mut purged = expense(dec!(75000));
    purged.submit(&host).unwrap();
    purged.cancel(&host).unwrap();
    let purged_name = purged.name();
    assert_eq!(purged.delete(&host).unwrap(), 4);
    assert!(ledger.rows_for_voucher(DOCTYPE, purged_name).unwrap().is_empty());
    assert_eq!(ledger.len().unwrap(), 4);
}

#[test]
fn submitted_entry_cannot_be_deleted_or_resubmitted() {
    let ledger = InMemoryLedger::new();
    let defaults = defaults();
    let settings = AccountsSettings::default();
    let host = PostingHost::new(&ledger, &AllowAll, &defaults, &settings);

    let mut entry = expense(dec!(10));
    entry.submit(&host).unwrap();

    assert!(matches!(
        entry.submit(&host),
        Err(PostingError::Domain(DomainError::Conflict(_)))
    ));
    assert!(matches!(
        entry.clone().delete(&host),
        Err(PostingError::Domain(DomainError::Conflict(_)))
    ));
    assert!(entry.document_mut().is_err());
}

#[test]
fn draft_cannot_be_cancelled() {
    let ledger = InMemoryLedger::new();
    let defaults = defaults();
    let settings = AccountsSettings::default();
    let host = PostingHost::new(&ledger, &AllowAll, &defaults, &settings);

    let mut entry = expense(dec!(10));
    assert!(matches!(
        entry.cancel(&host),
        Err(PostingError::Domain(DomainError::Conflict(_)))
    ));
    assert!(ledger.is_empty().unwrap());
}

#[test]
fn submit_requires_write_permission() {
    let ledger = InMemoryLedger::new();
    let defaults = defaults();
    let settings = AccountsSettings::default();

    let reader = clerk(vec![Permission::for_doctype(DOCTYPE, PermissionAction::Read)]);
    let host = PostingHost::new(&ledger, &reader, &defaults, &settings);
    let mut entry = expense(dec!(10));
    assert_eq!(entry.submit(&host), Err(PostingError::PermissionDenied));
    assert_eq!(entry.status(), DocStatus::Draft);
    assert!(ledger.is_empty().unwrap());

    let writer = clerk(vec![Permission::for_doctype(DOCTYPE, PermissionAction::Write)]);
    let host = PostingHost::new(&ledger, &writer, &defaults, &settings);
    entry.submit(&host).unwrap();
    assert_eq!(entry.status(), DocStatus::Submitted);
}

#[test]
fn invalid_lines_leave_the_ledger_untouched() {
    let ledger = InMemoryLedger::new();
    let defaults = defaults();
    let settings = AccountsSettings::default();
    let host = PostingHost::new(&ledger, &AllowAll, &defaults, &settings);

    let mut zero = expense(Decimal::ZERO);
    assert_eq!(zero.submit(&host), Err(PostingError::InvalidAmount { line: 1 }));

    let mut negative = expense(dec!(-1));
    assert_eq!(negative.submit(&host), Err(PostingError::InvalidAmount { line: 1 }));

    let mut empty = ExpenseEntry::new(
        VoucherId::new(),
        ExpenseDocument::new("Cash - A").with_company("Acme"),
    );
    assert_eq!(empty.submit(&host), Err(PostingError::NoDetailLines));

    assert!(ledger.is_empty().unwrap());
    assert_eq!(zero.status(), DocStatus::Draft);
}

#[test]
fn conversion_rounding_is_absorbed_by_company_rounding_account() {
    let ledger = InMemoryLedger::new();
    let defaults = defaults();
    let settings = AccountsSettings::default();
    let host = PostingHost::new(&ledger, &AllowAll, &defaults, &settings);

    let doc = ExpenseDocument::new("Cash - A")
        .with_company("Acme")
        .with_currency("USD")
        .with_exchange_rate(dec!(0.35))
        .with_posting_date(posting_date())
        .with_line(ExpenseLine::new("Travel - A", dec!(33.33)))
        .with_line(ExpenseLine::new("Meals - A", dec!(33.34)));
    let mut entry = ExpenseEntry::new(VoucherId::new(), doc);

    let posted = entry.submit(&host).unwrap();
    assert_eq!(posted.len(), 4);
    assert_eq!(posted[3].account, "Round Off - A");
    assert_eq!(posted[3].credit, dec!(0.01));
    assert_eq!(posted[3].account_currency, "IDR");
    assert!(posted[..3].iter().all(|e| e.account_currency == "USD"));

    let (debit, credit) = net(&ledger.rows_for_voucher(DOCTYPE, entry.name()).unwrap());
    assert_eq!(debit, dec!(23.34));
    assert_eq!(debit, credit);
}

#[test]
fn mandatory_dimension_blocks_submit_until_filled() {
    let ledger = InMemoryLedger::new();
    let defaults = defaults();
    let settings = AccountsSettings::default();
    let dimensions = [AccountingDimension {
        name: "Department".to_string(),
        label: "Department".to_string(),
        document_type: Some("Department".to_string()),
        disabled: false,
        mandatory_for_pl: true,
    }];
    let host =
        PostingHost::new(&ledger, &AllowAll, &defaults, &settings).with_dimensions(&dimensions);

    let mut entry = expense(dec!(10));
    assert_eq!(
        entry.submit(&host),
        Err(PostingError::MandatoryDimension("Department".to_string()))
    );

    let doc = entry.document_mut().unwrap();
    doc.dimensions.insert("department".to_string(), "Operations".to_string());
    let posted = entry.submit(&host).unwrap();
    assert_eq!(
        posted[0].dimensions.get("department").map(String::as_str),
        Some("Operations")
    );
}

#[test]
fn frozen_period_rejects_submit() {
    let ledger = InMemoryLedger::new().with_frozen_until(posting_date());
    let defaults = defaults();
    let settings = AccountsSettings::default();
    let host = PostingHost::new(&ledger, &AllowAll, &defaults, &settings);

    let mut entry = expense(dec!(10));
    assert!(matches!(
        entry.submit(&host),
        Err(PostingError::Ledger(LedgerError::PeriodFrozen { .. }))
    ));
    assert_eq!(entry.status(), DocStatus::Draft);
    assert!(!entry.posted_to_gl());
}

#[test]
fn missing_posting_date_uses_host_today() {
    let ledger = InMemoryLedger::new();
    let defaults = defaults();
    let settings = AccountsSettings::default();
    let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
    let host = PostingHost::new(&ledger, &AllowAll, &defaults, &settings).with_today(today);

    let doc = ExpenseDocument::new("Cash - A").with_line(ExpenseLine::new("Travel - A", dec!(5)));
    let mut entry = ExpenseEntry::new(VoucherId::new(), doc);
    let posted = entry.submit(&host).unwrap();

    assert!(posted.iter().all(|e| e.posting_date == today));
    assert!(posted.iter().all(|e| e.company == "Acme"));
}

#[test]
fn cancel_reverses_exactly_what_was_posted_after_host_state_changes() {
    let ledger = InMemoryLedger::new();
    let settings = AccountsSettings::default();
    let submitted_on = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
    let cancelled_on = NaiveDate::from_ymd_opt(2025, 4, 2).unwrap();

    let doc = ExpenseDocument::new("Cash - A")
        .with_currency("USD")
        .with_exchange_rate(dec!(0.35))
        .with_line(ExpenseLine::new("Travel - A", dec!(33.33)))
        .with_line(ExpenseLine::new("Meals - A", dec!(33.34)));
    let mut entry = ExpenseEntry::new(VoucherId::new(), doc);

    let before = defaults();
    let host = PostingHost::new(&ledger, &AllowAll, &before, &settings).with_today(submitted_on);
    let forward = entry.submit(&host).unwrap();
    assert_eq!(forward.len(), 4);

    // Company reconfigured between submit and cancel.
    let after = CompanyDefaults::new().with_default_company("Other").with_company(
        "Acme",
        CompanyConfig {
            default_currency: Some("EUR".to_string()),
            rounding_account: None,
        },
    );
    let host = PostingHost::new(&ledger, &AllowAll, &after, &settings).with_today(cancelled_on);
    let reversed = entry.cancel(&host).unwrap();

    assert_eq!(forward, reversed);
    let rows = ledger.rows_for_voucher(DOCTYPE, entry.name()).unwrap();
    assert_eq!(rows.len(), 8);
    assert!(rows.iter().all(|r| r.entry.posting_date == submitted_on));
    assert!(rows.iter().all(|r| r.entry.company == "Acme"));
    let (debit, credit) = net(&rows);
    assert_eq!(debit, credit);
}

#[test]
fn submit_pins_resolved_values_on_the_document() {
    let ledger = InMemoryLedger::new();
    let defaults = defaults();
    let settings = AccountsSettings::default();
    let host =
        PostingHost::new(&ledger, &AllowAll, &defaults, &settings).with_today(posting_date());

    let doc = ExpenseDocument::new("Cash - A").with_line(ExpenseLine::new("Travel - A", dec!(5)));
    let mut entry = ExpenseEntry::new(VoucherId::new(), doc);
    entry.submit(&host).unwrap();

    let doc = entry.document();
    assert_eq!(doc.company.as_deref(), Some("Acme"));
    assert_eq!(doc.currency.as_deref(), Some("IDR"));
    assert_eq!(doc.company_currency.as_deref(), Some("IDR"));
    assert_eq!(doc.posting_date, Some(posting_date()));
    assert_eq!(doc.exchange_rate, Some(Decimal::ONE));
    assert_eq!(doc.rounding_account.as_deref(), Some("Round Off - A"));
}

#[test]
fn blank_company_is_authorised_against_the_default_company() {
    let ledger = InMemoryLedger::new();
    let defaults = defaults();
    let settings = AccountsSettings::default();
    let writer = clerk(vec![Permission::for_doctype(DOCTYPE, PermissionAction::Write)]);
    let host = PostingHost::new(&ledger, &writer, &defaults, &settings);

    let doc = ExpenseDocument::new("Cash - A")
        .with_company("")
        .with_posting_date(posting_date())
        .with_line(ExpenseLine::new("Travel - A", dec!(5)));
    let mut entry = ExpenseEntry::new(VoucherId::new(), doc);

    let posted = entry.submit(&host).unwrap();
    assert!(posted.iter().all(|e| e.company == "Acme"));
    assert_eq!(entry.document().company.as_deref(), Some("Acme"));
}

#[test]
fn permission_is_checked_before_mandatory_dimensions() {
    let ledger = InMemoryLedger::new();
    let defaults = defaults();
    let settings = AccountsSettings::default();
    let dimensions = [AccountingDimension {
        name: "Department".to_string(),
        label: "Department".to_string(),
        document_type: Some("Department".to_string()),
        disabled: false,
        mandatory_for_pl: true,
    }];
    let reader = clerk(vec![Permission::for_doctype(DOCTYPE, PermissionAction::Read)]);
    let host =
        PostingHost::new(&ledger, &reader, &defaults, &settings).with_dimensions(&dimensions);

    let mut entry = expense(dec!(10));
    assert_eq!(entry.submit(&host), Err(PostingError::PermissionDenied));
    assert!(ledger.is_empty().unwrap());
}

//! Accounting-document capability.
//!
//! A voucher that posts to the ledger implements [`AccountingDocument`]:
//! it validates itself and builds its forward entries. Posting and reversal
//! are provided on top of that, so every voucher type goes through the same
//! permission check and ledger calls.

use chrono::{NaiveDate, Utc};

use journalplus_auth::{DocRef, PermissionAction, PermissionCheck};
use journalplus_core::Document;

use crate::dimension::AccountingDimension;
use crate::error::{PostingError, PostingResult};
use crate::ledger::{LedgerEntry, LedgerPoster, PostingOptions};
use crate::posting::PostingContext;
use crate::settings::{AccountsSettings, DefaultsLookup};

/// Everything a voucher needs from its host while it posts.
#[derive(Clone, Copy)]
pub struct PostingHost<'a> {
    pub ledger: &'a dyn LedgerPoster,
    pub permissions: &'a dyn PermissionCheck,
    pub defaults: &'a dyn DefaultsLookup,
    pub settings: &'a AccountsSettings,
    pub dimensions: &'a [AccountingDimension],
    /// Date used when a document names no posting date.
    pub today: NaiveDate,
}

impl<'a> PostingHost<'a> {
    pub fn new(
        ledger: &'a dyn LedgerPoster,
        permissions: &'a dyn PermissionCheck,
        defaults: &'a dyn DefaultsLookup,
        settings: &'a AccountsSettings,
    ) -> Self {
        Self {
            ledger,
            permissions,
            defaults,
            settings,
            dimensions: &[],
            today: Utc::now().date_naive(),
        }
    }

    pub fn with_dimensions(mut self, dimensions: &'a [AccountingDimension]) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn posting_context(&self) -> PostingContext<'a> {
        PostingContext {
            defaults: self.defaults,
            settings: self.settings,
            today: self.today,
        }
    }
}

pub trait AccountingDocument: Document {
    /// Permission required on [`Document::DOCTYPE`] to post.
    const POST_PERMISSION: PermissionAction;

    /// Company the document books into, when set explicitly.
    fn company(&self) -> Option<&str>;

    fn validate(&mut self) -> PostingResult<()>;

    /// Checks that need the host, run after the permission check and before
    /// any entry is built.
    fn check_postable(&self, _host: &PostingHost<'_>) -> PostingResult<()> {
        Ok(())
    }

    /// Forward entries for this document. Direction-agnostic: reversal posts
    /// the same entries with [`PostingOptions::reversed`] set.
    fn build_postings(&self, ctx: &PostingContext<'_>) -> PostingResult<Vec<LedgerEntry>>;

    /// Check permission and postability, then build and post forward entries.
    fn post(&self, host: &PostingHost<'_>) -> PostingResult<Vec<LedgerEntry>> {
        let doc = DocRef {
            voucher: self.name(),
            company: self.company(),
        };
        if !host
            .permissions
            .has_permission(Self::DOCTYPE, Self::POST_PERMISSION, doc)
        {
            return Err(PostingError::PermissionDenied);
        }
        self.check_postable(host)?;

        let entries = self.build_postings(&host.posting_context())?;
        host.ledger.post(&entries, PostingOptions::forward())?;
        Ok(entries)
    }

    /// Rebuild the forward entries and post them as a cancellation.
    fn reverse(&self, host: &PostingHost<'_>) -> PostingResult<Vec<LedgerEntry>> {
        let entries = self.build_postings(&host.posting_context())?;
        host.ledger.post(&entries, PostingOptions::reversal())?;
        Ok(entries)
    }
}

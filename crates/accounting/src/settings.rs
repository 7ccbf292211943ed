//! Configuration lookups and fallback resolution.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Ordered list of resolvers, evaluated until one yields a value.
pub struct ResolverChain<'a, T> {
    resolvers: Vec<Box<dyn Fn() -> Option<T> + 'a>>,
}

impl<'a, T> ResolverChain<'a, T> {
    pub fn new() -> Self {
        Self {
            resolvers: Vec::new(),
        }
    }

    /// Append a resolver consulted after every resolver already present.
    pub fn then(mut self, resolver: impl Fn() -> Option<T> + 'a) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    /// Append a value that is already known (or known to be absent).
    pub fn value(self, value: Option<T>) -> Self
    where
        T: Clone + 'a,
    {
        self.then(move || value.clone())
    }

    pub fn resolve(&self) -> Option<T> {
        self.resolvers.iter().find_map(|r| r())
    }
}

impl<T> Default for ResolverChain<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cached host configuration the posting builder reads.
pub trait DefaultsLookup {
    fn default_company(&self) -> Option<String>;

    fn company_default_currency(&self, company: &str) -> Option<String>;

    fn company_rounding_account(&self, company: &str) -> Option<String>;
}

/// Per-company configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyConfig {
    #[serde(default)]
    pub default_currency: Option<String>,
    #[serde(default)]
    pub rounding_account: Option<String>,
}

/// In-memory [`DefaultsLookup`], loadable from JSON.
///
/// ```json
/// { "default_company": "Acme", "companies": { "Acme": { "default_currency": "IDR" } } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyDefaults {
    #[serde(default)]
    pub default_company: Option<String>,
    #[serde(default)]
    pub companies: BTreeMap<String, CompanyConfig>,
}

impl CompanyDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_default_company(mut self, company: impl Into<String>) -> Self {
        self.default_company = Some(company.into());
        self
    }

    pub fn with_company(mut self, company: impl Into<String>, config: CompanyConfig) -> Self {
        self.companies.insert(company.into(), config);
        self
    }
}

impl DefaultsLookup for CompanyDefaults {
    fn default_company(&self) -> Option<String> {
        self.default_company.clone()
    }

    fn company_default_currency(&self, company: &str) -> Option<String> {
        self.companies.get(company)?.default_currency.clone()
    }

    fn company_rounding_account(&self, company: &str) -> Option<String> {
        self.companies.get(company)?.rounding_account.clone()
    }
}

const ENV_DELETE_LINKED: &str = "JOURNALPLUS_DELETE_LINKED_LEDGER_ENTRIES";
const ENV_FALLBACK_CURRENCY: &str = "JOURNALPLUS_FALLBACK_CURRENCY";

/// Accounts settings that change lifecycle behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountsSettings {
    /// Remove a voucher's ledger rows when the voucher is deleted.
    #[serde(default)]
    pub delete_linked_ledger_entries: bool,

    /// Currency of last resort when neither document nor company names one.
    #[serde(default = "default_fallback_currency")]
    pub fallback_currency: String,
}

fn default_fallback_currency() -> String {
    "IDR".to_string()
}

impl Default for AccountsSettings {
    fn default() -> Self {
        Self {
            delete_linked_ledger_entries: false,
            fallback_currency: default_fallback_currency(),
        }
    }
}

impl AccountsSettings {
    /// Read settings from `JOURNALPLUS_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`; unset or unparsable keys keep their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();

        if let Some(raw) = lookup(ENV_DELETE_LINKED) {
            match parse_flag(&raw) {
                Some(flag) => settings.delete_linked_ledger_entries = flag,
                None => tracing::warn!(
                    "{ENV_DELETE_LINKED}={raw:?} is not a boolean; keeping {}",
                    settings.delete_linked_ledger_entries
                ),
            }
        }

        if let Some(raw) = lookup(ENV_FALLBACK_CURRENCY) {
            let currency = raw.trim();
            if currency.is_empty() {
                tracing::warn!("{ENV_FALLBACK_CURRENCY} is empty; keeping {}", settings.fallback_currency);
            } else {
                settings.fallback_currency = currency.to_uppercase();
            }
        }

        settings
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

//! Blacklist rule sets derived from the blacklist reference table.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::{debug, warn};

use leadsift_shared::{LeadSiftError, Result};
use leadsift_table::Table;

/// Column listing full e-mail addresses to exclude.
pub const EXACT_EMAIL_COLUMN: &str = "mail";

/// Column listing excluded domains.
pub const DOMAIN_COLUMN: &str = "domaine";

/// Column listing substrings that redact a single e-mail cell.
pub const REDACT_COLUMN: &str = "tri_mail";

/// Immutable exclusion rules for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    exact_emails: BTreeSet<String>,
    excluded_domains: BTreeSet<String>,
    redact_substrings: BTreeSet<String>,
    /// Every blacklist column's non-null values, for cross-column matching.
    columns: BTreeMap<String, HashSet<String>>,
}

impl Blacklist {
    /// Derive the rule sets from a loaded blacklist table.
    ///
    /// Values are trimmed; nulls and blanks are ignored. A table carrying
    /// none of the three rule columns is rejected as malformed.
    pub fn from_table(table: &Table) -> Result<Self> {
        let known = [EXACT_EMAIL_COLUMN, DOMAIN_COLUMN, REDACT_COLUMN];
        if !known.iter().any(|c| table.has_column(c)) {
            return Err(LeadSiftError::reference(format!(
                "blacklist table has none of the columns {}",
                known.join(", ")
            )));
        }
        for column in known.iter().filter(|c| !table.has_column(c)) {
            warn!(column, "blacklist column absent, its rule set is empty");
        }

        let columns: BTreeMap<String, HashSet<String>> = table
            .columns()
            .iter()
            .map(|name| (name.clone(), column_values(table, name).collect()))
            .collect();

        let blacklist = Self {
            exact_emails: column_values(table, EXACT_EMAIL_COLUMN).collect(),
            excluded_domains: column_values(table, DOMAIN_COLUMN).collect(),
            redact_substrings: column_values(table, REDACT_COLUMN).collect(),
            columns,
        };

        debug!(
            exact_emails = blacklist.exact_emails.len(),
            excluded_domains = blacklist.excluded_domains.len(),
            redact_substrings = blacklist.redact_substrings.len(),
            columns = blacklist.columns.len(),
            "blacklist derived"
        );
        Ok(blacklist)
    }

    /// Build rule sets directly, without generic column values.
    pub fn from_rules<I, J, K>(exact_emails: I, excluded_domains: J, redact_substrings: K) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        J: IntoIterator,
        J::Item: Into<String>,
        K: IntoIterator,
        K::Item: Into<String>,
    {
        let exact_emails: BTreeSet<String> = exact_emails.into_iter().map(Into::into).collect();
        let mut columns = BTreeMap::new();
        columns.insert(
            EXACT_EMAIL_COLUMN.to_string(),
            exact_emails.iter().cloned().collect(),
        );
        Self {
            exact_emails,
            excluded_domains: excluded_domains.into_iter().map(Into::into).collect(),
            redact_substrings: redact_substrings.into_iter().map(Into::into).collect(),
            columns,
        }
    }

    pub fn exact_emails(&self) -> &BTreeSet<String> {
        &self.exact_emails
    }

    pub fn excluded_domains(&self) -> &BTreeSet<String> {
        &self.excluded_domains
    }

    pub fn redact_substrings(&self) -> &BTreeSet<String> {
        &self.redact_substrings
    }

    /// Values of the blacklist column `name`, if the table had one.
    pub fn column_values(&self, name: &str) -> Option<&HashSet<String>> {
        self.columns.get(name)
    }

    /// Names of all blacklist columns.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.exact_emails.is_empty()
            && self.excluded_domains.is_empty()
            && self.redact_substrings.is_empty()
            && self.columns.values().all(HashSet::is_empty)
    }
}

fn column_values<'a>(table: &'a Table, column: &str) -> impl Iterator<Item = String> + 'a {
    table
        .column_cells(column)
        .into_iter()
        .flatten()
        .filter_map(|cell| cell.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

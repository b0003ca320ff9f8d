//! Core domain types shared by the LeadSift crates.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LeadSiftError, Result};

/// Maximum number of e-mail columns the multi-column policy inspects.
pub const MAX_EMAIL_COLUMNS: usize = 3;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying a single pipeline run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ExclusionPolicy
// ---------------------------------------------------------------------------

/// One blacklist rule family applied by the exclusion engine.
///
/// Policies are deliberately distinct: `DomainSuffix` anchors the domain at
/// the end of the address, `MultiColumnEmail` matches it anywhere in the
/// domain part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ExclusionPolicy {
    /// Drop a row when any cell equals a value of the same-named blacklist column.
    RowRemoval,
    /// Drop a row whose e-mail ends with `@<excluded domain>` or has `chu` after the `@`.
    DomainSuffix { email_column: String },
    /// Per-column exact / domain-substring removal plus cell redaction.
    MultiColumnEmail { email_columns: Vec<String> },
}

impl ExclusionPolicy {
    /// Short name used in logs and reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RowRemoval => "row-removal",
            Self::DomainSuffix { .. } => "domain-suffix",
            Self::MultiColumnEmail { .. } => "multi-column-email",
        }
    }

    /// Check the policy's own settings.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::RowRemoval => Ok(()),
            Self::DomainSuffix { email_column } if email_column.trim().is_empty() => Err(
                LeadSiftError::validation("domain-suffix policy needs an email column"),
            ),
            Self::DomainSuffix { .. } => Ok(()),
            Self::MultiColumnEmail { email_columns } => {
                if email_columns.is_empty() {
                    return Err(LeadSiftError::validation(
                        "multi-column-email policy needs at least one email column",
                    ));
                }
                if email_columns.len() > MAX_EMAIL_COLUMNS {
                    return Err(LeadSiftError::validation(format!(
                        "multi-column-email policy supports at most {MAX_EMAIL_COLUMNS} email columns, got {}",
                        email_columns.len()
                    )));
                }
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// CleanProfile
// ---------------------------------------------------------------------------

/// Column contract and rule set for one family of export files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanProfile {
    /// Columns retained in the output, in order. Missing ones are dropped.
    pub columns: Vec<String>,

    /// Whether string cells are trimmed on load.
    #[serde(default)]
    pub trim_cells: bool,

    /// Exclusion policies, applied in order.
    #[serde(default)]
    pub policies: Vec<ExclusionPolicy>,

    /// Column holding the primary category label, used for group filtering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_column: Option<String>,
}

impl CleanProfile {
    /// Profile for single-`mail` exports carrying coordinates.
    pub fn legacy() -> Self {
        Self {
            columns: to_strings(&[
                "title",
                "cid",
                "address",
                "categories/0",
                "city",
                "location/lat",
                "location/lng",
                "phone",
                "url",
                "website",
                "mail",
            ]),
            trim_cells: false,
            policies: vec![
                ExclusionPolicy::RowRemoval,
                ExclusionPolicy::DomainSuffix {
                    email_column: "mail".into(),
                },
            ],
            category_column: Some("categories/0".into()),
        }
    }

    /// Profile for exports with up to three `contactDetails/emails/N` columns.
    pub fn contacts() -> Self {
        Self {
            columns: to_strings(&[
                "title",
                "cid",
                "categoryName",
                "address",
                "city",
                "phone",
                "website",
                "url",
                "totalScore",
                "reviewsCount",
                "contactDetails/emails/0",
                "contactDetails/emails/1",
                "contactDetails/emails/2",
            ]),
            trim_cells: true,
            policies: vec![ExclusionPolicy::MultiColumnEmail {
                email_columns: to_strings(&[
                    "contactDetails/emails/0",
                    "contactDetails/emails/1",
                    "contactDetails/emails/2",
                ]),
            }],
            category_column: Some("categoryName".into()),
        }
    }

    /// Check the column contract and every policy.
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(LeadSiftError::validation("profile declares no columns"));
        }
        for policy in &self.policies {
            policy.validate()?;
        }
        Ok(())
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

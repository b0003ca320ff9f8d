//! Blacklist exclusion: whole-row removal and single-cell redaction.
//!
//! The engine turns each configured [`ExclusionPolicy`] into a check bound to
//! the working table's column positions, then evaluates every row with a pure
//! function that yields either the (possibly redacted) record or the rule that
//! removed it. Rows are composed back into a table with `filter_map`.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use leadsift_reference::Blacklist;
use leadsift_shared::{ExclusionPolicy, Result};
use leadsift_table::{Cell, Record, Table};

/// `chu` anywhere after the `@`, any case.
static CHU_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)@.*chu").expect("valid regex"));

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Why a row was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalRule {
    /// A cell equals a value of the same-named blacklist column.
    BlacklistedValue,
    /// The e-mail ends with `@<excluded domain>`.
    DomainSuffix,
    /// The e-mail has `chu` after the `@`.
    ChuPattern,
    /// An e-mail cell is listed verbatim in the blacklist.
    ExactEmail,
    /// An e-mail's domain contains an excluded domain.
    DomainSubstring,
}

/// A cell that could not be compared as text.
///
/// Contained by the engine: logged, counted, and treated as non-matching.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("row {row}: column '{column}' holds a {found} value where an e-mail was expected")]
pub struct ComparisonFault {
    pub row: usize,
    pub column: String,
    pub found: &'static str,
}

/// What happened to one row.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Keep(Record),
    Remove(RemovalRule),
}

/// Result of evaluating one row against every policy.
#[derive(Debug, Clone, PartialEq)]
pub struct RowOutcome {
    pub verdict: Verdict,
    /// Cells cleared on the kept record.
    pub redacted: usize,
    pub faults: Vec<ComparisonFault>,
}

/// Counters for one exclusion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExclusionStats {
    pub rows_in: usize,
    pub removed_blacklisted_value: usize,
    pub removed_domain_suffix: usize,
    pub removed_chu_pattern: usize,
    pub removed_exact_email: usize,
    pub removed_domain_substring: usize,
    pub cells_redacted: usize,
    pub comparison_faults: usize,
}

impl ExclusionStats {
    /// Total rows dropped by any rule.
    pub fn removed(&self) -> usize {
        self.removed_blacklisted_value
            + self.removed_domain_suffix
            + self.removed_chu_pattern
            + self.removed_exact_email
            + self.removed_domain_substring
    }

    fn record(&mut self, rule: RemovalRule) {
        match rule {
            RemovalRule::BlacklistedValue => self.removed_blacklisted_value += 1,
            RemovalRule::DomainSuffix => self.removed_domain_suffix += 1,
            RemovalRule::ChuPattern => self.removed_chu_pattern += 1,
            RemovalRule::ExactEmail => self.removed_exact_email += 1,
            RemovalRule::DomainSubstring => self.removed_domain_substring += 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Applies an ordered list of policies against one blacklist.
#[derive(Debug)]
pub struct ExclusionEngine<'a> {
    blacklist: &'a Blacklist,
    policies: Vec<ExclusionPolicy>,
    /// Lower-cased excluded domains.
    domains: Vec<String>,
}

/// A policy bound to column positions of a particular table.
enum Check<'a> {
    RowMatch(Vec<(usize, &'a HashSet<String>)>),
    DomainSuffix { column: usize, name: &'a str },
    MultiColumn(Vec<(usize, &'a str)>),
}

impl<'a> ExclusionEngine<'a> {
    /// Validate `policies` and bind them to `blacklist`.
    pub fn new(blacklist: &'a Blacklist, policies: &[ExclusionPolicy]) -> Result<Self> {
        for policy in policies {
            policy.validate()?;
        }
        Ok(Self {
            blacklist,
            policies: policies.to_vec(),
            domains: blacklist
                .excluded_domains()
                .iter()
                .map(|d| d.to_lowercase())
                .collect(),
        })
    }

    /// Run every policy over `table`, returning the survivors and the counters.
    #[instrument(skip_all, fields(rows = table.len(), policies = self.policies.len()))]
    pub fn apply(&self, table: Table) -> (Table, ExclusionStats) {
        let checks = self.bind(&table);
        let shell = Table::empty(table.columns().to_vec());
        let mut stats = ExclusionStats {
            rows_in: table.len(),
            ..Default::default()
        };

        let kept: Vec<Record> = table
            .into_rows()
            .into_iter()
            .enumerate()
            .filter_map(|(index, row)| {
                let outcome = self.evaluate(&checks, index, row);
                stats.cells_redacted += outcome.redacted;
                stats.comparison_faults += outcome.faults.len();
                for fault in &outcome.faults {
                    warn!(%fault, "comparison fault, treated as no match");
                }
                match outcome.verdict {
                    Verdict::Keep(record) => Some(record),
                    Verdict::Remove(rule) => {
                        stats.record(rule);
                        None
                    }
                }
            })
            .collect();

        info!(
            removed = stats.removed(),
            redacted = stats.cells_redacted,
            faults = stats.comparison_faults,
            remaining = kept.len(),
            "exclusion complete"
        );
        (shell.with_rows(kept), stats)
    }

    /// Evaluate one row against the policies bound to `table`.
    pub fn evaluate_row(&self, table: &Table, index: usize, row: Record) -> RowOutcome {
        let checks = self.bind(table);
        self.evaluate(&checks, index, row)
    }

    fn bind<'s>(&'s self, table: &Table) -> Vec<Check<'s>> {
        let mut checks = Vec::with_capacity(self.policies.len());
        for policy in &self.policies {
            debug!(policy = policy.name(), "binding policy");
            match policy {
                ExclusionPolicy::RowRemoval => {
                    let shared: Vec<_> = table
                        .columns()
                        .iter()
                        .enumerate()
                        .filter_map(|(idx, name)| {
                            self.blacklist.column_values(name).map(|set| (idx, set))
                        })
                        .filter(|(_, set)| !set.is_empty())
                        .collect();
                    debug!(shared = shared.len(), "row-removal columns bound");
                    checks.push(Check::RowMatch(shared));
                }
                ExclusionPolicy::DomainSuffix { email_column } => {
                    match table.column_index(email_column) {
                        Some(column) => checks.push(Check::DomainSuffix {
                            column,
                            name: email_column.as_str(),
                        }),
                        None => debug!(column = %email_column, "e-mail column absent, domain-suffix skipped"),
                    }
                }
                ExclusionPolicy::MultiColumnEmail { email_columns } => {
                    let present: Vec<_> = email_columns
                        .iter()
                        .filter_map(|name| match table.column_index(name) {
                            Some(idx) => Some((idx, name.as_str())),
                            None => {
                                debug!(column = %name, "e-mail column absent, skipped");
                                None
                            }
                        })
                        .collect();
                    checks.push(Check::MultiColumn(present));
                }
            }
        }
        checks
    }

    fn evaluate(&self, checks: &[Check<'_>], index: usize, mut row: Record) -> RowOutcome {
        let mut faults = Vec::new();
        let mut redacted = 0;

        for check in checks {
            let removal = match check {
                Check::RowMatch(columns) => self.row_match(columns, &row),
                Check::DomainSuffix { column, name } => row
                    .get(*column)
                    .and_then(|cell| email_text(cell, index, name, &mut faults))
                    .and_then(|email| self.suffix_match(email)),
                Check::MultiColumn(columns) => {
                    match self.multi_column(columns, index, &row, &mut faults) {
                        Ok(clear) => {
                            for idx in clear {
                                row.set(idx, Cell::Null);
                                redacted += 1;
                            }
                            None
                        }
                        Err(rule) => Some(rule),
                    }
                }
            };

            if let Some(rule) = removal {
                return RowOutcome {
                    verdict: Verdict::Remove(rule),
                    redacted: 0,
                    faults,
                };
            }
        }

        RowOutcome {
            verdict: Verdict::Keep(row),
            redacted,
            faults,
        }
    }

    fn row_match(&self, columns: &[(usize, &HashSet<String>)], row: &Record) -> Option<RemovalRule> {
        columns
            .iter()
            .any(|(idx, set)| {
                row.get(*idx)
                    .and_then(Cell::as_str)
                    .is_some_and(|value| set.contains(value.trim()))
            })
            .then_some(RemovalRule::BlacklistedValue)
    }

    fn suffix_match(&self, email: &str) -> Option<RemovalRule> {
        let lower = email.to_lowercase();
        let anchored = self.domains.iter().any(|domain| {
            lower
                .strip_suffix(domain.as_str())
                .is_some_and(|head| head.ends_with('@'))
        });
        if anchored {
            Some(RemovalRule::DomainSuffix)
        } else if CHU_PATTERN.is_match(email) {
            Some(RemovalRule::ChuPattern)
        } else {
            None
        }
    }

    /// Rules 1 and 2 veto the row on any column; rule 3 only collects cells to clear.
    fn multi_column(
        &self,
        columns: &[(usize, &str)],
        index: usize,
        row: &Record,
        faults: &mut Vec<ComparisonFault>,
    ) -> std::result::Result<Vec<usize>, RemovalRule> {
        let mut clear = Vec::new();
        for (idx, name) in columns {
            let Some(email) = row
                .get(*idx)
                .and_then(|cell| email_text(cell, index, name, faults))
            else {
                continue;
            };

            if self.blacklist.exact_emails().contains(email) {
                return Err(RemovalRule::ExactEmail);
            }
            if let Some((_, domain)) = email.rsplit_once('@') {
                let domain = domain.to_lowercase();
                if self.domains.iter().any(|d| domain.contains(d.as_str())) {
                    return Err(RemovalRule::DomainSubstring);
                }
            }
            if self
                .blacklist
                .redact_substrings()
                .iter()
                .any(|s| email.contains(s.as_str()))
            {
                clear.push(*idx);
            }
        }
        Ok(clear)
    }
}

/// Text of an e-mail cell; numbers are recorded as faults.
fn email_text<'r>(
    cell: &'r Cell,
    row: usize,
    column: &str,
    faults: &mut Vec<ComparisonFault>,
) -> Option<&'r str> {
    match cell {
        Cell::Null => None,
        Cell::Text(s) => Some(s),
        Cell::Number { .. } => {
            faults.push(ComparisonFault {
                row,
                column: column.to_string(),
                found: cell.kind(),
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            columns.iter().map(|c| (*c).to_string()).collect(),
            rows.iter().map(|r| Record::from_texts(r.iter().copied())).collect(),
        )
        .unwrap()
    }

    fn titles(table: &Table) -> Vec<&str> {
        table
            .column_cells("title")
            .unwrap()
            .map(|c| c.as_str().unwrap_or(""))
            .collect()
    }

    fn multi(columns: &[&str]) -> ExclusionPolicy {
        ExclusionPolicy::MultiColumnEmail {
            email_columns: columns.iter().map(|c| (*c).to_string()).collect(),
        }
    }

    #[test]
    fn exact_email_removes_row() {
        let bl = Blacklist::from_rules(["a@x.com"], Vec::<String>::new(), Vec::<String>::new());
        let engine = ExclusionEngine::new(&bl, &[multi(&["email"])]).unwrap();
        let input = table(&["title", "email"], &[&["A", "a@x.com"], &["B", "b@y.com"]]);

        let (out, stats) = engine.apply(input);

        assert_eq!(titles(&out), ["B"]);
        assert_eq!(stats.removed_exact_email, 1);
        assert_eq!(stats.removed(), 1);
    }

    #[test]
    fn row_removal_drops_only_matching_rows() {
        let bl = Blacklist::from_rules(["x@y.fr"], Vec::<String>::new(), Vec::<String>::new());
        let engine = ExclusionEngine::new(&bl, &[ExclusionPolicy::RowRemoval]).unwrap();
        let input = table(
            &["title", "mail"],
            &[&["A", "x@y.fr"], &["B", " x@y.fr "], &["C", "z@y.fr"], &["D", ""]],
        );

        let (out, stats) = engine.apply(input);

        assert_eq!(titles(&out), ["C", "D"]);
        assert_eq!(stats.removed_blacklisted_value, 2);
    }

    #[test]
    fn domain_suffix_is_anchored() {
        let bl = Blacklist::from_rules(Vec::<String>::new(), ["Gouv.fr"], Vec::<String>::new());
        let policy = ExclusionPolicy::DomainSuffix {
            email_column: "mail".into(),
        };
        let engine = ExclusionEngine::new(&bl, &[policy]).unwrap();
        let input = table(
            &["title", "mail"],
            &[
                &["exact", "a@GOUV.FR"],
                &["nested", "a@mairie.gouv.fr"],
                &["longer", "a@gouv.fr.net"],
                &["hospital", "a@Chu-Nice.fr"],
                &["empty", ""],
            ],
        );

        let (out, stats) = engine.apply(input);

        assert_eq!(titles(&out), ["nested", "longer", "empty"]);
        assert_eq!(stats.removed_domain_suffix, 1);
        assert_eq!(stats.removed_chu_pattern, 1);
    }

    #[test]
    fn multi_column_domain_is_unanchored_substring() {
        let bl = Blacklist::from_rules(Vec::<String>::new(), ["chu-lyon.fr"], Vec::<String>::new());
        let engine = ExclusionEngine::new(&bl, &[multi(&["e0", "e1"])]).unwrap();
        let input = table(
            &["title", "e0", "e1"],
            &[
                &["sub", "ok@a.fr", "x@sub.chu-lyon.fr.net"],
                &["local-part", "chu-lyon.fr@a.fr", ""],
                &["clean", "ok@a.fr", ""],
            ],
        );

        let (out, stats) = engine.apply(input);

        assert_eq!(titles(&out), ["local-part", "clean"]);
        assert_eq!(stats.removed_domain_substring, 1);
    }

    #[test]
    fn redaction_is_cell_scoped() {
        let bl = Blacklist::from_rules(Vec::<String>::new(), Vec::<String>::new(), ["noreply"]);
        let engine = ExclusionEngine::new(&bl, &[multi(&["e0", "e1", "e2"])]).unwrap();
        let input = table(
            &["title", "e0", "e1", "e2"],
            &[&["A", "hello@a.fr", "noreply@a.fr", "sales@a.fr"]],
        );

        let (out, stats) = engine.apply(input);

        assert_eq!(out.len(), 1);
        let row = &out.rows()[0];
        assert_eq!(row.get(0), Some(&Cell::text("A")));
        assert_eq!(row.get(1), Some(&Cell::text("hello@a.fr")));
        assert_eq!(row.get(2), Some(&Cell::Null));
        assert_eq!(row.get(3), Some(&Cell::text("sales@a.fr")));
        assert_eq!(stats.cells_redacted, 1);
        assert_eq!(stats.removed(), 0);
    }

    #[test]
    fn veto_on_any_column_beats_redaction() {
        let bl = Blacklist::from_rules(["bad@a.fr"], Vec::<String>::new(), ["noreply"]);
        let engine = ExclusionEngine::new(&bl, &[multi(&["e0", "e1"])]).unwrap();
        let input = table(&["title", "e0", "e1"], &[&["A", "noreply@a.fr", "bad@a.fr"]]);

        let (out, stats) = engine.apply(input);

        assert!(out.is_empty());
        assert_eq!(stats.removed_exact_email, 1);
        assert_eq!(stats.cells_redacted, 0);
    }

    #[test]
    fn survivors_hold_no_blacklisted_email() {
        let bl = Blacklist::from_rules(["a@x.com", "b@x.com"], ["evil.org"], ["spam"]);
        let engine = ExclusionEngine::new(&bl, &[multi(&["e0", "e1", "e2"])]).unwrap();
        let input = table(
            &["title", "e0", "e1", "e2"],
            &[
                &["1", "a@x.com", "", ""],
                &["2", "", "c@mail.evil.org", ""],
                &["3", "ok@x.com", "spam@x.com", "b@x.com"],
                &["4", "ok@x.com", "spam@x.com", ""],
                &["5", "", "", ""],
            ],
        );

        let (out, _) = engine.apply(input);

        for row in out.rows() {
            for cell in &row.cells()[1..] {
                let Some(email) = cell.as_str() else { continue };
                assert!(!bl.exact_emails().contains(email));
                let domain = email.rsplit_once('@').map(|(_, d)| d).unwrap_or("");
                assert!(!domain.contains("evil.org"));
            }
        }
        assert_eq!(titles(&out), ["4", "5"]);
    }

    #[test]
    fn numeric_email_cell_is_a_contained_fault() {
        let bl = Blacklist::from_rules(["a@x.com"], Vec::<String>::new(), Vec::<String>::new());
        let engine = ExclusionEngine::new(&bl, &[multi(&["email"])]).unwrap();
        let input = Table::new(
            vec!["title".into(), "email".into()],
            vec![
                Record::new(vec![Cell::text("A"), Cell::number("42").unwrap()]),
                Record::new(vec![Cell::text("B"), Cell::text("a@x.com")]),
            ],
        )
        .unwrap();

        let (out, stats) = engine.apply(input);

        assert_eq!(titles(&out), ["A"]);
        assert_eq!(stats.comparison_faults, 1);
    }

    #[test]
    fn numeric_mail_cell_under_domain_suffix_is_a_contained_fault() {
        let bl = Blacklist::from_rules(Vec::<String>::new(), ["gouv.fr"], Vec::<String>::new());
        let policy = ExclusionPolicy::DomainSuffix {
            email_column: "mail".into(),
        };
        let engine = ExclusionEngine::new(&bl, &[policy]).unwrap();
        let input = Table::new(
            vec!["title".into(), "mail".into()],
            vec![
                Record::new(vec![Cell::text("A"), Cell::number("75001").unwrap()]),
                Record::new(vec![Cell::text("B"), Cell::text("x@gouv.fr")]),
                Record::new(vec![Cell::text("C"), Cell::Null]),
            ],
        )
        .unwrap();

        let (out, stats) = engine.apply(input);

        assert_eq!(titles(&out), ["A", "C"]);
        assert_eq!(stats.comparison_faults, 1);
        assert_eq!(stats.removed_domain_suffix, 1);

        let shape = Table::empty(vec!["title".into(), "mail".into()]);
        let outcome = engine.evaluate_row(
            &shape,
            4,
            Record::new(vec![Cell::text("D"), Cell::number("1.5").unwrap()]),
        );
        assert!(matches!(outcome.verdict, Verdict::Keep(_)));
        assert_eq!(
            outcome.faults,
            vec![ComparisonFault {
                row: 4,
                column: "mail".into(),
                found: "number"
            }]
        );
    }

    #[test]
    fn evaluate_row_reports_fault_details() {
        let bl = Blacklist::default();
        let engine = ExclusionEngine::new(&bl, &[multi(&["email"])]).unwrap();
        let shape = Table::empty(vec!["email".into()]);

        let outcome =
            engine.evaluate_row(&shape, 7, Record::new(vec![Cell::number("3.5").unwrap()]));

        assert!(matches!(outcome.verdict, Verdict::Keep(_)));
        assert_eq!(
            outcome.faults,
            vec![ComparisonFault {
                row: 7,
                column: "email".into(),
                found: "number"
            }]
        );
    }

    #[test]
    fn absent_columns_are_skipped() {
        let bl = Blacklist::from_rules(["a@x.com"], ["x.com"], Vec::<String>::new());
        let policies = [
            ExclusionPolicy::DomainSuffix {
                email_column: "mail".into(),
            },
            multi(&["e0", "e1"]),
        ];
        let engine = ExclusionEngine::new(&bl, &policies).unwrap();
        let input = table(&["title", "e1"], &[&["A", "ok@y.com"], &["B", "z@x.com"]]);

        let (out, _) = engine.apply(input);
        assert_eq!(titles(&out), ["A"]);
    }

    #[test]
    fn too_many_email_columns_rejected_up_front() {
        let bl = Blacklist::default();
        let err = ExclusionEngine::new(&bl, &[multi(&["a", "b", "c", "d"])]).unwrap_err();
        assert_eq!(err.kind(), leadsift_shared::ErrorKind::Validation);
    }
}

//! Three-way split of listings by review quality and e-mail availability.

use serde::Serialize;
use tracing::{info, instrument};

use leadsift_shared::{Result, SortSettings};
use leadsift_table::{Record, Table};

/// Which output a row goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
    /// Well reviewed, well scored, e-mail present.
    Top,
    /// E-mail present, not in `Top`.
    Trusted,
    /// No e-mail.
    Cold,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::Top, Bucket::Trusted, Bucket::Cold];

    /// File-name discriminator for this bucket.
    pub fn label(self, settings: &SortSettings) -> &str {
        match self {
            Self::Top => &settings.top_label,
            Self::Trusted => &settings.trusted_label,
            Self::Cold => &settings.cold_label,
        }
    }
}

/// The three disjoint partitions of the input, in input order.
#[derive(Debug, Clone)]
pub struct Classified {
    pub top: Table,
    pub trusted: Table,
    pub cold: Table,
}

impl Classified {
    pub fn get(&self, bucket: Bucket) -> &Table {
        match bucket {
            Bucket::Top => &self.top,
            Bucket::Trusted => &self.trusted,
            Bucket::Cold => &self.cold,
        }
    }

    pub fn counts(&self) -> BucketCounts {
        BucketCounts {
            top: self.top.len(),
            trusted: self.trusted.len(),
            cold: self.cold.len(),
        }
    }
}

/// Row counts per bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketCounts {
    pub top: usize,
    pub trusted: usize,
    pub cold: usize,
}

impl BucketCounts {
    pub fn total(&self) -> usize {
        self.top + self.trusted + self.cold
    }
}

/// Column positions resolved against one table.
struct Columns {
    reviews: usize,
    score: usize,
    email: usize,
}

/// Bucket for a single row. Unparseable numbers are missing, and any
/// comparison involving a missing number is false.
fn bucket_of(row: &Record, cols: &Columns, settings: &SortSettings) -> Bucket {
    let has_email = row.get(cols.email).is_some_and(|c| !c.is_null());
    if !has_email {
        return Bucket::Cold;
    }

    let reviews = row.get(cols.reviews).and_then(|c| c.as_number());
    let score = row.get(cols.score).and_then(|c| c.as_number());
    let well_rated = reviews.is_some_and(|r| r > settings.min_reviews)
        && score.is_some_and(|s| s > settings.min_score);

    if well_rated { Bucket::Top } else { Bucket::Trusted }
}

/// Partition `table` into the three buckets.
///
/// All three configured columns must exist; otherwise nothing is produced.
#[instrument(skip_all, fields(rows = table.len()))]
pub fn classify(table: Table, settings: &SortSettings) -> Result<Classified> {
    table.require_all(&[
        &settings.review_column,
        &settings.score_column,
        &settings.email_column,
    ])?;

    let resolve = |name: &str| table.column_index(name).unwrap_or_default();
    let cols = Columns {
        reviews: resolve(&settings.review_column),
        score: resolve(&settings.score_column),
        email: resolve(&settings.email_column),
    };

    let mut top = Vec::new();
    let mut trusted = Vec::new();
    let mut cold = Vec::new();
    let shell = Table::empty(table.columns().to_vec());

    for row in table.into_rows() {
        match bucket_of(&row, &cols, settings) {
            Bucket::Top => top.push(row),
            Bucket::Trusted => trusted.push(row),
            Bucket::Cold => cold.push(row),
        }
    }

    let classified = Classified {
        top: shell.with_rows(top),
        trusted: shell.with_rows(trusted),
        cold: shell.with_rows(cold),
    };
    let counts = classified.counts();
    info!(top = counts.top, trusted = counts.trusted, cold = counts.cold, "rows classified");
    Ok(classified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadsift_shared::LeadSiftError;
    use leadsift_table::{LoadOptions, load_str};

    fn load(text: &str) -> Table {
        load_str(text, &LoadOptions::default()).unwrap().table
    }

    const HEADER: &str = "title,reviewsCount,totalScore,contactDetails/emails/0\n";

    #[test]
    fn routes_top_and_cold() {
        let table = load(&format!("{HEADER}A,350,4.5,x@y.com\nB,350,4.5,\n"));
        let out = classify(table, &SortSettings::default()).unwrap();

        assert_eq!(out.counts(), BucketCounts { top: 1, trusted: 0, cold: 1 });
        assert_eq!(out.top.cell(0, "title").and_then(|c| c.as_str()), Some("A"));
        assert_eq!(out.cold.cell(0, "title").and_then(|c| c.as_str()), Some("B"));
    }

    #[test]
    fn thresholds_are_strict_and_missing_numbers_fail_comparisons() {
        let table = load(&format!(
            "{HEADER}edge-reviews,300,4.9,a@b.c\nedge-score,900,4,a@b.c\nno-reviews,,4.9,a@b.c\ngarbage,lots,4.9,a@b.c\n"
        ));
        let out = classify(table, &SortSettings::default()).unwrap();
        assert_eq!(out.counts(), BucketCounts { top: 0, trusted: 4, cold: 0 });
    }

    #[test]
    fn buckets_are_disjoint_and_exhaustive() {
        let table = load(&format!(
            "{HEADER}a,500,4.8,a@x.fr\nb,10,2,b@x.fr\nc,,,\nd,999,5,\ne,301,4.1,e@x.fr\n"
        ));
        let input_len = table.len();
        let out = classify(table, &SortSettings::default()).unwrap();

        assert_eq!(out.counts().total(), input_len);
        let mut titles: Vec<String> = Bucket::ALL
            .iter()
            .flat_map(|b| out.get(*b).column_cells("title").unwrap())
            .filter_map(|c| c.as_str().map(str::to_string))
            .collect();
        titles.sort();
        assert_eq!(titles, ["a", "b", "c", "d", "e"]);
        assert_eq!(out.counts(), BucketCounts { top: 2, trusted: 1, cold: 2 });
    }

    #[test]
    fn missing_required_column_fails() {
        let table = load("title,reviewsCount\nA,10\n");
        let err = classify(table, &SortSettings::default()).unwrap_err();
        match err {
            LeadSiftError::MissingColumns { missing } => {
                assert_eq!(missing, ["totalScore", "contactDetails/emails/0"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn custom_thresholds_and_labels() {
        let settings = SortSettings {
            min_reviews: 5.0,
            min_score: 3.0,
            top_label: " Hot".into(),
            ..Default::default()
        };
        let table = load(&format!("{HEADER}a,10,3.5,a@x.fr\n"));
        let out = classify(table, &settings).unwrap();
        assert_eq!(out.top.len(), 1);
        assert_eq!(Bucket::Top.label(&settings), " Hot");
        assert_eq!(Bucket::Cold.label(&settings), " Cold Call");
    }
}

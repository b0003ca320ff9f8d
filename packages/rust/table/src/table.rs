//! In-memory table model: cells, records, projection and deduplication.

use std::collections::HashSet;
use std::fmt;

use tracing::debug;

use leadsift_shared::{LeadSiftError, Result};

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// A single value. Numeric cells keep their source text so output is lossless.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Text(String),
    Number { raw: String, value: f64 },
}

impl Cell {
    /// Build a text cell.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Build a numeric cell, or `None` when `raw` is not a finite number.
    pub fn number(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let value = parse_finite(&raw)?;
        Some(Self::Number { raw, value })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The cell's textual form; `None` for null.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Null => None,
            Self::Text(s) => Some(s),
            Self::Number { raw, .. } => Some(raw),
        }
    }

    /// Only text cells; numbers and nulls yield `None`.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric coercion: unparseable text and nulls are missing.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Null => None,
            Self::Text(s) => parse_finite(s.trim()),
            Self::Number { value, .. } => Some(*value),
        }
    }

    /// Short type name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Text(_) => "text",
            Self::Number { .. } => "number",
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str().unwrap_or(""))
    }
}

pub(crate) fn parse_finite(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One row; cells are positionally aligned with the owning table's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    cells: Vec<Cell>,
}

impl Record {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    /// Text cells from string slices; empty strings become null.
    pub fn from_texts<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        Self::new(
            values
                .into_iter()
                .map(|v| if v.is_empty() { Cell::Null } else { Cell::text(v) })
                .collect(),
        )
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn get(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    /// Replace the cell at `index`. Out-of-range indexes are ignored.
    pub fn set(&mut self, index: usize, cell: Cell) {
        if let Some(slot) = self.cells.get_mut(index) {
            *slot = cell;
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn into_cells(self) -> Vec<Cell> {
        self.cells
    }

    /// Key used for duplicate detection: null equals null, numbers compare
    /// by value so `350` and `350.0` collide.
    fn dedup_key(&self) -> Vec<DedupKey<'_>> {
        self.cells.iter().map(DedupKey::from).collect()
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
enum DedupKey<'a> {
    Null,
    Text(&'a str),
    /// Bit pattern of the value, with `-0.0` folded into `0.0`.
    Number(u64),
}

impl<'a> From<&'a Cell> for DedupKey<'a> {
    fn from(cell: &'a Cell) -> Self {
        match cell {
            Cell::Null => Self::Null,
            Cell::Text(s) => Self::Text(s),
            Cell::Number { value, .. } => Self::Number((value + 0.0).to_bits()),
        }
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Ordered records sharing one column schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl Table {
    /// Build a table, checking that every record matches the schema width.
    pub fn new(columns: Vec<String>, rows: Vec<Record>) -> Result<Self> {
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != columns.len())
        {
            return Err(LeadSiftError::validation(format!(
                "row {i} has {} cells, expected {}",
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// An empty table with the given schema.
    pub fn empty(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// The cell at (`row`, `column`), if both exist.
    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }

    /// All cells of one column, top to bottom.
    pub fn column_cells<'a>(
        &'a self,
        column: &str,
    ) -> Option<impl Iterator<Item = &'a Cell> + use<'a>> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().filter_map(move |r| r.get(idx)))
    }

    /// Same schema, new rows. Rows must come from this table's schema.
    pub fn with_rows(&self, rows: Vec<Record>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == self.columns.len()));
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }

    pub fn into_rows(self) -> Vec<Record> {
        self.rows
    }

    /// Courtesy projection: keep the `required` columns that exist, in
    /// `required` order, silently dropping the rest.
    ///
    /// Fails with `MissingColumns` only when none of them exist.
    pub fn project<S: AsRef<str>>(&self, required: &[S]) -> Result<Self> {
        let kept: Vec<(usize, &str)> = required
            .iter()
            .filter_map(|name| {
                let name = name.as_ref();
                self.column_index(name).map(|idx| (idx, name))
            })
            .collect();

        if kept.is_empty() {
            return Err(LeadSiftError::missing_columns(
                required.iter().map(|s| s.as_ref().to_string()),
            ));
        }

        let dropped = required.len() - kept.len();
        if dropped > 0 {
            debug!(dropped, "required columns absent, dropped from projection");
        }

        let columns = kept.iter().map(|(_, name)| (*name).to_string()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                Record::new(
                    kept.iter()
                        .map(|(idx, _)| row.get(*idx).cloned().unwrap_or(Cell::Null))
                        .collect(),
                )
            })
            .collect();

        Ok(Self { columns, rows })
    }

    /// Strict contract: every `required` column must exist.
    pub fn require_all<S: AsRef<str>>(&self, required: &[S]) -> Result<()> {
        let missing: Vec<String> = required
            .iter()
            .map(|name| name.as_ref())
            .filter(|name: &&str| !self.has_column(name))
            .map(str::to_string)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(LeadSiftError::missing_columns(missing))
        }
    }

    /// Drop rows equal on every column to an earlier row, keeping first
    /// occurrences in their original order. Returns how many were removed.
    pub fn dedup(&mut self) -> usize {
        let before = self.rows.len();
        let mut keep = Vec::with_capacity(before);
        {
            let mut seen = HashSet::with_capacity(before);
            for row in &self.rows {
                keep.push(seen.insert(row.dedup_key()));
            }
        }

        let mut flags = keep.into_iter();
        self.rows.retain(|_| flags.next().unwrap_or(true));

        let removed = before - self.rows.len();
        debug!(removed, remaining = self.rows.len(), "deduplicated rows");
        removed
    }
}

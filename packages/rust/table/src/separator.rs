//! Field delimiter inference.

use std::fmt;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use leadsift_shared::{LeadSiftError, Result};

/// Number of leading lines sampled for detection.
const SAMPLE_LINES: usize = 5;

/// A field delimiter the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Separator {
    Comma,
    Semicolon,
    Tab,
}

impl Separator {
    /// Candidates in tie-breaking order: earlier wins on equal counts.
    pub const CANDIDATES: [Self; 3] = [Self::Comma, Self::Semicolon, Self::Tab];

    pub fn as_char(self) -> char {
        match self {
            Self::Comma => ',',
            Self::Semicolon => ';',
            Self::Tab => '\t',
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Self::Comma => b',',
            Self::Semicolon => b';',
            Self::Tab => b'\t',
        }
    }
}

impl fmt::Display for Separator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tab => f.write_str("\\t"),
            other => write!(f, "{}", other.as_char()),
        }
    }
}

/// Pick the separator occurring most often in the first five lines of `text`.
pub fn detect_separator(text: &str) -> Separator {
    detect_in_lines(text.lines().take(SAMPLE_LINES))
}

/// Like [`detect_separator`], reading only the head of the file at `path`.
///
/// A file shorter than five lines is fine: missing lines count as empty.
pub fn detect_separator_in_file(path: &Path) -> Result<Separator> {
    let file = std::fs::File::open(path).map_err(|e| LeadSiftError::io(path, e))?;
    let reader = BufReader::new(file);

    let mut lines = Vec::with_capacity(SAMPLE_LINES);
    for line in reader.split(b'\n').take(SAMPLE_LINES) {
        let bytes = line.map_err(|e| LeadSiftError::io(path, e))?;
        lines.push(String::from_utf8_lossy(&bytes).into_owned());
    }

    let separator = detect_in_lines(lines.iter().map(String::as_str));
    debug!(path = %path.display(), %separator, "separator detected");
    Ok(separator)
}

fn detect_in_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Separator {
    let mut counts = [0usize; Separator::CANDIDATES.len()];
    for line in lines {
        for (slot, candidate) in counts.iter_mut().zip(Separator::CANDIDATES) {
            *slot += line.matches(candidate.as_char()).count();
        }
    }

    let mut best = Separator::Comma;
    let mut best_count = 0;
    for (count, candidate) in counts.into_iter().zip(Separator::CANDIDATES) {
        // Strictly greater keeps the earliest candidate on ties.
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}

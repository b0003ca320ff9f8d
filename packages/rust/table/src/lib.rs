//! Delimited-text tables for LeadSift.
//!
//! This crate provides:
//! - [`separator`]: field delimiter inference over the first lines of a file
//! - [`loader`]: parsing into a [`Table`] (header trimming, NA handling, bad lines)
//! - [`Table`]: projection against a column contract and deduplication
//! - [`writer`]: comma-separated output

pub mod loader;
pub mod separator;
pub mod table;
pub mod writer;

pub use loader::{BadLinePolicy, LoadOptions, Loaded, NA_MARKERS, load_file, load_str, parse_str, read_text};
pub use separator::{Separator, detect_separator, detect_separator_in_file};
pub use table::{Cell, Record, Table};
pub use writer::{to_csv_string, write_file};

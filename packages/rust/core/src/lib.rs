//! Cleaning and sorting pipelines for LeadSift.
//!
//! This crate ties the table loader and the reference tables together into
//! the two end-to-end workflows: [`pipeline::clean`] and [`pipeline::sort`].

pub mod category;
pub mod classify;
pub mod exclusion;
pub mod output;
pub mod pipeline;
pub mod signal;

pub use category::filter_by_group;
pub use classify::{Bucket, BucketCounts, Classified, classify};
pub use exclusion::{ComparisonFault, ExclusionEngine, ExclusionStats, RemovalRule, RowOutcome, Verdict};
pub use output::{DEFAULT_EXTENSION, OutputNamer, split_input_name};
pub use pipeline::{
    CleanReport, CleanRequest, CleanStats, ProgressReporter, SilentProgress, SortOutput,
    SortReport, SortRequest, clean, clean_table, sort,
};
pub use signal::Signal;

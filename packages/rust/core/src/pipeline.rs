//! End-to-end pipelines: `clean` (file → projected, deduplicated, filtered
//! file) and `sort` (file → three bucket files).
//!
//! Both run synchronously on the calling thread. Every output is staged as a
//! hidden temporary file next to its destination and only renamed into place
//! once all outputs of the run are staged, so a failed run leaves no result.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use leadsift_reference::ReferenceTables;
use leadsift_shared::{CleanProfile, LeadSiftError, Result, RunId, SortSettings};
use leadsift_table::{BadLinePolicy, LoadOptions, Separator, Table, load_file, write_file};

use crate::category::filter_by_group;
use crate::classify::{Bucket, BucketCounts, classify};
use crate::exclusion::{ExclusionEngine, ExclusionStats};
use crate::output::OutputNamer;

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once the outputs are in place.
    fn done(&self, outputs: &[PathBuf]);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _outputs: &[PathBuf]) {}
}

// ---------------------------------------------------------------------------
// Clean
// ---------------------------------------------------------------------------

/// Configuration for one `clean` run.
#[derive(Debug, Clone)]
pub struct CleanRequest {
    /// File to clean.
    pub input: PathBuf,
    /// Profile name, for reporting.
    pub profile_name: String,
    /// Column contract and exclusion rules.
    pub profile: CleanProfile,
    /// Category group to keep, if any.
    pub group: Option<String>,
    /// Destination directory.
    pub output_dir: PathBuf,
    /// Discriminator appended to the input's stem.
    pub clean_suffix: String,
}

/// In-memory counters of a clean pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanStats {
    pub rows_loaded: usize,
    pub columns_kept: usize,
    pub duplicates_removed: usize,
    pub exclusion: ExclusionStats,
    /// Rows dropped by the category filter.
    pub filtered_out: usize,
    pub rows_written: usize,
}

/// Summary of a finished `clean` run.
#[derive(Debug, Clone, Serialize)]
pub struct CleanReport {
    pub run_id: RunId,
    pub input: PathBuf,
    pub profile: String,
    pub separator: Separator,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(flatten)]
    pub stats: CleanStats,
    pub output: PathBuf,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u128,
}

/// Project, deduplicate, exclude and (optionally) group-filter `table`.
pub fn clean_table(
    table: Table,
    profile: &CleanProfile,
    references: &ReferenceTables,
    group: Option<&str>,
) -> Result<(Table, CleanStats)> {
    let mut stats = CleanStats {
        rows_loaded: table.len(),
        ..Default::default()
    };

    let engine = ExclusionEngine::new(&references.blacklist, &profile.policies)?;

    let mut projected = table.project(&profile.columns)?;
    stats.columns_kept = projected.columns().len();
    stats.duplicates_removed = projected.dedup();

    let (mut cleaned, exclusion) = engine.apply(projected);
    stats.exclusion = exclusion;

    if let Some(group) = group {
        let column = profile.category_column.as_deref().ok_or_else(|| {
            LeadSiftError::validation("profile has no category column to filter groups on")
        })?;
        let before = cleaned.len();
        cleaned = filter_by_group(cleaned, &references.categories, group, column)?;
        stats.filtered_out = before - cleaned.len();
    }

    stats.rows_written = cleaned.len();
    Ok((cleaned, stats))
}

/// Run the `clean` pipeline.
///
/// 1. Load the input (separator detected, over-long lines rejected)
/// 2. Project onto the profile's columns and drop duplicates
/// 3. Apply the profile's exclusion policies
/// 4. Keep only the chosen category group, when one is given
/// 5. Write `{stem}{suffix}{ext}` into the output directory
#[instrument(skip_all, fields(input = %request.input.display(), profile = %request.profile_name))]
pub fn clean(
    request: &CleanRequest,
    references: &ReferenceTables,
    progress: &dyn ProgressReporter,
) -> Result<CleanReport> {
    let start = Instant::now();
    let run_id = RunId::new();
    info!(%run_id, "starting clean pipeline");

    progress.phase("Loading input");
    let opts = LoadOptions::default()
        .with_trim_cells(request.profile.trim_cells)
        .with_bad_lines(BadLinePolicy::Fail);
    let loaded = load_file(&request.input, &opts)?;

    progress.phase("Cleaning rows");
    let (cleaned, stats) = clean_table(
        loaded.table,
        &request.profile,
        references,
        request.group.as_deref(),
    )?;

    progress.phase("Writing output");
    let mut namer = OutputNamer::new(&request.output_dir);
    let output = namer.reserve_for(&request.input, &request.clean_suffix);
    let written = write_staged(&request.output_dir, &[(&cleaned, output)])?;
    let output = written.into_iter().next().ok_or_else(|| {
        LeadSiftError::validation("clean pipeline produced no output path")
    })?;

    let report = CleanReport {
        run_id,
        input: request.input.clone(),
        profile: request.profile_name.clone(),
        separator: loaded.separator,
        group: request.group.clone(),
        stats,
        output,
        finished_at: Utc::now(),
        elapsed_ms: start.elapsed().as_millis(),
    };

    info!(
        rows = report.stats.rows_written,
        output = %report.output.display(),
        elapsed_ms = report.elapsed_ms,
        "clean pipeline complete"
    );
    progress.done(std::slice::from_ref(&report.output));
    Ok(report)
}

// ---------------------------------------------------------------------------
// Sort
// ---------------------------------------------------------------------------

/// Configuration for one `sort` run.
#[derive(Debug, Clone)]
pub struct SortRequest {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub settings: SortSettings,
}

/// One bucket file of a `sort` run.
#[derive(Debug, Clone, Serialize)]
pub struct SortOutput {
    pub bucket: Bucket,
    pub path: PathBuf,
    pub rows: usize,
}

/// Summary of a finished `sort` run.
#[derive(Debug, Clone, Serialize)]
pub struct SortReport {
    pub run_id: RunId,
    pub input: PathBuf,
    pub separator: Separator,
    pub rows_loaded: usize,
    pub skipped_lines: usize,
    pub counts: BucketCounts,
    pub outputs: Vec<SortOutput>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u128,
}

impl SortReport {
    pub fn paths(&self) -> Vec<PathBuf> {
        self.outputs.iter().map(|o| o.path.clone()).collect()
    }
}

/// Run the `sort` pipeline.
///
/// Over-long lines are skipped. All three bucket files are written, empty
/// ones included, in bucket order.
#[instrument(skip_all, fields(input = %request.input.display()))]
pub fn sort(request: &SortRequest, progress: &dyn ProgressReporter) -> Result<SortReport> {
    let start = Instant::now();
    let run_id = RunId::new();
    info!(%run_id, "starting sort pipeline");

    progress.phase("Loading input");
    let opts = LoadOptions::default().with_bad_lines(BadLinePolicy::Skip);
    let loaded = load_file(&request.input, &opts)?;
    if loaded.skipped_lines > 0 {
        warn!(skipped = loaded.skipped_lines, "malformed lines skipped");
    }
    let rows_loaded = loaded.table.len();

    progress.phase("Classifying rows");
    let classified = classify(loaded.table, &request.settings)?;

    progress.phase("Writing outputs");
    let mut namer = OutputNamer::new(&request.output_dir);
    let targets: Vec<(&Table, PathBuf)> = Bucket::ALL
        .iter()
        .map(|bucket| {
            let path = namer.reserve_for(&request.input, bucket.label(&request.settings));
            (classified.get(*bucket), path)
        })
        .collect();
    let written = write_staged(&request.output_dir, &targets)?;

    let outputs = Bucket::ALL
        .iter()
        .zip(written)
        .map(|(bucket, path)| SortOutput {
            bucket: *bucket,
            path,
            rows: classified.get(*bucket).len(),
        })
        .collect();

    let report = SortReport {
        run_id,
        input: request.input.clone(),
        separator: loaded.separator,
        rows_loaded,
        skipped_lines: loaded.skipped_lines,
        counts: classified.counts(),
        outputs,
        finished_at: Utc::now(),
        elapsed_ms: start.elapsed().as_millis(),
    };

    info!(
        top = report.counts.top,
        trusted = report.counts.trusted,
        cold = report.counts.cold,
        elapsed_ms = report.elapsed_ms,
        "sort pipeline complete"
    );
    progress.done(&report.paths());
    Ok(report)
}

// ---------------------------------------------------------------------------
// Staged writes
// ---------------------------------------------------------------------------

/// Write every table to a hidden temp file in `dir`, then rename them all
/// into place. On a staging failure the temp files are removed and no
/// target is touched. On a rename failure the targets already renamed are
/// removed along with the remaining temp files.
fn write_staged(dir: &Path, targets: &[(&Table, PathBuf)]) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).map_err(|e| LeadSiftError::io(dir, e))?;

    let mut staged: Vec<(PathBuf, &PathBuf)> = Vec::with_capacity(targets.len());
    for (table, target) in targets {
        let temp = temp_path(target);
        if let Err(e) = write_file(table, &temp) {
            let _ = std::fs::remove_file(&temp);
            discard(&staged);
            return Err(e);
        }
        staged.push((temp, target));
    }

    let mut written: Vec<PathBuf> = Vec::with_capacity(staged.len());
    for (i, (temp, target)) in staged.iter().enumerate() {
        if let Err(e) = std::fs::rename(temp, target) {
            warn!(path = %target.display(), error = %e, "rename failed, rolling back outputs");
            for done in &written {
                let _ = std::fs::remove_file(done);
            }
            discard(&staged[i..]);
            return Err(LeadSiftError::io(*target, e));
        }
        debug!(path = %target.display(), "output written");
        written.push((*target).clone());
    }
    Ok(written)
}

fn temp_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}.tmp"))
}

fn discard(staged: &[(PathBuf, &PathBuf)]) {
    for (temp, _) in staged {
        let _ = std::fs::remove_file(temp);
    }
}

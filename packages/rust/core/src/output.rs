//! Unique output paths that never overwrite an existing file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Extension used when the input file has none.
pub const DEFAULT_EXTENSION: &str = ".csv";

/// Hands out non-colliding paths inside one directory.
///
/// A path is taken when it exists on disk or was already returned by this
/// namer. Reservations are in-process only.
#[derive(Debug)]
pub struct OutputNamer {
    dir: PathBuf,
    reserved: HashSet<PathBuf>,
}

impl OutputNamer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            reserved: HashSet::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `{dir}/{base}{label}{ext}`, or the first free `{base}{label}_{N}{ext}`
    /// for N = 1, 2, 3, ….
    pub fn reserve(&mut self, base: &str, label: &str, ext: &str) -> PathBuf {
        let mut candidate = self.dir.join(format!("{base}{label}{ext}"));
        let mut n = 0usize;
        while self.is_taken(&candidate) {
            n += 1;
            candidate = self.dir.join(format!("{base}{label}_{n}{ext}"));
        }
        debug!(path = %candidate.display(), "output path reserved");
        self.reserved.insert(candidate.clone());
        candidate
    }

    /// Reserve a path named after `input`'s stem and extension.
    pub fn reserve_for(&mut self, input: &Path, label: &str) -> PathBuf {
        let (base, ext) = split_input_name(input);
        self.reserve(&base, label, &ext)
    }

    fn is_taken(&self, path: &Path) -> bool {
        self.reserved.contains(path) || path.exists()
    }
}

/// File stem and dotted extension of `input`, with [`DEFAULT_EXTENSION`]
/// standing in for a missing extension.
pub fn split_input_name(input: &Path) -> (String, String) {
    let base = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = input
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
    (base, ext)
}

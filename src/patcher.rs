//! Style Patcher: the read-transform-write pipeline.
//!
//! [`patch`] is the pure core. [`StylePatcher::patch_file`] composes it with
//! the file boundary: one full read, in-memory rule application, one atomic
//! write.

use crate::edit::{atomic_write, fingerprint};
use crate::rules::{apply_rules, nav_links_rules, ApplicationError, PatchOutcome, RuleSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} changed on disk while it was being patched; nothing written", .path.display())]
    ConcurrentModification { path: PathBuf },

    #[error(transparent)]
    Application(#[from] ApplicationError),
}

impl PatchError {
    fn io(path: &Path, source: io::Error) -> Self {
        PatchError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchOptions {
    /// Compute the result but never write
    pub dry_run: bool,
}

/// What happened to one stylesheet.
#[derive(Debug, Clone)]
#[must_use = "FileReport should be checked for pending or failed rules"]
pub struct FileReport {
    pub path: PathBuf,
    pub original: String,
    pub outcome: PatchOutcome,
    /// Whether the file on disk was replaced
    pub written: bool,
}

impl FileReport {
    pub fn changed(&self) -> bool {
        self.original != self.outcome.text
    }
}

/// Applies a rule set to stylesheet text or files.
#[derive(Debug, Clone)]
pub struct StylePatcher {
    rules: RuleSet,
}

impl Default for StylePatcher {
    fn default() -> Self {
        Self::new(nav_links_rules())
    }
}

impl StylePatcher {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Run every rule over `text` in order.
    pub fn patch_text(&self, text: &str) -> Result<PatchOutcome, ApplicationError> {
        apply_rules(text, &self.rules.rules)
    }

    /// Read `path`, patch it, and write it back if anything changed.
    ///
    /// A read failure leaves the file untouched. The write goes through a
    /// sibling temp file and a rename, and is refused if the file's content
    /// changed since it was read.
    pub fn patch_file(
        &self,
        path: impl AsRef<Path>,
        options: PatchOptions,
    ) -> Result<FileReport, PatchError> {
        let path = path.as_ref();
        let original = fs::read_to_string(path).map_err(|e| PatchError::io(path, e))?;
        let read_fingerprint = fingerprint(original.as_bytes());

        let outcome = self.patch_text(&original)?;
        let mut report = FileReport {
            path: path.to_path_buf(),
            original,
            outcome,
            written: false,
        };

        if !report.changed() {
            tracing::info!(path = %path.display(), "stylesheet already up to date");
            return Ok(report);
        }
        if options.dry_run {
            tracing::info!(path = %path.display(), "dry run, not writing");
            return Ok(report);
        }

        let on_disk = fs::read(path).map_err(|e| PatchError::io(path, e))?;
        if fingerprint(&on_disk) != read_fingerprint {
            return Err(PatchError::ConcurrentModification {
                path: path.to_path_buf(),
            });
        }

        atomic_write(path, report.outcome.text.as_bytes()).map_err(|e| PatchError::io(path, e))?;
        report.written = true;

        tracing::info!(
            path = %path.display(),
            replacements = report.outcome.replacements(),
            "stylesheet written"
        );
        Ok(report)
    }
}

/// Patch `text` with the built-in navbar rules.
///
/// The built-in rules are validated and cannot fail to apply; the error arm
/// only guards against a broken built-in table. Pure: no I/O. Text without the old values comes back unchanged byte for
/// byte, and `patch(&patch(x)) == patch(x)`.
pub fn patch(text: &str) -> String {
    match StylePatcher::default().patch_text(text) {
        Ok(outcome) => outcome.text,
        Err(e) => {
            tracing::error!(error = %e, "built-in rules failed; returning input unchanged");
            text.to_string()
        }
    }
}

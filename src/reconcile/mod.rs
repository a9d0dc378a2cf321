//! Reconciliation engine
//!
//! Takes two uploaded ZIP archives of per-user PDFs, expands them (including
//! nested archives), indexes each by username, merges the two indices under
//! a fixed precedence rule (ZIP File 1 wins), and produces a deduplicated
//! `result.zip` plus an audit [`Report`].
//!
//! The engine is synchronous and self-contained: all inputs are explicit
//! paths, all intermediate state lives under the caller-provided scratch
//! directory, and nothing global is touched. Callers on an async runtime
//! should invoke [`reconcile`] through `spawn_blocking`.

pub mod error;
pub mod identifier;
pub mod merge;
pub mod normalize;
pub mod report;
pub mod unpack;

use std::fs;
use std::path::{Path, PathBuf};

pub use error::{ReconcileError, Result};
pub use report::Report;

use unpack::DEFAULT_MAX_NESTED_DEPTH;

/// Tuning knobs for one reconciliation run
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Bound on nested-archive expansion
    pub max_nested_depth: usize,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            max_nested_depth: DEFAULT_MAX_NESTED_DEPTH,
        }
    }
}

/// Result of a successful reconciliation
#[derive(Debug)]
pub struct ReconcileOutput {
    /// Packaged merged archive inside the scratch directory
    pub output_zip: PathBuf,
    pub summary: Report,
}

/// Run the full pipeline: validate, extract, expand, index, merge, package.
///
/// `work_dir` is an exclusively-owned scratch directory; everything this
/// function writes lands underneath it, so dropping the directory discards
/// all intermediate state along with the output archive.
pub fn reconcile(
    zip1_path: &Path,
    zip2_path: &Path,
    work_dir: &Path,
    options: &ReconcileOptions,
) -> Result<ReconcileOutput> {
    // Integrity checks first; a corrupt upload fails before any processing
    unpack::validate_zip(zip1_path).map_err(|e| {
        tracing::warn!(error = %e, "First upload failed ZIP validation");
        ReconcileError::InvalidZip(1)
    })?;
    unpack::validate_zip(zip2_path).map_err(|e| {
        tracing::warn!(error = %e, "Second upload failed ZIP validation");
        ReconcileError::InvalidZip(2)
    })?;

    let extract1 = work_dir.join("zip1_extract");
    let extract2 = work_dir.join("zip2_extract");
    fs::create_dir_all(&extract1)?;
    fs::create_dir_all(&extract2)?;

    unpack::extract_zip(zip1_path, &extract1)?;
    unpack::extract_zip(zip2_path, &extract2)?;

    for (label, root) in [("ZIP File 1", &extract1), ("ZIP File 2", &extract2)] {
        let outcome = unpack::extract_nested_zips(root, options.max_nested_depth);
        if outcome.extracted > 0 {
            tracing::info!(source = label, count = outcome.extracted, "Expanded nested ZIPs");
        }
        for warning in &outcome.warnings {
            tracing::warn!(source = label, warning = %warning, "Nested extraction warning");
        }
    }

    let index1 = normalize::index_source_one(&extract1);

    // ZIP File 2 may contain PDFs misnamed as .zip; repair before indexing
    let rename_outcome = normalize::rename_zips_to_pdfs(&extract2);
    if rename_outcome.renamed > 0 {
        tracing::info!(count = rename_outcome.renamed, "Renamed misnamed .zip files to .pdf");
    }
    for warning in &rename_outcome.warnings {
        tracing::warn!(warning = %warning, "Rename warning");
    }

    let index2 = normalize::index_source_two(&extract2);

    tracing::info!(
        zip1_files = index1.len(),
        zip2_files = index2.len(),
        "Indexed both sources"
    );

    if index1.is_empty() && index2.is_empty() {
        return Err(ReconcileError::NoPdfsFound);
    }

    let resolutions = merge::resolve(&index1, &index2);
    let output_zip = merge::write_merged_zip(&resolutions, work_dir)?;
    let summary = report::build_report(&index1, &index2, &resolutions);

    Ok(ReconcileOutput {
        output_zip,
        summary,
    })
}

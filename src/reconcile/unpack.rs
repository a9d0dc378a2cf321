//! Archive validation and recursive unpacking
//!
//! Uploaded ZIPs are validated with a full read-through (the reader checks
//! each entry's CRC), extracted into a scratch directory, and then any ZIP
//! files found inside the extracted tree are expanded in place up to a
//! bounded nesting depth.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::result::ZipResult;
use zip::ZipArchive;

use super::error::Result;

/// Default bound on nested-archive expansion
pub const DEFAULT_MAX_NESTED_DEPTH: usize = 5;

/// Outcome of a recursive nested-ZIP expansion pass
#[derive(Debug, Default)]
pub struct UnpackOutcome {
    /// Number of nested archives successfully expanded
    pub extracted: usize,
    /// Non-fatal failures (corrupt nested archives, delete failures)
    pub warnings: Vec<String>,
}

/// True when the file name carries a `.zip` extension (case-insensitive)
pub fn is_zip_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}

/// True when the file name carries a `.pdf` extension (case-insensitive)
pub fn is_pdf_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Run the archive's own integrity check: read every entry through so the
/// reader verifies each CRC. Any failure means the file is not a usable ZIP.
pub fn validate_zip(path: &Path) -> ZipResult<()> {
    let file = fs::File::open(path)?;
    let mut archive = ZipArchive::new(file)?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        io::copy(&mut entry, &mut io::sink())?;
    }
    Ok(())
}

/// Extract a ZIP archive into `dest`, skipping entries with unsafe paths.
/// Returns the number of files written.
pub fn extract_zip(archive_path: &Path, dest: &Path) -> Result<usize> {
    let file = fs::File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)?;

    let mut count = 0usize;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;

        let entry_path = match entry.enclosed_name() {
            Some(p) => p.to_path_buf(),
            None => continue, // Skip unsafe paths
        };

        let output_path = dest.join(&entry_path);

        if entry.is_dir() {
            fs::create_dir_all(&output_path)?;
        } else {
            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut outfile = fs::File::create(&output_path)?;
            io::copy(&mut entry, &mut outfile)?;
            count += 1;
        }
    }
    Ok(count)
}

/// Recursively expand nested ZIP files found anywhere under `root`.
///
/// Each nested archive is extracted into a sibling directory named after its
/// base name (merging into the directory if it already exists), the archive
/// file is deleted, and the new directory is scanned in turn. Expansion
/// stops silently at `max_depth`. A corrupt nested archive is recorded as a
/// warning and skipped; it never aborts the rest of the walk.
pub fn extract_nested_zips(root: &Path, max_depth: usize) -> UnpackOutcome {
    let mut outcome = UnpackOutcome::default();
    expand_level(root, max_depth, 0, &mut outcome);
    outcome
}

fn expand_level(root: &Path, max_depth: usize, depth: usize, outcome: &mut UnpackOutcome) {
    if depth >= max_depth {
        return;
    }

    // Snapshot the walk before mutating the tree underneath it
    let nested_zips: Vec<PathBuf> = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_zip_file(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    for zip_path in nested_zips {
        let Some(stem) = zip_path.file_stem() else {
            continue;
        };
        let Some(parent) = zip_path.parent() else {
            continue;
        };
        let extract_dir = parent.join(stem);

        tracing::debug!(
            archive = %zip_path.display(),
            dest = %extract_dir.display(),
            depth = depth,
            "Extracting nested ZIP"
        );

        if let Err(e) = fs::create_dir_all(&extract_dir) {
            outcome.warnings.push(format!(
                "Could not create extraction dir for {}: {}",
                zip_path.display(),
                e
            ));
            continue;
        }

        match extract_zip(&zip_path, &extract_dir) {
            Ok(_) => {
                if let Err(e) = fs::remove_file(&zip_path) {
                    outcome.warnings.push(format!(
                        "Could not remove nested ZIP {}: {}",
                        zip_path.display(),
                        e
                    ));
                }
                outcome.extracted += 1;

                // Whatever came out may itself contain archives
                expand_level(&extract_dir, max_depth, depth + 1, outcome);
            }
            Err(e) => {
                tracing::warn!(
                    archive = %zip_path.display(),
                    error = %e,
                    "Could not extract nested ZIP, skipping"
                );
                outcome.warnings.push(format!(
                    "Could not extract nested ZIP {}: {}",
                    zip_path.display(),
                    e
                ));
            }
        }
    }
}

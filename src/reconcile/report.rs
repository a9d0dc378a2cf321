//! Reconciliation report
//!
//! A plain serializable snapshot of what was kept, what was removed, and
//! why. Field names are part of the wire contract with existing consumers
//! and must not change.

use serde::Serialize;

use super::merge::Resolution;
use super::normalize::{SourceEntry, SourceIndex, SourceTag};

/// Per-file line in a source listing
#[derive(Debug, Clone, Serialize)]
pub struct SourceFileLine {
    pub username: String,
    pub folder: String,
    pub filename: String,
    /// `"unique"` or `"duplicate"`
    pub status: String,
    pub kept: bool,
}

/// Aggregate listing for one source
#[derive(Debug, Clone, Serialize)]
pub struct SourceStats {
    pub total_files: usize,
    pub unique_files: usize,
    pub duplicate_files: usize,
    pub files: Vec<SourceFileLine>,
}

/// One side of a duplicate pair
#[derive(Debug, Clone, Serialize)]
pub struct FileRef {
    pub folder: String,
    pub filename: String,
}

/// A username present in both sources
#[derive(Debug, Clone, Serialize)]
pub struct DuplicatePair {
    pub username: String,
    pub zip1_file: FileRef,
    pub zip2_file: FileRef,
    pub kept_from: String,
    pub removed_from: String,
}

/// Line in the merged output listing
#[derive(Debug, Clone, Serialize)]
pub struct MergedFileLine {
    pub username: String,
    pub source: String,
    pub folder: String,
    pub filename: String,
}

/// The merged output listing
#[derive(Debug, Clone, Serialize)]
pub struct MergedStats {
    pub total_files: usize,
    pub files: Vec<MergedFileLine>,
}

/// Aggregate totals
#[derive(Debug, Clone, Serialize)]
pub struct SummaryStats {
    pub total_kept: usize,
    pub total_removed: usize,
    pub total_duplicates: usize,
}

/// Full reconciliation report
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub zip1_stats: SourceStats,
    pub zip2_stats: SourceStats,
    pub duplicate_pairs: Vec<DuplicatePair>,
    pub final_merged: MergedStats,
    pub summary_stats: SummaryStats,
}

/// Build the report from both indices and the precedence resolutions.
///
/// Invariants: per source `unique_files + duplicate_files == total_files`,
/// `final_merged.total_files == total_kept == |resolutions|`, and
/// `total_removed == total_duplicates` (strict precedence, one loser per
/// duplicate username).
pub fn build_report(
    index1: &SourceIndex,
    index2: &SourceIndex,
    resolutions: &[Resolution],
) -> Report {
    let zip1_stats = source_stats(index1, index2, SourceTag::Zip1);
    let zip2_stats = source_stats(index2, index1, SourceTag::Zip2);

    let mut duplicate_pairs = Vec::new();
    for resolution in resolutions {
        if let Some(loser) = &resolution.loser {
            duplicate_pairs.push(DuplicatePair {
                username: resolution.winner.username.clone(),
                zip1_file: FileRef {
                    folder: resolution.winner.folder.clone(),
                    filename: resolution.winner.filename.clone(),
                },
                zip2_file: FileRef {
                    folder: loser.folder.clone(),
                    filename: loser.filename.clone(),
                },
                kept_from: resolution.winner.source.to_string(),
                removed_from: loser.source.to_string(),
            });
        }
    }

    let merged_files: Vec<MergedFileLine> = resolutions
        .iter()
        .map(|r| MergedFileLine {
            username: r.winner.username.clone(),
            source: r.winner.source.to_string(),
            folder: r.winner.folder.clone(),
            filename: r.winner.filename.clone(),
        })
        .collect();

    let summary_stats = SummaryStats {
        total_kept: merged_files.len(),
        total_removed: duplicate_pairs.len(),
        total_duplicates: duplicate_pairs.len(),
    };

    Report {
        zip1_stats,
        zip2_stats,
        duplicate_pairs,
        final_merged: MergedStats {
            total_files: merged_files.len(),
            files: merged_files,
        },
        summary_stats,
    }
}

fn source_stats(index: &SourceIndex, other: &SourceIndex, tag: SourceTag) -> SourceStats {
    let mut entries: Vec<&SourceEntry> = index.values().collect();
    entries.sort_by(|a, b| a.username.cmp(&b.username));

    let files: Vec<SourceFileLine> = entries
        .iter()
        .map(|entry| {
            let is_duplicate = other.contains_key(&entry.username);
            SourceFileLine {
                username: entry.username.clone(),
                folder: entry.folder.clone(),
                filename: entry.filename.clone(),
                status: if is_duplicate { "duplicate" } else { "unique" }.to_string(),
                // ZIP File 1 always wins precedence, so its files are always
                // kept; a ZIP File 2 file survives only when unique
                kept: match tag {
                    SourceTag::Zip1 => true,
                    SourceTag::Zip2 => !is_duplicate,
                },
            }
        })
        .collect();

    let duplicate_files = files.iter().filter(|f| f.status == "duplicate").count();

    SourceStats {
        total_files: files.len(),
        unique_files: files.len() - duplicate_files,
        duplicate_files,
        files,
    }
}

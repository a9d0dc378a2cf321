//! Precedence resolution and output packaging
//!
//! For every username present in either source the winner is fixed: ZIP
//! File 1 wins unconditionally, ZIP File 2 only fills usernames absent from
//! ZIP File 1. Winners are copied into the output set under the canonical
//! name `USERNAME.pdf` and packaged into a single deflated ZIP with
//! top-level entries only.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use super::error::Result;
use super::normalize::{SourceEntry, SourceIndex};

/// Name of the packaged output archive
pub const RESULT_ZIP_NAME: &str = "result.zip";

/// Precedence outcome for one username
#[derive(Debug, Clone)]
pub struct Resolution {
    pub winner: SourceEntry,
    /// Present when the username appeared in both sources
    pub loser: Option<SourceEntry>,
}

/// Apply the fixed precedence rule over the union of usernames.
///
/// The result is ordered by username so that repeated runs over identical
/// inputs produce identical output.
pub fn resolve(index1: &SourceIndex, index2: &SourceIndex) -> Vec<Resolution> {
    let usernames: BTreeSet<&String> = index1.keys().chain(index2.keys()).collect();

    usernames
        .into_iter()
        .map(|username| match index1.get(username) {
            Some(winner) => Resolution {
                winner: winner.clone(),
                loser: index2.get(username).cloned(),
            },
            None => Resolution {
                // Union membership guarantees presence in index2 here
                winner: index2[username].clone(),
                loser: None,
            },
        })
        .collect()
}

/// Copy each winning PDF into the output set as `USERNAME.pdf` and package
/// the set into `result.zip` under `work_dir`. Returns the archive path.
pub fn write_merged_zip(resolutions: &[Resolution], work_dir: &Path) -> Result<PathBuf> {
    let merged_dir = work_dir.join("merged_pdfs");
    fs::create_dir_all(&merged_dir)?;

    for resolution in resolutions {
        let dest = merged_dir.join(format!("{}.pdf", resolution.winner.username));
        fs::copy(&resolution.winner.pdf_path, &dest)?;
        if let Some(loser) = &resolution.loser {
            tracing::debug!(
                username = %resolution.winner.username,
                kept_from = %resolution.winner.source,
                removed_from = %loser.source,
                "Duplicate resolved"
            );
        }
    }

    let result_path = work_dir.join(RESULT_ZIP_NAME);
    let file = fs::File::create(&result_path)?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    // Resolutions are username-ordered, so entry order is deterministic
    for resolution in resolutions {
        let entry_name = format!("{}.pdf", resolution.winner.username);
        writer.start_file(entry_name.as_str(), options)?;
        let mut source = fs::File::open(merged_dir.join(&entry_name))?;
        io::copy(&mut source, &mut writer)?;
    }
    writer.finish()?;

    tracing::info!(
        entries = resolutions.len(),
        path = %result_path.display(),
        "Packaged merged archive"
    );

    Ok(result_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::normalize::SourceTag;
    use tempfile::TempDir;
    use zip::ZipArchive;

    fn entry_with_file(dir: &Path, username: &str, tag: SourceTag, contents: &[u8]) -> SourceEntry {
        let pdf_path = dir.join(format!("{username}_{}.pdf", tag.as_str().replace(' ', "")));
        fs::write(&pdf_path, contents).unwrap();
        SourceEntry {
            username: username.to_string(),
            pdf_path,
            folder: "folder1".to_string(),
            filename: format!("{username}_X.pdf"),
            source: tag,
        }
    }

    #[test]
    fn zip1_always_wins() {
        let dir = TempDir::new().unwrap();
        let mut index1 = SourceIndex::new();
        let mut index2 = SourceIndex::new();
        index1.insert(
            "USR002".to_string(),
            entry_with_file(dir.path(), "USR002", SourceTag::Zip1, b"from zip1"),
        );
        index2.insert(
            "USR002".to_string(),
            entry_with_file(dir.path(), "USR002", SourceTag::Zip2, b"from zip2"),
        );

        let resolutions = resolve(&index1, &index2);

        assert_eq!(resolutions.len(), 1);
        assert_eq!(resolutions[0].winner.source, SourceTag::Zip1);
        assert_eq!(
            resolutions[0].loser.as_ref().unwrap().source,
            SourceTag::Zip2
        );
    }

    #[test]
    fn resolutions_are_username_ordered() {
        let dir = TempDir::new().unwrap();
        let mut index1 = SourceIndex::new();
        let mut index2 = SourceIndex::new();
        index1.insert(
            "ZZZ1".to_string(),
            entry_with_file(dir.path(), "ZZZ1", SourceTag::Zip1, b"z"),
        );
        index2.insert(
            "AAA1".to_string(),
            entry_with_file(dir.path(), "AAA1", SourceTag::Zip2, b"a"),
        );

        let resolutions = resolve(&index1, &index2);
        let order: Vec<&str> = resolutions
            .iter()
            .map(|r| r.winner.username.as_str())
            .collect();
        assert_eq!(order, vec!["AAA1", "ZZZ1"]);
    }

    #[test]
    fn merged_zip_contains_canonical_top_level_entries() {
        let dir = TempDir::new().unwrap();
        let mut index1 = SourceIndex::new();
        let mut index2 = SourceIndex::new();
        index1.insert(
            "USR001".to_string(),
            entry_with_file(dir.path(), "USR001", SourceTag::Zip1, b"one"),
        );
        index2.insert(
            "USR003".to_string(),
            entry_with_file(dir.path(), "USR003", SourceTag::Zip2, b"three"),
        );

        let resolutions = resolve(&index1, &index2);
        let zip_path = write_merged_zip(&resolutions, dir.path()).unwrap();

        let mut archive = ZipArchive::new(fs::File::open(&zip_path).unwrap()).unwrap();
        let mut names = Vec::new();
        for i in 0..archive.len() {
            names.push(archive.by_index(i).unwrap().name().to_string());
        }
        names.sort();
        assert_eq!(names, vec!["USR001.pdf", "USR003.pdf"]);

        let mut contents = String::new();
        io::Read::read_to_string(&mut archive.by_name("USR001.pdf").unwrap(), &mut contents)
            .unwrap();
        assert_eq!(contents, "one");
    }

    #[test]
    fn winner_content_is_the_zip1_copy() {
        let dir = TempDir::new().unwrap();
        let mut index1 = SourceIndex::new();
        let mut index2 = SourceIndex::new();
        index1.insert(
            "USR002".to_string(),
            entry_with_file(dir.path(), "USR002", SourceTag::Zip1, b"keep me"),
        );
        index2.insert(
            "USR002".to_string(),
            entry_with_file(dir.path(), "USR002", SourceTag::Zip2, b"drop me"),
        );

        let resolutions = resolve(&index1, &index2);
        write_merged_zip(&resolutions, dir.path()).unwrap();

        let merged = fs::read(dir.path().join("merged_pdfs/USR002.pdf")).unwrap();
        assert_eq!(merged, b"keep me");
    }
}

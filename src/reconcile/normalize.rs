//! Source normalization
//!
//! Walks an extracted archive tree and builds the username -> PDF index for
//! each upload. The two uploads follow different conventions:
//!
//! - ZIP File 1: folders of PDFs named `USERNAME_CODE.pdf`; the username
//!   comes from the filename alone.
//! - ZIP File 2: one folder per user named `USERNAME(NUMBER) NAME`; the
//!   username comes from the folder first, falling back to the filename,
//!   falling back to a placeholder. Misnamed `.zip` documents are repaired
//!   to `.pdf` before indexing.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::identifier::{username_from_folder_name, username_from_pdf_name};
use super::unpack::{is_pdf_file, is_zip_file};

/// Sentinel folder label for files sitting at the extraction root
pub const ROOT_FOLDER: &str = "root";

/// Maximum length of a synthesized placeholder username
const PLACEHOLDER_MAX_LEN: usize = 20;

/// Which upload a file came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceTag {
    Zip1,
    Zip2,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::Zip1 => "ZIP File 1",
            SourceTag::Zip2 => "ZIP File 2",
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One indexed PDF
#[derive(Debug, Clone)]
pub struct SourceEntry {
    pub username: String,
    /// Path of the PDF inside the scratch tree
    pub pdf_path: PathBuf,
    /// Containing folder, relative to the extraction root (`"root"` at top level)
    pub folder: String,
    pub filename: String,
    pub source: SourceTag,
}

/// username -> entry mapping for one upload
pub type SourceIndex = HashMap<String, SourceEntry>;

/// Outcome of the ZIP File 2 misnamed-document repair pass
#[derive(Debug, Default)]
pub struct RenameOutcome {
    pub renamed: usize,
    pub warnings: Vec<String>,
}

/// Folder label for a directory, relative to the extraction root
fn folder_label(root: &Path, dir: &Path) -> String {
    match dir.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.to_string_lossy().into_owned(),
        _ => ROOT_FOLDER.to_string(),
    }
}

/// Index ZIP File 1: usernames are derived from filenames only.
///
/// Files that yield no username are skipped entirely; they appear in neither
/// the index nor the report. Within the source, a repeated username keeps the
/// last file seen (walk order is sorted, so this is deterministic).
pub fn index_source_one(root: &Path) -> SourceIndex {
    let mut index = SourceIndex::new();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        // ZIPs were expanded already; anything left named .zip is not a document here
        if is_zip_file(path) || !is_pdf_file(path) {
            continue;
        }

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let folder = folder_label(root, path.parent().unwrap_or(root));

        match username_from_pdf_name(&filename) {
            Some(username) => {
                tracing::debug!(
                    file = %filename,
                    folder = %folder,
                    username = %username,
                    "Indexed PDF from ZIP File 1"
                );
                index.insert(
                    username.clone(),
                    SourceEntry {
                        username,
                        pdf_path: path.to_path_buf(),
                        folder,
                        filename,
                        source: SourceTag::Zip1,
                    },
                );
            }
            None => {
                tracing::warn!(file = %filename, "Could not extract username from PDF name");
            }
        }
    }

    index
}

/// Rename any `.zip` files still present after nested extraction to `.pdf`.
///
/// ZIP File 2 uploads are known to contain PDFs misnamed with a `.zip`
/// extension; by this point every real archive has been expanded and deleted,
/// so what remains is treated as a document. Name collisions get an
/// incrementing `_N` suffix before the extension.
pub fn rename_zips_to_pdfs(root: &Path) -> RenameOutcome {
    let mut outcome = RenameOutcome::default();

    let leftover_zips: Vec<PathBuf> = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_zip_file(e.path()))
        .map(|e| e.into_path())
        .collect();

    for zip_path in leftover_zips {
        let Some(stem) = zip_path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        let Some(parent) = zip_path.parent() else {
            continue;
        };

        let mut pdf_path = parent.join(format!("{stem}.pdf"));
        let mut counter = 1;
        while pdf_path.exists() {
            pdf_path = parent.join(format!("{stem}_{counter}.pdf"));
            counter += 1;
        }

        match fs::rename(&zip_path, &pdf_path) {
            Ok(()) => {
                tracing::info!(
                    from = %zip_path.display(),
                    to = %pdf_path.display(),
                    "Renamed misnamed .zip document to .pdf"
                );
                outcome.renamed += 1;
            }
            Err(e) => {
                outcome.warnings.push(format!(
                    "Could not rename {} to {}: {}",
                    zip_path.display(),
                    pdf_path.display(),
                    e
                ));
            }
        }
    }

    outcome
}

/// Index ZIP File 2: usernames are derived per folder, not per file.
///
/// For each directory the folder-name rule is tried once; if it fails, the
/// first PDF that yields a filename-rule username fixes the folder's
/// username, and every later PDF in that folder reuses it. When neither rule
/// ever matches, the file is indexed under a placeholder built from its base
/// filename, first occurrence wins.
pub fn index_source_two(root: &Path) -> SourceIndex {
    let mut index = SourceIndex::new();

    let dirs: Vec<PathBuf> = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect();

    for dir in dirs {
        let folder_basename = if dir.as_path() == root {
            ROOT_FOLDER.to_string()
        } else {
            dir.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        let folder = folder_label(root, &dir);

        // Resolved once per folder; the first file-derived hit sticks too
        let mut username = username_from_folder_name(&folder_basename);

        let mut files: Vec<PathBuf> = match fs::read_dir(&dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect(),
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Could not read folder");
                continue;
            }
        };
        files.sort();

        for path in files {
            if is_zip_file(&path) || !is_pdf_file(&path) {
                continue;
            }
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            if username.is_none() {
                username = username_from_pdf_name(&filename);
            }

            if let Some(username) = username.clone() {
                tracing::debug!(
                    file = %filename,
                    folder = %folder,
                    username = %username,
                    "Indexed PDF from ZIP File 2"
                );
                index.insert(
                    username.clone(),
                    SourceEntry {
                        username,
                        pdf_path: path.clone(),
                        folder: folder.clone(),
                        filename,
                        source: SourceTag::Zip2,
                    },
                );
            } else {
                // Neither rule matched: synthesize a placeholder from the
                // base filename and keep the first occurrence only
                let placeholder: String = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default()
                    .chars()
                    .take(PLACEHOLDER_MAX_LEN)
                    .collect();

                if index.contains_key(&placeholder) {
                    tracing::debug!(
                        file = %filename,
                        placeholder = %placeholder,
                        "Dropped PDF, placeholder username already taken"
                    );
                } else {
                    tracing::warn!(
                        file = %filename,
                        folder = %folder,
                        placeholder = %placeholder,
                        "Could not extract username, indexing under placeholder"
                    );
                    index.insert(
                        placeholder.clone(),
                        SourceEntry {
                            username: placeholder,
                            pdf_path: path.clone(),
                            folder: folder.clone(),
                            filename,
                            source: SourceTag::Zip2,
                        },
                    );
                }
            }
        }
    }

    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path, contents: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn source_one_indexes_by_filename() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("folder1/USR001_X.pdf"), b"a");
        touch(&dir.path().join("folder1/USR002_Y.pdf"), b"b");
        touch(&dir.path().join("top.pdf"), b"c");

        let index = index_source_one(dir.path());

        assert_eq!(index.len(), 3);
        assert_eq!(index["USR001"].folder, "folder1");
        assert_eq!(index["USR001"].filename, "USR001_X.pdf");
        assert_eq!(index["USR001"].source, SourceTag::Zip1);
        assert_eq!(index["top"].folder, ROOT_FOLDER);
    }

    #[test]
    fn source_one_skips_files_without_username() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("_nousername.pdf"), b"a");
        touch(&dir.path().join("notes.txt"), b"b");

        let index = index_source_one(dir.path());
        assert!(index.is_empty());
    }

    #[test]
    fn source_one_last_wins_on_repeated_username() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("a/USR001_FIRST.pdf"), b"first");
        touch(&dir.path().join("b/USR001_SECOND.pdf"), b"second");

        let index = index_source_one(dir.path());

        assert_eq!(index.len(), 1);
        // Sorted walk visits a/ before b/, so b/ wins
        assert_eq!(index["USR001"].filename, "USR001_SECOND.pdf");
    }

    #[test]
    fn source_two_prefers_folder_name() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("USR002(111) SOME NAME/doc.pdf"), b"a");

        let index = index_source_two(dir.path());

        assert_eq!(index.len(), 1);
        let entry = &index["USR002"];
        assert_eq!(entry.folder, "USR002(111) SOME NAME");
        assert_eq!(entry.filename, "doc.pdf");
        assert_eq!(entry.source, SourceTag::Zip2);
    }

    #[test]
    fn source_two_falls_back_to_filename_rule() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("lowercase folder/USR009_X.pdf"), b"a");

        let index = index_source_two(dir.path());
        assert_eq!(index.len(), 1);
        assert!(index.contains_key("USR009"));
    }

    #[test]
    fn source_two_reuses_folder_username_for_every_file() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("USR003(9) NAME/a.pdf"), b"a");
        touch(&dir.path().join("USR003(9) NAME/b.pdf"), b"b");

        let index = index_source_two(dir.path());

        // Both files map to the folder's username; the later file wins
        assert_eq!(index.len(), 1);
        assert_eq!(index["USR003"].filename, "b.pdf");
    }

    #[test]
    fn source_two_placeholder_first_wins() {
        let dir = TempDir::new().unwrap();
        // Lowercase folders defeat the folder rule, a leading underscore
        // defeats the filename rule
        touch(&dir.path().join("no id one/_weird.pdf"), b"first");
        touch(&dir.path().join("no id two/_weird.pdf"), b"second");

        let index = index_source_two(dir.path());

        assert_eq!(index.len(), 1);
        let entry = &index["_weird"];
        assert_eq!(entry.folder, "no id one");
        assert_eq!(fs::read(&entry.pdf_path).unwrap(), b"first");
    }

    #[test]
    fn source_two_placeholder_truncates_to_twenty_chars() {
        let dir = TempDir::new().unwrap();
        touch(
            &dir.path()
                .join("junk folder/_averyveryverylongfilenameindeed.pdf"),
            b"x",
        );

        let index = index_source_two(dir.path());

        assert_eq!(index.len(), 1);
        let username = index.keys().next().unwrap();
        assert_eq!(username.chars().count(), 20);
        assert!(username.starts_with("_averyvery"));
    }

    #[test]
    fn rename_repairs_leftover_zips() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("folder/USR004_DOC.zip"), b"pdf really");

        let outcome = rename_zips_to_pdfs(dir.path());

        assert_eq!(outcome.renamed, 1);
        assert!(outcome.warnings.is_empty());
        assert!(dir.path().join("folder/USR004_DOC.pdf").is_file());
        assert!(!dir.path().join("folder/USR004_DOC.zip").exists());
    }

    #[test]
    fn rename_collision_gets_numeric_suffix() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("f/USR005_A.pdf"), b"existing");
        touch(&dir.path().join("f/USR005_A.zip"), b"misnamed");

        let outcome = rename_zips_to_pdfs(dir.path());

        assert_eq!(outcome.renamed, 1);
        assert!(dir.path().join("f/USR005_A_1.pdf").is_file());
        assert_eq!(fs::read(dir.path().join("f/USR005_A.pdf")).unwrap(), b"existing");
    }

    #[test]
    fn folder_labels_match_across_sources() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("USR006(1) NAME/USR006_X.pdf"), b"a");

        let one = index_source_one(dir.path());
        let two = index_source_two(dir.path());

        assert_eq!(one["USR006"].folder, two["USR006"].folder);
    }
}

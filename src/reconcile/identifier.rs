//! Username extraction rules
//!
//! Two naming conventions are in play:
//! - PDF filenames: `USERNAME_CODE.pdf` (e.g. `DAB7341_PLM-3001.pdf`)
//! - Folder names: `USERNAME(NUMBER) DISPLAY NAME` (e.g. `DAB7341(47564) ANJUM SIRAJ`)
//!
//! Only upper-case letters and digits count as username characters. Both
//! extractors are pure and total: any string input yields `Some(username)`
//! or `None`, never a panic.

use regex::Regex;
use std::sync::LazyLock;

/// `USERNAME(` at the start of a folder name
static FOLDER_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z0-9]+)\(").expect("valid folder id regex"));

/// Leading run of upper-case letters/digits
static LEADING_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z0-9]+)").expect("valid leading id regex"));

/// Extract the username from a PDF filename of the form `USERNAME_CODE.pdf`.
///
/// The `.pdf` extension is stripped case-insensitively, then everything
/// before the first underscore is the username. Returns `None` only when
/// nothing is left after trimming.
pub fn username_from_pdf_name(pdf_name: &str) -> Option<String> {
    let stem = strip_pdf_extension(pdf_name).trim();
    let username = stem.split('_').next().unwrap_or("");
    if username.is_empty() {
        None
    } else {
        Some(username.to_string())
    }
}

/// Extract the username from a folder name of the form `USERNAME(NUMBER) NAME`.
///
/// Falls back to the leading upper-case run of the first whitespace-delimited
/// token when no parenthesis pattern is present (`USERNAME SOME NAME`).
pub fn username_from_folder_name(folder_name: &str) -> Option<String> {
    if let Some(caps) = FOLDER_ID_RE.captures(folder_name) {
        return Some(caps[1].to_string());
    }

    let first_token = folder_name.split_whitespace().next()?;
    LEADING_ID_RE
        .captures(first_token)
        .map(|caps| caps[1].to_string())
}

fn strip_pdf_extension(name: &str) -> &str {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        &name[..name.len() - 4]
    } else {
        name
    }
}

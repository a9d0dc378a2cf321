//! ZIP comparison endpoint
//!
//! `POST /api/compare-zips` accepts two ZIP archives as multipart fields
//! `file1` and `file2`, runs the reconciliation engine over them, and
//! returns the merged archive (base64-encoded) together with the audit
//! summary. The engine does blocking filesystem work, so it runs on the
//! blocking thread pool; all scratch state lives in a per-request temporary
//! directory that is removed on every exit path.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Serialize;
use tempfile::TempDir;

use crate::reconcile::{self, ReconcileOptions, Report};
use crate::state::AppState;

/// Successful comparison response
#[derive(Serialize)]
pub struct CompareResponse {
    pub success: bool,
    pub summary: Report,
    /// Base64-encoded result archive
    pub zip_file: String,
    pub filename: String,
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorDetail {
    pub detail: String,
}

impl ErrorDetail {
    fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

type ErrorReply = (StatusCode, Json<ErrorDetail>);

/// Create the comparison router
pub fn router() -> Router<AppState> {
    Router::new().route("/api/compare-zips", post(compare_zips))
}

/// Upload and compare two ZIP files
async fn compare_zips(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<CompareResponse>, ErrorReply> {
    let mut file1: Option<(String, Vec<u8>)> = None;
    let mut file2: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to read multipart field: {}", e);
        bad_request(format!("Failed to read upload: {e}"))
    })? {
        let name = field.name().unwrap_or("").to_string();
        if name != "file1" && name != "file2" {
            continue;
        }

        let filename = field.file_name().unwrap_or("").to_string();
        let data = field.bytes().await.map_err(|e| {
            tracing::error!("Failed to read file data: {}", e);
            bad_request(format!("Failed to read file data: {e}"))
        })?;

        tracing::debug!(
            field = %name,
            filename = %filename,
            bytes = data.len(),
            "Received upload field"
        );

        match name.as_str() {
            "file1" => file1 = Some((filename, data.to_vec())),
            "file2" => file2 = Some((filename, data.to_vec())),
            _ => unreachable!(),
        }
    }

    let (name1, data1) = file1.ok_or_else(|| bad_request("file1 is required"))?;
    let (name2, data2) = file2.ok_or_else(|| bad_request("file2 is required"))?;

    // Cheap filename pre-check before the real integrity validation
    if !name1.to_lowercase().ends_with(".zip") {
        return Err(bad_request("File 1 must be a ZIP file"));
    }
    if !name2.to_lowercase().ends_with(".zip") {
        return Err(bad_request("File 2 must be a ZIP file"));
    }

    // Scratch tree for this request; dropped (and deleted) on every exit path
    let temp_dir = TempDir::new().map_err(|e| {
        tracing::error!("Failed to create scratch directory: {}", e);
        internal(format!("Error processing files: {e}"))
    })?;

    let zip1_path = temp_dir.path().join("zip1.zip");
    let zip2_path = temp_dir.path().join("zip2.zip");
    tokio::fs::write(&zip1_path, &data1)
        .await
        .map_err(|e| internal(format!("Error processing files: {e}")))?;
    tokio::fs::write(&zip2_path, &data2)
        .await
        .map_err(|e| internal(format!("Error processing files: {e}")))?;

    let options = ReconcileOptions {
        max_nested_depth: state.config().limits.max_nested_depth,
    };
    let work_dir = temp_dir.path().to_path_buf();

    let output = tokio::task::spawn_blocking(move || {
        reconcile::reconcile(&zip1_path, &zip2_path, &work_dir, &options)
    })
    .await
    .map_err(|e| {
        tracing::error!("Reconciliation task failed: {}", e);
        internal(format!("Error processing files: {e}"))
    })?
    .map_err(|e| {
        let status = e.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Reconciliation failed: {}", e);
            (status, Json(ErrorDetail::new(format!("Error processing files: {e}"))))
        } else {
            tracing::warn!("Reconciliation rejected: {}", e);
            (status, Json(ErrorDetail::new(e.to_string())))
        }
    })?;

    let zip_bytes = tokio::fs::read(&output.output_zip)
        .await
        .map_err(|e| internal(format!("Error processing files: {e}")))?;

    tracing::info!(
        kept = output.summary.summary_stats.total_kept,
        removed = output.summary.summary_stats.total_removed,
        result_bytes = zip_bytes.len(),
        "Comparison complete"
    );

    Ok(Json(CompareResponse {
        success: true,
        summary: output.summary,
        zip_file: BASE64.encode(&zip_bytes),
        filename: "result.zip".to_string(),
    }))
}

fn bad_request(detail: impl Into<String>) -> ErrorReply {
    (StatusCode::BAD_REQUEST, Json(ErrorDetail::new(detail)))
}

fn internal(detail: impl Into<String>) -> ErrorReply {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorDetail::new(detail)))
}

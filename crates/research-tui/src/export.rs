use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use research_core::form::error_message;
use research_service::{ExportPayload, ServiceError};
use serde_json::Value;

pub const EXPORT_FAILED: &str = "Failed to generate PDF";

/// The PDF bytes of an export reply. A JSON reply gets one conversion
/// attempt: a base64 string in `data` or `pdf`.
pub fn document_bytes(payload: ExportPayload) -> Result<Vec<u8>, String> {
    let bytes = match payload {
        ExportPayload::Document(bytes) => bytes.to_vec(),
        ExportPayload::Json(value) => {
            let Some(encoded) = ["data", "pdf"]
                .iter()
                .find_map(|k| value.get(*k).and_then(Value::as_str))
            else {
                return Err(reply_message(&value).unwrap_or_else(|| "No PDF data returned".into()));
            };
            STANDARD
                .decode(encoded.trim())
                .map_err(|e| format!("Could not decode PDF data: {e}"))?
        }
    };
    if bytes.is_empty() {
        return Err("No PDF data returned".into());
    }
    Ok(bytes)
}

/// `research-report-<id>.pdf`, with the current time standing in for a
/// missing id.
pub fn report_file_name(id: &str) -> String {
    if id.is_empty() {
        format!("research-report-{}.pdf", chrono::Utc::now().timestamp_millis())
    } else {
        format!("research-report-{id}.pdf")
    }
}

pub fn save_report(dir: &Path, id: &str, bytes: &[u8]) -> Result<PathBuf, String> {
    let path = dir.join(report_file_name(id));
    std::fs::write(&path, bytes).map_err(|e| format!("Could not save {}: {e}", path.display()))?;
    Ok(path)
}

/// The most specific message for a failed export request.
pub fn failure_message(err: &ServiceError) -> String {
    match err {
        ServiceError::Rejected { body, .. } => body
            .as_ref()
            .and_then(reply_message)
            .unwrap_or_else(|| EXPORT_FAILED.to_string()),
        other => other.to_string(),
    }
}

fn reply_message(value: &Value) -> Option<String> {
    value
        .get("err")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .or_else(|| error_message(Some(value)))
}

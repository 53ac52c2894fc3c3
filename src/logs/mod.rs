use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::core::RunSummary;

#[derive(Debug, Serialize)]
struct RunLog<'a> {
    #[serde(flatten)]
    summary: &'a RunSummary,
    command: &'static str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

pub fn format_timestamp(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_else(|_| "unknown".to_string())
}

/// Writes one JSON document per run into `dir`, creating it if needed.
pub fn write_run_log(
    dir: &Path,
    finished_at: OffsetDateTime,
    summary: &RunSummary,
    error: Option<&str>,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory: {}", dir.display()))?;

    let pid = std::process::id();
    let ts = finished_at.unix_timestamp_nanos();
    let path = dir.join(format!("crashtest-run-{pid}-{ts}.json"));

    let log = RunLog {
        summary,
        command: "run",
        status: if error.is_some() { "error" } else { "ok" },
        error,
    };

    let bytes = serde_json::to_vec_pretty(&log)?;
    std::fs::write(&path, bytes)
        .with_context(|| format!("failed to write run log: {}", path.display()))?;
    Ok(path)
}

/// Keeps the last four characters of long webhooks so runs stay traceable.
pub fn mask_webhook(webhook: &str) -> String {
    let chars: Vec<char> = webhook.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{visible}", "*".repeat(chars.len() - 4))
}

/// Replaces every occurrence of the webhook in free-form text with its masked form.
pub fn redact_webhook(text: &str, webhook: &str) -> String {
    if webhook.is_empty() {
        return text.to_string();
    }
    text.replace(webhook, &mask_webhook(webhook))
}

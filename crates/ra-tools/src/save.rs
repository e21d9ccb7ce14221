//! Append-only research log and the `save_text_to_file` tool.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use ra_core::{
    parse_any, record_log_entry, text_argument, text_log_entry, timestamp_now, Error, Tool,
    ToolKind, ToolOutput,
};

pub const DEFAULT_OUTPUT_FILE: &str = "research_output.txt";

/// Append one entry to the log, creating the file if needed.
pub async fn append_entry(path: &Path, entry: &str) -> Result<(), Error> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(entry.as_bytes()).await?;
    file.flush().await?;
    debug!(path = %path.display(), bytes = entry.len(), "Appended log entry");
    Ok(())
}

/// Render `data` for the log: a research record if it parses as one,
/// otherwise the text as given.
pub fn log_entry_for(data: &str, timestamp: &str) -> String {
    match parse_any(data) {
        Some(record) => record_log_entry(&record, timestamp),
        None => text_log_entry(data, timestamp),
    }
}

pub struct SaveTool {
    default_path: PathBuf,
}

impl SaveTool {
    pub fn new(default_path: impl Into<PathBuf>) -> Self {
        Self {
            default_path: default_path.into(),
        }
    }

    pub fn default_path(&self) -> &Path {
        &self.default_path
    }
}

impl Default for SaveTool {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_FILE)
    }
}

#[async_trait]
impl Tool for SaveTool {
    fn kind(&self) -> ToolKind {
        ToolKind::SaveTextToFile
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, Error> {
        let data = text_argument(ToolKind::SaveTextToFile, &arguments)?;
        let path = arguments
            .get("filename")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| self.default_path.clone());

        append_entry(&path, &log_entry_for(&data, &timestamp_now()))
            .await
            .map_err(|e| Error::tool(ToolKind::SaveTextToFile.name(), e.to_string()))?;

        info!(path = %path.display(), "Research data saved");
        Ok(ToolOutput::enriched(format!(
            "Data successfully saved to {}",
            path.display()
        )))
    }
}

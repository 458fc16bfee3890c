//! Writes the finished document to disk.

use chrono::NaiveDate;
use regex::Regex;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no document text to export")]
    NoDeliverable,
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// `<documentType>_<meetingTitle>_<date>.txt`, with whitespace runs in the title
/// collapsed to `_`.
///
/// Path separators, reserved characters and control characters in either part
/// become `_`, so the name always stays a single component of the output dir.
pub fn export_file_name(document_type: &str, meeting_title: &str, date: NaiveDate) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));
    let unsafe_chars =
        UNSAFE.get_or_init(|| Regex::new(r#"[/\\:*?"<>|\p{Cc}]"#).expect("valid regex"));

    let document_type = if document_type.is_empty() {
        Cow::Borrowed("document")
    } else {
        unsafe_chars.replace_all(document_type, "_")
    };
    let title = whitespace.replace_all(meeting_title, "_");
    let title = unsafe_chars.replace_all(&title, "_");
    let title: &str = if title.is_empty() { "reunion" } else { &title };

    format!("{}_{}_{}.txt", document_type, title, date.format("%Y-%m-%d"))
}

pub struct ResultExporter {
    output_dir: PathBuf,
}

impl ResultExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write `text` dated today (UTC). Refuses when there is no text.
    pub fn export(
        &self,
        text: Option<&str>,
        document_type: &str,
        meeting_title: &str,
    ) -> Result<PathBuf, ExportError> {
        let today = chrono::Utc::now().date_naive();
        self.export_dated(text, document_type, meeting_title, today)
    }

    pub fn export_dated(
        &self,
        text: Option<&str>,
        document_type: &str,
        meeting_title: &str,
        date: NaiveDate,
    ) -> Result<PathBuf, ExportError> {
        let text = match text {
            Some(text) if !text.is_empty() => text,
            _ => return Err(ExportError::NoDeliverable),
        };

        let path = self
            .output_dir
            .join(export_file_name(document_type, meeting_title, date));

        std::fs::write(&path, text.as_bytes()).map_err(|source| ExportError::Write {
            path: path.clone(),
            source,
        })?;

        info!("Document saved to {:?} ({} bytes)", path, text.len());
        Ok(path)
    }
}

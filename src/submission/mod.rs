//! HTTP client for the workflow webhook.
//!
//! Sends one multipart upload per submission. The response carries no
//! workflow status; progress arrives on the push channel.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, StatusCode};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::fs::File;
use tokio::sync::watch;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::form::{FormField, ValidatedForm};

/// Multipart field carrying the run correlation id.
pub const RUN_ID_FIELD: &str = "runId";

/// Everything sent for one submission. Dropped once the upload resolves.
#[derive(Debug, Clone)]
pub struct FormPayload {
    pub form: ValidatedForm,
    pub run_id: String,
}

impl FormPayload {
    pub fn new(form: ValidatedForm, run_id: impl Into<String>) -> Self {
        Self {
            form,
            run_id: run_id.into(),
        }
    }

    /// Text parts in send order; the audio file goes between participants and language.
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        let form = &self.form;
        vec![
            (
                FormField::DocumentType.wire_name(),
                form.document_type.as_str().to_string(),
            ),
            (FormField::MeetingTitle.wire_name(), form.meeting_title.clone()),
            (
                FormField::MeetingDate.wire_name(),
                form.meeting_date.format("%Y-%m-%d").to_string(),
            ),
            (FormField::MainObjective.wire_name(), form.main_objective.clone()),
            (FormField::Participants.wire_name(), form.participants.clone()),
            (FormField::Language.wire_name(), form.language.clone()),
            (FormField::Agenda.wire_name(), form.agenda.clone()),
            (RUN_ID_FIELD, self.run_id.clone()),
        ]
    }
}

/// Bytes of the audio file handed to the connection so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadProgress {
    pub sent: u64,
    pub total: u64,
}

impl UploadProgress {
    /// Rounded percentage; an empty file counts against a total of one byte.
    pub fn percent(&self) -> u8 {
        let total = self.total.max(1);
        ((self.sent.min(total) * 100 + total / 2) / total) as u8
    }
}

/// Why an upload failed.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The server answered with a non-success status.
    #[error("server responded with {status}: {body}")]
    Server { status: StatusCode, body: String },
    /// The request went out but no usable response came back.
    #[error("no response from {url}: {message}")]
    NoResponse { url: String, message: String },
    /// The request could not be built or sent.
    #[error("request could not be sent: {0}")]
    Request(String),
}

/// Remote trigger that starts the document workflow.
#[async_trait]
pub trait WorkflowTrigger: Send + Sync {
    /// Send the payload, publishing audio upload progress on `progress`.
    async fn submit(
        &self,
        payload: &FormPayload,
        progress: watch::Sender<UploadProgress>,
    ) -> Result<(), SubmitError>;
}

pub struct WebhookClient {
    client: reqwest::Client,
    url: String,
}

impl WebhookClient {
    pub fn new(url: &str, connect_timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn build_form(
        &self,
        payload: &FormPayload,
        progress: watch::Sender<UploadProgress>,
    ) -> Result<Form, SubmitError> {
        let audio_path = &payload.form.audio_file;
        let read_error = |e: std::io::Error| {
            SubmitError::Request(format!("failed to read {}: {}", audio_path.display(), e))
        };
        let file = File::open(audio_path).await.map_err(read_error)?;
        let total = file.metadata().await.map_err(read_error)?.len();

        let filename = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio")
            .to_string();

        progress.send_replace(UploadProgress { sent: 0, total });
        let mut sent = 0u64;
        let stream = ReaderStream::new(file).map(move |chunk| {
            if let Ok(bytes) = &chunk {
                sent += bytes.len() as u64;
                progress.send_replace(UploadProgress { sent, total });
            }
            chunk
        });

        let mime_type = mime_type_for_path(audio_path);
        let audio_part = Part::stream_with_length(Body::wrap_stream(stream), total)
            .file_name(filename)
            .mime_str(mime_type)
            .map_err(|e| SubmitError::Request(e.to_string()))?;

        let mut form = Form::new();
        let mut audio_part = Some(audio_part);
        for (name, value) in payload.text_fields() {
            if name == FormField::Language.wire_name() {
                if let Some(part) = audio_part.take() {
                    form = form.part(FormField::AudioFile.wire_name(), part);
                }
            }
            form = form.text(name, value);
        }

        if let Some(part) = audio_part {
            form = form.part(FormField::AudioFile.wire_name(), part);
        }
        Ok(form)
    }
}

#[async_trait]
impl WorkflowTrigger for WebhookClient {
    async fn submit(
        &self,
        payload: &FormPayload,
        progress: watch::Sender<UploadProgress>,
    ) -> Result<(), SubmitError> {
        info!(
            "Uploading {:?} to workflow webhook (run {})",
            payload.form.audio_file, payload.run_id
        );

        let form = self.build_form(payload, progress).await?;

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| classify_send_error(&self.url, e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| SubmitError::NoResponse {
            url: self.url.clone(),
            message: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(SubmitError::Server { status, body });
        }

        debug!("Webhook response: {}", body);
        info!("Upload accepted ({})", status);
        Ok(())
    }
}

fn classify_send_error(url: &str, err: reqwest::Error) -> SubmitError {
    if err.is_builder() {
        SubmitError::Request(err.to_string())
    } else {
        SubmitError::NoResponse {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

/// MIME type for an audio or video file, by extension.
pub fn mime_type_for_extension(ext: &str) -> Option<&'static str> {
    let mime = match ext {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "flac" => "audio/flac",
        "ogg" => "audio/ogg",
        "opus" => "audio/opus",
        "aac" => "audio/aac",
        "webm" => "audio/webm",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        _ => return None,
    };
    Some(mime)
}

fn mime_type_for_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .and_then(|e| mime_type_for_extension(&e))
        .unwrap_or("application/octet-stream")
}

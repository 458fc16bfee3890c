//! Ably realtime subscription over the SSE endpoint.
//!
//! Each SSE `data:` block carries one Ably message envelope
//! `{ "name": ..., "data": ..., "encoding": ... }`. Envelopes for other event
//! names are skipped; JSON-encoded string data is decoded before delivery.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::sse::{parse_sse_block, SseBuffer};
use super::{PushChannel, CHANNEL_BUFFER};
use crate::config::ChannelConfig;

const ABLY_PROTOCOL_VERSION: &str = "1.2";

pub struct AblySseChannel {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    channel: String,
    event: String,
    cancel: Option<CancellationToken>,
    reader: Option<JoinHandle<()>>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    encoding: Option<String>,
}

impl AblySseChannel {
    pub fn new(config: &ChannelConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            channel: config.name.clone(),
            event: config.event.clone(),
            cancel: None,
            reader: None,
        }
    }

    pub fn sse_url(&self) -> String {
        format!("{}/sse", self.endpoint)
    }
}

#[async_trait]
impl PushChannel for AblySseChannel {
    async fn open(&mut self) -> Result<mpsc::Receiver<Value>> {
        if self.reader.is_some() {
            bail!("Channel '{}' is already open", self.channel);
        }

        let mut query = vec![
            ("v", ABLY_PROTOCOL_VERSION),
            ("channels", self.channel.as_str()),
        ];
        if let Some(key) = &self.api_key {
            query.push(("key", key.as_str()));
        }

        let response = self
            .client
            .get(self.sse_url())
            .query(&query)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .with_context(|| format!("Failed to subscribe to channel '{}'", self.channel))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Channel subscription failed ({}): {}", status, body);
        }

        info!(
            "Subscribed to channel '{}' (event '{}')",
            self.channel, self.event
        );

        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER);
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let event = self.event.clone();
        let channel = self.channel.clone();
        let mut stream = response.bytes_stream();

        let reader = tokio::spawn(async move {
            let mut buffer = SseBuffer::new();
            loop {
                let chunk = tokio::select! {
                    _ = task_cancel.cancelled() => return,
                    chunk = stream.next() => chunk,
                };

                match chunk {
                    Some(Ok(bytes)) => {
                        buffer.push_chunk(&bytes);
                        while let Some(block) = buffer.next_block() {
                            let Some(payload) = payload_from_block(&block, &event) else {
                                continue;
                            };
                            tokio::select! {
                                _ = task_cancel.cancelled() => return,
                                sent = tx.send(payload) => {
                                    if sent.is_err() {
                                        return;
                                    }
                                }
                            }
                        }
                    }
                    Some(Err(e)) => {
                        warn!("Channel '{}' stream error: {}", channel, e);
                        return;
                    }
                    None => {
                        warn!("Channel '{}' stream ended", channel);
                        return;
                    }
                }
            }
        });

        self.cancel = Some(cancel);
        self.reader = Some(reader);
        Ok(rx)
    }

    async fn close(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(reader) = self.reader.take() {
            if let Err(e) = reader.await {
                warn!("Channel reader for '{}' failed: {}", self.channel, e);
            }
            info!("Unsubscribed from channel '{}'", self.channel);
        }
    }
}

impl Drop for AblySseChannel {
    fn drop(&mut self) {
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
        }
    }
}

/// Extract the message payload for `event` from one SSE block.
pub(crate) fn payload_from_block(block: &str, event: &str) -> Option<Value> {
    let (event_name, data) = parse_sse_block(block);

    if event_name == Some("error") {
        warn!("Channel reported an error: {}", data);
        return None;
    }
    if data.is_empty() {
        return None;
    }

    let envelope: Envelope = match serde_json::from_str(&data) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("Skipping malformed channel frame: {}", e);
            return None;
        }
    };

    if envelope.name.as_deref() != Some(event) {
        debug!("Skipping channel event {:?}", envelope.name);
        return None;
    }

    let Some(data) = envelope.data else {
        debug!("Skipping '{}' event without data", event);
        return None;
    };

    match (envelope.encoding.as_deref(), data) {
        (Some(encoding), _) if encoding.contains("base64") => {
            warn!("Skipping message with unsupported encoding '{}'", encoding);
            None
        }
        (Some(encoding), Value::String(raw)) if encoding.contains("json") => {
            match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Skipping message with invalid JSON data: {}", e);
                    None
                }
            }
        }
        (_, data) => Some(data),
    }
}

//! Push channel subscription.
//!
//! A `PushChannel` is constructed explicitly and handed to the session, which
//! opens it before submitting and closes it when the run ends.

pub mod ably;
pub mod sse;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

pub use ably::AblySseChannel;

/// Buffered payloads between the reader task and the session loop.
pub const CHANNEL_BUFFER: usize = 64;

/// Subscription to the workflow's progress events.
#[async_trait]
pub trait PushChannel: Send {
    /// Subscribe and start delivering raw payloads in arrival order.
    async fn open(&mut self) -> Result<mpsc::Receiver<Value>>;

    /// Unsubscribe. Safe to call more than once.
    async fn close(&mut self);
}

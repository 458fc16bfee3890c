//! Submission run orchestrator.
//!
//! Manages one run of the remote workflow:
//! subscribe → reset → upload → route progress → done
//!
//! The trigger and the push channel are injected via constructor. All tracker
//! mutations happen inside `run_until`, one event at a time.

use anyhow::{Context, Result};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::channel::PushChannel;
use crate::form::ValidatedForm;
use crate::submission::{FormPayload, SubmitError, UploadProgress, WorkflowTrigger};
use crate::workflow::{InboundMessage, MessageRouter, RouteOutcome, StepTracker, TransitionPolicy};

/// Receives tracker snapshots as the run progresses.
pub trait SessionObserver: Send {
    fn on_started(&mut self, _tracker: &StepTracker) {}
    fn on_upload_progress(&mut self, _progress: UploadProgress) {}
    fn on_uploaded(&mut self, _tracker: &StepTracker) {}
    fn on_update(&mut self, _tracker: &StepTracker, _outcome: &RouteOutcome) {}
    fn on_finished(&mut self, _tracker: &StepTracker, _outcome: &SessionOutcome) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub policy: TransitionPolicy,
    /// End the run when nothing happens for this long.
    pub idle_timeout: Option<Duration>,
    /// Wait this long for the document text once the last step completes.
    pub deliverable_grace: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            policy: TransitionPolicy::Monotonic,
            idle_timeout: None,
            deliverable_grace: Duration::from_secs(30),
        }
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum SessionOutcome {
    /// The last step completed. The document text is present if it arrived.
    Completed { deliverable: Option<String> },
    /// The upload failed; nothing was started remotely.
    TransmissionFailed(SubmitError),
    /// The channel stopped delivering before the run finished.
    ChannelClosed,
    TimedOut,
    Interrupted,
}

#[derive(Debug)]
pub struct SessionReport {
    pub run_id: String,
    pub outcome: SessionOutcome,
}

pub struct WorkflowSession {
    trigger: Box<dyn WorkflowTrigger>,
    channel: Box<dyn PushChannel>,
    observer: Box<dyn SessionObserver>,
    tracker: StepTracker,
    options: SessionOptions,
}

impl WorkflowSession {
    pub fn new(
        trigger: Box<dyn WorkflowTrigger>,
        channel: Box<dyn PushChannel>,
        options: SessionOptions,
    ) -> Self {
        Self {
            trigger,
            channel,
            observer: Box::new(NoopObserver),
            tracker: StepTracker::new(options.policy),
            options,
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn tracker(&self) -> &StepTracker {
        &self.tracker
    }

    /// Run until the workflow finishes, fails, or the user presses Ctrl-C.
    pub async fn run(&mut self, form: ValidatedForm) -> Result<SessionReport> {
        self.run_until(form, interrupted()).await
    }

    /// Run until the workflow finishes, fails, or `shutdown` resolves.
    pub async fn run_until<F>(&mut self, form: ValidatedForm, shutdown: F) -> Result<SessionReport>
    where
        F: Future<Output = ()>,
    {
        let run_id = Uuid::new_v4().to_string();
        let router = MessageRouter::for_run(run_id.clone());

        // Subscribe first so no progress message can be missed.
        let mut inbound = self
            .channel
            .open()
            .await
            .context("Failed to open the push channel")?;

        self.tracker.reset_all();
        self.tracker.start_processing();
        self.observer.on_started(&self.tracker);
        info!("Run {} started", run_id);

        let payload = FormPayload::new(form, run_id.clone());
        let (progress_tx, mut progress_rx) = watch::channel(UploadProgress::default());
        let mut upload = self.trigger.submit(&payload, progress_tx);
        let mut upload_done = false;
        let mut progress_open = true;
        let mut reported = UploadProgress::default();
        let mut grace_deadline: Option<Instant> = None;
        let idle_timeout = self.options.idle_timeout;
        tokio::pin!(shutdown);

        let outcome = loop {
            tokio::select! {
                result = &mut upload, if !upload_done => {
                    upload_done = true;
                    let last = *progress_rx.borrow();
                    if last != reported {
                        reported = last;
                        self.observer.on_upload_progress(last);
                    }
                    match result {
                        Ok(()) => self.observer.on_uploaded(&self.tracker),
                        Err(e) => {
                            self.tracker.stop_processing();
                            break SessionOutcome::TransmissionFailed(e);
                        }
                    }
                }
                changed = progress_rx.changed(), if progress_open && !upload_done => {
                    if changed.is_err() {
                        progress_open = false;
                        continue;
                    }
                    let progress = *progress_rx.borrow_and_update();
                    if progress != reported {
                        debug!("Upload progress: {}%", progress.percent());
                        reported = progress;
                        self.observer.on_upload_progress(progress);
                    }
                }
                value = inbound.recv() => {
                    let Some(value) = value else {
                        if self.tracker.is_finished() {
                            break SessionOutcome::Completed { deliverable: None };
                        }
                        warn!("Push channel closed before the run finished");
                        break SessionOutcome::ChannelClosed;
                    };

                    let message = match InboundMessage::decode(value) {
                        Ok(message) => message,
                        Err(e) => {
                            warn!("Dropping channel message: {}", e);
                            continue;
                        }
                    };

                    let routed = router.route(&mut self.tracker, message);
                    self.observer.on_update(&self.tracker, &routed);

                    if self.tracker.is_finished() {
                        if let Some(text) = self.tracker.deliverable() {
                            break SessionOutcome::Completed {
                                deliverable: Some(text.to_string()),
                            };
                        }
                        if grace_deadline.is_none() {
                            info!(
                                "All steps completed, waiting up to {}s for the document",
                                self.options.deliverable_grace.as_secs()
                            );
                            grace_deadline = Some(Instant::now() + self.options.deliverable_grace);
                        }
                    }
                }
                _ = sleep_until(grace_deadline.unwrap_or_else(Instant::now)), if grace_deadline.is_some() => {
                    warn!("No document received after the last step completed");
                    break SessionOutcome::Completed { deliverable: None };
                }
                _ = sleep(idle_timeout.unwrap_or_default()), if idle_timeout.is_some() => {
                    warn!("No progress for {}s, giving up", idle_timeout.unwrap_or_default().as_secs());
                    break SessionOutcome::TimedOut;
                }
                _ = &mut shutdown => {
                    warn!("Run {} interrupted", run_id);
                    break SessionOutcome::Interrupted;
                }
            }
        };

        drop(upload);
        self.channel.close().await;
        self.observer.on_finished(&self.tracker, &outcome);

        Ok(SessionReport { run_id, outcome })
    }
}

async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

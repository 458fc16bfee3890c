//! Routes decoded channel messages onto the step tracker.

use tracing::{error, info, warn};

use super::message::{InboundMessage, ReportedStatus, StatusMessage};
use super::step::{StepId, StepStatus};
use super::tracker::{AdvanceOutcome, StepTracker, Transition};

/// Effect of one routed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Activated(StepId),
    Advanced {
        completed: StepId,
        next: Option<StepId>,
    },
    Finished,
    StepFailed(StepId),
    Delivered,
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    UnknownStep(String),
    UnrecognizedStatus(String),
    ForeignRun(String),
    Rejected {
        step: StepId,
        from: StepStatus,
        to: StepStatus,
    },
}

/// Applies inbound messages to a tracker, one at a time, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct MessageRouter {
    run_id: Option<String>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept status messages that carry no run id or this one.
    pub fn for_run(run_id: impl Into<String>) -> Self {
        Self {
            run_id: Some(run_id.into()),
        }
    }

    pub fn route(&self, tracker: &mut StepTracker, message: InboundMessage) -> RouteOutcome {
        match message {
            InboundMessage::Status(status) => self.route_status(tracker, status),
            InboundMessage::Deliverable(text) => {
                info!("Received final document ({} chars)", text.len());
                tracker.force_complete();
                tracker.store_deliverable(text);
                RouteOutcome::Delivered
            }
        }
    }

    fn route_status(&self, tracker: &mut StepTracker, message: StatusMessage) -> RouteOutcome {
        if let (Some(expected), Some(actual)) = (&self.run_id, &message.run_id) {
            if expected != actual {
                warn!(
                    "Dropping message for run {} (current run is {})",
                    actual, expected
                );
                return RouteOutcome::Ignored(IgnoreReason::ForeignRun(actual.clone()));
            }
        }

        let Some(step) = StepId::parse(&message.step) else {
            warn!("Ignoring message for unknown step '{}'", message.step);
            return RouteOutcome::Ignored(IgnoreReason::UnknownStep(message.step));
        };

        match message.status {
            ReportedStatus::Active => match tracker.set_status(step, StepStatus::Active) {
                Transition::Rejected { from, to } => {
                    RouteOutcome::Ignored(IgnoreReason::Rejected { step, from, to })
                }
                _ => {
                    tracker.set_current(step);
                    info!("Step {} started", step.as_str());
                    RouteOutcome::Activated(step)
                }
            },
            ReportedStatus::Completed => match tracker.advance(step) {
                AdvanceOutcome::Activated(next) => {
                    info!("Step {} completed, {} started", step.as_str(), next.as_str());
                    RouteOutcome::Advanced {
                        completed: step,
                        next: Some(next),
                    }
                }
                AdvanceOutcome::Completed => {
                    info!("Step {} completed", step.as_str());
                    RouteOutcome::Advanced {
                        completed: step,
                        next: None,
                    }
                }
                AdvanceOutcome::Finished => RouteOutcome::Finished,
                AdvanceOutcome::Rejected { from, to } => {
                    RouteOutcome::Ignored(IgnoreReason::Rejected { step, from, to })
                }
            },
            ReportedStatus::Error => match tracker.set_status(step, StepStatus::Error) {
                Transition::Rejected { from, to } => {
                    RouteOutcome::Ignored(IgnoreReason::Rejected { step, from, to })
                }
                _ => {
                    match &message.data {
                        Some(data) => error!("Step {} failed: {}", step.as_str(), data),
                        None => error!("Step {} failed", step.as_str()),
                    }
                    RouteOutcome::StepFailed(step)
                }
            },
            ReportedStatus::Other(status) => {
                warn!(
                    "Unrecognized status '{}' for step {}",
                    status,
                    step.as_str()
                );
                RouteOutcome::Ignored(IgnoreReason::UnrecognizedStatus(status))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::TransitionPolicy;
    use serde_json::json;

    fn status(step: &str, status: &str) -> InboundMessage {
        InboundMessage::decode(json!({"step": step, "status": status})).unwrap()
    }

    fn tracker() -> StepTracker {
        let mut tracker = StepTracker::new(TransitionPolicy::Monotonic);
        tracker.reset_all();
        tracker.start_processing();
        tracker
    }

    #[test]
    fn test_upload_then_transcription_scenario() {
        let router = MessageRouter::new();
        let mut tracker = tracker();

        assert_eq!(
            router.route(&mut tracker, status("upload", "active")),
            RouteOutcome::Activated(StepId::Upload)
        );
        assert_eq!(
            router.route(&mut tracker, status("upload", "completed")),
            RouteOutcome::Advanced {
                completed: StepId::Upload,
                next: Some(StepId::Transcription)
            }
        );
        router.route(&mut tracker, status("transcription", "active"));

        assert_eq!(tracker.status(StepId::Upload), StepStatus::Completed);
        assert_eq!(tracker.status(StepId::Transcription), StepStatus::Active);
        assert_eq!(tracker.current_step(), Some(StepId::Transcription));
        assert_eq!(tracker.progress_percent(), 20);
    }

    #[test]
    fn test_completed_last_step_finishes() {
        let router = MessageRouter::new();
        let mut tracker = tracker();
        router.route(&mut tracker, status("completion", "active"));

        assert_eq!(
            router.route(&mut tracker, status("completion", "completed")),
            RouteOutcome::Finished
        );
        assert!(tracker.is_finished());
        assert!(!tracker.is_processing());
    }

    #[test]
    fn test_error_on_active_step() {
        let router = MessageRouter::new();
        let mut tracker = tracker();
        router.route(&mut tracker, status("upload", "completed"));
        router.route(&mut tracker, status("transcription", "completed"));
        let progress = tracker.progress_fraction();

        let outcome = router.route(
            &mut tracker,
            InboundMessage::decode(json!({
                "step": "processing",
                "status": "error",
                "data": "model unavailable"
            }))
            .unwrap(),
        );

        assert_eq!(outcome, RouteOutcome::StepFailed(StepId::Processing));
        assert_eq!(tracker.status(StepId::Processing), StepStatus::Error);
        assert_eq!(tracker.status(StepId::Generation), StepStatus::Pending);
        assert_eq!(tracker.progress_fraction(), progress);
        assert!(tracker.is_processing());
        assert!(!tracker.is_finished());
    }

    #[test]
    fn test_unknown_step_is_a_no_op() {
        let router = MessageRouter::new();
        let mut tracker = tracker();
        let before = tracker.steps().to_vec();

        assert_eq!(
            router.route(&mut tracker, status("review", "active")),
            RouteOutcome::Ignored(IgnoreReason::UnknownStep("review".to_string()))
        );
        assert_eq!(tracker.steps(), before.as_slice());
        assert!(tracker.current_step().is_none());
    }

    #[test]
    fn test_unrecognized_status_is_ignored() {
        let router = MessageRouter::new();
        let mut tracker = tracker();

        assert_eq!(
            router.route(&mut tracker, status("upload", "paused")),
            RouteOutcome::Ignored(IgnoreReason::UnrecognizedStatus("paused".to_string()))
        );
        assert_eq!(tracker.status(StepId::Upload), StepStatus::Pending);
    }

    #[test]
    fn test_deliverable_forces_completion() {
        let router = MessageRouter::new();
        let mut tracker = tracker();
        router.route(&mut tracker, status("upload", "active"));

        assert_eq!(
            router.route(
                &mut tracker,
                InboundMessage::Deliverable("Final report text".to_string())
            ),
            RouteOutcome::Delivered
        );
        assert!(tracker.is_finished());
        assert!(!tracker.is_processing());
        assert_eq!(tracker.status(StepId::Completion), StepStatus::Completed);
        assert_eq!(tracker.deliverable(), Some("Final report text"));
    }

    #[test]
    fn test_foreign_run_is_dropped() {
        let router = MessageRouter::for_run("run-a");
        let mut tracker = tracker();

        let foreign = InboundMessage::decode(json!({
            "step": "upload",
            "status": "active",
            "runId": "run-b"
        }))
        .unwrap();
        assert_eq!(
            router.route(&mut tracker, foreign),
            RouteOutcome::Ignored(IgnoreReason::ForeignRun("run-b".to_string()))
        );

        let own = InboundMessage::decode(json!({
            "step": "upload",
            "status": "active",
            "runId": "run-a"
        }))
        .unwrap();
        assert_eq!(
            router.route(&mut tracker, own),
            RouteOutcome::Activated(StepId::Upload)
        );

        // Messages without a run id are still trusted.
        assert_eq!(
            router.route(&mut tracker, status("upload", "completed")),
            RouteOutcome::Advanced {
                completed: StepId::Upload,
                next: Some(StepId::Transcription)
            }
        );
    }

    #[test]
    fn test_regression_rejected_under_monotonic_policy() {
        let router = MessageRouter::new();
        let mut tracker = tracker();
        router.route(&mut tracker, status("upload", "completed"));

        assert_eq!(
            router.route(&mut tracker, status("upload", "active")),
            RouteOutcome::Ignored(IgnoreReason::Rejected {
                step: StepId::Upload,
                from: StepStatus::Completed,
                to: StepStatus::Active
            })
        );
        assert_eq!(tracker.current_step(), Some(StepId::Transcription));
    }

    #[test]
    fn test_literal_policy_applies_out_of_order_messages() {
        let router = MessageRouter::new();
        let mut tracker = StepTracker::new(TransitionPolicy::Literal);
        tracker.start_processing();

        router.route(&mut tracker, status("upload", "completed"));
        assert_eq!(
            router.route(&mut tracker, status("upload", "active")),
            RouteOutcome::Activated(StepId::Upload)
        );
        assert_eq!(tracker.status(StepId::Upload), StepStatus::Active);
        assert_eq!(tracker.current_step(), Some(StepId::Upload));
    }
}

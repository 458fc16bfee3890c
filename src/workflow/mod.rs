//! Workflow progress tracking.
//!
//! The remote workflow reports progress over the push channel:
//! upload → transcription → processing → generation → completion
//!
//! Messages are decoded at the channel boundary (`message`), applied by the
//! `router`, and recorded in the `tracker`.

pub mod message;
pub mod router;
pub mod step;
pub mod tracker;

pub use message::{DecodeError, InboundMessage, ReportedStatus, StatusMessage};
pub use router::{IgnoreReason, MessageRouter, RouteOutcome};
pub use step::{Step, StepId, StepStatus};
pub use tracker::{AdvanceOutcome, StepTracker, Transition, TransitionPolicy};

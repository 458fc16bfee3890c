//! Ordered step sequence and its progress derivation.
//!
//! The tracker owns the five pipeline steps for one run. It is mutated only by
//! the message router and by the session (reset at submission time).

use tracing::{debug, info, warn};

use super::step::{Step, StepId, StepStatus};

/// How the tracker treats status updates that move a step backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Apply every update exactly as received.
    Literal,
    /// Reject updates to terminal steps and updates to a lower rank.
    #[default]
    Monotonic,
}

/// Result of a single status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    Unchanged,
    Rejected { from: StepStatus, to: StepStatus },
}

impl Transition {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Result of completing a step through [`StepTracker::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The step completed and the following step is now active.
    Activated(StepId),
    /// The step completed but the following step could not be activated.
    Completed,
    /// The last step completed; the run is finished.
    Finished,
    /// The completion itself was refused.
    Rejected { from: StepStatus, to: StepStatus },
}

#[derive(Debug, Clone)]
pub struct StepTracker {
    steps: Vec<Step>,
    policy: TransitionPolicy,
    current: Option<StepId>,
    processing: bool,
    finished: bool,
    deliverable: Option<String>,
}

impl Default for StepTracker {
    fn default() -> Self {
        Self::new(TransitionPolicy::default())
    }
}

impl StepTracker {
    pub fn new(policy: TransitionPolicy) -> Self {
        Self {
            steps: StepId::ORDER.into_iter().map(Step::new).collect(),
            policy,
            current: None,
            processing: false,
            finished: false,
            deliverable: None,
        }
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn status(&self, id: StepId) -> StepStatus {
        self.steps[id.index()].status
    }

    pub fn current_step(&self) -> Option<StepId> {
        self.current
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// True once the last step has completed; the exporter is unlocked.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn deliverable(&self) -> Option<&str> {
        self.deliverable.as_deref()
    }

    /// True when any step is in the error state.
    pub fn has_error(&self) -> bool {
        self.steps.iter().any(|s| s.status == StepStatus::Error)
    }

    /// Put every step back to pending and forget the previous run.
    pub fn reset_all(&mut self) {
        for step in &mut self.steps {
            step.status = StepStatus::Pending;
        }
        self.current = None;
        self.finished = false;
        self.deliverable = None;
        debug!("Step tracker reset");
    }

    pub fn start_processing(&mut self) {
        self.processing = true;
    }

    pub fn stop_processing(&mut self) {
        self.processing = false;
    }

    pub fn set_current(&mut self, id: StepId) {
        self.current = Some(id);
    }

    /// Set one step's status, subject to the transition policy.
    ///
    /// Does not check that only one step is active.
    pub fn set_status(&mut self, id: StepId, status: StepStatus) -> Transition {
        let policy = self.policy;
        let step = &mut self.steps[id.index()];
        let from = step.status;

        if from == status {
            return Transition::Unchanged;
        }

        if policy == TransitionPolicy::Monotonic
            && (from.is_terminal() || status.rank() < from.rank())
        {
            warn!(
                "Rejected {} transition {} -> {}",
                id.as_str(),
                from.as_str(),
                status.as_str()
            );
            return Transition::Rejected { from, to: status };
        }

        step.status = status;
        debug!("Step {}: {} -> {}", id.as_str(), from.as_str(), status.as_str());
        Transition::Applied
    }

    /// Complete `completed` and move the run forward.
    ///
    /// Activates the following step, or finishes the run when `completed` is
    /// the last step.
    pub fn advance(&mut self, completed: StepId) -> AdvanceOutcome {
        if let Transition::Rejected { from, to } = self.set_status(completed, StepStatus::Completed) {
            return AdvanceOutcome::Rejected { from, to };
        }

        match completed.next() {
            Some(next) => {
                if self.set_status(next, StepStatus::Active).is_rejected() {
                    return AdvanceOutcome::Completed;
                }
                self.current = Some(next);
                AdvanceOutcome::Activated(next)
            }
            None => {
                self.finish();
                AdvanceOutcome::Finished
            }
        }
    }

    /// Mark the last step completed and finish the run, whatever its state.
    pub fn force_complete(&mut self) {
        self.steps[StepId::Completion.index()].status = StepStatus::Completed;
        self.finish();
    }

    /// Store the final document text for export.
    pub fn store_deliverable(&mut self, text: String) {
        self.deliverable = Some(text);
    }

    /// Fraction of completed steps, in `[0, 1]`.
    pub fn progress_fraction(&self) -> f64 {
        let completed = self
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count();
        completed as f64 / self.steps.len() as f64
    }

    pub fn progress_percent(&self) -> u8 {
        (self.progress_fraction() * 100.0).round() as u8
    }

    fn finish(&mut self) {
        if !self.finished {
            info!("Workflow finished");
        }
        self.finished = true;
        self.processing = false;
    }
}

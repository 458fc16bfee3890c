//! Terminal rendering of the step tracker.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::session::{SessionObserver, SessionOutcome};
use crate::submission::UploadProgress;
use crate::workflow::{RouteOutcome, StepStatus, StepTracker};

/// Progress bar plus per-step log lines.
pub struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self {
            bar: create_progress_bar(),
        }
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionObserver for TerminalProgress {
    fn on_started(&mut self, tracker: &StepTracker) {
        self.bar.set_position(tracker.progress_percent() as u64);
        self.bar.set_message("Uploading...");
    }

    fn on_upload_progress(&mut self, progress: UploadProgress) {
        self.bar.set_message(upload_line(progress));
    }

    fn on_uploaded(&mut self, tracker: &StepTracker) {
        if tracker.current_step().is_none() {
            self.bar.set_message("Waiting for the workflow...");
        }
    }

    fn on_update(&mut self, tracker: &StepTracker, outcome: &RouteOutcome) {
        self.bar.set_position(tracker.progress_percent() as u64);
        self.bar.set_message(status_line(tracker));

        match outcome {
            RouteOutcome::Advanced { completed, .. } => {
                self.bar.println(format!("✓ {}", completed.label()));
            }
            RouteOutcome::Finished | RouteOutcome::Delivered => {
                self.bar.println("✓ Finalizing");
            }
            RouteOutcome::StepFailed(step) => {
                self.bar.println(format!("✗ {} failed", step.label()));
            }
            _ => {}
        }
    }

    fn on_finished(&mut self, tracker: &StepTracker, outcome: &SessionOutcome) {
        match outcome {
            SessionOutcome::Completed { .. } => self.bar.finish_with_message("Complete"),
            _ => self.bar.abandon_with_message(status_line(tracker)),
        }
    }
}

/// Create a styled progress bar.
fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(100);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━╸━");
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn upload_line(progress: UploadProgress) -> String {
    format!("Uploading... {}%", progress.percent())
}

/// One-line summary of where the run is.
pub fn status_line(tracker: &StepTracker) -> String {
    if let Some(step) = tracker
        .steps()
        .iter()
        .find(|s| s.status == StepStatus::Error)
    {
        return format!("Error: {}", step.label);
    }
    if tracker.is_finished() {
        return "Complete".to_string();
    }
    match tracker.current_step() {
        Some(step) => format!("{}...", step.label()),
        None => "Waiting for the workflow...".to_string(),
    }
}

/// Multi-line view of every step and its state.
pub fn render_steps(tracker: &StepTracker) -> String {
    let mut lines = vec![format!("Progress: {}%", tracker.progress_percent())];
    for step in tracker.steps() {
        let (icon, state) = match step.status {
            StepStatus::Completed => ("✓", "Done"),
            StepStatus::Active => ("⟳", "In progress..."),
            StepStatus::Error => ("✗", "Error"),
            StepStatus::Pending => ("·", ""),
        };
        lines.push(format!("  {} {:<28} {}", icon, step.label, state).trim_end().to_string());
    }
    lines.join("\n")
}

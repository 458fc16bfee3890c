//! CLI handler for submitting a meeting recording.
//!
//! Validates the form, uploads it to the workflow webhook, follows progress
//! on the push channel and saves the generated document.

use anyhow::{bail, Context, Result};
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::channel::AblySseChannel;
use crate::cli::args::SubmitCliArgs;
use crate::cli::progress::{render_steps, TerminalProgress};
use crate::cli::prompt::fill_missing;
use crate::config::Config;
use crate::export::{ExportError, ResultExporter};
use crate::form::{FormState, MeetingForm, ValidatedForm};
use crate::session::{SessionOptions, SessionOutcome, SessionReport, WorkflowSession};
use crate::submission::{SubmitError, WebhookClient};
use crate::workflow::{StepStatus, StepTracker};

/// Handle the submit CLI command.
pub async fn handle_submit_command(args: SubmitCliArgs) -> Result<()> {
    let config = Config::load()?;

    // 1. Collect the form from arguments, then prompts
    let mut state = FormState::new(form_from_args(&args, &config));
    if !args.no_prompt && io::stdin().is_terminal() {
        fill_missing(&mut state)?;
    }

    // 2. Validate before anything goes over the network
    let form = match state.validate() {
        Ok(form) => form,
        Err(errors) => {
            for (field, message) in errors.iter() {
                eprintln!("  {}: {}", field.label(), message);
            }
            bail!("Form is incomplete ({} field(s) need attention)", errors.len());
        }
    };

    // 3. Wire up the trigger and the push channel
    let webhook_url = args
        .webhook_url
        .clone()
        .unwrap_or_else(|| config.webhook.url.clone());
    let connect_timeout = (config.webhook.connect_timeout_seconds > 0)
        .then(|| Duration::from_secs(config.webhook.connect_timeout_seconds));
    let trigger = WebhookClient::new(&webhook_url, connect_timeout)
        .context("Failed to create the webhook client")?;

    if config.channel.api_key.as_deref().unwrap_or_default().is_empty() {
        warn!("No channel api_key configured; the subscription will likely be refused");
    }
    let channel = AblySseChannel::new(&config.channel);

    let options = SessionOptions {
        policy: config.workflow.transition_policy(),
        idle_timeout: config.workflow.idle_timeout(),
        deliverable_grace: config.workflow.deliverable_grace(),
    };

    let mut session = WorkflowSession::new(Box::new(trigger), Box::new(channel), options);
    if !args.no_progress {
        session = session.with_observer(Box::new(TerminalProgress::new()));
    }

    eprintln!("Submitting '{}' to {}", form.meeting_title, webhook_url);

    // 4. Run until done
    let report = session.run(form.clone()).await?;
    let tracker = session.tracker();

    if args.no_progress {
        eprintln!("{}", render_steps(tracker));
    }

    // 5. Handle the outcome
    let deliverable = completed_deliverable(report, tracker)?;
    let output_dir = output_dir(&args, &config);
    export_document(&output_dir, deliverable.as_deref(), &form)
}

/// The document text of a completed run; every other ending is an error.
fn completed_deliverable(report: SessionReport, tracker: &StepTracker) -> Result<Option<String>> {
    match report.outcome {
        SessionOutcome::Completed { deliverable } => Ok(deliverable),
        SessionOutcome::TransmissionFailed(err) => bail!("{}", transmission_message(&err)),
        SessionOutcome::ChannelClosed => match failed_step(tracker) {
            Some(label) => bail!("Workflow failed during: {}", label),
            None => bail!("Lost the connection to the progress channel before the document was ready"),
        },
        SessionOutcome::TimedOut => match failed_step(tracker) {
            Some(label) => bail!("Workflow failed during: {}", label),
            None => bail!("No progress received from the workflow, giving up"),
        },
        SessionOutcome::Interrupted => match failed_step(tracker) {
            Some(label) => bail!(
                "Interrupted after the workflow failed during: {} (run id: {})",
                label,
                report.run_id
            ),
            None => bail!("Interrupted before the document was ready (run id: {})", report.run_id),
        },
    }
}

fn form_from_args(args: &SubmitCliArgs, config: &Config) -> MeetingForm {
    MeetingForm {
        document_type: args.document_type.clone().unwrap_or_default(),
        meeting_title: args.title.clone().unwrap_or_default(),
        meeting_date: args.date.clone().unwrap_or_default(),
        main_objective: args.objective.clone().unwrap_or_default(),
        participants: args.participants.clone().unwrap_or_default(),
        audio_file: args.audio.clone(),
        language: args
            .language
            .clone()
            .unwrap_or_else(|| config.form.default_language.clone()),
        agenda: args.agenda.clone().unwrap_or_default(),
    }
}

fn output_dir(args: &SubmitCliArgs, config: &Config) -> PathBuf {
    args.output_dir
        .clone()
        .or_else(|| config.export.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn export_document(output_dir: &Path, text: Option<&str>, form: &ValidatedForm) -> Result<()> {
    let exporter = ResultExporter::new(output_dir);
    match exporter.export(text, form.document_type.as_str(), &form.meeting_title) {
        Ok(path) => {
            eprintln!("Document saved to: {}", path.display());
            Ok(())
        }
        Err(ExportError::NoDeliverable) => {
            eprintln!("The workflow finished without sending a document. Nothing to save.");
            Ok(())
        }
        Err(err) => Err(err).context("Failed to save the document"),
    }
}

/// User-facing message for an upload failure.
pub fn transmission_message(err: &SubmitError) -> String {
    match err {
        SubmitError::Server { status, .. } => format!("Server error: {}", status.as_u16()),
        SubmitError::NoResponse { .. } => {
            "Connection error. Check that the workflow server is running.".to_string()
        }
        SubmitError::Request(message) => format!("Unexpected error: {}", message),
    }
}

fn failed_step(tracker: &StepTracker) -> Option<&'static str> {
    tracker
        .steps()
        .iter()
        .find(|s| s.status == StepStatus::Error)
        .map(|s| s.label)
}

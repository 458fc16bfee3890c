//! Step identities and per-step status.

use serde::{Deserialize, Serialize};

/// Named stage of the remote pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepId {
    Upload,
    Transcription,
    Processing,
    Generation,
    Completion,
}

impl StepId {
    /// Fixed pipeline order.
    pub const ORDER: [StepId; 5] = [
        StepId::Upload,
        StepId::Transcription,
        StepId::Processing,
        StepId::Generation,
        StepId::Completion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Transcription => "transcription",
            Self::Processing => "processing",
            Self::Generation => "generation",
            Self::Completion => "completion",
        }
    }

    pub fn parse(id: &str) -> Option<Self> {
        Self::ORDER.into_iter().find(|step| step.as_str() == id)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Upload => "Uploading the file",
            Self::Transcription => "Transcribing with Whisper",
            Self::Processing => "Processing with OpenAI",
            Self::Generation => "Generating the document",
            Self::Completion => "Finalizing",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn next(&self) -> Option<Self> {
        Self::ORDER.get(self.index() + 1).copied()
    }

    pub fn is_last(&self) -> bool {
        self.next().is_none()
    }
}

/// Status of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Pending,
    Active,
    Completed,
    Error,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// Progress rank; `completed` and `error` share the terminal rank.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Active => 1,
            Self::Completed | Self::Error => 2,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub id: StepId,
    pub label: &'static str,
    pub status: StepStatus,
}

impl Step {
    pub fn new(id: StepId) -> Self {
        Self {
            id,
            label: id.label(),
            status: StepStatus::Pending,
        }
    }
}

use crate::global;
use crate::workflow::TransitionPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub webhook: WebhookConfig,
    pub channel: ChannelConfig,
    pub workflow: WorkflowConfig,
    pub form: FormConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Workflow trigger that receives the multipart upload.
    pub url: String,
    /// Connection timeout in seconds (0 disables it).
    pub connect_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Base URL of the realtime service (SSE endpoint lives at `<endpoint>/sse`).
    pub endpoint: String,
    pub api_key: Option<String>,
    /// Channel the workflow publishes progress on.
    pub name: String,
    /// Event name filter within the channel.
    pub event: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Reject status regressions (e.g. completed -> active) instead of applying them literally.
    pub strict_ordering: bool,
    /// How long to wait for the document text after the last step completes.
    pub deliverable_grace_seconds: u64,
    /// Give up when no message arrives for this long (0 waits forever).
    pub idle_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    pub default_language: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory for exported documents (defaults to the working directory).
    pub output_dir: Option<PathBuf>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5678/webhook-test/upload-audio".to_string(),
            connect_timeout_seconds: 30,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://realtime.ably.io".to_string(),
            api_key: None,
            name: "echo".to_string(),
            event: "result".to_string(),
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            strict_ordering: true,
            deliverable_grace_seconds: 30,
            idle_timeout_seconds: 0,
        }
    }
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            default_language: "fr".to_string(),
        }
    }
}

impl WorkflowConfig {
    pub fn transition_policy(&self) -> TransitionPolicy {
        if self.strict_ordering {
            TransitionPolicy::Monotonic
        } else {
            TransitionPolicy::Literal
        }
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_seconds > 0).then(|| Duration::from_secs(self.idle_timeout_seconds))
    }

    pub fn deliverable_grace(&self) -> Duration {
        Duration::from_secs(self.deliverable_grace_seconds)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_workflow_endpoints() {
        let config = Config::default();
        assert_eq!(
            config.webhook.url,
            "http://localhost:5678/webhook-test/upload-audio"
        );
        assert_eq!(config.channel.name, "echo");
        assert_eq!(config.channel.event, "result");
        assert_eq!(config.form.default_language, "fr");
        assert!(config.export.output_dir.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [channel]
            api_key = "app.key:secret"

            [workflow]
            strict_ordering = false
            "#,
        )
        .unwrap();

        assert_eq!(config.channel.api_key.as_deref(), Some("app.key:secret"));
        assert_eq!(config.channel.name, "echo");
        assert_eq!(
            config.workflow.transition_policy(),
            TransitionPolicy::Literal
        );
        assert_eq!(config.workflow.deliverable_grace_seconds, 30);
    }

    #[test]
    fn test_idle_timeout_disabled_by_zero() {
        let mut workflow = WorkflowConfig::default();
        assert!(workflow.idle_timeout().is_none());

        workflow.idle_timeout_seconds = 90;
        assert_eq!(workflow.idle_timeout(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert!(config.workflow.strict_ordering);

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.webhook.url, config.webhook.url);
    }
}

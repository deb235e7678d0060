//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc};

use serde::Deserialize;
use tracing::warn;

use super::types::{Res, Void};

/// Default capacity of the channel between the transport and the dispatch loop.
fn default_event_buffer_size() -> usize {
    32
}

/// What the dispatch loop does when a reply could not be sent.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Log the failure and keep draining events.
    #[default]
    Continue,
    /// Stop the dispatch loop and return the failure to the caller.
    Exit,
}

/// Configuration for the calm-bot application.
#[derive(Debug, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConfigInner {
    /// Slack app-level token used to open the socket mode connection (`SLACK_APP_TOKEN`).
    pub slack_app_token: String,
    /// Slack bot token used for Web API calls (`SLACK_BOT_TOKEN`).
    pub slack_bot_token: String,
    /// What to do when posting a reply fails (`ON_HANDLER_ERROR`).
    #[serde(default)]
    pub on_handler_error: ErrorPolicy,
    /// Number of unhandled events buffered before the transport waits (`EVENT_BUFFER_SIZE`).
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
}

impl Config {
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default());

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }

    /// Checks the values that deserialization alone cannot.
    pub fn validate(&self) -> Void {
        if self.slack_bot_token.trim().is_empty() {
            return Err(anyhow::anyhow!("Slack bot token (`SLACK_BOT_TOKEN`) must be set."));
        }

        if self.slack_app_token.trim().is_empty() {
            return Err(anyhow::anyhow!("Slack app token (`SLACK_APP_TOKEN`) must be set."));
        }

        if self.event_buffer_size < 1 {
            return Err(anyhow::anyhow!("Event buffer size must be at least 1."));
        }

        if !self.slack_bot_token.starts_with("xoxb-") {
            warn!("Slack bot token does not look like a bot token (expected `xoxb-` prefix).");
        }

        if !self.slack_app_token.starts_with("xapp-") {
            warn!("Slack app token does not look like an app-level token (expected `xapp-` prefix).");
        }

        Ok(())
    }
}

//! agent-embed configuration management
//!
//! Host-side settings (where the agent UI lives, animation timing, resize
//! policy, relay limits) plus default widget options, loaded from TOML.

use crate::error::{Error, Result};
use crate::protocol::Origin;
use crate::relay::RelayLimit;
use crate::widget::{
    WidgetOptions, WidgetSettings, DEFAULT_CONTAINER_ID, DEFAULT_FRAME_PATH,
    DEFAULT_MAX_HEIGHT_RATIO,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main agent-embed configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    /// Remote origin and page contract
    pub host: HostConfig,

    /// Animation timing
    pub timing: TimingConfig,

    /// Iframe sizing policy
    pub frame: FrameConfig,

    /// Relay rate limiting
    pub relay: RelayConfig,

    /// Default widget options; host page values take precedence
    pub widget: WidgetOptions,
}

/// Where the agent UI is served and how the host page hosts it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Origin serving the embedded agent UI
    pub remote_origin: Origin,

    /// Id of the container element on the host page
    pub container_id: String,

    /// Path of the agent UI, appended to the remote origin
    pub frame_path: String,

    /// Path of the loader script, appended to the remote origin
    pub script_path: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            remote_origin: Origin::default(),
            container_id: DEFAULT_CONTAINER_ID.to_string(),
            frame_path: DEFAULT_FRAME_PATH.to_string(),
            script_path: "/widget.js".to_string(),
        }
    }
}

/// Animation timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Delay before a concealed iframe leaves layout
    pub settle_delay_ms: u64,

    /// Length of one animation frame for the async runtime
    pub frame_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 300,
            frame_interval_ms: 16,
        }
    }
}

/// Iframe sizing policy for `widget:resize`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Largest share of the viewport height the iframe may take
    pub max_height_ratio: f64,

    /// Smallest height a resize may apply (0 = no floor)
    pub min_height_px: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_height_ratio: DEFAULT_MAX_HEIGHT_RATIO,
            min_height_px: 0,
        }
    }
}

/// Sliding-window limit on relayed `widget:message` events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub enabled: bool,

    /// Events allowed per window
    pub max_events: usize,

    /// Window length in milliseconds
    pub window_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_events: 20,
            window_ms: 1000,
        }
    }
}

impl RelayConfig {
    pub fn limit(&self) -> Option<RelayLimit> {
        self.enabled.then(|| RelayLimit {
            max_events: self.max_events,
            window: Duration::from_millis(self.window_ms),
        })
    }
}

impl EmbedConfig {
    /// Load and validate a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse and validate TOML
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        let id = &self.host.container_id;
        if id.is_empty()
            || !id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
        {
            return Err(Error::Config(format!("Invalid container id '{}'", id)));
        }
        for (name, path) in [
            ("frame_path", &self.host.frame_path),
            ("script_path", &self.host.script_path),
        ] {
            if !path.starts_with('/') {
                return Err(Error::Config(format!(
                    "host.{} must start with '/': '{}'",
                    name, path
                )));
            }
        }

        let ratio = self.frame.max_height_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(Error::Config(format!(
                "frame.max_height_ratio must be in (0, 1], got {}",
                ratio
            )));
        }

        if self.timing.frame_interval_ms == 0 {
            return Err(Error::Config(
                "timing.frame_interval_ms must be positive".to_string(),
            ));
        }

        if self.relay.enabled && (self.relay.max_events == 0 || self.relay.window_ms == 0) {
            return Err(Error::Config(
                "relay.max_events and relay.window_ms must be positive when enabled".to_string(),
            ));
        }

        Ok(())
    }

    /// Host-side widget settings derived from this configuration
    pub fn widget_settings(&self) -> WidgetSettings {
        WidgetSettings {
            remote_origin: self.host.remote_origin.clone(),
            container_id: self.host.container_id.clone(),
            frame_path: self.host.frame_path.clone(),
            settle_delay: Duration::from_millis(self.timing.settle_delay_ms),
            max_height_ratio: self.frame.max_height_ratio,
            min_height_px: self.frame.min_height_px,
            relay_limit: self.relay.limit(),
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.timing.frame_interval_ms)
    }

    /// Loader script URL on the remote origin
    pub fn script_url(&self) -> String {
        format!("{}{}", self.host.remote_origin, self.host.script_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = EmbedConfig::default();
        assert_eq!(config.host.remote_origin.as_str(), "http://localhost:3000");
        assert_eq!(config.host.container_id, "ai-agent-widget");
        assert_eq!(config.timing.settle_delay_ms, 300);
        assert_eq!(config.frame.max_height_ratio, 0.8);
        assert!(!config.relay.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EmbedConfig::from_toml(
            r#"
            [host]
            remote_origin = "https://agents.example.com/"

            [widget]
            agentId = "abc123"
            theme = "dark"
            "#,
        )
        .unwrap();
        assert_eq!(config.host.remote_origin.as_str(), "https://agents.example.com");
        assert_eq!(config.host.frame_path, "/widget");
        assert_eq!(config.timing, TimingConfig::default());
        assert_eq!(config.widget.agent_id.as_deref(), Some("abc123"));
        assert_eq!(config.widget.theme.as_deref(), Some("dark"));
    }

    #[test]
    fn test_invalid_origin_is_rejected() {
        let err = EmbedConfig::from_toml("[host]\nremote_origin = \"nope\"\n").unwrap_err();
        assert!(matches!(err, Error::Toml(_)));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = EmbedConfig::default();
        config.frame.max_height_ratio = 1.5;
        assert!(config.validate().is_err());

        let mut config = EmbedConfig::default();
        config.host.container_id = "has space".to_string();
        assert!(config.validate().is_err());

        let mut config = EmbedConfig::default();
        config.host.frame_path = "widget".to_string();
        assert!(config.validate().is_err());

        let mut config = EmbedConfig::default();
        config.relay.enabled = true;
        config.relay.max_events = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = EmbedConfig::default();
        config.relay.enabled = true;
        config.widget = WidgetOptions::for_agent("abc123");
        let text = config.to_toml().unwrap();
        assert_eq!(EmbedConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_widget_settings() {
        let mut config = EmbedConfig::default();
        config.timing.settle_delay_ms = 450;
        config.frame.min_height_px = 120;
        config.relay.enabled = true;
        let settings = config.widget_settings();
        assert_eq!(settings.settle_delay, Duration::from_millis(450));
        assert_eq!(settings.min_height_px, 120);
        assert_eq!(
            settings.relay_limit,
            Some(RelayLimit {
                max_events: 20,
                window: Duration::from_secs(1)
            })
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[timing]\nsettle_delay_ms = 250").unwrap();
        let config = EmbedConfig::load(file.path()).unwrap();
        assert_eq!(config.timing.settle_delay_ms, 250);
        assert_eq!(config.timing.frame_interval_ms, 16);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = EmbedConfig::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_script_url() {
        let config = EmbedConfig::default();
        assert_eq!(config.script_url(), "http://localhost:3000/widget.js");
    }
}

//! Widget configuration
//!
//! `WidgetOptions` is what a host page hands us (every field optional, enum
//! values as raw strings). `WidgetConfig::merge` turns it into the typed,
//! immutable configuration the widget runs with.

use crate::error::{Error, Result};
use crate::protocol::Origin;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Color scheme of the toggle button and the embedded UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub const ALL: [Theme; 2] = [Theme::Light, Theme::Dark];

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

/// Viewport corner the widget container is anchored to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    #[default]
    BottomRight,
    BottomLeft,
    TopRight,
    TopLeft,
}

impl Position {
    pub const ALL: [Position; 4] = [
        Position::BottomRight,
        Position::BottomLeft,
        Position::TopRight,
        Position::TopLeft,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Position::BottomRight => "bottom-right",
            Position::BottomLeft => "bottom-left",
            Position::TopRight => "top-right",
            Position::TopLeft => "top-left",
        }
    }

    pub fn is_top(self) -> bool {
        matches!(self, Position::TopRight | Position::TopLeft)
    }

    pub fn is_left(self) -> bool {
        matches!(self, Position::BottomLeft | Position::TopLeft)
    }
}

/// Toggle button size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl ButtonSize {
    pub const ALL: [ButtonSize; 3] = [ButtonSize::Small, ButtonSize::Medium, ButtonSize::Large];

    pub fn as_str(self) -> &'static str {
        match self {
            ButtonSize::Small => "small",
            ButtonSize::Medium => "medium",
            ButtonSize::Large => "large",
        }
    }
}

/// Corner rounding of the toggle button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderRadius {
    None,
    Small,
    #[default]
    Medium,
    Large,
}

impl BorderRadius {
    pub const ALL: [BorderRadius; 4] = [
        BorderRadius::None,
        BorderRadius::Small,
        BorderRadius::Medium,
        BorderRadius::Large,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BorderRadius::None => "none",
            BorderRadius::Small => "small",
            BorderRadius::Medium => "medium",
            BorderRadius::Large => "large",
        }
    }
}

/// Unrecognized value for one of the enumerated widget options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized value '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

macro_rules! option_enum_str {
    ($($ty:ty),+ $(,)?) => {$(
        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                <$ty>::ALL
                    .into_iter()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| UnknownVariant(s.to_string()))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    )+};
}

option_enum_str!(Theme, Position, ButtonSize, BorderRadius);

/// Partial widget options as supplied by the host page
/// (`window.aiAgentWidgetConfig`) or the `[widget]` config section
///
/// Scalars are read the way a script page writes them: a numeric `agentId`
/// becomes its decimal text, and `showAgentImage` also takes `"true"` or
/// `"false"`. Any other non-boolean `showAgentImage` falls back to the
/// default like an unrecognized enum value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WidgetOptions {
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "scalar::text"
    )]
    pub agent_id: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "scalar::text"
    )]
    pub theme: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "scalar::text"
    )]
    pub position: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "scalar::text"
    )]
    pub button_size: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "scalar::text"
    )]
    pub border_radius: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "scalar::flag"
    )]
    pub show_agent_image: Option<bool>,
}

mod scalar {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Flag(bool),
        Number(serde_json::Number),
        Text(String),
    }

    impl Scalar {
        fn into_text(self) -> String {
            match self {
                Scalar::Flag(b) => b.to_string(),
                Scalar::Number(n) => n.to_string(),
                Scalar::Text(s) => s,
            }
        }
    }

    pub(super) fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<Scalar>::deserialize(d)?.map(Scalar::into_text))
    }

    pub(super) fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(match Option::<Scalar>::deserialize(d)? {
            None => None,
            Some(Scalar::Flag(b)) => Some(b),
            Some(Scalar::Text(s)) if s == "true" => Some(true),
            Some(Scalar::Text(s)) if s == "false" => Some(false),
            Some(other) => {
                tracing::warn!(
                    value = %other.into_text(),
                    "Unrecognized showAgentImage value, using default"
                );
                None
            }
        })
    }
}

impl WidgetOptions {
    /// Options carrying only an agent id
    pub fn for_agent(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: Some(agent_id.into()),
            ..Default::default()
        }
    }

    /// Layer `other` on top of `self`; fields set in `other` win.
    pub fn overlay(&self, other: &WidgetOptions) -> WidgetOptions {
        WidgetOptions {
            agent_id: other.agent_id.clone().or_else(|| self.agent_id.clone()),
            theme: other.theme.clone().or_else(|| self.theme.clone()),
            position: other.position.clone().or_else(|| self.position.clone()),
            button_size: other.button_size.clone().or_else(|| self.button_size.clone()),
            border_radius: other
                .border_radius
                .clone()
                .or_else(|| self.border_radius.clone()),
            show_agent_image: other.show_agent_image.or(self.show_agent_image),
        }
    }
}

/// Fully resolved widget configuration
///
/// Immutable once built; a different configuration means a new widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    agent_id: String,
    theme: Theme,
    position: Position,
    button_size: ButtonSize,
    border_radius: BorderRadius,
    show_agent_image: bool,
}

impl WidgetConfig {
    /// Merge host options over the documented defaults.
    ///
    /// A missing or blank `agentId` is a configuration error. Unrecognized
    /// enum values fall back to the default for that field.
    pub fn merge(options: &WidgetOptions) -> Result<Self> {
        let agent_id = options.agent_id.as_deref().unwrap_or_default();
        if agent_id.trim().is_empty() {
            return Err(Error::Config("agentId is required".to_string()));
        }

        Ok(Self {
            agent_id: agent_id.to_string(),
            theme: resolve("theme", options.theme.as_deref()),
            position: resolve("position", options.position.as_deref()),
            button_size: resolve("buttonSize", options.button_size.as_deref()),
            border_radius: resolve("borderRadius", options.border_radius.as_deref()),
            show_agent_image: options.show_agent_image.unwrap_or(true),
        })
    }

    /// Configuration for `agent_id` with every other field at its default
    pub fn for_agent(agent_id: impl Into<String>) -> Result<Self> {
        Self::merge(&WidgetOptions::for_agent(agent_id))
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn button_size(&self) -> ButtonSize {
        self.button_size
    }

    pub fn border_radius(&self) -> BorderRadius {
        self.border_radius
    }

    pub fn show_agent_image(&self) -> bool {
        self.show_agent_image
    }

    /// URL-encoded query string carrying every config field, in declaration order
    pub fn query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("agentId", &self.agent_id)
            .append_pair("theme", self.theme.as_str())
            .append_pair("position", self.position.as_str())
            .append_pair("buttonSize", self.button_size.as_str())
            .append_pair("borderRadius", self.border_radius.as_str())
            .append_pair(
                "showAgentImage",
                if self.show_agent_image { "true" } else { "false" },
            )
            .finish()
    }

    /// Initial iframe URL: `<origin><frame_path>?<query>`
    pub fn iframe_url(&self, origin: &Origin, frame_path: &str) -> String {
        format!("{}{}?{}", origin, frame_path, self.query_string())
    }
}

fn resolve<T>(field: &'static str, raw: Option<&str>) -> T
where
    T: FromStr<Err = UnknownVariant> + Default + fmt::Display,
{
    match raw {
        None => T::default(),
        Some(value) => value.parse().unwrap_or_else(|e: UnknownVariant| {
            let fallback = T::default();
            tracing::warn!(
                field,
                error = %e,
                fallback = %fallback,
                "Unrecognized widget option, using default"
            );
            fallback
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_applies_defaults() {
        let config = WidgetConfig::for_agent("abc123").unwrap();
        assert_eq!(config.agent_id(), "abc123");
        assert_eq!(config.theme(), Theme::Light);
        assert_eq!(config.position(), Position::BottomRight);
        assert_eq!(config.button_size(), ButtonSize::Medium);
        assert_eq!(config.border_radius(), BorderRadius::Medium);
        assert!(config.show_agent_image());
    }

    #[test]
    fn test_merge_keeps_supplied_values() {
        let options = WidgetOptions {
            agent_id: Some("agent-7".to_string()),
            theme: Some("dark".to_string()),
            position: Some("top-left".to_string()),
            button_size: Some("large".to_string()),
            border_radius: Some("none".to_string()),
            show_agent_image: Some(false),
        };
        let config = WidgetConfig::merge(&options).unwrap();
        assert_eq!(config.theme(), Theme::Dark);
        assert_eq!(config.position(), Position::TopLeft);
        assert_eq!(config.button_size(), ButtonSize::Large);
        assert_eq!(config.border_radius(), BorderRadius::None);
        assert!(!config.show_agent_image());
    }

    #[test]
    fn test_merge_rejects_missing_agent_id() {
        let err = WidgetConfig::merge(&WidgetOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_merge_rejects_blank_agent_id() {
        let err = WidgetConfig::for_agent("   ").unwrap_err();
        assert!(err.to_string().contains("agentId"));
    }

    #[test]
    fn test_unknown_position_falls_back_to_bottom_right() {
        let options = WidgetOptions {
            position: Some("middle".to_string()),
            ..WidgetOptions::for_agent("abc")
        };
        let config = WidgetConfig::merge(&options).unwrap();
        assert_eq!(config.position(), Position::BottomRight);
    }

    #[test]
    fn test_unknown_theme_falls_back_to_light() {
        let options = WidgetOptions {
            theme: Some("solarized".to_string()),
            ..WidgetOptions::for_agent("abc")
        };
        assert_eq!(WidgetConfig::merge(&options).unwrap().theme(), Theme::Light);
    }

    #[test]
    fn test_query_string_with_defaults() {
        let config = WidgetConfig::for_agent("abc123").unwrap();
        assert_eq!(
            config.query_string(),
            "agentId=abc123&theme=light&position=bottom-right&buttonSize=medium&borderRadius=medium&showAgentImage=true"
        );
    }

    #[test]
    fn test_query_string_encodes_agent_id() {
        let config = WidgetConfig::for_agent("a b&c=d").unwrap();
        assert!(config.query_string().starts_with("agentId=a+b%26c%3Dd&"));
    }

    #[test]
    fn test_iframe_url() {
        let config = WidgetConfig::for_agent("abc123").unwrap();
        let origin = Origin::parse("https://agents.example.com").unwrap();
        let url = config.iframe_url(&origin, "/widget");
        assert!(url.starts_with("https://agents.example.com/widget?agentId=abc123&"));
    }

    #[test]
    fn test_config_serializes_camel_case() {
        let config = WidgetConfig::for_agent("abc123").unwrap();
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "agentId": "abc123",
                "theme": "light",
                "position": "bottom-right",
                "buttonSize": "medium",
                "borderRadius": "medium",
                "showAgentImage": true
            })
        );
    }

    #[test]
    fn test_options_overlay() {
        let base = WidgetOptions {
            agent_id: Some("base".to_string()),
            theme: Some("dark".to_string()),
            ..Default::default()
        };
        let top = WidgetOptions {
            agent_id: Some("top".to_string()),
            show_agent_image: Some(false),
            ..Default::default()
        };
        let merged = base.overlay(&top);
        assert_eq!(merged.agent_id.as_deref(), Some("top"));
        assert_eq!(merged.theme.as_deref(), Some("dark"));
        assert_eq!(merged.show_agent_image, Some(false));
    }

    #[test]
    fn test_options_deserialize_from_host_object() {
        let raw = serde_json::json!({ "agentId": "abc", "buttonSize": "small" });
        let options: WidgetOptions = serde_json::from_value(raw).unwrap();
        assert_eq!(options.agent_id.as_deref(), Some("abc"));
        assert_eq!(options.button_size.as_deref(), Some("small"));
        assert!(options.theme.is_none());
    }

    #[test]
    fn test_options_accept_script_scalars() {
        let raw = serde_json::json!({
            "agentId": 123,
            "theme": null,
            "position": 7,
            "showAgentImage": "false"
        });
        let options: WidgetOptions = serde_json::from_value(raw).unwrap();
        assert_eq!(options.agent_id.as_deref(), Some("123"));
        assert!(options.theme.is_none());
        assert_eq!(options.show_agent_image, Some(false));

        let config = WidgetConfig::merge(&options).unwrap();
        assert_eq!(config.agent_id(), "123");
        assert_eq!(config.position(), Position::BottomRight);
        assert!(!config.show_agent_image());
    }

    #[test]
    fn test_unrecognized_show_agent_image_uses_default() {
        let raw = serde_json::json!({ "agentId": "abc", "showAgentImage": "nope" });
        let options: WidgetOptions = serde_json::from_value(raw).unwrap();
        assert!(options.show_agent_image.is_none());
        assert!(WidgetConfig::merge(&options).unwrap().show_agent_image());
    }

    #[test]
    fn test_options_reject_structured_values() {
        let raw = serde_json::json!({ "agentId": ["abc"] });
        assert!(serde_json::from_value::<WidgetOptions>(raw).is_err());
    }
}

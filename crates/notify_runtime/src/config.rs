//! Runtime configuration for notification routing, channels, and presentation.

use std::collections::BTreeMap;

use notify_host::{ChannelSettings, ForegroundPresentation, RendererSettings};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::categories::DEFAULT_CATEGORY_PREFIX;

/// Errors raised while loading [`NotifyConfig`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Config text is not valid JSON for the expected shape.
    #[error("invalid notification config: {0}")]
    Parse(String),
    /// Category prefix is empty or contains characters outside `[A-Za-z0-9_]`.
    #[error("invalid action category prefix `{0}`")]
    InvalidCategoryPrefix(String),
}

/// Tap navigation table and fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Payload `type` value → route.
    pub type_routes: BTreeMap<String, String>,
    /// Route used for non-empty payloads that match nothing else.
    pub fallback_route: Option<String>,
}

/// Top-level notification runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Tap navigation settings.
    pub navigation: NavigationConfig,
    /// Renderer start-up settings.
    pub renderer: RendererSettings,
    /// Channel notifications are posted to on channel-based platforms.
    pub channel: ChannelSettings,
    /// OS presentation of pushes received in the foreground.
    pub foreground: ForegroundPresentation,
    /// Mirror foreground pushes as local banners.
    pub show_foreground_banners: bool,
    /// Prefix of derived action-category identifiers.
    pub category_prefix: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            navigation: NavigationConfig::default(),
            renderer: RendererSettings::default(),
            channel: ChannelSettings::default(),
            foreground: ForegroundPresentation::default(),
            show_foreground_banners: true,
            category_prefix: DEFAULT_CATEGORY_PREFIX.to_string(),
        }
    }
}

impl NotifyConfig {
    /// Parses and validates config from JSON text; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::InvalidCategoryPrefix`] for an unusable category prefix.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks invariants that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCategoryPrefix`] for an unusable category prefix.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix_ok = !self.category_prefix.is_empty()
            && self
                .category_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if prefix_ok {
            Ok(())
        } else {
            Err(ConfigError::InvalidCategoryPrefix(
                self.category_prefix.clone(),
            ))
        }
    }

    /// Adds a `type` → route mapping.
    #[must_use]
    pub fn with_type_route(mut self, kind: impl Into<String>, route: impl Into<String>) -> Self {
        self.navigation.type_routes.insert(kind.into(), route.into());
        self
    }

    /// Sets the fallback route.
    #[must_use]
    pub fn with_fallback_route(mut self, route: impl Into<String>) -> Self {
        self.navigation.fallback_route = Some(route.into());
        self
    }
}

//! Overlay plugin configuration
//!
//! Sources, lowest priority first: defaults, `fob.overlay.toml` (or the file
//! passed to [`OverlayConfig::load`]), then `FOB_OVERLAY_*` environment
//! variables.

use crate::dev_server::DEV_SERVER_TAP;
use crate::error::Result;
use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "fob.overlay.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Name of the dev server's `done` tap to hold back and replay.
    #[serde(default = "default_dev_server_tap")]
    pub dev_server_tap: String,

    /// Warn once at construction when the checker runs synchronously.
    #[serde(default = "default_true")]
    pub warn_when_inert: bool,

    /// Count error-severity lints as checker errors.
    #[serde(default = "default_true")]
    pub lint_errors_block: bool,
}

fn default_dev_server_tap() -> String {
    DEV_SERVER_TAP.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            dev_server_tap: default_dev_server_tap(),
            warn_when_inert: true,
            lint_errors_block: true,
        }
    }
}

impl OverlayConfig {
    /// Load configuration from file and environment on top of defaults.
    ///
    /// `.json` paths are read as JSON, anything else as TOML. Without a path,
    /// [`DEFAULT_CONFIG_FILE`] is used if it exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        let config_file = path.map(Path::to_path_buf).or_else(|| {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            default_path.exists().then(|| default_path.to_path_buf())
        });

        if let Some(file) = config_file {
            let is_json = file.extension().is_some_and(|ext| ext == "json");
            figment = if is_json {
                figment.merge(Json::file(file))
            } else {
                figment.merge(Toml::file(file))
            };
        }

        // FOB_OVERLAY_DEV_SERVER_TAP, FOB_OVERLAY_WARN_WHEN_INERT, ...
        figment = figment.merge(Env::prefixed("FOB_OVERLAY_"));

        Ok(figment.extract()?)
    }

    pub fn with_dev_server_tap(mut self, name: impl Into<String>) -> Self {
        self.dev_server_tap = name.into();
        self
    }

    pub fn with_warn_when_inert(mut self, enabled: bool) -> Self {
        self.warn_when_inert = enabled;
        self
    }

    pub fn with_lint_errors_block(mut self, enabled: bool) -> Self {
        self.lint_errors_block = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OverlayConfig::default();
        assert_eq!(config.dev_server_tap, "fob-dev-server");
        assert!(config.warn_when_inert);
        assert!(config.lint_errors_block);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: OverlayConfig = toml::from_str("lint_errors_block = false").unwrap();
        assert!(!config.lint_errors_block);
        assert_eq!(config.dev_server_tap, "fob-dev-server");
    }
}

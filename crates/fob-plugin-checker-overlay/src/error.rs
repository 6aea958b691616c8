//! Error types for the checker overlay plugin

use fob_hooks::{HookError, TapKind};
use miette::Diagnostic;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OverlayError>;

/// Errors raised while setting up or running the overlay plugin
#[derive(Error, Debug, Diagnostic)]
pub enum OverlayError {
    /// No checker handle in the options
    #[error("Please pass checker to {plugin}.")]
    #[diagnostic(
        code(fob::checker_overlay::missing_checker),
        help("Construct the plugin with CheckerOverlayOptions::new(checker)")
    )]
    MissingChecker { plugin: &'static str },

    /// The dev server's `done` tap is no longer sync
    #[error("{tap}'s done tap is not sync (found {kind}). Please update logic of this plugin.")]
    #[diagnostic(
        code(fob::checker_overlay::dev_server_tap_not_sync),
        help("The overlay replays the dev server's done listener directly and needs it to be sync")
    )]
    DevServerTapNotSync { tap: String, kind: TapKind },

    /// Configuration could not be loaded
    #[error("Invalid overlay configuration: {0}")]
    #[diagnostic(
        code(fob::checker_overlay::config),
        help("Check fob.overlay.toml and FOB_OVERLAY_* environment variables")
    )]
    Config(#[from] Box<figment::Error>),

    /// Registering or calling a hook failed
    #[error(transparent)]
    #[diagnostic(transparent)]
    Hook(#[from] HookError),
}

impl From<figment::Error> for OverlayError {
    fn from(err: figment::Error) -> Self {
        OverlayError::Config(Box::new(err))
    }
}

impl OverlayError {
    pub fn dev_server_tap_not_sync(tap: impl Into<String>, kind: TapKind) -> Self {
        Self::DevServerTapNotSync {
            tap: tap.into(),
            kind,
        }
    }
}

//! Error types for hook registration and dispatch

use crate::tap::TapKind;
use miette::Diagnostic;
use thiserror::Error;

/// Boxed error carried from interceptors and failing taps.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, HookError>;

/// Errors raised while registering or calling taps
#[derive(Error, Debug, Diagnostic)]
pub enum HookError {
    /// A host declared a tap with a kind name we don't recognize
    #[error("Unknown tap type: {0}")]
    #[diagnostic(
        code(fob::hooks::unknown_tap_kind),
        help("Taps must be declared as 'sync', 'async' or 'promise'")
    )]
    UnknownTapKind(String),

    /// Declared kind and listener disagree
    #[error("Tap '{tap}' is declared as {declared} but its listener is {actual}")]
    #[diagnostic(code(fob::hooks::kind_mismatch))]
    KindMismatch {
        tap: String,
        declared: TapKind,
        actual: TapKind,
    },

    /// Non-sync tap registered on a sync hook
    #[error("Hook '{hook}' only accepts sync taps, '{tap}' is {kind}")]
    #[diagnostic(
        code(fob::hooks::kind_not_supported),
        help("Register the listener with `tap` instead of `tap_async`/`tap_promise`")
    )]
    KindNotSupported {
        hook: &'static str,
        tap: String,
        kind: TapKind,
    },

    /// A non-sync tap was invoked synchronously
    #[error("Tap '{tap}' is {kind} and cannot be called synchronously")]
    #[diagnostic(code(fob::hooks::not_sync))]
    NotSync { tap: String, kind: TapKind },

    /// An interceptor refused a tap at registration
    #[error("Interceptor on hook '{hook}' rejected tap '{tap}': {source}")]
    #[diagnostic(code(fob::hooks::interceptor))]
    Interceptor {
        hook: &'static str,
        tap: String,
        #[source]
        source: BoxError,
    },

    /// A callback or promise tap completed with an error
    #[error("Tap '{tap}' on hook '{hook}' failed: {source}")]
    #[diagnostic(code(fob::hooks::tap_failed))]
    TapFailed {
        hook: &'static str,
        tap: String,
        #[source]
        source: BoxError,
    },

    /// A callback tap dropped its completion without calling it
    #[error("Tap '{tap}' on hook '{hook}' dropped its completion callback")]
    #[diagnostic(
        code(fob::hooks::callback_dropped),
        help("Callback taps must call their completion exactly once")
    )]
    CallbackDropped { hook: &'static str, tap: String },
}

impl HookError {
    /// Downcast the error an interceptor or tap failed with.
    pub fn source_as<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            HookError::Interceptor { source, .. } | HookError::TapFailed { source, .. } => {
                source.downcast_ref::<E>()
            }
            _ => None,
        }
    }
}

//! The overlay coordinator.
//!
//! With an asynchronous checker in a watch session, the compiler's `done`
//! fires before type-check results exist. Left alone, the dev server treats
//! that as "all clear", dismisses the overlay, and the checker's errors never
//! reach the browser. The coordinator holds the dev server's `done` listener
//! back and replays it once both the build has finished and the checker has
//! reported errors for the same cycle.

use crate::checker::{CompletionNotifier, TypeChecker};
use crate::config::OverlayConfig;
use crate::diagnostic::CheckerReport;
use crate::error::{OverlayError, Result};
use fob_hooks::{BoxError, Compilation, Compiler, Plugin, Stats, Tap, TapKind};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{debug, error, warn};

pub const PLUGIN_NAME: &str = "fob-checker-overlay";

/// Construction options.
#[derive(Clone, Default)]
pub struct CheckerOverlayOptions {
    /// Required.
    pub checker: Option<Arc<dyn TypeChecker>>,
    pub config: OverlayConfig,
}

impl CheckerOverlayOptions {
    pub fn new(checker: Arc<dyn TypeChecker>) -> Self {
        Self {
            checker: Some(checker),
            config: OverlayConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OverlayConfig) -> Self {
        self.config = config;
        self
    }
}

/// Per-cycle gate. The dev server is notified only when both are set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordinatorState {
    checker_done: bool,
    last_stats: Option<Stats>,
}

impl CoordinatorState {
    /// Checker reported errors this cycle.
    pub fn checker_done(&self) -> bool {
        self.checker_done
    }

    /// Stats of this cycle's `done`, once it has fired.
    pub fn last_stats(&self) -> Option<&Stats> {
        self.last_stats.as_ref()
    }

    fn ready(&self) -> Option<Stats> {
        if self.checker_done {
            self.last_stats.clone()
        } else {
            None
        }
    }
}

struct Shared {
    checker: Arc<dyn TypeChecker>,
    config: OverlayConfig,
    state: Mutex<CoordinatorState>,
    dev_server_taps: Mutex<Vec<Tap<Stats>>>,
}

impl Shared {
    fn is_async(&self) -> bool {
        self.checker.is_watching() && self.checker.is_async()
    }

    fn maybe_notify(&self) {
        let Some(stats) = self.state.lock().ready() else {
            return;
        };
        let taps = self.dev_server_taps.lock().clone();
        debug!(hash = stats.hash(), listeners = taps.len(), "replaying dev server done");
        for tap in taps {
            if let Err(err) = tap.call_sync(&stats) {
                error!(tap = tap.name(), error = %err, "dev server done replay failed");
            }
        }
    }

    fn on_checker_done(&self, report: &CheckerReport) {
        if !report.has_errors(self.config.lint_errors_block) {
            debug!("checker finished without errors");
            return;
        }
        self.state.lock().checker_done = true;

        match self.checker.emit_callback() {
            Some(callback) => {
                if let Err(err) = callback() {
                    error!(error = %err, "checker emit callback failed");
                }
            }
            None => self.maybe_notify(),
        }
    }
}

/// Holds back the dev server's `done` until asynchronous type-check errors
/// are known.
///
/// Register it with [`plugins`](Self::plugins), which puts the checker first:
/// the coordinator has to see the checker's taps.
#[derive(Clone)]
pub struct CheckerOverlayPlugin {
    shared: Arc<Shared>,
}

impl CheckerOverlayPlugin {
    /// Build the plugin around `options.checker`.
    ///
    /// Fails with [`OverlayError::MissingChecker`] when no checker is given.
    /// A checker without async mode is accepted, with a warning that the
    /// plugin will do nothing.
    ///
    /// ```
    /// use fob_plugin_checker_overlay::{
    ///     BackgroundChecker, CheckerOverlayOptions, CheckerOverlayPlugin, OverlayError,
    /// };
    /// use std::sync::Arc;
    ///
    /// let err = CheckerOverlayPlugin::new(CheckerOverlayOptions::default()).err();
    /// assert!(matches!(err, Some(OverlayError::MissingChecker { .. })));
    ///
    /// let checker = Arc::new(BackgroundChecker::asynchronous());
    /// let plugin = CheckerOverlayPlugin::new(CheckerOverlayOptions::new(checker)).unwrap();
    /// assert_eq!(plugin.plugins().len(), 2);
    /// ```
    pub fn new(options: CheckerOverlayOptions) -> Result<Self> {
        let checker = options.checker.ok_or(OverlayError::MissingChecker {
            plugin: PLUGIN_NAME,
        })?;

        if !checker.is_async() && options.config.warn_when_inert {
            warn!(
                plugin = PLUGIN_NAME,
                checker = checker.name(),
                "async mode of the type checker is disabled, {PLUGIN_NAME} does nothing"
            );
        }

        Ok(Self {
            shared: Arc::new(Shared {
                checker,
                config: options.config,
                state: Mutex::new(CoordinatorState::default()),
                dev_server_taps: Mutex::new(Vec::new()),
            }),
        })
    }

    /// The checker followed by this plugin, in registration order.
    pub fn plugins(&self) -> Vec<Arc<dyn Plugin>> {
        vec![
            Arc::new(CheckerPlugin(Arc::clone(&self.shared.checker))),
            Arc::new(self.clone()),
        ]
    }

    /// The checker whose reports gate the dev server.
    pub fn checker(&self) -> &Arc<dyn TypeChecker> {
        &self.shared.checker
    }

    /// Configuration the plugin was built with.
    pub fn config(&self) -> &OverlayConfig {
        &self.shared.config
    }

    /// Whether the checker is currently reporting after the build.
    pub fn is_async(&self) -> bool {
        self.shared.is_async()
    }

    /// Snapshot of the current cycle's gate.
    pub fn state(&self) -> CoordinatorState {
        self.shared.state.lock().clone()
    }

    /// Number of dev server `done` listeners held for replay.
    pub fn captured_listeners(&self) -> usize {
        self.shared.dev_server_taps.lock().len()
    }

    fn capture_dev_server_tap(
        shared: &Arc<Shared>,
        tap: Tap<Stats>,
    ) -> std::result::Result<Tap<Stats>, BoxError> {
        if tap.name() != shared.config.dev_server_tap {
            return Ok(tap);
        }
        if tap.kind() != TapKind::Sync {
            return Err(Box::new(OverlayError::dev_server_tap_not_sync(
                tap.name(),
                tap.kind(),
            )));
        }

        debug!(tap = tap.name(), "capturing dev server done listener");
        shared.dev_server_taps.lock().push(tap.clone());

        // Without async mode it fires at the build's own `done`. In async mode
        // only replays reach it, so clean async cycles never notify the server.
        let gate = Arc::clone(shared);
        Ok(tap.with_guard(move || !gate.is_async()))
    }
}

impl Plugin for CheckerOverlayPlugin {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn apply(&self, compiler: &Compiler) -> fob_hooks::Result<()> {
        let shared = Arc::clone(&self.shared);
        compiler
            .hooks
            .done
            .intercept(move |tap: Tap<Stats>| Self::capture_dev_server_tap(&shared, tap))?;

        let shared = Arc::clone(&self.shared);
        compiler.hooks.compile.tap(PLUGIN_NAME, move |_| {
            *shared.state.lock() = CoordinatorState::default();
        })?;

        let shared = Arc::clone(&self.shared);
        compiler
            .hooks
            .emit
            .tap(PLUGIN_NAME, move |compilation: &Compilation| {
                if !shared.is_async() {
                    return;
                }
                let weak = Arc::downgrade(&shared);
                let notify: CompletionNotifier = Arc::new(move || {
                    if let Some(shared) = weak.upgrade() {
                        shared.maybe_notify();
                    }
                });
                let callback = shared
                    .checker
                    .create_emit_callback(compilation.clone(), notify);
                shared.checker.set_emit_callback(callback);
            })?;

        // The checker's own emit listeners would record results too early;
        // in async mode that work is left to the callback installed above.
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        self.shared
            .checker
            .hooks()
            .emit
            .intercept(move |tap: Tap<CheckerReport>| -> std::result::Result<_, BoxError> {
                let weak = weak.clone();
                Ok(tap.with_guard(move || weak.upgrade().is_none_or(|shared| !shared.is_async())))
            })?;

        let shared = Arc::clone(&self.shared);
        compiler.hooks.done.tap(PLUGIN_NAME, move |stats: &Stats| {
            if !shared.is_async() {
                return;
            }
            shared.state.lock().last_stats = Some(stats.clone());
            shared.maybe_notify();
        })?;

        let weak = Arc::downgrade(&self.shared);
        self.shared
            .checker
            .hooks()
            .done
            .tap(PLUGIN_NAME, move |report: &CheckerReport| {
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                if shared.is_async() {
                    shared.on_checker_done(report);
                }
            })?;

        Ok(())
    }
}

/// Registers the checker through the coordinator's plugin list.
struct CheckerPlugin(Arc<dyn TypeChecker>);

impl Plugin for CheckerPlugin {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn apply(&self, compiler: &Compiler) -> fob_hooks::Result<()> {
        self.0.apply(compiler)
    }
}

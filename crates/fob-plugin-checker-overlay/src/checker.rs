//! The type-checker collaborator.
//!
//! [`TypeChecker`] is the surface the overlay plugin drives. The checker
//! runs out of band and reports back through its own `emit` and `done`
//! hooks; its pending emit callback is what records diagnostics onto the
//! compilation.
//!
//! [`BackgroundChecker`] implements that protocol for hosts whose checking
//! worker lives elsewhere (a child process, a thread pool): the worker calls
//! [`BackgroundChecker::report`] with the cycle it checked when a run
//! finishes. Reports for a cycle that has already been superseded are
//! dropped; reports for a cycle that has not started yet are held until its
//! `compile`.

use crate::diagnostic::CheckerReport;
use fob_hooks::{Compilation, Compiler, Completion, Hook, Plugin, Stats};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error};

/// Deferred "record results onto the compilation" step.
pub type EmitCallback = Arc<dyn Fn() -> fob_hooks::Result<()> + Send + Sync>;

/// Called once an emit callback has finished its work.
pub type CompletionNotifier = Arc<dyn Fn() + Send + Sync>;

/// Hooks the checker fires with each report.
#[derive(Debug)]
pub struct CheckerHooks {
    pub emit: Hook<CheckerReport>,
    pub done: Hook<CheckerReport>,
}

impl Default for CheckerHooks {
    fn default() -> Self {
        Self {
            emit: Hook::sync("checker_emit"),
            done: Hook::sync("checker_done"),
        }
    }
}

/// A type checker that reports independently of the compiler's own events.
pub trait TypeChecker: Plugin {
    /// Whether results are reported after `done` instead of blocking `emit`.
    fn is_async(&self) -> bool;

    /// Whether a watch session is active.
    fn is_watching(&self) -> bool;

    /// The pending emit callback, if one is installed.
    fn emit_callback(&self) -> Option<EmitCallback>;

    fn set_emit_callback(&self, callback: EmitCallback);

    /// Build an emit callback bound to `compilation` that runs
    /// `on_complete` when done.
    fn create_emit_callback(
        &self,
        compilation: Compilation,
        on_complete: CompletionNotifier,
    ) -> EmitCallback;

    fn hooks(&self) -> &CheckerHooks;
}

const CHECKER_NAME: &str = "fob-type-checker";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckerOptions {
    /// Report after the build instead of holding `emit` until results arrive.
    #[serde(default = "default_async")]
    pub async_mode: bool,
}

fn default_async() -> bool {
    true
}

impl Default for CheckerOptions {
    fn default() -> Self {
        Self {
            async_mode: default_async(),
        }
    }
}

#[derive(Default)]
struct CheckState {
    /// Cycle of the latest `compile`; 0 before the first one.
    cycle: u64,
    /// Results for `cycle`.
    report: Option<CheckerReport>,
    /// Results that arrived ahead of their cycle's `compile`.
    upcoming: Option<(u64, CheckerReport)>,
    compilation_done: bool,
}

impl CheckState {
    fn start_cycle(&mut self, cycle: u64) {
        self.cycle = cycle;
        self.compilation_done = false;
        self.report = None;
        match self.upcoming.take() {
            Some((pending, report)) if pending == cycle => self.report = Some(report),
            Some(ahead) if ahead.0 > cycle => self.upcoming = Some(ahead),
            _ => {}
        }
    }
}

struct CheckerInner {
    options: CheckerOptions,
    hooks: CheckerHooks,
    watching: AtomicBool,
    state: Mutex<CheckState>,
    emit_callback: Mutex<Option<EmitCallback>>,
}

impl CheckerInner {
    fn reports_after_build(&self) -> bool {
        self.options.async_mode && self.watching.load(Ordering::SeqCst)
    }

    fn run_emit_callback(&self) {
        let callback = self.emit_callback.lock().clone();
        if let Some(callback) = callback {
            if let Err(err) = callback() {
                error!(error = %err, "checker emit callback failed");
            }
        }
    }

    fn fire_done(&self, report: &CheckerReport) {
        debug!(
            errors = report.error_count(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "checker done"
        );
        if let Err(err) = self.hooks.done.call(report) {
            error!(error = %err, "checker done hook failed");
        }
    }
}

/// Checker fed by an external worker through [`report`](Self::report).
#[derive(Clone)]
pub struct BackgroundChecker {
    inner: Arc<CheckerInner>,
}

impl BackgroundChecker {
    pub fn new(options: CheckerOptions) -> Self {
        Self {
            inner: Arc::new(CheckerInner {
                options,
                hooks: CheckerHooks::default(),
                watching: AtomicBool::new(false),
                state: Mutex::new(CheckState::default()),
                emit_callback: Mutex::new(None),
            }),
        }
    }

    /// Checker that reports after the build in watch sessions.
    pub fn asynchronous() -> Self {
        Self::new(CheckerOptions { async_mode: true })
    }

    /// Checker that holds `emit` until results arrive.
    pub fn synchronous() -> Self {
        Self::new(CheckerOptions { async_mode: false })
    }

    pub fn options(&self) -> &CheckerOptions {
        &self.inner.options
    }

    /// Deliver the results of checking `cycle`.
    ///
    /// If the build already reached the point where results are consumed,
    /// they are consumed now: in async watch mode the checker `done` hook
    /// fires, otherwise the pending emit callback runs and releases `emit`.
    /// Results for an earlier cycle are discarded; results for a cycle whose
    /// `compile` has not run yet are held until it does.
    pub fn report(&self, cycle: u64, report: CheckerReport) {
        let compilation_done = {
            let mut state = self.inner.state.lock();
            if cycle < state.cycle {
                debug!(cycle, current = state.cycle, "dropping stale checker report");
                return;
            }
            if cycle > state.cycle {
                debug!(cycle, current = state.cycle, "holding checker report for upcoming cycle");
                state.upcoming = Some((cycle, report));
                return;
            }
            state.report = Some(report.clone());
            state.compilation_done
        };
        debug!(cycle, compilation_done, errors = report.error_count(), "checker report received");

        if !compilation_done {
            return;
        }
        if self.inner.reports_after_build() {
            self.inner.fire_done(&report);
        } else {
            self.inner.run_emit_callback();
        }
    }

    /// Results of the current cycle, if they have arrived.
    pub fn last_report(&self) -> Option<CheckerReport> {
        self.inner.state.lock().report.clone()
    }

    /// Cycle of the latest `compile`, 0 before the first one.
    pub fn current_cycle(&self) -> u64 {
        self.inner.state.lock().cycle
    }
}

impl Default for BackgroundChecker {
    fn default() -> Self {
        Self::new(CheckerOptions::default())
    }
}

impl Plugin for BackgroundChecker {
    fn name(&self) -> &'static str {
        CHECKER_NAME
    }

    fn apply(&self, compiler: &Compiler) -> fob_hooks::Result<()> {
        let inner = Arc::clone(&self.inner);
        compiler.hooks.watch_run.tap(CHECKER_NAME, move |_| {
            inner.watching.store(true, Ordering::SeqCst);
        })?;

        let inner = Arc::clone(&self.inner);
        compiler.hooks.compile.tap(CHECKER_NAME, move |cycle: &u64| {
            inner.state.lock().start_cycle(*cycle);
        })?;

        let checker = self.clone();
        compiler
            .hooks
            .emit
            .tap_async(CHECKER_NAME, move |compilation, done: Completion| {
                let inner = &checker.inner;
                if inner.reports_after_build() {
                    done(Ok(()));
                    return;
                }

                let done = Mutex::new(Some(done));
                let release: CompletionNotifier = Arc::new(move || {
                    if let Some(done) = done.lock().take() {
                        done(Ok(()));
                    }
                });
                let callback = checker.create_emit_callback(compilation.clone(), release);
                checker.set_emit_callback(callback);

                let has_report = {
                    let mut state = inner.state.lock();
                    state.compilation_done = true;
                    state.report.is_some()
                };
                if has_report {
                    inner.run_emit_callback();
                }
            })?;

        let inner = Arc::clone(&self.inner);
        compiler.hooks.done.tap(CHECKER_NAME, move |_: &Stats| {
            if !inner.reports_after_build() {
                return;
            }
            let report = {
                let mut state = inner.state.lock();
                state.compilation_done = true;
                state.report.clone()
            };
            if let Some(report) = report {
                inner.fire_done(&report);
            }
        })?;

        Ok(())
    }
}

impl TypeChecker for BackgroundChecker {
    fn is_async(&self) -> bool {
        self.inner.options.async_mode
    }

    fn is_watching(&self) -> bool {
        self.inner.watching.load(Ordering::SeqCst)
    }

    fn emit_callback(&self) -> Option<EmitCallback> {
        self.inner.emit_callback.lock().clone()
    }

    fn set_emit_callback(&self, callback: EmitCallback) {
        *self.inner.emit_callback.lock() = Some(callback);
    }

    /// Errors go to `compilation.errors`, everything else to `warnings`;
    /// then the checker `emit` hook fires and `on_complete` runs. Results are
    /// recorded at most once per callback.
    fn create_emit_callback(
        &self,
        compilation: Compilation,
        on_complete: CompletionNotifier,
    ) -> EmitCallback {
        // Weak: the callback is stored inside the checker it points to.
        let inner: Weak<CheckerInner> = Arc::downgrade(&self.inner);
        let recorded = AtomicBool::new(false);

        Arc::new(move || {
            let Some(inner) = inner.upgrade() else {
                return Ok(());
            };
            let report = {
                let state = inner.state.lock();
                // A later cycle's results never land on this compilation.
                if state.cycle == compilation.cycle() {
                    state.report.clone()
                } else {
                    None
                }
            };

            if let Some(report) = report {
                if !recorded.swap(true, Ordering::SeqCst) {
                    for message in report.messages() {
                        if message.is_error_severity() {
                            compilation.push_error(message.to_string());
                        } else {
                            compilation.push_warning(message.to_string());
                        }
                    }
                }
                inner.hooks.emit.call(&report)?;
            }

            on_complete();
            Ok(())
        })
    }

    fn hooks(&self) -> &CheckerHooks {
        &self.inner.hooks
    }
}

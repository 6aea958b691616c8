//! Shared test utilities for checker overlay tests
//!
//! Builds a watching compiler with a background checker, optionally the
//! overlay plugin, and a stand-in dev server listener that records every
//! stats snapshot it is called with.

#![allow(dead_code)]

use fob_hooks::{Compiler, Plugin, Stats};
use fob_plugin_checker_overlay::{
    BackgroundChecker, CheckerOptions, CheckerOverlayOptions, CheckerOverlayPlugin, CheckerReport,
    DEV_SERVER_TAP, Diagnostic,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

pub struct Harness {
    pub compiler: Compiler,
    pub checker: BackgroundChecker,
    pub overlay: Option<CheckerOverlayPlugin>,
    /// Stats passed to the dev server listener, in call order
    pub calls: Arc<Mutex<Vec<Stats>>>,
}

impl Harness {
    /// Watching compiler, checker in the given mode, overlay installed.
    pub fn with_overlay(async_mode: bool) -> Self {
        Self::build(Compiler::watching(), async_mode, true)
    }

    /// Same setup without the overlay plugin.
    pub fn without_overlay(async_mode: bool) -> Self {
        Self::build(Compiler::watching(), async_mode, false)
    }

    pub fn build(compiler: Compiler, async_mode: bool, overlay: bool) -> Self {
        // RUST_LOG=debug shows the coordinator's transitions.
        fob_hooks::logging::init_logging_from_env();
        let checker = BackgroundChecker::new(CheckerOptions { async_mode });

        let overlay = if overlay {
            let plugin =
                CheckerOverlayPlugin::new(CheckerOverlayOptions::new(Arc::new(checker.clone())))
                    .expect("overlay plugin");
            compiler
                .apply_plugins(plugin.plugins())
                .expect("plugins apply");
            Some(plugin)
        } else {
            compiler
                .apply_plugins([Arc::new(checker.clone()) as Arc<dyn Plugin>])
                .expect("checker applies");
            None
        };

        let calls = record_dev_server(&compiler);

        Self {
            compiler,
            checker,
            overlay,
            calls,
        }
    }

    pub fn overlay(&self) -> &CheckerOverlayPlugin {
        self.overlay.as_ref().expect("harness built with overlay")
    }

    /// Run one cycle and deliver `report` the way the checker's worker would:
    /// after the build when the checker reports late, during `emit`
    /// otherwise.
    pub async fn cycle(&self, report: CheckerReport) -> Stats {
        let reports_late =
            self.checker.options().async_mode && self.compiler.is_watch_mode();

        if reports_late {
            let stats = self.compiler.run_cycle().await.expect("cycle runs");
            self.checker.report(stats.compilation().cycle(), report);
            return stats;
        }

        let worker = self.checker.clone();
        let cycle = self.compiler.cycles() + 1;
        let handle = tokio::spawn(async move { worker.report(cycle, report) });
        let stats = self.compiler.run_cycle().await.expect("cycle runs");
        handle.await.expect("worker finished");
        stats
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn called_with(&self) -> Vec<Stats> {
        self.calls.lock().clone()
    }
}

/// Register a sync `done` listener under the dev server's name.
pub fn record_dev_server(compiler: &Compiler) -> Arc<Mutex<Vec<Stats>>> {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    compiler
        .hooks
        .done
        .tap(DEV_SERVER_TAP, move |stats: &Stats| sink.lock().push(stats.clone()))
        .expect("dev server listener registers");
    calls
}

pub fn clean_report() -> CheckerReport {
    CheckerReport::new(
        vec![Diagnostic::warning("'x' is declared but its value is never read.").with_code("TS6133")],
        vec![],
        Duration::from_millis(25),
    )
}

pub fn failing_report() -> CheckerReport {
    CheckerReport::new(
        vec![
            Diagnostic::error("Type 'string' is not assignable to type 'number'.")
                .with_code("TS2322")
                .with_file("src/index.ts")
                .at(4, 9),
        ],
        vec![],
        Duration::from_millis(30),
    )
}

pub fn lint_only_failing_report() -> CheckerReport {
    CheckerReport::new(
        vec![],
        vec![Diagnostic::error("Unexpected any.").with_code("no-explicit-any")],
        Duration::from_millis(8),
    )
}

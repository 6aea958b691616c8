//! Property tests over random sequences of watch cycles.
//!
//! Each cycle is described by whether the checker finds errors and whether
//! its report lands before or after the build's `done`.

mod helpers;

use fob_hooks::{Compilation, Stats};
use fob_plugin_checker_overlay::{CheckerReport, CoordinatorState};
use helpers::{Harness, clean_report, failing_report};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
struct CycleOutcome {
    has_errors: bool,
    report_before_done: bool,
}

fn outcomes_strategy() -> impl Strategy<Value = Vec<CycleOutcome>> {
    prop::collection::vec(
        (any::<bool>(), any::<bool>()).prop_map(|(has_errors, report_before_done)| CycleOutcome {
            has_errors,
            report_before_done,
        }),
        1..12,
    )
}

fn report_for(outcome: CycleOutcome) -> CheckerReport {
    if outcome.has_errors {
        failing_report()
    } else {
        clean_report()
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The dev server sees exactly the erroring cycles, once each, in order,
    /// and always with that cycle's own stats.
    #[test]
    fn prop_async_notifies_once_per_erroring_cycle(outcomes in outcomes_strategy()) {
        runtime().block_on(async {
            let harness = Harness::with_overlay(true);

            // Reports that should land during `emit`, before `done`.
            let pending: Arc<Mutex<Option<CheckerReport>>> = Arc::new(Mutex::new(None));
            let slot = Arc::clone(&pending);
            let worker = harness.checker.clone();
            harness
                .compiler
                .hooks
                .emit
                .tap("early-worker", move |compilation: &Compilation| {
                    if let Some(report) = slot.lock().take() {
                        worker.report(compilation.cycle(), report);
                    }
                })
                .unwrap();

            let overlay = harness.overlay().clone();
            let resets = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&resets);
            harness
                .compiler
                .hooks
                .compile
                .tap("probe", move |_| sink.lock().push(overlay.state()))
                .unwrap();

            let mut expected: Vec<Stats> = Vec::new();
            for outcome in &outcomes {
                let report = report_for(*outcome);
                let stats = if outcome.report_before_done {
                    *pending.lock() = Some(report);
                    harness.compiler.run_cycle().await.unwrap()
                } else {
                    let stats = harness.compiler.run_cycle().await.unwrap();
                    harness.checker.report(stats.compilation().cycle(), report);
                    stats
                };

                prop_assert_eq!(stats.has_errors(), outcome.has_errors);
                if outcome.has_errors {
                    expected.push(stats);
                }
            }

            prop_assert_eq!(harness.called_with(), expected);

            let resets = resets.lock();
            prop_assert_eq!(resets.len(), outcomes.len());
            prop_assert!(resets.iter().all(|state| *state == CoordinatorState::default()));
            Ok(())
        })?;
    }

    /// With a synchronous checker the overlay changes nothing: one call per
    /// cycle, whatever the report says.
    #[test]
    fn prop_sync_mode_is_transparent(outcomes in outcomes_strategy()) {
        runtime().block_on(async {
            let harness = Harness::with_overlay(false);

            for outcome in &outcomes {
                let stats = harness.cycle(report_for(*outcome)).await;
                let calls = harness.called_with();
                prop_assert_eq!(calls.last(), Some(&stats));
                prop_assert_eq!(stats.has_errors(), outcome.has_errors);
            }

            prop_assert_eq!(harness.call_count(), outcomes.len());
            prop_assert_eq!(harness.overlay().state(), CoordinatorState::default());
            Ok(())
        })?;
    }
}

//! The compiler host: lifecycle hooks and the driver that fires them.

use crate::compilation::{Compilation, Stats};
use crate::error::Result;
use crate::hook::Hook;
use crate::plugin::Plugin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::debug;

/// Lifecycle hooks exposed to plugins.
#[derive(Debug)]
pub struct CompilerHooks {
    /// Before each cycle of a watch session.
    pub watch_run: Hook<()>,
    /// Start of every cycle, with the cycle number.
    pub compile: Hook<u64>,
    /// Output is ready to be written.
    pub emit: Hook<Compilation>,
    /// Cycle finished.
    pub done: Hook<Stats>,
}

impl Default for CompilerHooks {
    fn default() -> Self {
        Self {
            watch_run: Hook::async_series("watch_run"),
            compile: Hook::sync("compile"),
            emit: Hook::async_series("emit"),
            done: Hook::async_series("done"),
        }
    }
}

/// Delivers lifecycle events to plugins, one cycle at a time.
#[derive(Debug, Default)]
pub struct Compiler {
    pub hooks: CompilerHooks,
    watch: bool,
    cycle: AtomicU64,
}

impl Compiler {
    /// Compiler for one-shot builds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiler for a watch session; every cycle starts with `watch_run`.
    pub fn watching() -> Self {
        Self {
            watch: true,
            ..Self::default()
        }
    }

    pub fn is_watch_mode(&self) -> bool {
        self.watch
    }

    /// Apply plugins in order. Stops at the first plugin that fails.
    pub fn apply_plugins<I>(&self, plugins: I) -> Result<()>
    where
        I: IntoIterator<Item = Arc<dyn Plugin>>,
    {
        for plugin in plugins {
            debug!(plugin = plugin.name(), "applying plugin");
            plugin.apply(self)?;
        }
        Ok(())
    }

    /// Run one cycle with nothing to build.
    pub async fn run_cycle(&self) -> Result<Stats> {
        self.run_cycle_with(|_| {}).await
    }

    /// Run one cycle: `watch_run` (watch mode), `compile`, `build`, `emit`,
    /// `done`. `build` stands in for the work between compile and emit and
    /// may record errors or assets on the compilation.
    pub async fn run_cycle_with<F>(&self, build: F) -> Result<Stats>
    where
        F: FnOnce(&Compilation),
    {
        let started_at = Instant::now();
        let cycle = self.cycle.fetch_add(1, Ordering::SeqCst) + 1;

        if self.watch {
            self.hooks.watch_run.call_async(&()).await?;
        }

        debug!(cycle, "compile");
        self.hooks.compile.call(&cycle)?;

        let compilation = Compilation::new(cycle);
        build(&compilation);

        self.hooks.emit.call_async(&compilation).await?;

        let stats = Stats::new(format!("{cycle:08x}"), compilation, started_at);
        debug!(cycle, hash = stats.hash(), errors = stats.has_errors(), "done");
        self.hooks.done.call_async(&stats).await?;

        Ok(stats)
    }

    /// Number of cycles started so far.
    pub fn cycles(&self) -> u64 {
        self.cycle.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tap::Completion;
    use parking_lot::Mutex;

    struct Recorder {
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Plugin for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn apply(&self, compiler: &Compiler) -> Result<()> {
            let log = Arc::clone(&self.log);
            compiler.hooks.watch_run.tap(self.name(), move |_| {
                log.lock().push("watch_run")
            })?;
            let log = Arc::clone(&self.log);
            compiler
                .hooks
                .compile
                .tap(self.name(), move |_| log.lock().push("compile"))?;
            let log = Arc::clone(&self.log);
            compiler
                .hooks
                .emit
                .tap_async(self.name(), move |_, done: Completion| {
                    log.lock().push("emit");
                    done(Ok(()))
                })?;
            let log = Arc::clone(&self.log);
            compiler
                .hooks
                .done
                .tap(self.name(), move |_| log.lock().push("done"))?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_cycle_fires_hooks_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let compiler = Compiler::new();
        compiler
            .apply_plugins([Arc::new(Recorder {
                log: Arc::clone(&log),
            }) as Arc<dyn Plugin>])
            .unwrap();

        let stats = compiler.run_cycle().await.unwrap();
        assert_eq!(*log.lock(), vec!["compile", "emit", "done"]);
        assert_eq!(stats.compilation().cycle(), 1);
    }

    #[tokio::test]
    async fn test_watch_cycle_starts_with_watch_run() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let compiler = Compiler::watching();
        compiler
            .apply_plugins([Arc::new(Recorder {
                log: Arc::clone(&log),
            }) as Arc<dyn Plugin>])
            .unwrap();

        compiler.run_cycle().await.unwrap();
        compiler.run_cycle().await.unwrap();
        assert_eq!(
            *log.lock(),
            vec![
                "watch_run", "compile", "emit", "done", "watch_run", "compile", "emit", "done"
            ]
        );
        assert_eq!(compiler.cycles(), 2);
    }

    #[tokio::test]
    async fn test_compile_receives_cycle_number() {
        let compiler = Compiler::watching();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        compiler
            .hooks
            .compile
            .tap("cycles", move |cycle: &u64| sink.lock().push(*cycle))
            .unwrap();

        let first = compiler.run_cycle().await.unwrap();
        let second = compiler.run_cycle().await.unwrap();
        assert_eq!(*seen.lock(), vec![1, 2]);
        assert_eq!(first.compilation().cycle(), 1);
        assert_eq!(second.compilation().cycle(), 2);
    }

    #[tokio::test]
    async fn test_build_closure_records_errors() {
        let compiler = Compiler::new();
        let stats = compiler
            .run_cycle_with(|compilation| compilation.push_error("Module not found"))
            .await
            .unwrap();
        assert!(stats.has_errors());
        assert_ne!(stats.hash(), compiler.run_cycle().await.unwrap().hash());
    }
}

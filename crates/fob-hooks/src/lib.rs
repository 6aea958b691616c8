//! # fob-hooks
//!
//! Lifecycle hooks for fob compiler plugins.
//!
//! A [`Compiler`] exposes a fixed set of [`Hook`]s (`watch_run`, `compile`,
//! `emit`, `done`). Plugins register [`Tap`]s on them; each tap is sync,
//! callback-style or promise-style ([`TapKind`]). Hooks accept
//! [`Interceptor`]s that observe or replace taps at registration, which is
//! how one plugin adjusts the behavior of another without touching its code.
//!
//! ```no_run
//! use fob_hooks::{Compiler, Plugin};
//! use std::sync::Arc;
//!
//! struct Announce;
//!
//! impl Plugin for Announce {
//!     fn name(&self) -> &'static str {
//!         "announce"
//!     }
//!
//!     fn apply(&self, compiler: &Compiler) -> fob_hooks::Result<()> {
//!         compiler.hooks.done.tap(self.name(), |stats| {
//!             tracing::info!(hash = stats.hash(), "build finished");
//!         })
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let compiler = Compiler::watching();
//! compiler.apply_plugins([Arc::new(Announce) as Arc<dyn Plugin>])?;
//! compiler.run_cycle().await?;
//! # Ok(()) }
//! ```

pub mod compilation;
pub mod compiler;
pub mod error;
pub mod hook;
pub mod plugin;
pub mod tap;

#[cfg(feature = "logging")]
pub mod logging;

pub use compilation::{Compilation, CompilationRecord, Stats, StatsSummary};
pub use compiler::{Compiler, CompilerHooks};
pub use error::{BoxError, HookError, Result};
pub use hook::{Hook, HookMode, Interceptor};
pub use plugin::Plugin;
pub use tap::{Completion, Tap, TapFn, TapFuture, TapKind};

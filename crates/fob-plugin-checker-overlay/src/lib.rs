//! Keep the dev server's error overlay in sync with an asynchronous type checker
//!
//! When the type checker runs in the background during a watch session, the
//! compiler finishes (and the dev server dismisses its overlay) before any
//! type errors are known. [`CheckerOverlayPlugin`] sits between the three:
//!
//! ```text
//! compile ──> reset gate
//! emit    ──> install checker emit callback (bound to this compilation)
//! done    ──> hold dev server listener, remember stats
//! checker done (errors) ──> run emit callback ──> replay dev server done(stats)
//! ```
//!
//! Without async mode every hook is a pass-through and the dev server sees
//! exactly what it would see without the plugin.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use fob_hooks::Compiler;
//! use fob_plugin_checker_overlay::{
//!     BackgroundChecker, CheckerOverlayOptions, CheckerOverlayPlugin, DevServer,
//! };
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let checker = BackgroundChecker::asynchronous();
//! let overlay = CheckerOverlayPlugin::new(CheckerOverlayOptions::new(Arc::new(checker.clone())))?;
//!
//! let compiler = Compiler::watching();
//! compiler.apply_plugins(overlay.plugins())?;
//! DevServer::new().attach(&compiler)?;
//!
//! compiler.run_cycle().await?;
//! // later, from the checking worker:
//! // checker.report(cycle, report);
//! # Ok(()) }
//! ```

mod checker;
mod config;
mod dev_server;
mod diagnostic;
mod error;
mod plugin;

pub use checker::{
    BackgroundChecker, CheckerHooks, CheckerOptions, CompletionNotifier, EmitCallback, TypeChecker,
};
pub use config::{DEFAULT_CONFIG_FILE, OverlayConfig};
pub use dev_server::{
    BuildStatus, ClientRegistry, DEV_SERVER_TAP, DevEvent, DevServer, DevServerState, SharedState,
};
pub use diagnostic::{CheckerReport, Diagnostic, Severity};
pub use error::{OverlayError, Result};
pub use plugin::{CheckerOverlayOptions, CheckerOverlayPlugin, CoordinatorState, PLUGIN_NAME};

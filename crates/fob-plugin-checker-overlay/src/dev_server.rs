//! Development server side of the overlay.
//!
//! The dev server listens to the compiler's `done` hook through one sync tap
//! named [`DEV_SERVER_TAP`]. Each call decides whether the browser overlay is
//! shown (the build has errors) or dismissed with a reload, and broadcasts the
//! matching [`DevEvent`] to connected clients.

use fob_hooks::{Compiler, Stats};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Name of the dev server's `done` tap.
pub const DEV_SERVER_TAP: &str = "fob-dev-server";

/// Events sent to connected clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DevEvent {
    /// Build is clean: dismiss the overlay and reload
    BuildCompleted { hash: String, duration_ms: u64 },

    /// Build has errors: show the overlay
    BuildFailed { hash: String, errors: Vec<String> },
}

/// Overlay-relevant build status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    /// No `done` has been seen yet
    NotStarted,
    Success { hash: String, duration_ms: u64 },
    Failed { hash: String, errors: Vec<String> },
}

impl BuildStatus {
    /// Whether the last build was clean.
    pub fn is_success(&self) -> bool {
        matches!(self, BuildStatus::Success { .. })
    }

    /// Whether clients are currently showing the error overlay.
    pub fn overlay_visible(&self) -> bool {
        matches!(self, BuildStatus::Failed { .. })
    }

    /// Hash of the last build, if any.
    pub fn hash(&self) -> Option<&str> {
        match self {
            BuildStatus::Success { hash, .. } | BuildStatus::Failed { hash, .. } => Some(hash),
            BuildStatus::NotStarted => None,
        }
    }

    /// Errors shown in the overlay; empty unless the build failed.
    pub fn errors(&self) -> &[String] {
        match self {
            BuildStatus::Failed { errors, .. } => errors,
            _ => &[],
        }
    }
}

/// Client connection tracker.
pub type ClientRegistry = Arc<RwLock<HashMap<usize, mpsc::Sender<String>>>>;

/// Shared dev server state.
pub struct DevServerState {
    pub status: RwLock<BuildStatus>,
    pub clients: ClientRegistry,
    pub next_client_id: RwLock<usize>,
}

impl DevServerState {
    /// Create state with no build seen and no clients.
    pub fn new() -> Self {
        Self {
            status: RwLock::new(BuildStatus::NotStarted),
            clients: Arc::new(RwLock::new(HashMap::new())),
            next_client_id: RwLock::new(0),
        }
    }

    /// Get current build status.
    pub fn get_status(&self) -> BuildStatus {
        self.status.read().clone()
    }

    /// Register a new client.
    ///
    /// # Returns
    ///
    /// Client ID and receiver for serialized [`DevEvent`]s
    pub fn register_client(&self) -> (usize, mpsc::Receiver<String>) {
        let id = {
            let mut next_id = self.next_client_id.write();
            let id = *next_id;
            *next_id += 1;
            id
        };

        let (tx, rx) = mpsc::channel(100);
        self.clients.write().insert(id, tx);

        (id, rx)
    }

    /// Unregister a client.
    pub fn unregister_client(&self, id: usize) {
        self.clients.write().remove(&id);
    }

    /// Number of connected clients.
    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Send an event to every connected client without blocking.
    ///
    /// Clients whose channel is closed are dropped; a full channel skips
    /// that client for this event.
    pub fn broadcast(&self, event: &DevEvent) {
        let json = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
        let clients = self.clients.read().clone();

        let mut failed_ids = Vec::new();
        for (id, tx) in clients {
            if let Err(mpsc::error::TrySendError::Closed(_)) = tx.try_send(json.clone()) {
                failed_ids.push(id);
            }
        }

        for id in failed_ids {
            self.unregister_client(id);
        }
    }

    /// React to a finished build.
    pub fn handle_done(&self, stats: &Stats) {
        let (status, event) = if stats.has_errors() {
            let errors = stats.compilation().errors();
            info!(hash = stats.hash(), errors = errors.len(), "showing error overlay");
            (
                BuildStatus::Failed {
                    hash: stats.hash().to_string(),
                    errors: errors.clone(),
                },
                DevEvent::BuildFailed {
                    hash: stats.hash().to_string(),
                    errors,
                },
            )
        } else {
            debug!(hash = stats.hash(), "build clean, reloading clients");
            (
                BuildStatus::Success {
                    hash: stats.hash().to_string(),
                    duration_ms: stats.duration_ms(),
                },
                DevEvent::BuildCompleted {
                    hash: stats.hash().to_string(),
                    duration_ms: stats.duration_ms(),
                },
            )
        };

        *self.status.write() = status;
        self.broadcast(&event);
    }
}

impl Default for DevServerState {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedState = Arc<DevServerState>;

/// The dev server's compiler integration.
#[derive(Clone, Default)]
pub struct DevServer {
    state: SharedState,
}

impl DevServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// State shared with client connections.
    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Register the dev server's `done` tap on `compiler`.
    pub fn attach(&self, compiler: &Compiler) -> fob_hooks::Result<()> {
        let state = Arc::clone(&self.state);
        compiler
            .hooks
            .done
            .tap(DEV_SERVER_TAP, move |stats| state.handle_done(stats))
    }
}

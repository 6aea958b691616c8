//! Per-cycle compilation records and the stats snapshot handed to `done`.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Messages and assets collected during one compile cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationRecord {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub assets: Vec<String>,
}

/// Shared handle to the compilation of one cycle.
///
/// Plugins that finish late (a background checker, for instance) may still
/// push errors onto it after `done`; anything holding the handle, including
/// [`Stats`], sees them.
#[derive(Clone)]
pub struct Compilation {
    cycle: u64,
    record: Arc<RwLock<CompilationRecord>>,
}

impl Compilation {
    pub fn new(cycle: u64) -> Self {
        Self {
            cycle,
            record: Arc::new(RwLock::new(CompilationRecord::default())),
        }
    }

    /// Cycle number this compilation belongs to.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn push_error(&self, message: impl Into<String>) {
        self.record.write().errors.push(message.into());
    }

    pub fn push_warning(&self, message: impl Into<String>) {
        self.record.write().warnings.push(message.into());
    }

    pub fn add_asset(&self, name: impl Into<String>) {
        self.record.write().assets.push(name.into());
    }

    pub fn errors(&self) -> Vec<String> {
        self.record.read().errors.clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.record.read().warnings.clone()
    }

    pub fn assets(&self) -> Vec<String> {
        self.record.read().assets.clone()
    }

    pub fn has_errors(&self) -> bool {
        !self.record.read().errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.record.read().warnings.is_empty()
    }

    /// Copy of everything recorded so far.
    pub fn record(&self) -> CompilationRecord {
        self.record.read().clone()
    }

    /// Whether both handles point at the same compilation.
    pub fn same_as(&self, other: &Compilation) -> bool {
        Arc::ptr_eq(&self.record, &other.record)
    }
}

impl fmt::Debug for Compilation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.record.read();
        f.debug_struct("Compilation")
            .field("cycle", &self.cycle)
            .field("errors", &record.errors.len())
            .field("warnings", &record.warnings.len())
            .field("assets", &record.assets.len())
            .finish()
    }
}

/// Snapshot of a finished build, passed to `done` taps.
#[derive(Debug, Clone)]
pub struct Stats {
    hash: String,
    compilation: Compilation,
    duration: Duration,
}

impl Stats {
    pub fn new(hash: impl Into<String>, compilation: Compilation, started_at: Instant) -> Self {
        Self {
            hash: hash.into(),
            compilation,
            duration: started_at.elapsed(),
        }
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn compilation(&self) -> &Compilation {
        &self.compilation
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }

    pub fn has_errors(&self) -> bool {
        self.compilation.has_errors()
    }

    pub fn has_warnings(&self) -> bool {
        self.compilation.has_warnings()
    }

    /// Serializable view of the snapshot.
    pub fn summary(&self) -> StatsSummary {
        let record = self.compilation.record();
        StatsSummary {
            hash: self.hash.clone(),
            duration_ms: self.duration_ms(),
            errors: record.errors,
            warnings: record.warnings,
            assets: record.assets,
        }
    }
}

impl PartialEq for Stats {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.compilation.same_as(&other.compilation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub hash: String,
    pub duration_ms: u64,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub assets: Vec<String>,
}

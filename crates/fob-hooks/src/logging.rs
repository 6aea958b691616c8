//! Subscriber setup for hosts driving a [`Compiler`](crate::Compiler).
//!
//! Only compiled with the `logging` feature. Hooks and plugins never install
//! a subscriber themselves; they emit `tracing` events at these levels:
//!
//! | level | events |
//! |---|---|
//! | `warn` | inert-plugin advisory, failed replays |
//! | `info` | dev server overlay shown |
//! | `debug` | cycle phases, checker reports, coordinator transitions |
//! | `trace` | every tap registration |

use std::fmt;
use std::str::FromStr;
use std::sync::Once;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt as fmt_layer, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Verbosity of hook and plugin output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Silent,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    const ALL: [(LogLevel, &'static str, LevelFilter); 6] = [
        (LogLevel::Silent, "off", LevelFilter::OFF),
        (LogLevel::Error, "error", LevelFilter::ERROR),
        (LogLevel::Warn, "warn", LevelFilter::WARN),
        (LogLevel::Info, "info", LevelFilter::INFO),
        (LogLevel::Debug, "debug", LevelFilter::DEBUG),
        (LogLevel::Trace, "trace", LevelFilter::TRACE),
    ];

    fn entry(self) -> (LogLevel, &'static str, LevelFilter) {
        Self::ALL[self as usize]
    }

    fn level_filter(self) -> LevelFilter {
        self.entry().2
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        let name = match lower.as_str() {
            "silent" => "off",
            "warning" => "warn",
            other => other,
        };
        Self::ALL
            .iter()
            .find(|(_, known, _)| *known == name)
            .map(|(level, _, _)| *level)
            .ok_or_else(|| format!("Invalid log level: {s}"))
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entry().1)
    }
}

fn install(filter: EnvFilter) {
    INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer::layer().compact().with_target(false).without_time())
            .init();
    });
}

/// Log at `level` unless `RUST_LOG` says otherwise for a target.
///
/// Only the first `init_*` call in a process takes effect.
pub fn init_logging(level: LogLevel) {
    install(
        EnvFilter::builder()
            .with_default_directive(level.level_filter().into())
            .from_env_lossy(),
    );
}

/// Log according to `RUST_LOG`, at `info` when it is unset or invalid.
pub fn init_logging_from_env() {
    init_logging(LogLevel::default());
}

//! The construction-time warning for a checker that never reports late.

use fob_plugin_checker_overlay::{
    BackgroundChecker, CheckerOverlayOptions, CheckerOverlayPlugin, OverlayConfig,
};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Captured {
    type Writer = Captured;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn construct_with_logs(checker: BackgroundChecker, config: OverlayConfig) -> String {
    let captured = Captured::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(captured.clone())
        .with_ansi(false)
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        CheckerOverlayPlugin::new(
            CheckerOverlayOptions::new(Arc::new(checker)).with_config(config),
        )
        .unwrap();
    });

    let bytes = captured.0.lock().clone();
    String::from_utf8(bytes).unwrap()
}

#[test]
fn synchronous_checker_warns_once() {
    let logs = construct_with_logs(BackgroundChecker::synchronous(), OverlayConfig::default());
    assert_eq!(logs.matches("does nothing").count(), 1);
    assert!(logs.contains("WARN"));
    assert!(logs.contains("async mode of the type checker is disabled"));
}

#[test]
fn asynchronous_checker_does_not_warn() {
    let logs = construct_with_logs(BackgroundChecker::asynchronous(), OverlayConfig::default());
    assert!(!logs.contains("does nothing"));
}

#[test]
fn warning_can_be_silenced() {
    let logs = construct_with_logs(
        BackgroundChecker::synchronous(),
        OverlayConfig::default().with_warn_when_inert(false),
    );
    assert!(logs.is_empty());
}

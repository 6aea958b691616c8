//! Taps: named listeners registered against a [`Hook`](crate::Hook).
//!
//! A tap carries its listener inside [`TapFn`], a closed set of invocation
//! kinds. Each kind defines its own "completed without doing anything"
//! substitute, which is what [`Tap::with_guard`] falls back to when its
//! condition is false.

use crate::error::{HookError, Result};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

/// Future returned by promise-style taps.
pub type TapFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

/// Completion handed to callback-style taps. Must be called exactly once.
pub type Completion = Box<dyn FnOnce(anyhow::Result<()>) + Send + 'static>;

type SyncFn<A> = Arc<dyn Fn(&A) + Send + Sync>;
type CallbackFn<A> = Arc<dyn Fn(&A, Completion) + Send + Sync>;
type PromiseFn<A> = Arc<dyn Fn(&A) -> TapFuture + Send + Sync>;

/// How a tap is invoked and how it signals completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TapKind {
    /// Returns when done.
    Sync,
    /// Receives a [`Completion`] and calls it when done.
    Callback,
    /// Returns a [`TapFuture`] that resolves when done.
    Promise,
}

impl TapKind {
    /// Name used when taps are declared by hosts (`sync`, `async`, `promise`).
    pub fn as_str(&self) -> &'static str {
        match self {
            TapKind::Sync => "sync",
            TapKind::Callback => "async",
            TapKind::Promise => "promise",
        }
    }
}

impl fmt::Display for TapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TapKind {
    type Err = HookError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sync" => Ok(TapKind::Sync),
            "async" | "callback" => Ok(TapKind::Callback),
            "promise" => Ok(TapKind::Promise),
            other => Err(HookError::UnknownTapKind(other.to_string())),
        }
    }
}

/// The listener itself, tagged by invocation kind.
pub enum TapFn<A> {
    Sync(SyncFn<A>),
    Callback(CallbackFn<A>),
    Promise(PromiseFn<A>),
}

impl<A> TapFn<A> {
    pub fn kind(&self) -> TapKind {
        match self {
            TapFn::Sync(_) => TapKind::Sync,
            TapFn::Callback(_) => TapKind::Callback,
            TapFn::Promise(_) => TapKind::Promise,
        }
    }
}

impl<A> Clone for TapFn<A> {
    fn clone(&self) -> Self {
        match self {
            TapFn::Sync(f) => TapFn::Sync(Arc::clone(f)),
            TapFn::Callback(f) => TapFn::Callback(Arc::clone(f)),
            TapFn::Promise(f) => TapFn::Promise(Arc::clone(f)),
        }
    }
}

/// A named listener for hooks carrying `A`.
///
/// Taps are values: cloning shares the listener, and every transform
/// returns a new tap instead of rewriting the one it was given.
pub struct Tap<A> {
    name: Arc<str>,
    func: TapFn<A>,
}

impl<A> Clone for Tap<A> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            func: self.func.clone(),
        }
    }
}

impl<A> fmt::Debug for Tap<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tap")
            .field("name", &self.name)
            .field("kind", &self.func.kind())
            .finish()
    }
}

impl<A: 'static> Tap<A> {
    pub fn new(name: impl Into<Arc<str>>, func: TapFn<A>) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }

    /// Synchronous tap.
    pub fn sync<F>(name: impl Into<Arc<str>>, f: F) -> Self
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        Self::new(name, TapFn::Sync(Arc::new(f)))
    }

    /// Callback-style tap.
    pub fn callback<F>(name: impl Into<Arc<str>>, f: F) -> Self
    where
        F: Fn(&A, Completion) + Send + Sync + 'static,
    {
        Self::new(name, TapFn::Callback(Arc::new(f)))
    }

    /// Promise-style tap.
    pub fn promise<F, Fut>(name: impl Into<Arc<str>>, f: F) -> Self
    where
        F: Fn(&A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let func: PromiseFn<A> = Arc::new(move |args: &A| -> TapFuture { Box::pin(f(args)) });
        Self::new(name, TapFn::Promise(func))
    }

    /// Build a tap whose kind is declared by name, as hosts bridging from
    /// other runtimes do. The declared kind must be known and must match
    /// the listener.
    pub fn declared(name: impl Into<Arc<str>>, kind: &str, func: TapFn<A>) -> Result<Self> {
        let name = name.into();
        let declared: TapKind = kind.parse()?;
        if declared != func.kind() {
            return Err(HookError::KindMismatch {
                tap: name.to_string(),
                declared,
                actual: func.kind(),
            });
        }
        Ok(Self { name, func })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TapKind {
        self.func.kind()
    }

    pub fn func(&self) -> &TapFn<A> {
        &self.func
    }

    /// Return a tap that only runs this listener while `condition` holds.
    ///
    /// When the condition is false the listener is skipped but the tap still
    /// completes according to its kind: sync taps return, callback taps call
    /// their completion with no error, promise taps resolve immediately.
    pub fn with_guard<C>(&self, condition: C) -> Tap<A>
    where
        C: Fn() -> bool + Send + Sync + 'static,
    {
        let condition = Arc::new(condition);
        let func = match &self.func {
            TapFn::Sync(f) => {
                let f = Arc::clone(f);
                TapFn::Sync(Arc::new(move |args: &A| {
                    if condition() {
                        f(args)
                    }
                }) as SyncFn<A>)
            }
            TapFn::Callback(f) => {
                let f = Arc::clone(f);
                TapFn::Callback(Arc::new(move |args: &A, done: Completion| {
                    if condition() {
                        f(args, done)
                    } else {
                        done(Ok(()))
                    }
                }) as CallbackFn<A>)
            }
            TapFn::Promise(f) => {
                let f = Arc::clone(f);
                TapFn::Promise(Arc::new(move |args: &A| -> TapFuture {
                    if condition() {
                        f(args)
                    } else {
                        Box::pin(std::future::ready(Ok(())))
                    }
                }) as PromiseFn<A>)
            }
        };

        Tap {
            name: Arc::clone(&self.name),
            func,
        }
    }

    /// Invoke a synchronous tap directly.
    pub fn call_sync(&self, args: &A) -> Result<()> {
        match &self.func {
            TapFn::Sync(f) => {
                f(args);
                Ok(())
            }
            other => Err(HookError::NotSync {
                tap: self.name.to_string(),
                kind: other.kind(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[test]
    fn test_tap_kind_from_str() {
        assert_eq!("sync".parse::<TapKind>().unwrap(), TapKind::Sync);
        assert_eq!("async".parse::<TapKind>().unwrap(), TapKind::Callback);
        assert_eq!("callback".parse::<TapKind>().unwrap(), TapKind::Callback);
        assert_eq!("promise".parse::<TapKind>().unwrap(), TapKind::Promise);
    }

    #[test]
    fn test_unknown_tap_kind_names_the_kind() {
        let err = "stream".parse::<TapKind>().unwrap_err();
        assert!(matches!(&err, HookError::UnknownTapKind(kind) if kind == "stream"));
        assert!(err.to_string().contains("stream"));
    }

    #[test]
    fn test_declared_tap_rejects_unknown_kind() {
        let func: TapFn<u32> = TapFn::Sync(Arc::new(|_: &u32| {}));
        let err = Tap::declared("bridge", "stream", func).unwrap_err();
        assert!(matches!(err, HookError::UnknownTapKind(kind) if kind == "stream"));
    }

    #[test]
    fn test_declared_tap_rejects_mismatch() {
        let func: TapFn<u32> = TapFn::Sync(Arc::new(|_: &u32| {}));
        let err = Tap::declared("bridge", "promise", func).unwrap_err();
        assert!(matches!(
            err,
            HookError::KindMismatch {
                declared: TapKind::Promise,
                actual: TapKind::Sync,
                ..
            }
        ));
    }

    #[test]
    fn test_guarded_sync_tap_skips_listener() {
        let hits = Arc::new(AtomicUsize::new(0));
        let enabled = Arc::new(AtomicBool::new(false));

        let counter = Arc::clone(&hits);
        let tap = Tap::sync("count", move |n: &usize| {
            counter.fetch_add(*n, Ordering::SeqCst);
        });
        let flag = Arc::clone(&enabled);
        let guarded = tap.with_guard(move || flag.load(Ordering::SeqCst));

        guarded.call_sync(&3).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        enabled.store(true, Ordering::SeqCst);
        guarded.call_sync(&3).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 3);

        // The original tap is untouched by the guard.
        enabled.store(false, Ordering::SeqCst);
        tap.call_sync(&1).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_guarded_callback_tap_still_completes() {
        let ran = Arc::new(AtomicBool::new(false));
        let seen = Arc::clone(&ran);
        let tap = Tap::callback("cb", move |_: &(), done: Completion| {
            seen.store(true, Ordering::SeqCst);
            done(Err(anyhow::anyhow!("should not run")));
        })
        .with_guard(|| false);

        let completed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&completed);
        let TapFn::Callback(f) = tap.func() else {
            panic!("guard must keep the callback kind");
        };
        f(
            &(),
            Box::new(move |result| {
                assert!(result.is_ok());
                flag.store(true, Ordering::SeqCst);
            }),
        );

        assert!(!ran.load(Ordering::SeqCst));
        assert!(completed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_guarded_promise_tap_resolves() {
        let tap = Tap::promise("p", |_: &()| async { Err(anyhow::anyhow!("should not run")) })
            .with_guard(|| false);
        assert_eq!(tap.kind(), TapKind::Promise);

        let TapFn::Promise(f) = tap.func() else {
            panic!("guard must keep the promise kind");
        };
        assert!(f(&()).await.is_ok());
    }

    #[test]
    fn test_debug_shows_name_and_kind() {
        fn describe<A>(tap: &Tap<A>) -> String {
            format!("{tap:?}")
        }

        let tap = Tap::callback("cb", |_: &(), done: Completion| done(Ok(())));
        let rendered = describe(&tap);
        assert!(rendered.contains("\"cb\""));
        assert!(rendered.contains("Callback"));
    }

    #[test]
    fn test_call_sync_rejects_other_kinds() {
        let tap = Tap::callback("cb", |_: &(), done: Completion| done(Ok(())));
        let err = tap.call_sync(&()).unwrap_err();
        assert!(matches!(
            err,
            HookError::NotSync {
                kind: TapKind::Callback,
                ..
            }
        ));
    }
}

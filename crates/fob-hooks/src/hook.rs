//! Hooks: ordered tap lists with register interceptors.
//!
//! A hook is either [`HookMode::Sync`] (only sync taps, dispatched with
//! [`Hook::call`]) or [`HookMode::AsyncSeries`] (any tap kind, dispatched in
//! registration order with [`Hook::call_async`]).
//!
//! Interceptors see every tap at registration time and may return a
//! replacement. Adding an interceptor also runs it over the taps that are
//! already registered, so plugins applied later can still observe earlier
//! plugins' taps.

use crate::error::{BoxError, HookError, Result};
use crate::tap::{Completion, Tap, TapFn, TapKind};
use parking_lot::RwLock;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::trace;

/// Dispatch discipline of a hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookMode {
    Sync,
    AsyncSeries,
}

/// Observes (and may replace) taps as they are registered.
pub trait Interceptor<A>: Send + Sync {
    fn register(&self, tap: Tap<A>) -> std::result::Result<Tap<A>, BoxError>;
}

impl<A, F> Interceptor<A> for F
where
    F: Fn(Tap<A>) -> std::result::Result<Tap<A>, BoxError> + Send + Sync,
{
    fn register(&self, tap: Tap<A>) -> std::result::Result<Tap<A>, BoxError> {
        self(tap)
    }
}

struct HookInner<A> {
    taps: Vec<Tap<A>>,
    interceptors: Vec<Arc<dyn Interceptor<A>>>,
}

/// A named lifecycle hook carrying `A`.
pub struct Hook<A> {
    name: &'static str,
    mode: HookMode,
    inner: RwLock<HookInner<A>>,
}

impl<A> fmt::Debug for Hook<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Hook")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("taps", &inner.taps)
            .field("interceptors", &inner.interceptors.len())
            .finish()
    }
}

impl<A: 'static> Hook<A> {
    /// Hook that only accepts sync taps.
    pub fn sync(name: &'static str) -> Self {
        Self::with_mode(name, HookMode::Sync)
    }

    /// Hook that runs taps of any kind one after another.
    pub fn async_series(name: &'static str) -> Self {
        Self::with_mode(name, HookMode::AsyncSeries)
    }

    fn with_mode(name: &'static str, mode: HookMode) -> Self {
        Self {
            name,
            mode,
            inner: RwLock::new(HookInner {
                taps: Vec::new(),
                interceptors: Vec::new(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn mode(&self) -> HookMode {
        self.mode
    }

    /// Register a tap, passing it through every interceptor first.
    pub fn tap_with(&self, tap: Tap<A>) -> Result<()> {
        if self.mode == HookMode::Sync && tap.kind() != TapKind::Sync {
            return Err(HookError::KindNotSupported {
                hook: self.name,
                tap: tap.name().to_string(),
                kind: tap.kind(),
            });
        }

        // Interceptors run outside the lock so they may inspect the hook.
        let interceptors = self.inner.read().interceptors.clone();
        let mut tap = tap;
        for interceptor in &interceptors {
            tap = self.intercept_one(interceptor.as_ref(), tap)?;
        }

        trace!(hook = self.name, tap = tap.name(), kind = %tap.kind(), "tap registered");
        self.inner.write().taps.push(tap);
        Ok(())
    }

    /// Register a sync tap.
    pub fn tap<F>(&self, name: &str, f: F) -> Result<()>
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        self.tap_with(Tap::sync(name, f))
    }

    /// Register a callback-style tap.
    pub fn tap_async<F>(&self, name: &str, f: F) -> Result<()>
    where
        F: Fn(&A, Completion) + Send + Sync + 'static,
    {
        self.tap_with(Tap::callback(name, f))
    }

    /// Register a promise-style tap.
    pub fn tap_promise<F, Fut>(&self, name: &str, f: F) -> Result<()>
    where
        F: Fn(&A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.tap_with(Tap::promise(name, f))
    }

    /// Register a tap whose kind is given by name.
    pub fn tap_declared(&self, name: &str, kind: &str, func: TapFn<A>) -> Result<()> {
        self.tap_with(Tap::declared(name, kind, func)?)
    }

    /// Add an interceptor. It is applied to already-registered taps
    /// immediately and to every tap registered afterwards.
    pub fn intercept<I>(&self, interceptor: I) -> Result<()>
    where
        I: Interceptor<A> + 'static,
    {
        let interceptor: Arc<dyn Interceptor<A>> = Arc::new(interceptor);

        let existing = std::mem::take(&mut self.inner.write().taps);
        let mut replaced = Vec::with_capacity(existing.len());
        let mut failure = None;
        for tap in existing {
            if failure.is_some() {
                replaced.push(tap);
                continue;
            }
            let fallback = tap.clone();
            match self.intercept_one(interceptor.as_ref(), tap) {
                Ok(tap) => replaced.push(tap),
                Err(err) => {
                    replaced.push(fallback);
                    failure = Some(err);
                }
            }
        }

        let mut inner = self.inner.write();
        // Keep taps registered by the interceptor itself after the old ones.
        replaced.append(&mut inner.taps);
        inner.taps = replaced;
        if let Some(err) = failure {
            return Err(err);
        }
        inner.interceptors.push(interceptor);
        Ok(())
    }

    fn intercept_one(&self, interceptor: &dyn Interceptor<A>, tap: Tap<A>) -> Result<Tap<A>> {
        let name = tap.name().to_string();
        interceptor
            .register(tap)
            .map_err(|source| HookError::Interceptor {
                hook: self.name,
                tap: name,
                source,
            })
    }

    /// Names of registered taps, in call order.
    pub fn tap_names(&self) -> Vec<String> {
        self.inner
            .read()
            .taps
            .iter()
            .map(|tap| tap.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().taps.is_empty()
    }

    fn snapshot(&self) -> Vec<Tap<A>> {
        self.inner.read().taps.clone()
    }

    /// Call every tap synchronously, in order.
    ///
    /// Callback taps are accepted as long as they complete before returning.
    /// Promise taps cannot be driven here and fail the call.
    pub fn call(&self, args: &A) -> Result<()> {
        for tap in self.snapshot() {
            match tap.func() {
                TapFn::Sync(f) => f(args),
                TapFn::Callback(f) => {
                    let (tx, mut rx) = oneshot::channel();
                    f(
                        args,
                        Box::new(move |result| {
                            let _ = tx.send(result);
                        }),
                    );
                    match rx.try_recv() {
                        Ok(Ok(())) => {}
                        Ok(Err(source)) => return Err(self.failed(&tap, source)),
                        Err(_) => {
                            return Err(HookError::NotSync {
                                tap: tap.name().to_string(),
                                kind: TapKind::Callback,
                            });
                        }
                    }
                }
                TapFn::Promise(_) => {
                    return Err(HookError::NotSync {
                        tap: tap.name().to_string(),
                        kind: TapKind::Promise,
                    });
                }
            }
        }
        Ok(())
    }

    /// Call every tap in registration order, waiting for each to complete.
    /// Stops at the first failing tap.
    pub async fn call_async(&self, args: &A) -> Result<()> {
        for tap in self.snapshot() {
            match tap.func() {
                TapFn::Sync(f) => f(args),
                TapFn::Callback(f) => {
                    let (tx, rx) = oneshot::channel();
                    f(
                        args,
                        Box::new(move |result| {
                            let _ = tx.send(result);
                        }),
                    );
                    match rx.await {
                        Ok(Ok(())) => {}
                        Ok(Err(source)) => return Err(self.failed(&tap, source)),
                        Err(_) => {
                            return Err(HookError::CallbackDropped {
                                hook: self.name,
                                tap: tap.name().to_string(),
                            });
                        }
                    }
                }
                TapFn::Promise(f) => {
                    if let Err(source) = f(args).await {
                        return Err(self.failed(&tap, source));
                    }
                }
            }
        }
        Ok(())
    }

    fn failed(&self, tap: &Tap<A>, source: anyhow::Error) -> HookError {
        HookError::TapFailed {
            hook: self.name,
            tap: tap.name().to_string(),
            source: source.into(),
        }
    }
}

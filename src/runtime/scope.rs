//! Request-scoped resolver bindings.
//!
//! A [`RequestContext`] carries the binding of one logical request. It can be
//! passed explicitly to the `*_in` accessors, or entered ambiently:
//!
//! - [`RequestContext::scope`] binds it for one future. Every poll of that
//!   future sees the binding; other tasks never do.
//! - [`RequestContext::enter`] binds it for one synchronous closure on the
//!   current thread, for thread-per-request servers.
//!
//! Both push onto the same per-thread stack, so the innermost binding wins
//! however the two are nested, including a `block_on` inside `enter`.
//!
//! Tasks started with [`RequestContext::spawn`] or [`spawn`](super::spawn)
//! carry the binding along. A bare `tokio::spawn` or `std::thread::spawn`
//! does not; capture the context with [`RequestContext::current`] and hand it
//! over instead.

use std::cell::RefCell;
use std::fmt;
use std::future::{self, Future};
use std::pin::pin;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::provider::{FnProvider, Provider};

thread_local! {
    static THREAD_BINDINGS: RefCell<Vec<RequestContext>> = const { RefCell::new(Vec::new()) };
}

/// The resolver binding of one logical request.
#[derive(Clone)]
pub struct RequestContext {
    provider: Arc<dyn Provider>,
}

impl RequestContext {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    /// Binds a closure as the request's resolver.
    pub fn from_fn<F>(resolve: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self::new(Arc::new(FnProvider::new(resolve)))
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Runs `fut` with this context as the ambient binding.
    ///
    /// ```
    /// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
    /// use envspec::RequestContext;
    ///
    /// let context = RequestContext::from_fn(|_| Some("A".to_string()));
    /// let seen = context
    ///     .scope(async { RequestContext::current().is_some() })
    ///     .await;
    /// assert!(seen);
    /// assert!(RequestContext::current().is_none());
    /// # });
    /// ```
    pub async fn scope<F: Future>(self, fut: F) -> F::Output {
        let mut fut = pin!(fut);
        future::poll_fn(move |cx| self.enter(|| fut.as_mut().poll(cx))).await
    }

    /// Spawns `fut` onto the tokio runtime with this context bound.
    ///
    /// Must be called from within a tokio runtime, like `tokio::spawn`.
    pub fn spawn<F>(&self, fut: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tokio::spawn(self.clone().scope(fut))
    }

    /// Runs `f` on the current thread with this context as the ambient binding.
    ///
    /// Nested calls stack; the innermost binding wins and the previous one is
    /// restored when `f` returns or unwinds.
    pub fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        THREAD_BINDINGS.with(|stack| stack.borrow_mut().push(self.clone()));
        let _guard = PopOnDrop;
        f()
    }

    /// The ambient binding, if the caller runs inside [`scope`](Self::scope)
    /// or [`enter`](Self::enter).
    pub fn current() -> Option<Self> {
        THREAD_BINDINGS.with(|stack| stack.borrow().last().cloned())
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("provider", &self.provider.name())
            .finish()
    }
}

struct PopOnDrop;

impl Drop for PopOnDrop {
    fn drop(&mut self) {
        THREAD_BINDINGS.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

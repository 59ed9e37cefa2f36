#![forbid(unsafe_code)]

//! Observer/observable contract shared by every cell type.
//!
//! # Grammar
//!
//! A source delivers `on_next*` followed by at most one terminal
//! notification (`on_error` or `on_completed`). Nothing is delivered to an
//! observer after its terminal notification.
//!
//! # Failure Modes
//!
//! - Observer panics: the panic unwinds through the producer's `set` call.
//!   Observers are expected not to panic.

use std::fmt;
use std::sync::Arc;

/// Error carried by an `on_error` notification.
pub type StreamError = Arc<dyn std::error::Error + Send + Sync>;

/// Receives notifications from an [`Observable`].
pub trait Observer<T>: Send + Sync {
    fn on_next(&self, value: &T);

    fn on_error(&self, error: &StreamError) {
        let _ = error;
    }

    fn on_completed(&self) {}
}

/// A push-based source of values.
pub trait Observable<T: 'static> {
    /// Register `observer`; the returned handle releases it.
    fn subscribe_observer(&self, observer: Arc<dyn Observer<T>>) -> Subscription;

    /// Subscribe a value callback.
    fn subscribe(&self, on_next: impl Fn(&T) + Send + Sync + 'static) -> Subscription
    where
        Self: Sized,
    {
        self.subscribe_observer(Arc::new(FnObserver::new(on_next)))
    }

    /// Subscribe callbacks for values, errors and completion.
    fn subscribe_all(
        &self,
        on_next: impl Fn(&T) + Send + Sync + 'static,
        on_error: impl Fn(&StreamError) + Send + Sync + 'static,
        on_completed: impl Fn() + Send + Sync + 'static,
    ) -> Subscription
    where
        Self: Sized,
    {
        let observer = FnObserver::new(on_next)
            .with_error(on_error)
            .with_completed(on_completed);
        self.subscribe_observer(Arc::new(observer))
    }
}

/// Anything exposing a current value.
pub trait ReadValue<T> {
    /// The current value.
    fn value(&self) -> T;
}

type NextFn<T> = Box<dyn Fn(&T) + Send + Sync>;
type ErrorFn = Box<dyn Fn(&StreamError) + Send + Sync>;
type CompletedFn = Box<dyn Fn() + Send + Sync>;

/// [`Observer`] built from closures.
pub struct FnObserver<T> {
    on_next: NextFn<T>,
    on_error: Option<ErrorFn>,
    on_completed: Option<CompletedFn>,
}

impl<T> FnObserver<T> {
    pub fn new(on_next: impl Fn(&T) + Send + Sync + 'static) -> Self {
        Self {
            on_next: Box::new(on_next),
            on_error: None,
            on_completed: None,
        }
    }

    #[must_use]
    pub fn with_error(mut self, on_error: impl Fn(&StreamError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(on_error));
        self
    }

    #[must_use]
    pub fn with_completed(mut self, on_completed: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_completed = Some(Box::new(on_completed));
        self
    }
}

impl<T> Observer<T> for FnObserver<T> {
    fn on_next(&self, value: &T) {
        (self.on_next)(value);
    }

    fn on_error(&self, error: &StreamError) {
        if let Some(on_error) = &self.on_error {
            on_error(error);
        }
    }

    fn on_completed(&self) {
        if let Some(on_completed) = &self.on_completed {
            on_completed();
        }
    }
}

impl<T> fmt::Debug for FnObserver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnObserver")
            .field("on_error", &self.on_error.is_some())
            .field("on_completed", &self.on_completed.is_some())
            .finish()
    }
}

/// RAII handle for a registered observer.
///
/// Dropping the handle (or calling [`unsubscribe`](Self::unsubscribe))
/// removes the observer before the next notification it would receive.
/// Releasing during an in-flight notification pass is safe: the pass skips
/// the released observer and carries on with the rest.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Create a subscription that runs `release` once when released.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A subscription with nothing to release (e.g. the source had already
    /// terminated).
    pub fn empty() -> Self {
        Self { release: None }
    }

    /// Whether releasing this handle would still do something.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }

    /// Release the registration now.
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    /// Give up the handle without releasing; the observer then stays
    /// registered for the lifetime of the source.
    pub fn detach(mut self) {
        self.release = None;
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

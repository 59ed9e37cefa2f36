#![forbid(unsafe_code)]

//! Disposal lifecycle and cooperative cancellation.
//!
//! Every cell embeds a [`Lifecycle`]: a one-way `active → disposed` flag plus
//! a [`CancellationToken`]. Anything that must be torn down when the cell is
//! disposed (mirrored-source subscriptions, redirected observers) registers a
//! release action on the token.
//!
//! # Invariants
//!
//! 1. `active` goes from `true` to `false` at most once and never returns.
//! 2. A token runs each registered release action exactly once.
//! 3. Registering on an already-cancelled token runs the action immediately,
//!    so nothing registered late can outlive the owner.
//! 4. Release actions run outside the token's lock; an action may register
//!    on (or cancel) other tokens without deadlocking.
//!
//! # Scoped release
//!
//! [`DisposeGuard`] disposes its target when dropped. Use it to bound a
//! cell's lifetime to a block:
//!
//! ```
//! use rxcell::{Dispose, RxCell};
//!
//! let cell = RxCell::new(1);
//! {
//!     let _guard = cell.dispose_guard();
//!     assert!(!cell.is_disposed());
//! }
//! assert!(cell.is_disposed());
//! ```

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::reactive::Subscription;

type ReleaseAction = Box<dyn FnOnce() + Send>;

struct TokenInner {
    cancelled: AtomicBool,
    actions: Mutex<Vec<ReleaseAction>>,
}

/// One-shot cooperative cancellation signal.
///
/// Cloning shares the same signal. Cancellation is checked, never preemptive:
/// holders either poll [`is_cancelled`](Self::is_cancelled) or register a
/// release action with [`on_cancel`](Self::on_cancel).
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

impl CancellationToken {
    /// Create a fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                actions: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Run `action` when the token is cancelled (or now, if it already is).
    pub fn on_cancel(&self, action: impl FnOnce() + Send + 'static) {
        let mut actions = self.inner.actions.lock();
        if self.inner.cancelled.load(Ordering::Acquire) {
            drop(actions);
            action();
            return;
        }
        actions.push(Box::new(action));
    }

    /// Scope `subscription` to this token: it is released on cancellation.
    pub fn attach(&self, subscription: Subscription) {
        self.on_cancel(move || subscription.unsubscribe());
    }

    /// Cancel the token, running all registered release actions.
    ///
    /// Returns `true` on the first call and `false` afterwards.
    pub fn cancel(&self) -> bool {
        let actions = {
            let mut actions = self.inner.actions.lock();
            if self.inner.cancelled.swap(true, Ordering::AcqRel) {
                return false;
            }
            std::mem::take(&mut *actions)
        };
        for action in actions {
            action();
        }
        true
    }

    /// Number of release actions still waiting for cancellation.
    #[must_use]
    pub fn pending_actions(&self) -> usize {
        self.inner.actions.lock().len()
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("pending_actions", &self.pending_actions())
            .finish()
    }
}

/// Active/disposed state plus the cancellation signal released on disposal.
pub struct Lifecycle {
    active: AtomicBool,
    token: CancellationToken,
}

impl Lifecycle {
    /// Create an active lifecycle with a fresh token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: AtomicBool::new(true),
            token: CancellationToken::new(),
        }
    }

    /// Whether the owner has not been disposed yet.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Whether the owner has been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        !self.is_active()
    }

    /// The cancellation signal owned by this lifecycle.
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Flip to disposed and cancel the token.
    ///
    /// Returns `true` only for the call that performed the transition; every
    /// later call is a no-op returning `false`.
    pub fn dispose(&self) -> bool {
        if self
            .active
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.token.cancel();
        true
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("active", &self.is_active())
            .field("token", &self.token)
            .finish()
    }
}

/// Something with an explicit, idempotent release.
pub trait Dispose {
    /// Release the resource. Calls after the first are no-ops.
    fn dispose(&self);

    /// Whether [`dispose`](Self::dispose) has run.
    fn is_disposed(&self) -> bool;
}

/// RAII guard that disposes its target when dropped.
#[must_use = "dropping this guard disposes the target immediately"]
pub struct DisposeGuard<D: Dispose> {
    target: D,
}

impl<D: Dispose> DisposeGuard<D> {
    /// Guard `target` until the end of the enclosing scope.
    pub fn new(target: D) -> Self {
        Self { target }
    }
}

impl<D: Dispose> Deref for DisposeGuard<D> {
    type Target = D;

    fn deref(&self) -> &D {
        &self.target
    }
}

impl<D: Dispose> Drop for DisposeGuard<D> {
    fn drop(&mut self) {
        self.target.dispose();
    }
}

impl<D: Dispose + fmt::Debug> fmt::Debug for DisposeGuard<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposeGuard")
            .field("target", &self.target)
            .finish()
    }
}

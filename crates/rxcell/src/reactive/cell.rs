#![forbid(unsafe_code)]

//! The reactive value cell.
//!
//! [`RxCell<T>`] is a mutable value that is at once an [`Observable`] (every
//! accepted mutation is pushed to subscribers) and an [`Observer`] (it can
//! mirror an upstream source via [`listen_to`](RxCell::listen_to)).
//!
//! # Invariants
//!
//! 1. In distinct mode (the default) setting a value equal to the current
//!    one is a no-op: no store, no version bump, no notification.
//! 2. Subscribers are notified synchronously, on the calling thread, in
//!    registration order, before `set` returns.
//! 3. A new subscriber immediately receives the current value, then every
//!    later accepted value (replay-then-live).
//! 4. Each accepted mutation is applied and fully delivered before the next
//!    one starts; concurrent producers are serialized.
//! 5. After disposal, reads return `T::default()` and never fail; mutation
//!    and subscription are no-ops.
//! 6. Disposal happens exactly once: it cancels the lifecycle token (which
//!    detaches mirrored sources), completes every subscriber and clears the
//!    registry.
//!
//! # Locking
//!
//! A re-entrant gate serializes mutation passes; a subscriber callback may
//! mutate the same cell from the same thread. The state mutex is never held
//! while user callbacks run. Wiring cells into a cycle that is driven from
//! several threads at once can deadlock on the gates.
//!
//! # Equality
//!
//! Equality and hashing look only at the current value. A disposed cell
//! reads as the default value, so it equals any other disposed cell and any
//! live cell currently holding the default.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};

use super::observable::{Observable, Observer, ReadValue, StreamError, Subscription};
use super::view::ReadOnlyCell;
use crate::convert::{ConversionError, Convertible, RawValue};
use crate::lifecycle::{CancellationToken, Dispose, DisposeGuard, Lifecycle};

/// Bounds every cell value satisfies.
pub trait CellValue: Clone + PartialEq + Default + Send + Sync + 'static {}

impl<T: Clone + PartialEq + Default + Send + Sync + 'static> CellValue for T {}

/// Ordering used by [`RxCell::compare_to`].
pub type Comparer<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// Runs after every accepted mutation, once subscribers have been notified.
pub(crate) type ChangeHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone)]
enum Terminal {
    Completed,
    Failed(StreamError),
}

struct Slot<T> {
    id: u64,
    observer: Arc<dyn Observer<T>>,
    live: Arc<AtomicBool>,
}

type Delivery<T> = Vec<(Arc<dyn Observer<T>>, Arc<AtomicBool>)>;

struct State<T> {
    value: T,
    distinct: bool,
    comparer: Option<Comparer<T>>,
    slots: Vec<Slot<T>>,
    next_id: u64,
    version: u64,
    terminal: Option<Terminal>,
    hook: Option<ChangeHook>,
}

impl<T> State<T> {
    fn snapshot(&self) -> Delivery<T> {
        self.slots
            .iter()
            .map(|slot| (Arc::clone(&slot.observer), Arc::clone(&slot.live)))
            .collect()
    }

    /// Empty the registry, returning the observers that were still live.
    fn drain_live(&mut self) -> Vec<Arc<dyn Observer<T>>> {
        self.slots
            .drain(..)
            .filter(|slot| slot.live.swap(false, AtomicOrdering::AcqRel))
            .map(|slot| slot.observer)
            .collect()
    }
}

pub(crate) struct Shared<T: CellValue> {
    gate: ReentrantMutex<()>,
    state: Mutex<State<T>>,
    lifecycle: Lifecycle,
}

impl<T: CellValue> Shared<T> {
    fn new(value: T, distinct: bool, comparer: Option<Comparer<T>>) -> Self {
        Self {
            gate: ReentrantMutex::new(()),
            state: Mutex::new(State {
                value,
                distinct,
                comparer,
                slots: Vec::new(),
                next_id: 0,
                version: 0,
                terminal: None,
                hook: None,
            }),
            lifecycle: Lifecycle::new(),
        }
    }

    fn read(&self) -> T {
        let state = self.state.lock();
        if self.lifecycle.is_disposed() {
            return T::default();
        }
        state.value.clone()
    }

    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let state = self.state.lock();
        if self.lifecycle.is_disposed() {
            drop(state);
            return f(&T::default());
        }
        f(&state.value)
    }

    /// Apply `value` if it passes the disposal, terminal and distinct checks.
    fn push(&self, value: T) -> bool {
        if self.lifecycle.is_disposed() {
            return false;
        }
        let _gate = self.gate.lock();
        let (observers, hook, version) = {
            let mut state = self.state.lock();
            if self.lifecycle.is_disposed() || state.terminal.is_some() {
                return false;
            }
            if state.distinct && state.value == value {
                tracing::trace!(version = state.version, "cell value unchanged; skipped");
                return false;
            }
            state.value = value.clone();
            state.version += 1;
            (state.snapshot(), state.hook.clone(), state.version)
        };
        tracing::trace!(version, subscribers = observers.len(), "cell value accepted");
        for (observer, live) in &observers {
            if live.load(AtomicOrdering::Acquire) {
                observer.on_next(&value);
            }
        }
        if let Some(hook) = hook {
            if self.lifecycle.is_active() {
                hook();
            }
        }
        true
    }

    fn terminate(&self, terminal: Terminal) {
        if self.lifecycle.is_disposed() {
            return;
        }
        let _gate = self.gate.lock();
        let observers = {
            let mut state = self.state.lock();
            if self.lifecycle.is_disposed() || state.terminal.is_some() {
                return;
            }
            state.terminal = Some(terminal.clone());
            state.drain_live()
        };
        match &terminal {
            Terminal::Completed => {
                tracing::debug!(subscribers = observers.len(), "cell completed");
                for observer in &observers {
                    observer.on_completed();
                }
            }
            Terminal::Failed(error) => {
                tracing::debug!(subscribers = observers.len(), %error, "cell failed");
                for observer in &observers {
                    observer.on_error(error);
                }
            }
        }
    }

    fn subscribe(self: &Arc<Self>, observer: Arc<dyn Observer<T>>) -> Subscription {
        let _gate = self.gate.lock();
        let registration = {
            let mut state = self.state.lock();
            if self.lifecycle.is_disposed() {
                Err(Terminal::Completed)
            } else if let Some(terminal) = &state.terminal {
                Err(terminal.clone())
            } else {
                let id = state.next_id;
                state.next_id += 1;
                let live = Arc::new(AtomicBool::new(true));
                state.slots.push(Slot {
                    id,
                    observer: Arc::clone(&observer),
                    live: Arc::clone(&live),
                });
                Ok((id, live, state.value.clone()))
            }
        };
        match registration {
            Ok((id, live, current)) => {
                observer.on_next(&current);
                let weak = Arc::downgrade(self);
                Subscription::new(move || {
                    live.store(false, AtomicOrdering::Release);
                    if let Some(shared) = weak.upgrade() {
                        shared.state.lock().slots.retain(|slot| slot.id != id);
                    }
                })
            }
            Err(Terminal::Completed) => {
                observer.on_completed();
                Subscription::empty()
            }
            Err(Terminal::Failed(error)) => {
                observer.on_error(&error);
                Subscription::empty()
            }
        }
    }

    fn dispose(&self) {
        if !self.lifecycle.dispose() {
            return;
        }
        let _gate = self.gate.lock();
        let observers = {
            let mut state = self.state.lock();
            state.value = T::default();
            state.hook = None;
            state.drain_live()
        };
        tracing::debug!(subscribers = observers.len(), "cell disposed");
        for observer in &observers {
            observer.on_completed();
        }
    }
}

impl<T: CellValue> Drop for Shared<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Forwards an upstream source into a cell without keeping the cell alive.
struct Mirror<T: CellValue> {
    target: Weak<Shared<T>>,
}

impl<T: CellValue> Observer<T> for Mirror<T> {
    fn on_next(&self, value: &T) {
        if let Some(shared) = self.target.upgrade() {
            shared.push(value.clone());
        }
    }

    fn on_error(&self, error: &StreamError) {
        if let Some(shared) = self.target.upgrade() {
            shared.terminate(Terminal::Failed(Arc::clone(error)));
        }
    }

    fn on_completed(&self) {
        if let Some(shared) = self.target.upgrade() {
            shared.terminate(Terminal::Completed);
        }
    }
}

/// The right-hand side of a polymorphic equality check.
#[derive(Debug)]
pub enum Comparand<'a, T: CellValue> {
    /// A raw value.
    Value(&'a T),
    /// Another cell (or a bound property's cell).
    Cell(&'a RxCell<T>),
    /// A read-only view.
    View(&'a ReadOnlyCell<T>),
    /// Nothing; never equal.
    Null,
}

impl<'a, T: CellValue> From<&'a RxCell<T>> for Comparand<'a, T> {
    fn from(cell: &'a RxCell<T>) -> Self {
        Self::Cell(cell)
    }
}

impl<'a, T: CellValue> From<&'a ReadOnlyCell<T>> for Comparand<'a, T> {
    fn from(view: &'a ReadOnlyCell<T>) -> Self {
        Self::View(view)
    }
}

impl<'a, T: CellValue> From<Option<&'a RxCell<T>>> for Comparand<'a, T> {
    fn from(cell: Option<&'a RxCell<T>>) -> Self {
        cell.map_or(Self::Null, Self::Cell)
    }
}

impl<T: CellValue> Comparand<'_, T> {
    /// Whether `value` equals this comparand.
    pub(crate) fn matches(&self, value: &T) -> bool {
        match self {
            Self::Value(other) => value == *other,
            Self::Cell(cell) => cell.with(|other| value == other),
            Self::View(view) => view.with(|other| value == other),
            Self::Null => false,
        }
    }
}

/// Construction options for [`RxCell`].
pub struct RxCellBuilder<T: CellValue> {
    distinct: bool,
    comparer: Option<Comparer<T>>,
}

impl<T: CellValue> RxCellBuilder<T> {
    /// Distinct mode on, natural ordering.
    #[must_use]
    pub fn new() -> Self {
        Self {
            distinct: true,
            comparer: None,
        }
    }

    /// Whether equal consecutive values are filtered out.
    #[must_use]
    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    /// Ordering used by `compare_to` instead of `PartialOrd`.
    #[must_use]
    pub fn comparer(mut self, comparer: impl Fn(&T, &T) -> Ordering + Send + Sync + 'static) -> Self {
        self.comparer = Some(Arc::new(comparer));
        self
    }

    /// Build a cell holding `initial`.
    pub fn build(self, initial: T) -> RxCell<T> {
        RxCell {
            shared: Arc::new(Shared::new(initial, self.distinct, self.comparer)),
        }
    }

    /// Build from a raw value coerced to `T`.
    ///
    /// # Errors
    ///
    /// Returns the [`ConversionError`] when `raw` cannot be coerced.
    pub fn build_from_raw(self, raw: impl Into<RawValue>) -> Result<RxCell<T>, ConversionError>
    where
        T: Convertible,
    {
        Ok(self.build(T::from_raw(raw.into())?))
    }

    /// Build with `T::default()` and immediately mirror `source`.
    pub fn build_listening(self, source: &(impl Observable<T> + ?Sized)) -> RxCell<T> {
        let cell = self.build(T::default());
        cell.listen_to(source);
        cell
    }
}

impl<T: CellValue> Default for RxCellBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A shared, observable, observing value cell.
///
/// Cloning creates another handle to the **same** cell. The cell is
/// disposed explicitly via [`dispose`](Self::dispose), at the end of a
/// [`dispose_guard`](Self::dispose_guard) scope, or when the last handle is
/// dropped.
///
/// # Example
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use rxcell::{Observable, RxCell};
///
/// let connected = RxCell::new(false);
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let log = Arc::clone(&seen);
/// let _sub = connected.subscribe(move |v| log.lock().unwrap().push(*v));
///
/// connected.set(true);
/// connected.set(true); // filtered: unchanged
/// assert_eq!(*seen.lock().unwrap(), vec![false, true]);
/// ```
pub struct RxCell<T: CellValue> {
    shared: Arc<Shared<T>>,
}

impl<T: CellValue> Clone for RxCell<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: CellValue> RxCell<T> {
    /// Create a cell holding `initial`, in distinct mode.
    pub fn new(initial: T) -> Self {
        RxCellBuilder::new().build(initial)
    }

    /// Start configuring a cell (distinct mode, comparer).
    #[must_use]
    pub fn builder() -> RxCellBuilder<T> {
        RxCellBuilder::new()
    }

    /// Create a cell from a raw value coerced to `T`.
    ///
    /// ```
    /// use rxcell::RxCell;
    ///
    /// let flag = RxCell::<bool>::from_raw("true").unwrap();
    /// assert!(flag.value());
    /// assert!(RxCell::<bool>::from_raw("nope").is_err());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns the [`ConversionError`] when `raw` cannot be coerced.
    pub fn from_raw(raw: impl Into<RawValue>) -> Result<Self, ConversionError>
    where
        T: Convertible,
    {
        RxCellBuilder::new().build_from_raw(raw)
    }

    /// Create a cell with `T::default()` that mirrors `source` until disposed.
    pub fn listening(source: &(impl Observable<T> + ?Sized)) -> Self {
        RxCellBuilder::new().build_listening(source)
    }

    /// The current value, or `T::default()` once disposed.
    #[must_use]
    pub fn value(&self) -> T {
        self.shared.read()
    }

    /// Borrow the current value (the default once disposed).
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.shared.with(f)
    }

    /// Set the value; returns it for fluent use.
    pub fn set(&self, value: T) -> T {
        self.on_next(value)
    }

    /// Observer entry point. Ignored when disposed, terminated, or (in
    /// distinct mode) equal to the current value; otherwise stored and
    /// pushed to every subscriber in order. Returns `value`.
    pub fn on_next(&self, value: T) -> T {
        self.shared.push(value.clone());
        value
    }

    /// Like [`set`](Self::set), but reports whether the value was accepted.
    pub fn try_set(&self, value: T) -> bool {
        self.shared.push(value)
    }

    /// Mutate a copy of the current value and set it.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let mut next = self.value();
        f(&mut next);
        self.shared.push(next)
    }

    /// Forward an error to every subscriber. The cell stops accepting values
    /// but is not disposed.
    pub fn on_error(&self, error: StreamError) {
        self.shared.terminate(Terminal::Failed(error));
    }

    /// Forward completion to every subscriber. The cell stops accepting
    /// values but is not disposed.
    pub fn on_completed(&self) {
        self.shared.terminate(Terminal::Completed);
    }

    /// Whether `on_error` or `on_completed` has been received.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.shared.state.lock().terminal.is_some()
    }

    /// Whether equal consecutive values are filtered out.
    #[must_use]
    pub fn is_distinct_mode(&self) -> bool {
        self.shared.state.lock().distinct
    }

    /// Turn the distinct filter on or off for later mutations.
    pub fn set_distinct_mode(&self, distinct: bool) {
        self.shared.state.lock().distinct = distinct;
    }

    /// Number of accepted mutations so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.shared.state.lock().version
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared.state.lock().slots.len()
    }

    /// Mirror `source`: every value it emits goes through [`on_next`](Self::on_next).
    /// The subscription is scoped to this cell's cancellation token, so
    /// disposal detaches it.
    pub fn listen_to(&self, source: &(impl Observable<T> + ?Sized)) {
        if self.is_disposed() {
            return;
        }
        let mirror = Arc::new(Mirror {
            target: Arc::downgrade(&self.shared),
        });
        let subscription = source.subscribe_observer(mirror);
        tracing::debug!("cell listening to upstream source");
        self.shared.lifecycle.token().attach(subscription);
    }

    /// Subscribe `observer` until this cell is disposed.
    ///
    /// The registry keeps `observer` alive until then. Redirecting into
    /// another cell therefore keeps that cell from being dropped while this
    /// one lives; use [`listen_to`](Self::listen_to) on the target for a
    /// link that does not.
    pub fn redirect_to(&self, observer: Arc<dyn Observer<T>>) {
        let subscription = self.subscribe_observer(observer);
        self.shared.lifecycle.token().attach(subscription);
    }

    /// Subscribe `on_next` for as long as this cell is alive.
    pub fn notify(&self, on_next: impl Fn(&T) + Send + Sync + 'static) {
        let subscription = self.subscribe(on_next);
        self.shared.lifecycle.token().attach(subscription);
    }

    /// Replace the ordering used by [`compare_to`](Self::compare_to).
    pub fn set_comparer(&self, comparer: impl Fn(&T, &T) -> Ordering + Send + Sync + 'static) {
        self.shared.state.lock().comparer = Some(Arc::new(comparer));
    }

    /// Compare the current value with `other` using the configured comparer,
    /// or `PartialOrd` (incomparable values are `Equal`).
    pub fn compare_to(&self, other: &T) -> Ordering
    where
        T: PartialOrd,
    {
        let comparer = self.shared.state.lock().comparer.clone();
        let current = self.value();
        match comparer {
            Some(comparer) => comparer(&current, other),
            None => current.partial_cmp(other).unwrap_or(Ordering::Equal),
        }
    }

    /// `compare_to(other)` is `Less`.
    pub fn less_than(&self, other: &T) -> bool
    where
        T: PartialOrd,
    {
        self.compare_to(other) == Ordering::Less
    }

    /// `compare_to(other)` is not `Greater`.
    pub fn less_or_equal(&self, other: &T) -> bool
    where
        T: PartialOrd,
    {
        self.compare_to(other) != Ordering::Greater
    }

    /// `compare_to(other)` is `Greater`.
    pub fn greater_than(&self, other: &T) -> bool
    where
        T: PartialOrd,
    {
        self.compare_to(other) == Ordering::Greater
    }

    /// `compare_to(other)` is not `Less`.
    pub fn greater_or_equal(&self, other: &T) -> bool
    where
        T: PartialOrd,
    {
        self.compare_to(other) != Ordering::Less
    }

    /// Polymorphic equality against a value, another cell, a view or null.
    ///
    /// ```
    /// use rxcell::{Comparand, RxCell};
    ///
    /// let a = RxCell::new(3);
    /// let b = RxCell::new(3);
    /// assert!(a.equals(&b));
    /// assert!(a.equals(Comparand::Value(&3)));
    /// assert!(!a.equals(Comparand::Null));
    /// ```
    pub fn equals<'a>(&self, other: impl Into<Comparand<'a, T>>) -> bool {
        let other = other.into();
        if let Comparand::Cell(cell) = &other {
            if Arc::ptr_eq(&self.shared, &cell.shared) {
                return true;
            }
        }
        let current = self.value();
        other.matches(&current)
    }

    /// Whether the current value equals `other`.
    pub fn equals_value(&self, other: &T) -> bool {
        self.with(|current| current == other)
    }

    /// A read-only view of this cell.
    #[must_use]
    pub fn read_only(&self) -> ReadOnlyCell<T> {
        ReadOnlyCell::new(self)
    }

    /// Whether [`dispose`](Self::dispose) has run.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.shared.lifecycle.is_disposed()
    }

    /// Dispose the cell. Idempotent.
    pub fn dispose(&self) {
        self.shared.dispose();
    }

    /// Dispose this cell when the returned guard goes out of scope.
    pub fn dispose_guard(&self) -> DisposeGuard<Self> {
        DisposeGuard::new(self.clone())
    }

    /// The cell's cancellation signal; cancelled on disposal.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shared.lifecycle.token().clone()
    }

    pub(crate) fn downgrade(&self) -> Weak<Shared<T>> {
        Arc::downgrade(&self.shared)
    }

    pub(crate) fn from_shared(shared: Arc<Shared<T>>) -> Self {
        Self { shared }
    }

    pub(crate) fn set_change_hook(&self, hook: Option<ChangeHook>) {
        let mut state = self.shared.state.lock();
        if self.shared.lifecycle.is_active() {
            state.hook = hook;
        }
    }
}

impl RxCell<bool> {
    /// The current value.
    #[must_use]
    pub fn is_true(&self) -> bool {
        self.value()
    }

    /// The current value is `false` (also once disposed).
    #[must_use]
    pub fn is_false(&self) -> bool {
        !self.value()
    }

    /// Negation of the current value.
    #[must_use]
    pub fn not(&self) -> bool {
        !self.value()
    }

    /// Flip the value.
    pub fn toggle(&self) -> bool {
        self.update(|v| *v = !*v)
    }
}

impl<T: CellValue> Observable<T> for RxCell<T> {
    fn subscribe_observer(&self, observer: Arc<dyn Observer<T>>) -> Subscription {
        self.shared.subscribe(observer)
    }
}

impl<T: CellValue> Observer<T> for RxCell<T> {
    fn on_next(&self, value: &T) {
        self.shared.push(value.clone());
    }

    fn on_error(&self, error: &StreamError) {
        self.shared.terminate(Terminal::Failed(Arc::clone(error)));
    }

    fn on_completed(&self) {
        self.shared.terminate(Terminal::Completed);
    }
}

impl<T: CellValue> ReadValue<T> for RxCell<T> {
    fn value(&self) -> T {
        self.shared.read()
    }
}

impl<T: CellValue> Dispose for RxCell<T> {
    fn dispose(&self) {
        self.shared.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.shared.lifecycle.is_disposed()
    }
}

impl<T: CellValue> Default for RxCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: CellValue> From<T> for RxCell<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: CellValue> PartialEq for RxCell<T> {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl<T: CellValue + Eq> Eq for RxCell<T> {}

impl<T: CellValue + Hash> Hash for RxCell<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.with(|value| value.hash(state));
    }
}

impl<T: CellValue + fmt::Display> fmt::Display for RxCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with(|value| fmt::Display::fmt(value, f))
    }
}

impl<T: CellValue + fmt::Debug> fmt::Debug for RxCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("RxCell")
            .field("value", &state.value)
            .field("distinct", &state.distinct)
            .field("version", &state.version)
            .field("subscribers", &state.slots.len())
            .field("disposed", &self.shared.lifecycle.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter<T: CellValue>(cell: &RxCell<T>) -> (Arc<AtomicUsize>, Subscription) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let sub = cell.subscribe(move |_| {
            c.fetch_add(1, AtomicOrdering::SeqCst);
        });
        (count, sub)
    }

    fn recorder<T: CellValue>(cell: &RxCell<T>) -> (Arc<Mutex<Vec<T>>>, Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let sub = cell.subscribe(move |v: &T| s.lock().push(v.clone()));
        (seen, sub)
    }

    #[test]
    fn new_holds_initial_value() {
        let cell = RxCell::new(false);
        assert!(!cell.value());
        assert!(cell.is_distinct_mode());
        assert_eq!(cell.version(), 0);
    }

    #[test]
    fn set_updates_value_and_version() {
        let cell = RxCell::new(1);
        assert_eq!(cell.set(2), 2);
        assert_eq!(cell.value(), 2);
        assert_eq!(cell.version(), 1);
    }

    #[test]
    fn distinct_sequence_notifies_only_changes() {
        let cell = RxCell::new(false);
        let (count, _sub) = counter(&cell);
        count.store(0, AtomicOrdering::SeqCst);

        for v in [false, false, false, false, true, true, true, false] {
            cell.set(v);
        }
        assert_eq!(count.load(AtomicOrdering::SeqCst), 2);

        cell.set_distinct_mode(false);
        for _ in 0..3 {
            cell.set(false);
        }
        assert_eq!(count.load(AtomicOrdering::SeqCst), 5);
    }

    #[test]
    fn subscribe_replays_current_value_only() {
        let cell = RxCell::new(0);
        cell.set(1);
        cell.set(2);
        cell.set(3);
        let (seen, _sub) = recorder(&cell);
        assert_eq!(*seen.lock(), vec![3]);
        cell.set(4);
        assert_eq!(*seen.lock(), vec![3, 4]);
    }

    #[test]
    fn subscribers_notified_in_registration_order() {
        let cell = RxCell::new(0);
        let order = Arc::new(Mutex::new(Vec::new()));
        let subs: Vec<_> = (0..4)
            .map(|i| {
                let o = Arc::clone(&order);
                cell.subscribe(move |v: &i32| {
                    if *v == 9 {
                        o.lock().push(i);
                    }
                })
            })
            .collect();
        cell.set(9);
        assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
        drop(subs);
    }

    #[test]
    fn dropped_subscription_stops_delivery() {
        let cell = RxCell::new(0);
        let (count, sub) = counter(&cell);
        cell.set(1);
        drop(sub);
        cell.set(2);
        assert_eq!(count.load(AtomicOrdering::SeqCst), 2);
        assert_eq!(cell.subscriber_count(), 0);
    }

    #[test]
    fn unsubscribe_during_pass_skips_only_the_released_observer() {
        let cell = RxCell::new(0);
        let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let first_seen = Arc::new(AtomicUsize::new(0));
        let third_seen = Arc::new(AtomicUsize::new(0));

        let v = Arc::clone(&victim);
        let _first = cell.subscribe(move |value: &i32| {
            if *value == 1 {
                if let Some(sub) = v.lock().take() {
                    sub.unsubscribe();
                }
            }
        });
        let f = Arc::clone(&first_seen);
        *victim.lock() = Some(cell.subscribe(move |_| {
            f.fetch_add(1, AtomicOrdering::SeqCst);
        }));
        let t = Arc::clone(&third_seen);
        let _third = cell.subscribe(move |_| {
            t.fetch_add(1, AtomicOrdering::SeqCst);
        });

        cell.set(1);
        // Replay only; the pass for 1 skipped the released observer.
        assert_eq!(first_seen.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(third_seen.load(AtomicOrdering::SeqCst), 2);
    }

    #[test]
    fn subscribe_during_pass_receives_later_values() {
        let cell = RxCell::new(0);
        let late_seen = Arc::new(Mutex::new(Vec::new()));
        let late_sub: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let (first_seen, _first) = recorder(&cell);
        let inner = cell.clone();
        let slot = Arc::clone(&late_sub);
        let seen = Arc::clone(&late_seen);
        let _joiner = cell.subscribe(move |value: &i32| {
            if *value == 1 && slot.lock().is_none() {
                let s = Arc::clone(&seen);
                let sub = inner.subscribe(move |v: &i32| s.lock().push(*v));
                *slot.lock() = Some(sub);
            }
        });
        let (third_seen, _third) = recorder(&cell);

        cell.set(1);
        assert_eq!(*late_seen.lock(), vec![1]);
        cell.set(2);

        assert_eq!(*late_seen.lock(), vec![1, 2]);
        assert_eq!(*first_seen.lock(), vec![0, 1, 2]);
        assert_eq!(*third_seen.lock(), vec![0, 1, 2]);
        assert_eq!(cell.subscriber_count(), 4);
    }

    #[test]
    fn redirected_cell_lives_until_source_disposes() {
        let source = RxCell::new(0);
        let target = RxCell::new(0);
        let token = target.cancellation_token();
        let weak = target.downgrade();
        source.redirect_to(Arc::new(target));

        source.set(5);
        assert!(!token.is_cancelled());
        assert_eq!(weak.upgrade().map(|shared| shared.read()), Some(5));

        source.dispose();
        assert!(token.is_cancelled());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn reentrant_set_from_callback() {
        let cell = RxCell::new(0);
        let inner = cell.clone();
        let _sub = cell.subscribe(move |v: &i32| {
            if *v == 1 {
                inner.set(2);
            }
        });
        cell.set(1);
        assert_eq!(cell.value(), 2);
    }

    #[test]
    fn dispose_is_idempotent_and_completes_once() {
        let cell = RxCell::new(5);
        let completions = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&completions);
        let _sub = cell.subscribe_all(
            |_| {},
            |_| {},
            move || {
                c.fetch_add(1, AtomicOrdering::SeqCst);
            },
        );

        cell.dispose();
        cell.dispose();

        assert!(cell.is_disposed());
        assert_eq!(completions.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(cell.value(), 0);
        assert_eq!(cell.subscriber_count(), 0);
        assert!(cell.cancellation_token().is_cancelled());
    }

    #[test]
    fn disposed_cell_ignores_mutation_and_subscription() {
        let cell = RxCell::new(String::from("live"));
        cell.dispose();
        assert!(!cell.try_set("ignored".into()));
        assert_eq!(cell.value(), "");

        let completed = Arc::new(AtomicBool::new(false));
        let c = Arc::clone(&completed);
        let sub = cell.subscribe_all(
            |_| panic!("no values after disposal"),
            |_| {},
            move || c.store(true, AtomicOrdering::SeqCst),
        );
        assert!(!sub.is_active());
        assert!(completed.load(AtomicOrdering::SeqCst));
    }

    #[test]
    fn dropping_last_handle_disposes() {
        let cell = RxCell::new(1);
        let token = cell.cancellation_token();
        drop(cell);
        assert!(token.is_cancelled());
    }

    #[test]
    fn errors_are_forwarded_not_disposing() {
        let cell = RxCell::new(1);
        let errors = Arc::new(AtomicUsize::new(0));
        let e = Arc::clone(&errors);
        let _sub = cell.subscribe_all(
            |_| {},
            move |_| {
                e.fetch_add(1, AtomicOrdering::SeqCst);
            },
            || {},
        );
        cell.on_error(Arc::new(std::io::Error::other("upstream")));
        assert_eq!(errors.load(AtomicOrdering::SeqCst), 1);
        assert!(!cell.is_disposed());
        assert!(cell.is_terminated());
        assert_eq!(cell.value(), 1);

        // Terminated: no further values, late subscribers see the error.
        assert!(!cell.try_set(2));
        let late = Arc::new(AtomicUsize::new(0));
        let l = Arc::clone(&late);
        let _late = cell.subscribe_all(
            |_| {},
            move |_| {
                l.fetch_add(1, AtomicOrdering::SeqCst);
            },
            || {},
        );
        assert_eq!(late.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn completion_forwarded_once() {
        let cell = RxCell::new(1);
        let done = Arc::new(AtomicUsize::new(0));
        let d = Arc::clone(&done);
        let _sub = cell.subscribe_all(
            |_| {},
            |_| {},
            move || {
                d.fetch_add(1, AtomicOrdering::SeqCst);
            },
        );
        cell.on_completed();
        cell.on_completed();
        cell.dispose();
        assert_eq!(done.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn comparer_overrides_natural_order() {
        let cell = RxCell::new(10);
        assert_eq!(cell.compare_to(&5), Ordering::Greater);
        cell.set_comparer(|a: &i32, b: &i32| b.cmp(a));
        assert_eq!(cell.compare_to(&5), Ordering::Less);
        assert!(cell.less_than(&5));
        assert!(!cell.greater_or_equal(&5));
    }

    #[test]
    fn named_comparisons() {
        let cell = RxCell::new(3.5);
        assert!(cell.greater_than(&1.0));
        assert!(cell.greater_or_equal(&3.5));
        assert!(cell.less_or_equal(&3.5));
        assert!(cell.less_than(&4.0));
        assert_eq!(cell.compare_to(&f64::NAN), Ordering::Equal);
    }

    #[test]
    fn polymorphic_equality() {
        let a = RxCell::new(false);
        let b = RxCell::new(false);
        let c = RxCell::new(true);
        assert!(a.equals(&b));
        assert!(!a.equals(&c));
        assert!(a.equals(Comparand::Value(&false)));
        assert!(!a.equals(None::<&RxCell<bool>>));
        assert!(a.equals(&a.read_only()));
        assert!(a == b);
        assert!(a != c);
    }

    #[test]
    fn disposed_cells_compare_by_default_value() {
        let a = RxCell::new(7);
        let b = RxCell::new(9);
        a.dispose();
        b.dispose();
        assert!(a.equals(&b));
        assert!(a.equals(&RxCell::new(0)));
        assert_eq!(a.compare_to(&0), Ordering::Equal);
    }

    #[test]
    fn from_raw_coerces() {
        assert!(RxCell::<bool>::from_raw("true").unwrap().value());
        assert_eq!(RxCell::<char>::from_raw("C").unwrap().value(), 'C');
        assert_eq!(RxCell::<i32>::from_raw(" 42 ").unwrap().value(), 42);
        assert!(RxCell::<u8>::from_raw(-1).is_err());
    }

    #[test]
    fn builder_configures_mode_and_comparer() {
        let cell = RxCell::builder()
            .distinct(false)
            .comparer(|a: &i32, b: &i32| b.cmp(a))
            .build(1);
        let (count, _sub) = counter(&cell);
        cell.set(1);
        cell.set(1);
        assert_eq!(count.load(AtomicOrdering::SeqCst), 3);
        assert!(cell.greater_than(&2));
    }

    #[test]
    fn update_and_toggle() {
        let cell = RxCell::new(vec![1]);
        assert!(cell.update(|v| v.push(2)));
        assert_eq!(cell.value(), vec![1, 2]);

        let flag = RxCell::new(false);
        assert!(flag.toggle());
        assert!(flag.is_true());
        assert!(!flag.is_false());
        assert!(!flag.not());
    }

    #[test]
    fn notify_is_scoped_to_cell_lifetime() {
        let cell = RxCell::new(0);
        let seen = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&seen);
        cell.notify(move |_| {
            s.fetch_add(1, AtomicOrdering::SeqCst);
        });
        cell.set(1);
        assert_eq!(seen.load(AtomicOrdering::SeqCst), 2);
        assert_eq!(cell.subscriber_count(), 1);
        cell.dispose();
        assert_eq!(cell.subscriber_count(), 0);
    }

    #[test]
    fn display_and_debug() {
        let cell = RxCell::new(12);
        assert_eq!(cell.to_string(), "12");
        let debug = format!("{cell:?}");
        assert!(debug.contains("value: 12"));
        assert!(debug.contains("disposed: false"));
    }

    #[test]
    fn hash_follows_value() {
        use std::collections::hash_map::DefaultHasher;
        let hash = |cell: &RxCell<i32>| {
            let mut h = DefaultHasher::new();
            cell.hash(&mut h);
            h.finish()
        };
        let a = RxCell::new(4);
        let b = RxCell::new(4);
        assert_eq!(hash(&a), hash(&b));
    }
}

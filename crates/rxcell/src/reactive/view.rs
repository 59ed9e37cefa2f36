#![forbid(unsafe_code)]

//! Read-only projection of an [`RxCell`].
//!
//! A [`ReadOnlyCell`] holds a weak reference to the cell's shared state. It
//! never caches: every read, comparison and subscription is delegated to the
//! live cell. Once the cell is disposed, or every owning handle is gone,
//! the view reads as `T::default()` and subscriptions complete immediately.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use super::cell::{CellValue, Comparand, RxCell, Shared};
use super::observable::{Observable, Observer, ReadValue, Subscription};

/// A view exposing observation and reads, but no mutation.
pub struct ReadOnlyCell<T: CellValue> {
    source: Weak<Shared<T>>,
}

impl<T: CellValue> Clone for ReadOnlyCell<T> {
    fn clone(&self) -> Self {
        Self {
            source: Weak::clone(&self.source),
        }
    }
}

impl<T: CellValue> ReadOnlyCell<T> {
    pub(crate) fn new(cell: &RxCell<T>) -> Self {
        Self {
            source: cell.downgrade(),
        }
    }

    fn cell(&self) -> Option<RxCell<T>> {
        self.source.upgrade().map(RxCell::from_shared)
    }

    /// The source's current value, or `T::default()` once it is gone.
    #[must_use]
    pub fn value(&self) -> T {
        self.cell().map(|cell| cell.value()).unwrap_or_default()
    }

    /// Borrow the source's current value (the default once it is gone).
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        match self.cell() {
            Some(cell) => cell.with(f),
            None => f(&T::default()),
        }
    }

    /// Whether the source cell has been disposed or dropped.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.cell().is_none_or(|cell| cell.is_disposed())
    }

    /// Compare the source's value with `other`; see [`RxCell::compare_to`].
    pub fn compare_to(&self, other: &T) -> Ordering
    where
        T: PartialOrd,
    {
        match self.cell() {
            Some(cell) => cell.compare_to(other),
            None => T::default().partial_cmp(other).unwrap_or(Ordering::Equal),
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

    /// Polymorphic equality; see [`RxCell::equals`].
    pub fn equals<'a>(&self, other: impl Into<Comparand<'a, T>>) -> bool {
        let current = self.value();
        other.into().matches(&current)
    }

    /// Whether the source's value equals `other`.
    pub fn equals_value(&self, other: &T) -> bool {
        self.with(|current| current == other)
    }
}

impl ReadOnlyCell<bool> {
    /// The source's value.
    #[must_use]
    pub fn is_true(&self) -> bool {
        self.value()
    }

    /// The source's value is `false`.
    #[must_use]
    pub fn is_false(&self) -> bool {
        !self.value()
    }

    /// Negation of the source's value.
    #[must_use]
    pub fn not(&self) -> bool {
        !self.value()
    }
}

impl<T: CellValue> Observable<T> for ReadOnlyCell<T> {
    fn subscribe_observer(&self, observer: Arc<dyn Observer<T>>) -> Subscription {
        match self.cell() {
            Some(cell) => cell.subscribe_observer(observer),
            None => {
                observer.on_completed();
                Subscription::empty()
            }
        }
    }
}

impl<T: CellValue> ReadValue<T> for ReadOnlyCell<T> {
    fn value(&self) -> T {
        ReadOnlyCell::value(self)
    }
}

impl<T: CellValue> From<&RxCell<T>> for ReadOnlyCell<T> {
    fn from(cell: &RxCell<T>) -> Self {
        Self::new(cell)
    }
}

impl<T: CellValue> PartialEq for ReadOnlyCell<T> {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl<T: CellValue + Eq> Eq for ReadOnlyCell<T> {}

impl<T: CellValue + Hash> Hash for ReadOnlyCell<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.with(|value| value.hash(state));
    }
}

impl<T: CellValue + fmt::Display> fmt::Display for ReadOnlyCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with(|value| fmt::Display::fmt(value, f))
    }
}

impl<T: CellValue + fmt::Debug> fmt::Debug for ReadOnlyCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOnlyCell")
            .field("value", &self.value())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

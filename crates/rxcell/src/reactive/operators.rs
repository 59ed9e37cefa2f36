#![forbid(unsafe_code)]

//! Stateless stream operators and construction helpers.
//!
//! [`ObservableExt`] adds filtering and wiring helpers to every
//! [`Observable`]; [`IntoRxCell`] turns plain values into cells.
//!
//! Operators never buffer or reorder: a [`Filter`] forwards each upstream
//! notification synchronously, and terminal notifications always pass.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::cell::{CellValue, RxCell};
use super::observable::{Observable, Observer, StreamError, Subscription};
use super::property::BoundProperty;
use crate::lifecycle::CancellationToken;

type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;
type Tap<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Observable that forwards only values matching a predicate.
pub struct Filter<S, T> {
    source: S,
    predicate: Predicate<T>,
}

impl<S: Clone, T> Clone for Filter<S, T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<S: fmt::Debug, T> fmt::Debug for Filter<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter").field("source", &self.source).finish()
    }
}

struct FilterObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    predicate: Predicate<T>,
}

impl<T> Observer<T> for FilterObserver<T> {
    fn on_next(&self, value: &T) {
        if (self.predicate)(value) {
            self.downstream.on_next(value);
        }
    }

    fn on_error(&self, error: &StreamError) {
        self.downstream.on_error(error);
    }

    fn on_completed(&self) {
        self.downstream.on_completed();
    }
}

impl<S: Observable<T>, T: 'static> Observable<T> for Filter<S, T> {
    fn subscribe_observer(&self, observer: Arc<dyn Observer<T>>) -> Subscription {
        self.source.subscribe_observer(Arc::new(FilterObserver {
            downstream: observer,
            predicate: Arc::clone(&self.predicate),
        }))
    }
}

/// Observable that runs a side effect on each value before forwarding it.
pub struct Inspect<S, T> {
    source: S,
    tap: Tap<T>,
    _marker: PhantomData<fn(&T)>,
}

impl<S: fmt::Debug, T> fmt::Debug for Inspect<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inspect").field("source", &self.source).finish()
    }
}

struct InspectObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    tap: Tap<T>,
}

impl<T> Observer<T> for InspectObserver<T> {
    fn on_next(&self, value: &T) {
        (self.tap)(value);
        self.downstream.on_next(value);
    }

    fn on_error(&self, error: &StreamError) {
        self.downstream.on_error(error);
    }

    fn on_completed(&self) {
        self.downstream.on_completed();
    }
}

impl<S: Observable<T>, T: 'static> Observable<T> for Inspect<S, T> {
    fn subscribe_observer(&self, observer: Arc<dyn Observer<T>>) -> Subscription {
        self.source.subscribe_observer(Arc::new(InspectObserver {
            downstream: observer,
            tap: Arc::clone(&self.tap),
        }))
    }
}

/// Operators available on every [`Observable`].
pub trait ObservableExt<T: 'static>: Observable<T> + Sized {
    /// Forward only values for which `predicate` holds.
    fn filter(&self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Filter<Self, T>
    where
        Self: Clone,
    {
        Filter {
            source: self.clone(),
            predicate: Arc::new(predicate),
        }
    }

    /// Forward only values equal to `expected`.
    fn when(&self, expected: T) -> Filter<Self, T>
    where
        Self: Clone,
        T: PartialEq + Send + Sync,
    {
        self.filter(move |value| *value == expected)
    }

    /// Alias of [`when`](Self::when).
    fn if_value(&self, expected: T) -> Filter<Self, T>
    where
        Self: Clone,
        T: PartialEq + Send + Sync,
    {
        self.when(expected)
    }

    /// Forward only values different from `rejected`.
    fn if_not(&self, rejected: T) -> Filter<Self, T>
    where
        Self: Clone,
        T: PartialEq + Send + Sync,
    {
        self.filter(move |value| *value != rejected)
    }

    /// Run `tap` on each value on its way downstream.
    fn inspect(&self, tap: impl Fn(&T) + Send + Sync + 'static) -> Inspect<Self, T>
    where
        Self: Clone,
    {
        Inspect {
            source: self.clone(),
            tap: Arc::new(tap),
            _marker: PhantomData,
        }
    }

    /// Subscribe `observer` until `token` is cancelled. The observer is kept
    /// alive until then.
    fn redirect_until(&self, observer: Arc<dyn Observer<T>>, token: &CancellationToken) {
        token.attach(self.subscribe_observer(observer));
    }

    /// Subscribe `on_next` until `token` is cancelled.
    fn notify_until(&self, on_next: impl Fn(&T) + Send + Sync + 'static, token: &CancellationToken) {
        token.attach(self.subscribe(on_next));
    }

    /// A new cell that mirrors this source until disposed.
    fn to_rx_cell(&self) -> RxCell<T>
    where
        T: CellValue,
    {
        RxCell::listening(self)
    }

    /// A new bound property that mirrors this source until disposed.
    fn to_bound_property(&self) -> BoundProperty<T>
    where
        T: CellValue,
    {
        BoundProperty::listening(self)
    }
}

impl<T: 'static, O: Observable<T>> ObservableExt<T> for O {}

/// Wrap a plain value in a cell.
pub trait IntoRxCell: CellValue {
    fn into_rx_cell(self) -> RxCell<Self> {
        RxCell::new(self)
    }

    fn into_bound_property(self) -> BoundProperty<Self> {
        BoundProperty::new(self)
    }
}

impl<T: CellValue> IntoRxCell for T {}

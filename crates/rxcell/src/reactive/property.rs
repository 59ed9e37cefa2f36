#![forbid(unsafe_code)]

//! UI-bindable cells.
//!
//! A [`BoundProperty<T>`] is an [`RxCell<T>`] that additionally tells an
//! external change proxy when its value changes, so a data-binding layer can
//! re-read it. The proxy is any [`PropertyChangedProxy`]; wiring is done by
//! the binding layer through [`Bindable::bind_to`] (or [`bind_all`] for a
//! batch of properties).
//!
//! # Invariants
//!
//! 1. `notify_changed(label)` fires once per accepted mutation, after every
//!    subscriber has seen the value.
//! 2. Filtered (distinct) and post-disposal mutations never notify.
//! 3. At most one proxy is bound; binding again replaces it.
//! 4. The proxy is held weakly. A view model may own the properties it is
//!    bound to without keeping itself alive.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use rxcell::{Bindable, BoundProperty, PropertyChangedProxy};
//!
//! #[derive(Default)]
//! struct Changes(Mutex<Vec<String>>);
//!
//! impl PropertyChangedProxy for Changes {
//!     fn notify_changed(&self, property: &str) {
//!         self.0.lock().push(property.to_owned());
//!     }
//! }
//!
//! let changes = Arc::new(Changes::default());
//! let name = BoundProperty::new(String::new());
//! name.bind_to(changes.clone(), "name");
//!
//! name.set("Ada".into());
//! name.set("Ada".into());
//! assert_eq!(*changes.0.lock(), vec!["name".to_string()]);
//! ```

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::Mutex;

use super::cell::{CellValue, RxCell};
use super::observable::{Observable, Observer, ReadValue, StreamError, Subscription};
use crate::convert::{ConversionError, Convertible, RawValue};
use crate::lifecycle::Dispose;

/// Receives "property changed" notifications from bound properties.
pub trait PropertyChangedProxy: Send + Sync {
    fn notify_changed(&self, property: &str);
}

/// A property that can be attached to a [`PropertyChangedProxy`].
pub trait Bindable {
    /// Attach `target`, replacing any previous binding. Only a weak
    /// reference is kept; once `target` is dropped notifications stop.
    fn bind_to(&self, target: Arc<dyn PropertyChangedProxy>, label: &str);

    /// Detach the current target, if any.
    fn unbind(&self);

    /// The label of the current binding.
    fn bound_label(&self) -> Option<String>;
}

/// Bind every `(label, property)` pair to `target`.
pub fn bind_all(target: &Arc<dyn PropertyChangedProxy>, properties: &[(&str, &dyn Bindable)]) {
    for (label, property) in properties {
        property.bind_to(Arc::clone(target), label);
    }
    tracing::debug!(count = properties.len(), "bound properties to change proxy");
}

/// An [`RxCell`] that raises change notifications on a bound proxy.
///
/// Dereferences to the underlying cell, so every cell operation is
/// available directly.
pub struct BoundProperty<T: CellValue> {
    cell: RxCell<T>,
    label: Arc<Mutex<Option<String>>>,
}

impl<T: CellValue> Clone for BoundProperty<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            label: Arc::clone(&self.label),
        }
    }
}

impl<T: CellValue> BoundProperty<T> {
    /// Create an unbound property holding `initial`.
    pub fn new(initial: T) -> Self {
        Self::from_cell(RxCell::new(initial))
    }

    /// Wrap an existing cell. Any hook the cell already had is replaced on
    /// the next [`bind_to`](Bindable::bind_to).
    pub fn from_cell(cell: RxCell<T>) -> Self {
        Self {
            cell,
            label: Arc::new(Mutex::new(None)),
        }
    }

    /// # Errors
    ///
    /// Returns the [`ConversionError`] when `raw` cannot be coerced.
    pub fn from_raw(raw: impl Into<RawValue>) -> Result<Self, ConversionError>
    where
        T: Convertible,
    {
        RxCell::from_raw(raw).map(Self::from_cell)
    }

    /// Start with `T::default()` and mirror `source`.
    pub fn listening(source: &(impl Observable<T> + ?Sized)) -> Self {
        Self::from_cell(RxCell::listening(source))
    }

    /// The underlying cell handle.
    #[must_use]
    pub fn cell(&self) -> &RxCell<T> {
        &self.cell
    }

    /// Unwrap into the underlying cell, dropping the binding label.
    #[must_use]
    pub fn into_cell(self) -> RxCell<T> {
        self.cell
    }

    /// Whether a proxy has been bound.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.label.lock().is_some()
    }
}

impl<T: CellValue> Bindable for BoundProperty<T> {
    fn bind_to(&self, target: Arc<dyn PropertyChangedProxy>, label: &str) {
        if self.cell.is_disposed() {
            return;
        }
        let token = label.to_owned();
        *self.label.lock() = Some(token.clone());
        let target = Arc::downgrade(&target);
        self.cell.set_change_hook(Some(Arc::new(move || {
            if let Some(target) = target.upgrade() {
                target.notify_changed(&token);
            }
        })));
        tracing::debug!(property = label, "property bound");
    }

    fn unbind(&self) {
        self.label.lock().take();
        self.cell.set_change_hook(None);
    }

    fn bound_label(&self) -> Option<String> {
        self.label.lock().clone()
    }
}

impl<T: CellValue> Deref for BoundProperty<T> {
    type Target = RxCell<T>;

    fn deref(&self) -> &RxCell<T> {
        &self.cell
    }
}

impl<T: CellValue> Observable<T> for BoundProperty<T> {
    fn subscribe_observer(&self, observer: Arc<dyn Observer<T>>) -> Subscription {
        self.cell.subscribe_observer(observer)
    }
}

impl<T: CellValue> Observer<T> for BoundProperty<T> {
    fn on_next(&self, value: &T) {
        Observer::on_next(&self.cell, value);
    }

    fn on_error(&self, error: &StreamError) {
        Observer::on_error(&self.cell, error);
    }

    fn on_completed(&self) {
        Observer::on_completed(&self.cell);
    }
}

impl<T: CellValue> ReadValue<T> for BoundProperty<T> {
    fn value(&self) -> T {
        self.cell.value()
    }
}

impl<T: CellValue> Dispose for BoundProperty<T> {
    fn dispose(&self) {
        self.label.lock().take();
        self.cell.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.cell.is_disposed()
    }
}

impl<T: CellValue> Default for BoundProperty<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: CellValue> From<T> for BoundProperty<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: CellValue> From<RxCell<T>> for BoundProperty<T> {
    fn from(cell: RxCell<T>) -> Self {
        Self::from_cell(cell)
    }
}

impl<T: CellValue> PartialEq for BoundProperty<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cell == other.cell
    }
}

impl<T: CellValue + fmt::Display> fmt::Display for BoundProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.cell, f)
    }
}

impl<T: CellValue + fmt::Debug> fmt::Debug for BoundProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundProperty")
            .field("cell", &self.cell)
            .field("label", &*self.label.lock())
            .finish()
    }
}

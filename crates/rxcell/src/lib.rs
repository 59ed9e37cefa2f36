#![forbid(unsafe_code)]

//! Reactive value cells.
//!
//! An [`RxCell<T>`] holds one value, pushes every accepted change to its
//! subscribers, and can itself subscribe to another source. Around it:
//!
//! - [`lifecycle`]: disposal state, [`CancellationToken`] and scoped release
//! - [`convert`]: [`RawValue`] and the [`Convertible`] coercion contract
//! - [`reactive`]: cells, read-only views, bound properties and operators
//!
//! With the `serde` feature a cell serializes as its raw value only.
//!
//! ```
//! use rxcell::{ObservableExt, RxCell};
//!
//! let temperature = RxCell::new(18);
//! let display = temperature.to_rx_cell();
//! let warm = temperature.filter(|t| *t > 20).to_rx_cell();
//!
//! temperature.set(24);
//! assert_eq!(display.value(), 24);
//! assert_eq!(warm.value(), 24);
//!
//! temperature.dispose();
//! assert_eq!(temperature.value(), 0);
//! ```

pub mod convert;
pub mod lifecycle;
pub mod reactive;

#[cfg(feature = "serde")]
mod serde_impl;

pub use convert::{
    ConversionError, Convertible, RawValue, ValueConversions, ValueDescriptor, ValueKind,
};
pub use lifecycle::{CancellationToken, Dispose, DisposeGuard, Lifecycle};
pub use reactive::{
    Bindable, BoundProperty, CellValue, Comparand, Comparer, Container, ContainerKind, Filter,
    FnObserver, Inspect, IntoRxCell, Observable, ObservableExt, Observer, PropertyChangedProxy,
    ReadOnlyCell, ReadValue, RxCell, RxCellBuilder, StreamError, Subscription, bind_all,
};

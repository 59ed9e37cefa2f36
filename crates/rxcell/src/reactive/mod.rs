#![forbid(unsafe_code)]

//! Reactive cells and the observable contract they speak.
//!
//! - [`RxCell`]: a shared value cell that is both observable and observer.
//! - [`ReadOnlyCell`]: a non-owning, read-only projection of a cell.
//! - [`BoundProperty`]: a cell that tells a UI change proxy when it changes.
//! - [`Observable`] / [`Observer`] / [`Subscription`]: the push contract.
//! - [`ObservableExt`]: stateless filters and wiring helpers.
//!
//! # Architecture
//!
//! A cell handle is an `Arc` around shared state. The state holds the
//! value, the distinct flag, an optional comparer and an ordered registry
//! of observers. Notifications are delivered synchronously on the thread
//! that mutated the cell; there is no scheduler.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per accepted mutation.
//! 2. Subscribers are notified in registration order.
//! 3. In distinct mode, setting a value equal to the current one is a no-op.
//! 4. A new subscriber first receives the current value, then every later
//!    accepted value.
//! 5. Dropping a [`Subscription`] removes the observer before the next
//!    notification it would receive, even mid-pass.
//! 6. A disposed cell reads as `T::default()` and ignores mutation.

pub mod cell;
pub mod container;
pub mod observable;
pub mod operators;
pub mod property;
pub mod view;

pub use cell::{CellValue, Comparand, Comparer, RxCell, RxCellBuilder};
pub use container::{Container, ContainerKind};
pub use observable::{FnObserver, Observable, Observer, ReadValue, StreamError, Subscription};
pub use operators::{Filter, Inspect, IntoRxCell, ObservableExt};
pub use property::{Bindable, BoundProperty, PropertyChangedProxy, bind_all};
pub use view::ReadOnlyCell;

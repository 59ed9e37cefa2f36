#![forbid(unsafe_code)]

//! Static description of cell types for serialization adapters.
//!
//! Adapters never inspect types at runtime. A cell type states what it
//! wraps through [`Container`], and a primitive value type states how it
//! converts through [`Convertible::DESCRIPTOR`](crate::Convertible::DESCRIPTOR).

use super::cell::{CellValue, RxCell};
use super::property::BoundProperty;

/// Which cell flavour a [`Container`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Cell,
    BoundProperty,
}

/// A cell type that wraps a single value of type [`Value`](Self::Value).
pub trait Container: Sized {
    type Value: CellValue;

    const KIND: ContainerKind;

    /// Build a fresh container holding `value`.
    fn from_value(value: Self::Value) -> Self;

    /// The value as seen right now.
    fn snapshot(&self) -> Self::Value;
}

impl<T: CellValue> Container for RxCell<T> {
    type Value = T;

    const KIND: ContainerKind = ContainerKind::Cell;

    fn from_value(value: T) -> Self {
        RxCell::new(value)
    }

    fn snapshot(&self) -> T {
        self.value()
    }
}

impl<T: CellValue> Container for BoundProperty<T> {
    type Value = T;

    const KIND: ContainerKind = ContainerKind::BoundProperty;

    fn from_value(value: T) -> Self {
        BoundProperty::new(value)
    }

    fn snapshot(&self) -> T {
        self.cell().value()
    }
}

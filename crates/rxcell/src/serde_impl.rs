#![forbid(unsafe_code)]

//! `serde` support: a cell is written as its value and nothing else.
//!
//! Distinct mode, comparer, version and subscribers are runtime state and
//! are never serialized. Deserializing always produces a fresh cell in
//! distinct mode. Nested cells (`RxCell<RxCell<T>>`, a struct holding
//! cells) recurse through the value's own impls.

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

use crate::convert::RawValue;
use crate::reactive::{BoundProperty, CellValue, ReadOnlyCell, RxCell};

impl<T: CellValue + Serialize> Serialize for RxCell<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.with(|value| value.serialize(serializer))
    }
}

impl<'de, T: CellValue + Deserialize<'de>> Deserialize<'de> for RxCell<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(RxCell::new)
    }
}

impl<T: CellValue + Serialize> Serialize for BoundProperty<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.cell().serialize(serializer)
    }
}

impl<'de, T: CellValue + Deserialize<'de>> Deserialize<'de> for BoundProperty<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(BoundProperty::new)
    }
}

impl<T: CellValue + Serialize> Serialize for ReadOnlyCell<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.with(|value| value.serialize(serializer))
    }
}

impl Serialize for RawValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Char(c) => serializer.serialize_char(*c),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::UInt(u) => serializer.serialize_u64(*u),
            Self::Float(x) => serializer.serialize_f64(*x),
            Self::Text(s) => serializer.serialize_str(s),
            Self::DateTime(_) => serializer.collect_str(self),
        }
    }
}

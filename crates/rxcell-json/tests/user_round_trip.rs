//! A user profile made of cells survives a flat JSON round trip.

use proptest::prelude::*;
use rxcell::{BoundProperty, RxCell};
use rxcell_json::{FlatJson, FlatJsonError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Info {
    title: String,
    height: f64,
}

impl Default for Info {
    fn default() -> Self {
        Self {
            title: "Mr".into(),
            height: 76.5,
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct User {
    name: RxCell<String>,
    is_male: RxCell<bool>,
    age: BoundProperty<i32>,
    info: RxCell<Info>,
}

impl Default for User {
    fn default() -> Self {
        let user = Self {
            name: RxCell::new("John".into()),
            is_male: RxCell::new(true),
            age: BoundProperty::new(16),
            info: RxCell::new(Info::default()),
        };
        user.name.set_distinct_mode(false);
        user
    }
}

#[test]
fn user_round_trips_through_flat_json() {
    let json = FlatJson::indented();
    let original = User::default();
    let text = json.to_string(&original).unwrap();
    let restored: User = json.from_str(&text).unwrap();
    assert_eq!(original, restored);
}

#[test]
fn only_raw_values_are_written() {
    let text = FlatJson::new().to_string(&User::default()).unwrap();
    assert_eq!(
        text,
        r#"{"name":"John","is_male":true,"age":16,"info":{"title":"Mr","height":76.5}}"#
    );
    assert!(!text.contains("distinct"));
}

#[test]
fn restored_cells_are_independent_and_distinct() {
    let json = FlatJson::new();
    let original = User::default();
    let restored: User = json.from_value(json.to_value(&original).unwrap()).unwrap();

    assert!(restored.name.is_distinct_mode());
    restored.age.set(40);
    assert_eq!(original.age.value(), 16);
}

#[test]
fn nested_cell_in_cell() {
    let json = FlatJson::new();
    let nested = RxCell::new(RxCell::new(Info::default()));
    let text = json.to_string(&nested).unwrap();
    let back: RxCell<RxCell<Info>> = json.from_str(&text).unwrap();
    assert_eq!(back.value().value(), Info::default());
}

#[test]
fn shape_mismatch_is_a_json_error() {
    let err = FlatJson::new()
        .from_str::<RxCell<bool>>(r#""yes""#)
        .unwrap_err();
    assert!(matches!(err, FlatJsonError::Json(_)));
}

proptest! {
    #[test]
    fn integer_cells_round_trip(v in any::<i64>()) {
        let json = FlatJson::new();
        let text = json.to_string(&RxCell::new(v)).unwrap();
        prop_assert_eq!(&text, &v.to_string());
        let back: RxCell<i64> = json.from_raw_json(&text).unwrap();
        prop_assert_eq!(back.value(), v);
    }

    #[test]
    fn text_cells_accept_any_string(s in ".*") {
        let json = FlatJson::new();
        let text = json.to_string(&RxCell::new(s.clone())).unwrap();
        let back: RxCell<String> = json.from_str(&text).unwrap();
        prop_assert_eq!(back.value(), s);
    }
}

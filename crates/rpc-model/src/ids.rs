//! # Identifier Normalization
//!
//! Remote records are addressed by integer identifiers. Callers hand them over
//! in many shapes (a single id, a list, a JSON value returned by `search`, a
//! recordset), so every entry point funnels its input through [`IntoIds`].
//!
//! The conversion is total: false-ish inputs (`()`, `None`, `0`, `null`,
//! `false`, empty collections) become an empty list, scalars become a
//! one-element list, and collections keep their order and duplicates.

use serde_json::Value;
use std::ops::{Range, RangeInclusive};

/// Identifier of a remote record.
pub type RecordId = i64;

/// Conversion of heterogeneous identifier inputs into an ordered id list.
pub trait IntoIds {
    fn into_ids(self) -> Vec<RecordId>;
}

/// Normalizes `input` into the ordered identifier list used by `browse`.
pub fn normalize_ids(input: impl IntoIds) -> Vec<RecordId> {
    input.into_ids()
}

impl IntoIds for () {
    fn into_ids(self) -> Vec<RecordId> {
        Vec::new()
    }
}

macro_rules! scalar_ids {
    ($($t:ty),*) => {
        $(
            impl IntoIds for $t {
                fn into_ids(self) -> Vec<RecordId> {
                    match RecordId::try_from(self) {
                        Ok(0) | Err(_) => Vec::new(),
                        Ok(id) => vec![id],
                    }
                }
            }
        )*
    };
}

scalar_ids!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl<T: IntoIds> IntoIds for Option<T> {
    fn into_ids(self) -> Vec<RecordId> {
        self.map(IntoIds::into_ids).unwrap_or_default()
    }
}

impl IntoIds for &str {
    fn into_ids(self) -> Vec<RecordId> {
        self.trim().parse::<RecordId>().map(|id| vec![id]).unwrap_or_default()
    }
}

impl IntoIds for String {
    fn into_ids(self) -> Vec<RecordId> {
        self.as_str().into_ids()
    }
}

impl<T: Copy + Into<RecordId>> IntoIds for &[T] {
    fn into_ids(self) -> Vec<RecordId> {
        self.iter().map(|&id| id.into()).collect()
    }
}

impl<T: Copy + Into<RecordId>, const N: usize> IntoIds for [T; N] {
    fn into_ids(self) -> Vec<RecordId> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Into<RecordId>> IntoIds for Vec<T> {
    fn into_ids(self) -> Vec<RecordId> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Copy + Into<RecordId>> IntoIds for &Vec<T> {
    fn into_ids(self) -> Vec<RecordId> {
        self.as_slice().into_ids()
    }
}

impl IntoIds for Range<RecordId> {
    fn into_ids(self) -> Vec<RecordId> {
        self.collect()
    }
}

impl IntoIds for RangeInclusive<RecordId> {
    fn into_ids(self) -> Vec<RecordId> {
        self.collect()
    }
}

/// JSON input, typically the result of a remote `search`.
///
/// Array elements that are not integers are skipped.
impl IntoIds for &Value {
    fn into_ids(self) -> Vec<RecordId> {
        match self {
            Value::Number(n) => n.as_i64().into_ids(),
            Value::String(s) => s.as_str().into_ids(),
            Value::Array(items) => items.iter().filter_map(Value::as_i64).collect(),
            Value::Null | Value::Bool(_) | Value::Object(_) => Vec::new(),
        }
    }
}

impl IntoIds for Value {
    fn into_ids(self) -> Vec<RecordId> {
        (&self).into_ids()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_falsy_inputs_are_empty() {
        assert!(normalize_ids(()).is_empty());
        assert!(normalize_ids(None::<i64>).is_empty());
        assert!(normalize_ids(0).is_empty());
        assert!(normalize_ids(Vec::<i64>::new()).is_empty());
        assert!(normalize_ids(json!(null)).is_empty());
        assert!(normalize_ids(json!(false)).is_empty());
        assert!(normalize_ids("").is_empty());
    }

    #[test]
    fn test_scalars_become_singletons() {
        assert_eq!(normalize_ids(7), vec![7]);
        assert_eq!(normalize_ids(7u32), vec![7]);
        assert_eq!(normalize_ids(Some(3i64)), vec![3]);
        assert_eq!(normalize_ids("42"), vec![42]);
        assert_eq!(normalize_ids(String::from(" 5 ")), vec![5]);
        assert_eq!(normalize_ids(json!(12)), vec![12]);
    }

    #[test]
    fn test_collections_keep_order_and_duplicates() {
        assert_eq!(normalize_ids(vec![3, 1, 3]), vec![3, 1, 3]);
        assert_eq!(normalize_ids([5i32, 4]), vec![5, 4]);
        assert_eq!(normalize_ids(&[9i64, 8][..]), vec![9, 8]);
        assert_eq!(normalize_ids(2..5), vec![2, 3, 4]);
        assert_eq!(normalize_ids(json!([4, "x", 2])), vec![4, 2]);
    }

    #[test]
    fn test_unparsable_text_is_empty() {
        assert!(normalize_ids("abc").is_empty());
        assert!(normalize_ids(u64::MAX).is_empty());
    }
}

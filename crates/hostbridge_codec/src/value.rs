//! Dynamic wire value type.

use crate::encoder::to_cbor;
use std::cmp::Ordering;

/// A dynamic value carried in command payloads, configuration maps and
/// result packages.
///
/// Unlike storage formats, the wire allows floats: property values such as
/// lengths and areas are routinely fractional. NaN is still rejected by
/// both the encoder and the decoder.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer (full i64 range).
    Integer(i64),
    /// Double precision float (never NaN).
    Float(f64),
    /// Byte string.
    Bytes(Vec<u8>),
    /// Text string (UTF-8).
    Text(String),
    /// Ordered array of values.
    Array(Vec<Value>),
    /// Map of key-value pairs, kept in encoded-key order.
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Create a map value with keys sorted in encoded order.
    pub fn map(mut entries: Vec<(Value, Value)>) -> Self {
        entries.sort_by(|(a, _), (b, _)| a.cmp_encoded(b));
        Value::Map(entries)
    }

    /// Create a map value from text keys.
    pub fn text_map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::map(
            entries
                .into_iter()
                .map(|(k, v)| (Value::Text(k.into()), v))
                .collect(),
        )
    }

    /// Create an array value from anything convertible to values.
    pub fn array<T: Into<Value>, I: IntoIterator<Item = T>>(items: I) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }

    /// Compare two values by their encoded bytes: shorter encodings first,
    /// then bytewise. This is the order the encoder writes map keys in.
    pub fn cmp_encoded(&self, other: &Self) -> Ordering {
        let (a, b) = (
            to_cbor(self).unwrap_or_default(),
            to_cbor(other).unwrap_or_default(),
        );
        a.len().cmp(&b.len()).then_with(|| a.cmp(&b))
    }

    /// Short name of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Bytes(_) => "bytes",
            Value::Text(_) => "text",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }

    /// True for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        *self == Value::Null
    }

    /// The boolean, for [`Value::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        if let Value::Bool(b) = self {
            Some(*b)
        } else {
            None
        }
    }

    /// The integer, for [`Value::Integer`]. Floats are not truncated.
    pub fn as_integer(&self) -> Option<i64> {
        if let Value::Integer(n) = self {
            Some(*n)
        } else {
            None
        }
    }

    /// The number as a float; integers are widened.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Float(f) => Some(f),
            Value::Integer(n) => Some(n as f64),
            _ => None,
        }
    }

    /// The raw bytes, for [`Value::Bytes`].
    pub fn as_bytes(&self) -> Option<&[u8]> {
        if let Value::Bytes(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// The string, for [`Value::Text`].
    pub fn as_text(&self) -> Option<&str> {
        if let Value::Text(text) = self {
            Some(text)
        } else {
            None
        }
    }

    /// The items, for [`Value::Array`].
    pub fn as_array(&self) -> Option<&[Value]> {
        if let Value::Array(items) = self {
            Some(items)
        } else {
            None
        }
    }

    /// The entries, for [`Value::Map`].
    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        if let Value::Map(entries) = self {
            Some(entries)
        } else {
            None
        }
    }

    /// The entry stored under a text key, when this is a map.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.text_entries()
            .find_map(|(k, v)| (k == key).then_some(v))
    }

    /// Text-keyed entries of a map; other keys are skipped.
    pub fn text_entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.as_map()
            .unwrap_or_default()
            .iter()
            .filter_map(|(k, v)| Some((k.as_text()?, v)))
    }
}

macro_rules! value_from {
    ($($source:ty => |$v:ident| $body:expr;)*) => {
        $(
            impl From<$source> for Value {
                fn from($v: $source) -> Self {
                    $body
                }
            }
        )*
    };
}

value_from! {
    bool => |b| Value::Bool(b);
    i64 => |n| Value::Integer(n);
    i32 => |n| Value::Integer(n.into());
    u32 => |n| Value::Integer(n.into());
    f64 => |f| Value::Float(f);
    String => |text| Value::Text(text);
    &str => |text| Value::Text(text.to_owned());
    Vec<u8> => |bytes| Value::Bytes(bytes);
    &[u8] => |bytes| Value::Bytes(bytes.to_vec());
    Vec<Value> => |items| Value::Array(items);
    () => |_unit| Value::Null;
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(map: &Value) -> Vec<&str> {
        map.text_entries().map(|(k, _)| k).collect()
    }

    #[test]
    fn text_maps_sort_by_encoded_key() {
        let map = Value::text_map([
            ("width", Value::Integer(1)),
            ("id", Value::Integer(2)),
            ("area", Value::Integer(3)),
            ("x", Value::Integer(4)),
        ]);
        assert_eq!(keys(&map), ["x", "id", "area", "width"]);
    }

    #[test]
    fn integer_keys_sort_first_and_are_skipped_by_text_entries() {
        let map = Value::map(vec![
            (Value::from("b"), Value::from(2)),
            (Value::from(-3), Value::Null),
        ]);
        assert_eq!(map.as_map().unwrap()[0].0, Value::Integer(-3));
        assert_eq!(keys(&map), ["b"]);
    }

    #[test]
    fn lookups() {
        let map = Value::text_map([("span", Value::Float(6.0)), ("level", Value::from(2))]);
        assert_eq!(map.get("span").and_then(Value::as_f64), Some(6.0));
        assert_eq!(map.get("level").and_then(Value::as_f64), Some(2.0));
        assert_eq!(map.get("level").and_then(Value::as_integer), Some(2));
        assert!(map.get("depth").is_none());
        assert!(Value::from("span").get("span").is_none());
        assert_eq!(Value::Float(1.5).as_integer(), None);
        assert_eq!(Value::from("t").as_text(), Some("t"));
        assert!(Value::from(()).is_null());
    }

    #[test]
    fn conversions() {
        assert_eq!(Value::from(7u32), Value::Integer(7));
        assert_eq!(Value::from(&b"ab"[..]), Value::Bytes(b"ab".to_vec()));
        assert_eq!(Value::from(Some(1.25)), Value::Float(1.25));
        assert_eq!(Value::from(None::<String>), Value::Null);
        assert_eq!(
            Value::array([1, 2]),
            Value::Array(vec![Value::Integer(1), Value::Integer(2)])
        );
        assert_eq!(Value::Bytes(vec![]).type_name(), "bytes");
    }
}

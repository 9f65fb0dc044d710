//! Value encoding for the key-value client
//!
//! Every accessor of the client routes through one [`Serializer`], so scalar
//! values and list elements share a single encode/decode path. The serializer
//! is a type parameter of the client, resolved at compile time.
//!
//! List elements are stored as discrete, self-contained encoded values.
//! [`Serializer::unmarshal_seq`] reassembles them into one sequence.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Encoding strategy for stored values
pub trait Serializer: Send + Sync + Clone + 'static {
    /// Encode a value
    fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    /// Decode a value
    fn unmarshal<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T>;

    /// Decode a sequence of independently encoded elements
    ///
    /// The default implementation decodes element by element.
    fn unmarshal_seq<T: DeserializeOwned>(&self, items: &[Vec<u8>]) -> Result<Vec<T>> {
        items.iter().map(|item| self.unmarshal(item)).collect()
    }
}

/// JSON encoding (default): human-inspectable, self-describing
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn unmarshal<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Joins the elements into one JSON array and decodes it in a single pass.
    fn unmarshal_seq<T: DeserializeOwned>(&self, items: &[Vec<u8>]) -> Result<Vec<T>> {
        let body_len: usize = items.iter().map(|i| i.len() + 1).sum();
        let mut array = Vec::with_capacity(body_len + 2);
        array.push(b'[');
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                array.push(b',');
            }
            array.extend_from_slice(item);
        }
        array.push(b']');
        Ok(serde_json::from_slice(&array)?)
    }
}

/// MessagePack encoding: compact binary alternative
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackSerializer;

impl Serializer for MsgPackSerializer {
    fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    fn unmarshal<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Nested {
        label: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Record {
        int: i64,
        text: String,
        float: f32,
        nested: Nested,
    }

    fn records() -> Vec<Record> {
        vec![
            Record {
                int: 1,
                text: "1".into(),
                float: 1.5,
                nested: Nested { label: "nested1".into() },
            },
            Record {
                int: 2,
                text: "2".into(),
                float: 2.5,
                nested: Nested { label: "nested2".into() },
            },
        ]
    }

    #[test]
    fn test_json_is_human_readable() {
        let bytes = JsonSerializer.marshal("+5V23yMex8GY5ZWFi").unwrap();
        assert_eq!(bytes, b"\"+5V23yMex8GY5ZWFi\"");
    }

    #[test]
    fn test_json_seq_joins_elements() {
        let s = JsonSerializer;
        let items: Vec<Vec<u8>> = records().iter().map(|r| s.marshal(r).unwrap()).collect();
        let decoded: Vec<Record> = s.unmarshal_seq(&items).unwrap();
        assert_eq!(decoded, records());
    }

    #[test]
    fn test_json_seq_of_scalars() {
        let s = JsonSerializer;
        let items: Vec<Vec<u8>> = [1, 2, 3].iter().map(|v| s.marshal(v).unwrap()).collect();
        let decoded: Vec<i32> = s.unmarshal_seq(&items).unwrap();
        assert_eq!(decoded, vec![1, 2, 3]);
    }

    #[test]
    fn test_json_seq_rejects_corrupt_element() {
        let s = JsonSerializer;
        let items = vec![b"1".to_vec(), b"{broken".to_vec()];
        assert!(s.unmarshal_seq::<i32>(&items).is_err());
    }

    #[test]
    fn test_msgpack_seq_per_element() {
        let s = MsgPackSerializer;
        let items: Vec<Vec<u8>> = records().iter().map(|r| s.marshal(r).unwrap()).collect();
        let decoded: Vec<Record> = s.unmarshal_seq(&items).unwrap();
        assert_eq!(decoded, records());
    }

    #[test]
    fn test_type_mismatch_is_serialization_error() {
        let bytes = JsonSerializer.marshal("text").unwrap();
        let err = JsonSerializer.unmarshal::<u64>(&bytes).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Serialization);
    }
}

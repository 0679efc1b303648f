//! # Hostbridge Codec
//!
//! Deterministic CBOR encoding/decoding for values crossing the host bridge.
//!
//! Every command payload, configuration map and result package travels as a
//! tree of [`Value`]s. The codec guarantees:
//! - Identical values produce identical bytes
//! - Map keys are written in encoded order (length-first, then bytewise)
//! - Integers use the shortest head, floats the 8-byte form
//! - No indefinite-length items, tags or NaN
//!
//! ## Usage
//!
//! ```
//! use hostbridge_codec::{from_cbor, to_cbor, Value};
//!
//! let value = Value::text_map([("height", Value::Float(3.2))]);
//! let bytes = to_cbor(&value).unwrap();
//! assert_eq!(from_cbor(&bytes).unwrap(), value);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod value;

pub use decoder::{from_cbor, Decoder};
pub use encoder::{to_cbor, Encoder};
pub use error::{CodecError, CodecResult};
pub use value::Value;

/// Types that can be written as CBOR bytes.
pub trait Encode {
    /// Encode this value to CBOR bytes.
    fn encode(&self) -> CodecResult<Vec<u8>>;
}

/// Types that can be read from CBOR bytes.
pub trait Decode: Sized {
    /// Decode this value from CBOR bytes.
    fn decode(bytes: &[u8]) -> CodecResult<Self>;
}

impl Encode for Value {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        to_cbor(self)
    }
}

impl Decode for Value {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        from_cbor(bytes)
    }
}

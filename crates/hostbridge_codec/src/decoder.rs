//! CBOR decoder.
//!
//! Only the canonical subset written by [`crate::to_cbor`] is accepted, so
//! a decoded value always re-encodes to the bytes it came from.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use std::cmp::Ordering;

/// Element cap for one array or map; guards preallocation on hostile input.
const ELEMENT_LIMIT: u64 = 16 * 1024 * 1024;

/// Length cap for one byte or text string.
const STRING_LIMIT: u64 = 256 * 1024 * 1024;

// Major types.
const UNSIGNED: u8 = 0;
const NEGATIVE: u8 = 1;
const BYTES: u8 = 2;
const TEXT: u8 = 3;
const ARRAY: u8 = 4;
const MAP: u8 = 5;
const TAG: u8 = 6;

/// Decode exactly one value from CBOR bytes.
///
/// # Errors
///
/// Fails on malformed input, on constructs outside the canonical subset
/// (indefinite lengths, tags, half or single floats, unordered map keys,
/// over-long integer heads) and on trailing bytes.
pub fn from_cbor(bytes: &[u8]) -> CodecResult<Value> {
    let mut decoder = Decoder::new(bytes);
    let value = decoder.decode()?;
    match decoder.remaining().len() {
        0 => Ok(value),
        remaining => Err(CodecError::TrailingBytes { remaining }),
    }
}

/// Reads values from a borrowed buffer, one at a time.
pub struct Decoder<'a> {
    input: &'a [u8],
    offset: usize,
}

impl<'a> Decoder<'a> {
    /// Starts reading at the beginning of `input`.
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, offset: 0 }
    }

    /// Reads the next complete value.
    pub fn decode(&mut self) -> CodecResult<Value> {
        let lead = self.take_byte()?;
        let (major, info) = (lead >> 5, lead & 0x1f);

        match major {
            UNSIGNED => self.integer(info, |n| n),
            NEGATIVE => self.integer(info, |n| -1 - n),
            BYTES => {
                let len = self.length(info, STRING_LIMIT)?;
                Ok(Value::Bytes(self.take(len)?.to_vec()))
            }
            TEXT => {
                let len = self.length(info, STRING_LIMIT)?;
                let raw = self.take(len)?;
                std::str::from_utf8(raw)
                    .map(|s| Value::Text(s.to_owned()))
                    .map_err(|_| CodecError::InvalidUtf8)
            }
            ARRAY => self.array(info),
            MAP => self.map(info),
            TAG => Err(CodecError::unsupported_type("tagged value")),
            _ => self.simple(info),
        }
    }

    /// True once every input byte has been read.
    pub fn is_empty(&self) -> bool {
        self.remaining().is_empty()
    }

    /// The bytes not read yet.
    pub fn remaining(&self) -> &[u8] {
        self.input.get(self.offset..).unwrap_or_default()
    }

    fn take_byte(&mut self) -> CodecResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn take(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        let input = self.input;
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= input.len())
            .ok_or(CodecError::UnexpectedEof)?;
        let slice = &input[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn take_fixed<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    /// Reads the argument of a head, insisting on the shortest form.
    fn argument(&mut self, info: u8) -> CodecResult<u64> {
        let (arg, minimum) = match info {
            0..=23 => return Ok(u64::from(info)),
            24 => (u64::from(self.take_byte()?), 24),
            25 => (u64::from(u16::from_be_bytes(self.take_fixed()?)), 0x100),
            26 => (u64::from(u32::from_be_bytes(self.take_fixed()?)), 0x1_0000),
            27 => (u64::from_be_bytes(self.take_fixed()?), 0x1_0000_0000),
            31 => return Err(CodecError::IndefiniteLengthForbidden),
            _ => return Err(CodecError::invalid_structure("reserved additional info")),
        };
        if arg < minimum {
            return Err(CodecError::invalid_structure("integer head not in shortest form"));
        }
        Ok(arg)
    }

    fn integer(&mut self, info: u8, sign: fn(i64) -> i64) -> CodecResult<Value> {
        let arg = self.argument(info)?;
        let magnitude =
            i64::try_from(arg).map_err(|_| CodecError::invalid_structure("integer exceeds i64"))?;
        Ok(Value::Integer(sign(magnitude)))
    }

    fn length(&mut self, info: u8, limit: u64) -> CodecResult<usize> {
        let claimed = self.argument(info)?;
        if claimed > limit {
            return Err(CodecError::SizeLimitExceeded {
                claimed,
                max_allowed: limit,
            });
        }
        usize::try_from(claimed).map_err(|_| CodecError::SizeLimitExceeded {
            claimed,
            max_allowed: limit,
        })
    }

    fn array(&mut self, info: u8) -> CodecResult<Value> {
        let count = self.length(info, ELEMENT_LIMIT)?;
        // Every element needs at least one byte of input.
        let mut items = Vec::with_capacity(count.min(self.remaining().len()));
        while items.len() < count {
            items.push(self.decode()?);
        }
        Ok(Value::Array(items))
    }

    fn map(&mut self, info: u8) -> CodecResult<Value> {
        let count = self.length(info, ELEMENT_LIMIT)?;
        let mut entries = Vec::with_capacity(count.min(self.remaining().len() / 2));
        let mut last_key: Option<&'a [u8]> = None;

        while entries.len() < count {
            let (input, start) = (self.input, self.offset);
            let key = self.decode()?;
            let raw_key = &input[start..self.offset];
            if last_key.is_some_and(|last| canonical_order(last, raw_key) != Ordering::Less) {
                return Err(CodecError::invalid_structure("map keys not strictly increasing"));
            }
            last_key = Some(raw_key);
            entries.push((key, self.decode()?));
        }

        Ok(Value::Map(entries))
    }

    fn simple(&mut self, info: u8) -> CodecResult<Value> {
        match info {
            20 | 21 => Ok(Value::Bool(info == 21)),
            22 | 23 => Ok(Value::Null),
            25 | 26 => Err(CodecError::invalid_structure("floats must use the 8-byte form")),
            27 => {
                let float = f64::from_be_bytes(self.take_fixed()?);
                if float.is_nan() {
                    Err(CodecError::NaNForbidden)
                } else {
                    Ok(Value::Float(float))
                }
            }
            31 => Err(CodecError::invalid_structure("break without indefinite item")),
            other => Err(CodecError::unsupported_type(format!("simple value {other}"))),
        }
    }
}

/// Shorter encodings sort first, equal lengths compare bytewise.
fn canonical_order(a: &[u8], b: &[u8]) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

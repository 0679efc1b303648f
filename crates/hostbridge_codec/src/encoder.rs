//! Deterministic CBOR encoder.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;

/// Encode a value to CBOR bytes.
///
/// The output is canonical: integer and length heads use their shortest
/// form, floats always take the 8-byte form and map entries are ordered by
/// their encoded keys (shorter first, then bytewise). Equal values therefore
/// always produce equal frames.
///
/// # Errors
///
/// Fails when the value holds a NaN or a map repeats a key.
pub fn to_cbor(value: &Value) -> CodecResult<Vec<u8>> {
    let mut encoder = Encoder::new();
    encoder.encode(value)?;
    Ok(encoder.into_bytes())
}

/// Appends canonical CBOR to an owned buffer.
#[derive(Debug, Default)]
pub struct Encoder {
    out: Vec<u8>,
}

impl Encoder {
    /// An encoder with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// An encoder whose buffer can hold `capacity` bytes without growing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            out: Vec::with_capacity(capacity),
        }
    }

    /// Appends `value`.
    pub fn encode(&mut self, value: &Value) -> CodecResult<()> {
        match value {
            Value::Null => self.out.push(0xf6),
            Value::Bool(false) => self.out.push(0xf4),
            Value::Bool(true) => self.out.push(0xf5),
            Value::Integer(n) if *n >= 0 => self.head(0, n.unsigned_abs()),
            // -1 travels as 0, -2 as 1, and so on.
            Value::Integer(n) => self.head(1, (n + 1).unsigned_abs()),
            Value::Float(f) => {
                if f.is_nan() {
                    return Err(CodecError::NaNForbidden);
                }
                self.out.push(0xfb);
                self.out.extend_from_slice(&f.to_be_bytes());
            }
            Value::Bytes(bytes) => self.string(2, bytes),
            Value::Text(text) => self.string(3, text.as_bytes()),
            Value::Array(items) => {
                self.head(4, items.len() as u64);
                items.iter().try_for_each(|item| self.encode(item))?;
            }
            Value::Map(entries) => self.map(entries)?,
        }
        Ok(())
    }

    /// The bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.out
    }

    /// Takes the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.out
    }

    #[allow(clippy::cast_possible_truncation)]
    fn head(&mut self, major: u8, arg: u64) {
        let lead = major << 5;
        match arg {
            0..=23 => self.out.push(lead | arg as u8),
            24..=0xff => self.out.extend_from_slice(&[lead | 24, arg as u8]),
            0x100..=0xffff => {
                self.out.push(lead | 25);
                self.out.extend_from_slice(&(arg as u16).to_be_bytes());
            }
            0x1_0000..=0xffff_ffff => {
                self.out.push(lead | 26);
                self.out.extend_from_slice(&(arg as u32).to_be_bytes());
            }
            _ => {
                self.out.push(lead | 27);
                self.out.extend_from_slice(&arg.to_be_bytes());
            }
        }
    }

    fn string(&mut self, major: u8, bytes: &[u8]) {
        self.head(major, bytes.len() as u64);
        self.out.extend_from_slice(bytes);
    }

    fn map(&mut self, entries: &[(Value, Value)]) -> CodecResult<()> {
        let mut keyed = entries
            .iter()
            .map(|(key, value)| Ok((to_cbor(key)?, value)))
            .collect::<CodecResult<Vec<_>>>()?;
        keyed.sort_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        if keyed.windows(2).any(|pair| pair[0].0 == pair[1].0) {
            return Err(CodecError::encoding_failed("duplicate map key"));
        }

        self.head(5, keyed.len() as u64);
        for (key, value) in keyed {
            self.out.extend_from_slice(&key);
            self.encode(value)?;
        }
        Ok(())
    }
}

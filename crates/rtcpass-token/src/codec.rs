//! Primitive wire encoders.
//!
//! All integers are little-endian. Variable-length fields carry a `u16`
//! length prefix, so no field may exceed 65535 bytes. Out-of-range values
//! are rejected rather than truncated.

use crate::error::TokenError;

/// Encode `value` as a 2-byte little-endian integer.
pub fn encode_u16(value: u64) -> Result<[u8; 2], TokenError> {
    u16::try_from(value)
        .map(u16::to_le_bytes)
        .map_err(|_| TokenError::ValueOutOfRange { bits: 16, value })
}

/// Encode `value` as a 4-byte little-endian integer.
pub fn encode_u32(value: u64) -> Result<[u8; 4], TokenError> {
    u32::try_from(value)
        .map(u32::to_le_bytes)
        .map_err(|_| TokenError::ValueOutOfRange { bits: 32, value })
}

/// Encode `data` behind a `u16` length prefix.
pub fn encode_bytes(data: &[u8]) -> Result<Vec<u8>, TokenError> {
    let mut packer = Packer::with_capacity(2 + data.len());
    packer.put_bytes("bytes", data)?;
    Ok(packer.into_bytes())
}

/// Encode the UTF-8 bytes of `s` behind a `u16` length prefix.
pub fn encode_str(s: &str) -> Result<Vec<u8>, TokenError> {
    encode_bytes(s.as_bytes())
}

/// Checked conversion of a length or count into the `u16` prefix width.
pub(crate) fn length_prefix(field: &'static str, len: usize) -> Result<u16, TokenError> {
    u16::try_from(len).map_err(|_| TokenError::LengthOverflow { field, len })
}

/// Append-only writer for the token's binary structures.
#[derive(Debug, Default)]
pub struct Packer {
    buf: Vec<u8>,
}

impl Packer {
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { buf: Vec::with_capacity(capacity) }
    }

    pub fn put_u16(&mut self, value: u16) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn put_u32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Append `data` behind its `u16` length. `field` names the value in the
    /// error if it is too long.
    pub fn put_bytes(&mut self, field: &'static str, data: &[u8]) -> Result<&mut Self, TokenError> {
        let len = length_prefix(field, data.len())?;
        self.put_u16(len);
        self.buf.extend_from_slice(data);
        Ok(self)
    }

    pub fn put_str(&mut self, field: &'static str, s: &str) -> Result<&mut Self, TokenError> {
        self.put_bytes(field, s.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor reading back what [`Packer`] wrote.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug)]
pub struct Unpacker<'a> {
    data: &'a [u8],
    pos: usize,
}

#[cfg(any(test, feature = "test-utils"))]
impl<'a> Unpacker<'a> {
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], TokenError> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.data.len()).ok_or_else(|| {
            TokenError::Malformed(format!(
                "need {n} bytes at offset {}, have {}",
                self.pos,
                self.data.len() - self.pos
            ))
        })?;
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    pub fn u16(&mut self) -> Result<u16, TokenError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn u32(&mut self) -> Result<u32, TokenError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn bytes(&mut self) -> Result<&'a [u8], TokenError> {
        let len = self.u16()?;
        self.take(usize::from(len))
    }

    pub const fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message trait: the encode/decode contract between typed entities and the
//! byte-oriented transport layer.
//!
//! Type-support code generation is out of scope for this crate; the built-in
//! impls for scalars, `String` and `Vec<u8>` cover the internal message types
//! and give applications a starting point. Encoding is little-endian
//! throughout.

use crate::error::{Error, Result};

/// Contract for types that can travel over a topic or service.
///
/// `Clone` is required because a published message may be delivered both
/// through the intra-process path (by ownership transfer) and serialized for
/// observers in other processes.
pub trait Message: Clone + Send + Sync + 'static {
    /// Stable name of this type, used for endpoint matching.
    fn type_name() -> &'static str;

    /// Encode into a fresh little-endian buffer.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the value cannot be represented.
    fn encode(&self) -> Result<Vec<u8>>;

    /// Decode from a little-endian buffer.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the buffer is truncated or contains invalid data.
    fn decode(buf: &[u8]) -> Result<Self>;
}

macro_rules! impl_scalar_message {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Message for $ty {
                fn type_name() -> &'static str {
                    stringify!($ty)
                }

                fn encode(&self) -> Result<Vec<u8>> {
                    Ok(self.to_le_bytes().to_vec())
                }

                fn decode(buf: &[u8]) -> Result<Self> {
                    let bytes: [u8; core::mem::size_of::<$ty>()] =
                        buf.try_into().map_err(|_| {
                            Error::Serialization(format!(
                                "expected {} bytes for {}, got {}",
                                core::mem::size_of::<$ty>(),
                                stringify!($ty),
                                buf.len()
                            ))
                        })?;
                    Ok(<$ty>::from_le_bytes(bytes))
                }
            }
        )*
    };
}

impl_scalar_message!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl Message for bool {
    fn type_name() -> &'static str {
        "bool"
    }

    fn encode(&self) -> Result<Vec<u8>> {
        Ok(vec![u8::from(*self)])
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        match buf {
            [0] => Ok(false),
            [1] => Ok(true),
            _ => Err(Error::Serialization(format!(
                "expected 1 byte for bool, got {}",
                buf.len()
            ))),
        }
    }
}

impl Message for String {
    fn type_name() -> &'static str {
        "string"
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(4 + self.len());
        wire::put_str(&mut buf, self);
        Ok(buf)
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = wire::Cursor::new(buf);
        let value = cursor.get_str()?;
        cursor.finish()?;
        Ok(value)
    }
}

impl Message for Vec<u8> {
    fn type_name() -> &'static str {
        "bytes"
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(4 + self.len());
        wire::put_bytes(&mut buf, self);
        Ok(buf)
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = wire::Cursor::new(buf);
        let value = cursor.get_bytes()?;
        cursor.finish()?;
        Ok(value)
    }
}

/// Marker for the unit message (no payload).
///
/// Useful for trigger-style topics and request-less services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Empty;

impl Message for Empty {
    fn type_name() -> &'static str {
        "empty"
    }

    fn encode(&self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        if buf.is_empty() {
            Ok(Empty)
        } else {
            Err(Error::Serialization(format!(
                "expected empty payload, got {} bytes",
                buf.len()
            )))
        }
    }
}

/// Reserved metadata record published on a topic's `__intra` companion.
///
/// When intra-process routing is enabled, the payload never crosses the
/// transport serializer; only this 16-byte record does. The receiving
/// subscription exchanges it for the owned message at the intra-process
/// manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntraProcessMessage {
    /// Manager-assigned id of the originating publisher (non-zero).
    pub publisher_id: u64,
    /// Ring sequence assigned by the store operation.
    pub message_sequence: u64,
}

impl Message for IntraProcessMessage {
    fn type_name() -> &'static str {
        "hrcl/IntraProcessMessage"
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(16);
        wire::put_u64(&mut buf, self.publisher_id);
        wire::put_u64(&mut buf, self.message_sequence);
        Ok(buf)
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = wire::Cursor::new(buf);
        let publisher_id = cursor.get_u64()?;
        let message_sequence = cursor.get_u64()?;
        cursor.finish()?;
        Ok(Self {
            publisher_id,
            message_sequence,
        })
    }
}

/// Little-endian wire helpers shared by the built-in message types.
pub(crate) mod wire {
    use crate::error::{Error, Result};

    pub fn put_u32(buf: &mut Vec<u8>, value: u32) {
        buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_u64(buf: &mut Vec<u8>, value: u64) {
        buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_i64(buf: &mut Vec<u8>, value: i64) {
        buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_f64(buf: &mut Vec<u8>, value: f64) {
        buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_bytes(buf: &mut Vec<u8>, value: &[u8]) {
        put_u32(buf, value.len() as u32);
        buf.extend_from_slice(value);
    }

    pub fn put_str(buf: &mut Vec<u8>, value: &str) {
        put_bytes(buf, value.as_bytes());
    }

    /// Bounds-checked reader over a received buffer.
    pub struct Cursor<'a> {
        buf: &'a [u8],
        pos: usize,
    }

    impl<'a> Cursor<'a> {
        pub fn new(buf: &'a [u8]) -> Self {
            Self { buf, pos: 0 }
        }

        fn advance(&mut self, len: usize) -> Result<&'a [u8]> {
            let end = self.pos.checked_add(len).filter(|&e| e <= self.buf.len());
            let Some(end) = end else {
                return Err(Error::Serialization(format!(
                    "buffer truncated: need {} bytes at offset {}, have {}",
                    len,
                    self.pos,
                    self.buf.len()
                )));
            };
            let slice = &self.buf[self.pos..end];
            self.pos = end;
            Ok(slice)
        }

        pub fn get_u8(&mut self) -> Result<u8> {
            Ok(self.advance(1)?[0])
        }

        pub fn get_u32(&mut self) -> Result<u32> {
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(self.advance(4)?);
            Ok(u32::from_le_bytes(bytes))
        }

        pub fn get_u64(&mut self) -> Result<u64> {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(self.advance(8)?);
            Ok(u64::from_le_bytes(bytes))
        }

        pub fn get_i64(&mut self) -> Result<i64> {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(self.advance(8)?);
            Ok(i64::from_le_bytes(bytes))
        }

        pub fn get_f64(&mut self) -> Result<f64> {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(self.advance(8)?);
            Ok(f64::from_le_bytes(bytes))
        }

        pub fn get_bytes(&mut self) -> Result<Vec<u8>> {
            let len = self.get_u32()? as usize;
            Ok(self.advance(len)?.to_vec())
        }

        pub fn get_str(&mut self) -> Result<String> {
            let bytes = self.get_bytes()?;
            String::from_utf8(bytes)
                .map_err(|e| Error::Serialization(format!("invalid utf-8 string: {}", e)))
        }

        /// Assert the whole buffer was consumed.
        pub fn finish(self) -> Result<()> {
            if self.pos == self.buf.len() {
                Ok(())
            } else {
                Err(Error::Serialization(format!(
                    "{} trailing bytes after decode",
                    self.buf.len() - self.pos
                )))
            }
        }
    }
}

//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//


//! Little-endian binary primitives.
//!
//! [`BinaryWriter`] and [`BinaryReader`] implement the leaf encodings every
//! composite routine is built from:
//!
//! ```text
//! integers, floats   little-endian, fixed width
//! bool               1 byte, 0 or 1
//! Decimal            4 x u32: lo, mid, hi, flags
//! String, Bytes      hint byte (0 = null, 1 = present), i32 length, data
//! DateTime           i64 seconds since the epoch, u32 nanoseconds
//! Guid               16 bytes, RFC 4122 order
//! IpAddr             u8 family (4 or 6), address octets
//! SocketAddr         IpAddr, u16 port
//! ```

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::error::{DecodeError, EncodeError};
use crate::types::Decimal;

/// Leading byte of every self-describing value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Hint {
    /// No value follows.
    Null = 0,
    /// The value follows in place.
    Inline = 1,
    /// Nothing follows; the receiver substitutes its own instance.
    Singleton = 2,
    /// An object id and an interface name follow.
    ByReference = 3,
}

impl Hint {
    /// Parses a hint byte.
    pub fn from_byte(value: u8) -> Result<Self, DecodeError> {
        match value {
            0 => Ok(Self::Null),
            1 => Ok(Self::Inline),
            2 => Ok(Self::Singleton),
            3 => Ok(Self::ByReference),
            value => Err(DecodeError::InvalidHint { value }),
        }
    }
}

fn length_prefix(length: usize) -> Result<i32, EncodeError> {
    i32::try_from(length).map_err(|_| EncodeError::TooLarge { length })
}

/// Growable output buffer.
#[derive(Debug, Default)]
pub struct BinaryWriter {
    buffer: BytesMut,
}

impl BinaryWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a writer with preallocated room.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The bytes written so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Freezes the written bytes.
    pub fn into_bytes(self) -> Bytes {
        self.buffer.freeze()
    }

    /// Appends raw bytes without any prefix.
    pub fn write_raw(&mut self, data: &[u8]) {
        self.buffer.put_slice(data);
    }

    /// Writes a hint byte.
    pub fn write_hint(&mut self, hint: Hint) {
        self.buffer.put_u8(hint as u8);
    }

    /// Writes an `i8`.
    pub fn write_i8(&mut self, value: i8) {
        self.buffer.put_i8(value);
    }

    /// Writes a `u8`.
    pub fn write_u8(&mut self, value: u8) {
        self.buffer.put_u8(value);
    }

    /// Writes an `i16`.
    pub fn write_i16(&mut self, value: i16) {
        self.buffer.put_i16_le(value);
    }

    /// Writes a `u16`.
    pub fn write_u16(&mut self, value: u16) {
        self.buffer.put_u16_le(value);
    }

    /// Writes an `i32`.
    pub fn write_i32(&mut self, value: i32) {
        self.buffer.put_i32_le(value);
    }

    /// Writes a `u32`.
    pub fn write_u32(&mut self, value: u32) {
        self.buffer.put_u32_le(value);
    }

    /// Writes an `i64`.
    pub fn write_i64(&mut self, value: i64) {
        self.buffer.put_i64_le(value);
    }

    /// Writes a `u64`.
    pub fn write_u64(&mut self, value: u64) {
        self.buffer.put_u64_le(value);
    }

    /// Writes an `f32`.
    pub fn write_f32(&mut self, value: f32) {
        self.buffer.put_f32_le(value);
    }

    /// Writes an `f64`.
    pub fn write_f64(&mut self, value: f64) {
        self.buffer.put_f64_le(value);
    }

    /// Writes a `bool` as a single byte.
    pub fn write_bool(&mut self, value: bool) {
        self.buffer.put_u8(u8::from(value));
    }

    /// Writes a decimal as its four 32-bit words.
    pub fn write_decimal(&mut self, value: Decimal) {
        for word in value.to_bits() {
            self.buffer.put_u32_le(word);
        }
    }

    /// Writes a nullable length-prefixed string.
    pub fn write_string(&mut self, value: Option<&str>) -> Result<(), EncodeError> {
        self.write_bytes(value.map(str::as_bytes))
    }

    /// Writes a nullable length-prefixed byte array.
    pub fn write_bytes(&mut self, value: Option<&[u8]>) -> Result<(), EncodeError> {
        match value {
            None => self.write_hint(Hint::Null),
            Some(data) => {
                let length = length_prefix(data.len())?;
                self.write_hint(Hint::Inline);
                self.buffer.put_i32_le(length);
                self.buffer.put_slice(data);
            }
        }
        Ok(())
    }

    /// Writes a UTC timestamp.
    pub fn write_date_time(&mut self, value: &DateTime<Utc>) {
        self.buffer.put_i64_le(value.timestamp());
        self.buffer.put_u32_le(value.timestamp_subsec_nanos());
    }

    /// Writes a GUID.
    pub fn write_guid(&mut self, value: &Uuid) {
        self.buffer.put_slice(value.as_bytes());
    }

    /// Writes an IP address.
    pub fn write_ip_addr(&mut self, value: &IpAddr) {
        match value {
            IpAddr::V4(address) => {
                self.buffer.put_u8(4);
                self.buffer.put_slice(&address.octets());
            }
            IpAddr::V6(address) => {
                self.buffer.put_u8(6);
                self.buffer.put_slice(&address.octets());
            }
        }
    }

    /// Writes a socket address. IPv6 flow info and scope are not carried.
    pub fn write_socket_addr(&mut self, value: &SocketAddr) {
        self.write_ip_addr(&value.ip());
        self.buffer.put_u16_le(value.port());
    }
}

/// Cursor over an input slice.
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    input: &'a [u8],
    position: usize,
}

impl<'a> BinaryReader<'a> {
    /// Creates a reader at the start of `input`.
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, position: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes left.
    pub fn remaining(&self) -> usize {
        self.input.len() - self.position
    }

    /// Whether the input is exhausted.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Fails unless the input is exhausted.
    pub fn finish(&self) -> Result<(), DecodeError> {
        match self.remaining() {
            0 => Ok(()),
            remaining => Err(DecodeError::TrailingBytes { remaining }),
        }
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], DecodeError> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(DecodeError::UnexpectedEof { needed, remaining });
        }
        let start = self.position;
        self.position += needed;
        Ok(&self.input[start..self.position])
    }

    /// Returns the next byte without consuming it.
    pub fn peek_u8(&self) -> Result<u8, DecodeError> {
        self.input
            .get(self.position)
            .copied()
            .ok_or(DecodeError::UnexpectedEof {
                needed: 1,
                remaining: 0,
            })
    }

    /// Reads `length` raw bytes.
    pub fn read_raw(&mut self, length: usize) -> Result<&'a [u8], DecodeError> {
        self.take(length)
    }

    /// Reads and validates a hint byte.
    pub fn read_hint(&mut self) -> Result<Hint, DecodeError> {
        Hint::from_byte(self.read_u8()?)
    }

    /// Reads an `i8`.
    pub fn read_i8(&mut self) -> Result<i8, DecodeError> {
        Ok(self.take(1)?.get_i8())
    }

    /// Reads a `u8`.
    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?.get_u8())
    }

    /// Reads an `i16`.
    pub fn read_i16(&mut self) -> Result<i16, DecodeError> {
        Ok(self.take(2)?.get_i16_le())
    }

    /// Reads a `u16`.
    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(self.take(2)?.get_u16_le())
    }

    /// Reads an `i32`.
    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(self.take(4)?.get_i32_le())
    }

    /// Reads a `u32`.
    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(self.take(4)?.get_u32_le())
    }

    /// Reads an `i64`.
    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        Ok(self.take(8)?.get_i64_le())
    }

    /// Reads a `u64`.
    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        Ok(self.take(8)?.get_u64_le())
    }

    /// Reads an `f32`.
    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        Ok(self.take(4)?.get_f32_le())
    }

    /// Reads an `f64`.
    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        Ok(self.take(8)?.get_f64_le())
    }

    /// Reads a `bool`; any byte other than 0 or 1 is rejected.
    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(DecodeError::InvalidValue {
                type_name: "bool".to_string(),
                reason: format!("byte {other} is neither 0 nor 1"),
            }),
        }
    }

    /// Reads a decimal.
    pub fn read_decimal(&mut self) -> Result<Decimal, DecodeError> {
        let bits = [
            self.read_u32()?,
            self.read_u32()?,
            self.read_u32()?,
            self.read_u32()?,
        ];
        Decimal::from_bits(bits).ok_or_else(|| DecodeError::InvalidValue {
            type_name: "Decimal".to_string(),
            reason: format!("invalid flags {:#010x}", bits[3]),
        })
    }

    /// Reads a nullable length-prefixed string.
    pub fn read_string(&mut self) -> Result<Option<String>, DecodeError> {
        match self.read_byte_slice()? {
            None => Ok(None),
            Some(data) => std::str::from_utf8(data)
                .map(|text| Some(text.to_string()))
                .map_err(|_| DecodeError::InvalidUtf8),
        }
    }

    /// Reads a nullable length-prefixed byte array.
    pub fn read_bytes(&mut self) -> Result<Option<Bytes>, DecodeError> {
        Ok(self.read_byte_slice()?.map(Bytes::copy_from_slice))
    }

    fn read_byte_slice(&mut self) -> Result<Option<&'a [u8]>, DecodeError> {
        match self.read_hint()? {
            Hint::Null => Ok(None),
            Hint::Inline => {
                let length = self.read_i32()?;
                let length = usize::try_from(length).map_err(|_| DecodeError::InvalidLength {
                    length: i64::from(length),
                })?;
                self.take(length).map(Some)
            }
            hint => Err(DecodeError::UnexpectedHint {
                type_name: "byte array".to_string(),
                hint,
            }),
        }
    }

    /// Reads a UTC timestamp.
    pub fn read_date_time(&mut self) -> Result<DateTime<Utc>, DecodeError> {
        let seconds = self.read_i64()?;
        let nanos = self.read_u32()?;
        DateTime::from_timestamp(seconds, nanos).ok_or_else(|| DecodeError::InvalidValue {
            type_name: "DateTime".to_string(),
            reason: format!("{seconds}s {nanos}ns is out of range"),
        })
    }

    /// Reads a GUID.
    pub fn read_guid(&mut self) -> Result<Uuid, DecodeError> {
        let data = self.take(16)?;
        Uuid::from_slice(data).map_err(|error| DecodeError::InvalidValue {
            type_name: "Guid".to_string(),
            reason: error.to_string(),
        })
    }

    /// Reads an IP address.
    pub fn read_ip_addr(&mut self) -> Result<IpAddr, DecodeError> {
        match self.read_u8()? {
            4 => {
                let mut octets = [0u8; 4];
                octets.copy_from_slice(self.take(4)?);
                Ok(IpAddr::V4(Ipv4Addr::from(octets)))
            }
            6 => {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(self.take(16)?);
                Ok(IpAddr::V6(Ipv6Addr::from(octets)))
            }
            family => Err(DecodeError::InvalidValue {
                type_name: "IpAddr".to_string(),
                reason: format!("unknown address family {family}"),
            }),
        }
    }

    /// Reads a socket address.
    pub fn read_socket_addr(&mut self) -> Result<SocketAddr, DecodeError> {
        let ip = self.read_ip_addr()?;
        let port = self.read_u16()?;
        Ok(SocketAddr::new(ip, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers_are_little_endian() {
        let mut writer = BinaryWriter::new();
        writer.write_i32(1);
        writer.write_u16(0x0102);
        assert_eq!(writer.as_slice(), &[1, 0, 0, 0, 0x02, 0x01]);
    }

    #[test]
    fn test_string_layout() {
        let mut writer = BinaryWriter::new();
        writer.write_string(Some("hi")).unwrap();
        writer.write_string(None).unwrap();
        assert_eq!(writer.as_slice(), &[1, 2, 0, 0, 0, b'h', b'i', 0]);

        let bytes = writer.into_bytes();
        let mut reader = BinaryReader::new(&bytes);
        assert_eq!(reader.read_string().unwrap().as_deref(), Some("hi"));
        assert_eq!(reader.read_string().unwrap(), None);
        assert!(reader.finish().is_ok());
    }

    #[test]
    fn test_truncated_input() {
        let mut reader = BinaryReader::new(&[1, 2, 3]);
        assert_eq!(
            reader.read_i32(),
            Err(DecodeError::UnexpectedEof {
                needed: 4,
                remaining: 3
            })
        );
        // A failed read consumes nothing.
        assert_eq!(reader.remaining(), 3);
    }

    #[test]
    fn test_negative_length_is_rejected() {
        let mut reader = BinaryReader::new(&[1, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(
            reader.read_bytes(),
            Err(DecodeError::InvalidLength { length: -1 })
        );
    }

    #[test]
    fn test_invalid_hint() {
        let mut reader = BinaryReader::new(&[9]);
        assert_eq!(reader.read_hint(), Err(DecodeError::InvalidHint { value: 9 }));
    }

    #[test]
    fn test_date_time_keeps_nanoseconds() {
        let value = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        let mut writer = BinaryWriter::new();
        writer.write_date_time(&value);
        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), 12);
        assert_eq!(BinaryReader::new(&bytes).read_date_time(), Ok(value));
    }

    #[test]
    fn test_socket_addr() {
        let value: SocketAddr = "[::1]:8080".parse().unwrap();
        let mut writer = BinaryWriter::new();
        writer.write_socket_addr(&value);
        let bytes = writer.into_bytes();
        assert_eq!(BinaryReader::new(&bytes).read_socket_addr(), Ok(value));
    }
}

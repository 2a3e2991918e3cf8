// (c) 2025 Ross Younger

//! Typed binary packing primitives
//!
//! Every NewTP structure is a flat sequence of fields drawn from a tiny set of types:
//! unsigned integers of 8, 16, 32 or 64 bits, all in network byte order, and
//! byte strings whose length is carried by the immediately preceding 16-bit field.
//!
//! A structure's layout is described by a [`Format`], a slice of [`FieldType`] tags.
//! [`pack`] writes a sequence of [`Value`]s; [`unpack`] reads them back, checking every
//! field against the number of bytes actually available.

use bytes::BufMut;

/// A single field type within a [`Format`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum FieldType {
    /// 8-bit unsigned integer
    U8,
    /// 16-bit unsigned integer, big-endian
    U16,
    /// 32-bit unsigned integer, big-endian
    U32,
    /// 64-bit unsigned integer, big-endian
    U64,
    /// Byte string. Its length is the value of the immediately preceding [`FieldType::U16`].
    Bytes,
}

impl FieldType {
    /// Encoded width of this field, if fixed
    #[must_use]
    pub const fn width(self) -> Option<usize> {
        match self {
            FieldType::U8 => Some(1),
            FieldType::U16 => Some(2),
            FieldType::U32 => Some(4),
            FieldType::U64 => Some(8),
            FieldType::Bytes => None,
        }
    }
}

/// Describes the layout of a structure on the wire
pub type Format = &'static [FieldType];

/// A single field value, borrowing any byte string from its buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value<'a> {
    /// 8-bit unsigned integer
    U8(u8),
    /// 16-bit unsigned integer
    U16(u16),
    /// 32-bit unsigned integer
    U32(u32),
    /// 64-bit unsigned integer
    U64(u64),
    /// Byte string
    Bytes(&'a [u8]),
}

impl Value<'_> {
    /// The [`FieldType`] this value encodes as
    #[must_use]
    pub const fn field_type(&self) -> FieldType {
        match self {
            Value::U8(_) => FieldType::U8,
            Value::U16(_) => FieldType::U16,
            Value::U32(_) => FieldType::U32,
            Value::U64(_) => FieldType::U64,
            Value::Bytes(_) => FieldType::Bytes,
        }
    }

    /// Encoded size of this value in bytes
    #[must_use]
    pub const fn encoded_len(&self) -> usize {
        match self {
            Value::U8(_) => 1,
            Value::U16(_) => 2,
            Value::U32(_) => 4,
            Value::U64(_) => 8,
            Value::Bytes(b) => b.len(),
        }
    }
}

/// Framing errors raised while unpacking
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The buffer ended before the field at this index could be read
    #[error("truncated input: field {field} needs {needed} bytes, {available} available")]
    Truncated {
        /// Index of the field within its format
        field: usize,
        /// Bytes required by the field
        needed: usize,
        /// Bytes remaining in the buffer
        available: usize,
    },
    /// A byte string field was not preceded by a 16-bit length
    #[error("byte string at field {0} has no length prefix")]
    MissingLength(usize),
    /// Decoded values did not match the shape the caller expected
    #[error("field {field}: expected {expected}")]
    Shape {
        /// Index of the offending field
        field: usize,
        /// What was expected there
        expected: FieldType,
    },
    /// A byte string was longer than its 16-bit length prefix can express
    #[error("byte string of {0} bytes is too long to encode")]
    TooLong(usize),
}

/// Packs a sequence of values into `buf`, returning the number of bytes written.
///
/// The caller is responsible for ensuring that each [`Value::Bytes`] is preceded by
/// a [`Value::U16`] holding its length.
pub fn pack<B: BufMut>(buf: &mut B, values: &[Value<'_>]) -> usize {
    let mut written = 0;
    for v in values {
        match v {
            Value::U8(n) => buf.put_u8(*n),
            Value::U16(n) => buf.put_u16(*n),
            Value::U32(n) => buf.put_u32(*n),
            Value::U64(n) => buf.put_u64(*n),
            Value::Bytes(b) => buf.put_slice(b),
        }
        written += v.encoded_len();
    }
    written
}

/// Unpacks values described by `format` from the front of `buf`.
///
/// Returns the values and the number of bytes consumed. Never reads beyond `buf.len()`.
pub fn unpack<'a>(
    buf: &'a [u8],
    format: &[FieldType],
) -> Result<(Vec<Value<'a>>, usize), CodecError> {
    let mut values = Vec::with_capacity(format.len());
    let mut pos = 0;
    for (i, ft) in format.iter().enumerate() {
        let available = buf.len() - pos;
        let needed = match ft.width() {
            Some(w) => w,
            None => match values.last() {
                Some(Value::U16(len)) => usize::from(*len),
                _ => return Err(CodecError::MissingLength(i)),
            },
        };
        if needed > available {
            return Err(CodecError::Truncated {
                field: i,
                needed,
                available,
            });
        }
        let field = &buf[pos..pos + needed];
        let value = match ft {
            FieldType::U8 => Value::U8(field[0]),
            FieldType::U16 => Value::U16(u16::from_be_bytes([field[0], field[1]])),
            FieldType::U32 => Value::U32(u32::from_be_bytes([
                field[0], field[1], field[2], field[3],
            ])),
            FieldType::U64 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(field);
                Value::U64(u64::from_be_bytes(raw))
            }
            FieldType::Bytes => Value::Bytes(field),
        };
        values.push(value);
        pos += needed;
    }
    Ok((values, pos))
}

/// Sequential reader over a slice of unpacked values, for building typed structures
#[derive(Debug)]
pub struct Fields<'v, 'a> {
    values: &'v [Value<'a>],
    next: usize,
}

impl<'v, 'a> Fields<'v, 'a> {
    /// Constructor
    #[must_use]
    pub fn new(values: &'v [Value<'a>]) -> Self {
        Self { values, next: 0 }
    }

    fn take(&mut self, expected: FieldType) -> Result<Value<'a>, CodecError> {
        let field = self.next;
        self.next += 1;
        match self.values.get(field) {
            Some(v) if v.field_type() == expected => Ok(*v),
            _ => Err(CodecError::Shape { field, expected }),
        }
    }

    /// Takes the next value as a u8
    pub fn u8(&mut self) -> Result<u8, CodecError> {
        match self.take(FieldType::U8)? {
            Value::U8(n) => Ok(n),
            _ => Err(self.shape(FieldType::U8)),
        }
    }
    /// Takes the next value as a u16
    pub fn u16(&mut self) -> Result<u16, CodecError> {
        match self.take(FieldType::U16)? {
            Value::U16(n) => Ok(n),
            _ => Err(self.shape(FieldType::U16)),
        }
    }
    /// Takes the next value as a u32
    pub fn u32(&mut self) -> Result<u32, CodecError> {
        match self.take(FieldType::U32)? {
            Value::U32(n) => Ok(n),
            _ => Err(self.shape(FieldType::U32)),
        }
    }
    /// Takes the next value as a u64
    pub fn u64(&mut self) -> Result<u64, CodecError> {
        match self.take(FieldType::U64)? {
            Value::U64(n) => Ok(n),
            _ => Err(self.shape(FieldType::U64)),
        }
    }
    /// Takes the next value as a byte string
    pub fn bytes(&mut self) -> Result<&'a [u8], CodecError> {
        match self.take(FieldType::Bytes)? {
            Value::Bytes(b) => Ok(b),
            _ => Err(self.shape(FieldType::Bytes)),
        }
    }

    fn shape(&self, expected: FieldType) -> CodecError {
        CodecError::Shape {
            field: self.next.saturating_sub(1),
            expected,
        }
    }
}

/// Converts a byte string length into its 16-bit wire prefix
pub fn string_length(b: &[u8]) -> Result<u16, CodecError> {
    u16::try_from(b.len()).map_err(|_| CodecError::TooLong(b.len()))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod test {
    use super::{CodecError, FieldType, Fields, Value, pack, unpack};
    use bytes::BytesMut;
    use pretty_assertions::assert_eq;

    const ALL: &[FieldType] = &[
        FieldType::U8,
        FieldType::U16,
        FieldType::U32,
        FieldType::U64,
        FieldType::U16,
        FieldType::Bytes,
    ];

    #[test]
    fn network_byte_order() {
        let mut buf = BytesMut::new();
        let n = pack(
            &mut buf,
            &[
                Value::U8(0x01),
                Value::U16(0x0203),
                Value::U32(0x0405_0607),
                Value::U64(0x0809_0a0b_0c0d_0e0f),
                Value::U16(2),
                Value::Bytes(b"hi"),
            ],
        );
        assert_eq!(n, 19);
        assert_eq!(
            &buf[..],
            &[
                1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 0, 2, b'h', b'i'
            ]
        );
    }

    #[test]
    fn unpack_reports_consumed() {
        let input = [1u8, 0, 2, 0, 0, 0, 3, 0, 0, 0, 0, 0, 0, 0, 4, 0, 3, b'a', b'b', b'c', 99];
        let (values, used) = unpack(&input, ALL).unwrap();
        assert_eq!(used, 20);
        let mut f = Fields::new(&values);
        assert_eq!(f.u8().unwrap(), 1);
        assert_eq!(f.u16().unwrap(), 2);
        assert_eq!(f.u32().unwrap(), 3);
        assert_eq!(f.u64().unwrap(), 4);
        assert_eq!(f.u16().unwrap(), 3);
        assert_eq!(f.bytes().unwrap(), b"abc");
    }

    #[test]
    fn truncated_integer() {
        let err = unpack(&[0u8, 1, 2], &[FieldType::U32]).unwrap_err();
        assert_eq!(
            err,
            CodecError::Truncated {
                field: 0,
                needed: 4,
                available: 3
            }
        );
    }

    #[test]
    fn string_longer_than_buffer() {
        // declares 10 bytes, supplies 2
        let err = unpack(&[0u8, 10, b'a', b'b'], &[FieldType::U16, FieldType::Bytes]).unwrap_err();
        assert_eq!(
            err,
            CodecError::Truncated {
                field: 1,
                needed: 10,
                available: 2
            }
        );
    }

    #[test]
    fn string_without_prefix() {
        let err = unpack(&[1u8, 2, 3], &[FieldType::U8, FieldType::Bytes]).unwrap_err();
        assert_eq!(err, CodecError::MissingLength(1));
    }

    #[test]
    fn empty_input() {
        let (values, used) = unpack(&[], &[]).unwrap();
        assert!(values.is_empty());
        assert_eq!(used, 0);
        assert!(unpack(&[], &[FieldType::U8]).is_err());
    }

    #[test]
    fn wrong_shape() {
        let values = [Value::U8(1)];
        let mut f = Fields::new(&values);
        assert_eq!(
            f.u16().unwrap_err(),
            CodecError::Shape {
                field: 0,
                expected: FieldType::U16
            }
        );
        // running off the end is also a shape error
        assert!(f.u8().is_err());
    }
}

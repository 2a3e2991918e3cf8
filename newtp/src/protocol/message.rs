// (c) 2025 Ross Younger

//! Message shapes carried on the wire
//!
//! Every exchange is a fixed-size header followed by `length` bytes of payload.
//! Clients send a [`Command`]; the server answers with a [`Reply`].
//! Payload layouts depend on the opcode; the reusable ones are defined here.

use bytes::{BufMut, Bytes, BytesMut};

use super::codec::{CodecError, FieldType, Fields, Format, Value, pack, unpack};

/// Clips a byte string to what a 16-bit length prefix can carry
#[allow(clippy::cast_possible_truncation)]
fn clip(b: &[u8]) -> (u16, &[u8]) {
    let len = b.len().min(usize::from(u16::MAX));
    (len as u16, &b[..len])
}

/// Structures with a fixed wire [`Format`]
pub trait WireMessage: Sized {
    /// Wire layout of this structure
    const FORMAT: Format;

    /// Lists this structure's field values in wire order
    fn values(&self) -> Vec<Value<'_>>;

    /// Builds this structure from decoded field values
    fn from_fields(fields: &mut Fields<'_, '_>) -> Result<Self, CodecError>;

    /// Appends this structure to a buffer, returning the number of bytes written
    fn encode<B: BufMut>(&self, buf: &mut B) -> usize {
        pack(buf, &self.values())
    }

    /// Encodes this structure into a new buffer
    fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        let _ = self.encode(&mut buf);
        buf.freeze()
    }

    /// Decodes this structure from the front of `buf`,
    /// returning it and the number of bytes consumed
    fn decode(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        let (values, used) = unpack(buf, Self::FORMAT)?;
        let mut fields = Fields::new(&values);
        Ok((Self::from_fields(&mut fields)?, used))
    }
}

/// A [`WireMessage`] that frames a payload
pub trait Header: WireMessage + Copy + Send {
    /// Encoded size of the header
    const SIZE: usize;
    /// Length of the payload that follows
    fn payload_length(&self) -> u16;
}

/// Maximum length of any payload
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/////////////////////////////////////////////////////////////////////////////////////////////

/// Command header, sent by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Command {
    /// Chosen by the client, echoed in the reply
    pub request_id: u16,
    /// Extension selector. 0 for the core protocol.
    pub extension: u8,
    /// Raw opcode; see [`Opcode`](super::Opcode)
    pub opcode: u8,
    /// Handle the command operates on
    pub handle: u16,
    /// Length of the payload that follows
    pub length: u16,
}

impl Command {
    /// Constructor for a core protocol command
    #[must_use]
    pub fn new(request_id: u16, opcode: super::Opcode, handle: u16, length: u16) -> Self {
        Self {
            request_id,
            extension: 0,
            opcode: opcode.into(),
            handle,
            length,
        }
    }

    /// The opcode, if it is one we know
    #[must_use]
    pub fn opcode(&self) -> Option<super::Opcode> {
        super::Opcode::from_repr(self.opcode)
    }
}

impl WireMessage for Command {
    const FORMAT: Format = &[
        FieldType::U16,
        FieldType::U8,
        FieldType::U8,
        FieldType::U16,
        FieldType::U16,
    ];

    fn values(&self) -> Vec<Value<'_>> {
        vec![
            Value::U16(self.request_id),
            Value::U8(self.extension),
            Value::U8(self.opcode),
            Value::U16(self.handle),
            Value::U16(self.length),
        ]
    }

    fn from_fields(f: &mut Fields<'_, '_>) -> Result<Self, CodecError> {
        Ok(Self {
            request_id: f.u16()?,
            extension: f.u8()?,
            opcode: f.u8()?,
            handle: f.u16()?,
            length: f.u16()?,
        })
    }
}

impl Header for Command {
    const SIZE: usize = 8;
    fn payload_length(&self) -> u16 {
        self.length
    }
}

/// Reply header, sent by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reply {
    /// Echoed from the command
    pub request_id: u16,
    /// Extension selector. 0 for the core protocol.
    pub extension: u8,
    /// Raw result code; see [`Status`](super::Status)
    pub result: u8,
    /// Length of the payload that follows
    pub length: u16,
}

impl Reply {
    /// Constructor for a core protocol reply
    #[must_use]
    pub fn new(request_id: u16, status: super::Status, length: u16) -> Self {
        Self {
            request_id,
            extension: 0,
            result: status.into(),
            length,
        }
    }

    /// The result code, if it is one we know
    #[must_use]
    pub fn status(&self) -> Option<super::Status> {
        super::Status::from_u8(self.result)
    }
}

impl WireMessage for Reply {
    const FORMAT: Format = &[
        FieldType::U16,
        FieldType::U8,
        FieldType::U8,
        FieldType::U16,
    ];

    fn values(&self) -> Vec<Value<'_>> {
        vec![
            Value::U16(self.request_id),
            Value::U8(self.extension),
            Value::U8(self.result),
            Value::U16(self.length),
        ]
    }

    fn from_fields(f: &mut Fields<'_, '_>) -> Result<Self, CodecError> {
        Ok(Self {
            request_id: f.u16()?,
            extension: f.u8()?,
            result: f.u8()?,
            length: f.u16()?,
        })
    }
}

impl Header for Reply {
    const SIZE: usize = 6;
    fn payload_length(&self) -> u16 {
        self.length
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////

/// One entry in a directory listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name (a single path segment). Names longer than 65535 bytes are truncated.
    pub name: Vec<u8>,
    /// Attribute blob, laid out according to the attribute specification of the request
    pub attributes: Vec<u8>,
}

impl DirEntry {
    /// Encoded size of this entry
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        4 + clip(&self.name).1.len() + clip(&self.attributes).1.len()
    }
}

impl WireMessage for DirEntry {
    const FORMAT: Format = &[
        FieldType::U16,
        FieldType::Bytes,
        FieldType::U16,
        FieldType::Bytes,
    ];

    fn values(&self) -> Vec<Value<'_>> {
        let (nl, name) = clip(&self.name);
        let (al, attrs) = clip(&self.attributes);
        vec![
            Value::U16(nl),
            Value::Bytes(name),
            Value::U16(al),
            Value::Bytes(attrs),
        ]
    }

    fn from_fields(f: &mut Fields<'_, '_>) -> Result<Self, CodecError> {
        let _ = f.u16()?;
        let name = f.bytes()?.to_vec();
        let _ = f.u16()?;
        let attributes = f.bytes()?.to_vec();
        Ok(Self { name, attributes })
    }
}

/// READ parameter block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetLength {
    /// File offset
    pub offset: u64,
    /// Number of bytes requested
    pub length: u16,
}

impl WireMessage for OffsetLength {
    const FORMAT: Format = &[FieldType::U64, FieldType::U16];

    fn values(&self) -> Vec<Value<'_>> {
        vec![Value::U64(self.offset), Value::U16(self.length)]
    }

    fn from_fields(f: &mut Fields<'_, '_>) -> Result<Self, CodecError> {
        Ok(Self {
            offset: f.u64()?,
            length: f.u16()?,
        })
    }
}

/// WRITE and TRUNCATE parameter block.
///
/// For WRITE, the bytes following the offset are the data to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offset {
    /// File offset
    pub offset: u64,
}

impl WireMessage for Offset {
    const FORMAT: Format = &[FieldType::U64];

    fn values(&self) -> Vec<Value<'_>> {
        vec![Value::U64(self.offset)]
    }

    fn from_fields(f: &mut Fields<'_, '_>) -> Result<Self, CodecError> {
        Ok(Self { offset: f.u64()? })
    }
}

/// A 16-bit count: the WRITE reply payload, and the header of a READDIR page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Count(pub u16);

impl WireMessage for Count {
    const FORMAT: Format = &[FieldType::U16];

    fn values(&self) -> Vec<Value<'_>> {
        vec![Value::U16(self.0)]
    }

    fn from_fields(f: &mut Fields<'_, '_>) -> Result<Self, CodecError> {
        Ok(Self(f.u16()?))
    }
}

/// STATVFS reply payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FsStats {
    /// Filesystem identifier (truncated to 32 bits)
    pub device_id: u32,
    /// Total size in bytes
    pub capacity: u64,
    /// Space available to unprivileged users, in bytes
    pub free: u64,
    /// Whether writes will be refused
    pub readonly: bool,
}

impl WireMessage for FsStats {
    const FORMAT: Format = &[
        FieldType::U32,
        FieldType::U64,
        FieldType::U64,
        FieldType::U8,
    ];

    fn values(&self) -> Vec<Value<'_>> {
        vec![
            Value::U32(self.device_id),
            Value::U64(self.capacity),
            Value::U64(self.free),
            Value::U8(u8::from(self.readonly)),
        ]
    }

    fn from_fields(f: &mut Fields<'_, '_>) -> Result<Self, CodecError> {
        Ok(Self {
            device_id: f.u32()?,
            capacity: f.u64()?,
            free: f.u64()?,
            readonly: f.u8()? != 0,
        })
    }
}

/// Decodes a READDIR page payload: a count, then that many entries
pub fn decode_dir_page(mut buf: &[u8]) -> Result<Vec<DirEntry>, CodecError> {
    let (Count(count), used) = Count::decode(buf)?;
    buf = &buf[used..];
    let mut entries = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        let (entry, used) = DirEntry::decode(buf)?;
        buf = &buf[used..];
        entries.push(entry);
    }
    Ok(entries)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod test {
    use super::{
        Command, Count, DirEntry, FsStats, Header as _, OffsetLength, Reply, WireMessage,
        decode_dir_page,
    };
    use crate::protocol::{CodecError, Opcode, Status};

    use bytes::{BufMut as _, BytesMut};
    use pretty_assertions::assert_eq;

    #[test]
    fn command_layout() {
        let cmd = Command::new(0x1234, Opcode::Read, 7, 10);
        let bytes = cmd.to_bytes();
        assert_eq!(bytes.len(), Command::SIZE);
        assert_eq!(&bytes[..], &[0x12, 0x34, 0, 0x10, 0, 7, 0, 10]);
        let (decoded, used) = Command::decode(&bytes).unwrap();
        assert_eq!(used, Command::SIZE);
        assert_eq!(decoded, cmd);
        assert_eq!(decoded.opcode(), Some(Opcode::Read));
    }

    #[test]
    fn reply_layout() {
        let reply = Reply::new(9, Status::NotFound, 0);
        let bytes = reply.to_bytes();
        assert_eq!(&bytes[..], &[0, 9, 0, 0x88, 0, 0]);
        let (decoded, _) = Reply::decode(&bytes).unwrap();
        assert_eq!(decoded.status(), Some(Status::NotFound));
        assert_eq!(decoded.payload_length(), 0);
    }

    #[test]
    fn unknown_opcode_survives_decoding() {
        let (cmd, _) = Command::decode(&[0, 1, 0, 0x77, 0, 0, 0, 0]).unwrap();
        assert_eq!(cmd.opcode, 0x77);
        assert_eq!(cmd.opcode(), None);
    }

    #[test]
    fn short_header() {
        assert!(matches!(
            Reply::decode(&[0, 1, 0]),
            Err(CodecError::Truncated { .. })
        ));
    }

    #[test]
    fn dir_page() {
        let a = DirEntry {
            name: b"alpha".to_vec(),
            attributes: vec![1, 2, 3],
        };
        let b = DirEntry {
            name: b"b".to_vec(),
            attributes: vec![],
        };
        let mut buf = BytesMut::new();
        let _ = Count(2).encode(&mut buf);
        assert_eq!(a.encode(&mut buf), a.encoded_len());
        let _ = b.encode(&mut buf);
        assert_eq!(buf.len(), 2 + 12 + 5);
        assert_eq!(decode_dir_page(&buf).unwrap(), vec![a, b]);
    }

    #[test]
    fn dir_page_count_overstated() {
        let mut buf = BytesMut::new();
        let _ = Count(3).encode(&mut buf);
        let _ = DirEntry {
            name: b"x".to_vec(),
            attributes: vec![],
        }
        .encode(&mut buf);
        assert!(decode_dir_page(&buf).is_err());
    }

    #[test]
    fn read_params() {
        let mut buf = BytesMut::new();
        buf.put_u64(0x1_0000_0000);
        buf.put_u16(512);
        let (ol, used) = OffsetLength::decode(&buf).unwrap();
        assert_eq!(used, 10);
        assert_eq!(
            ol,
            OffsetLength {
                offset: 0x1_0000_0000,
                length: 512
            }
        );
        assert!(OffsetLength::decode(&buf[..9]).is_err());
    }

    #[test]
    fn fs_stats() {
        let st = FsStats {
            device_id: 42,
            capacity: 1 << 40,
            free: 1 << 30,
            readonly: true,
        };
        let bytes = st.to_bytes();
        assert_eq!(bytes.len(), 21);
        assert_eq!(FsStats::decode(&bytes).unwrap().0, st);
    }
}

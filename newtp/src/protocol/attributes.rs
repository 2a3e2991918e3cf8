// (c) 2025 Ross Younger

//! File attributes and attribute specifications
//!
//! A client asks for attributes by sending an attribute specification: a string of
//! single-byte [`AttrCode`]s. The server answers with the requested fields packed in
//! exactly that order, each at the fixed width its code implies. There is no per-field
//! tagging on the wire, so both sides must agree on the specification.

use bytes::BufMut;

use super::{
    Status,
    codec::{CodecError, FieldType, Fields, Value, pack, unpack},
};

/// Bit in [`FileAttributes::rights`]: the entity is readable (for a directory: listable)
pub const RIGHTS_READ: u8 = 1;
/// Bit in [`FileAttributes::rights`]: the entity is writable
pub const RIGHTS_WRITE: u8 = 2;

/// Attribute codes
///
/// **Caution:** These values are part of the wire protocol and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::FromRepr)]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum AttrCode {
    /// Access rights for this session (u8 bitmask of [`RIGHTS_READ`] and [`RIGHTS_WRITE`])
    Rights = 0x01,
    /// Size in bytes (u64)
    Size = 0x02,
    /// Hard link count (u32)
    Links = 0x04,
    /// Last access time, microseconds since the Unix epoch (u64)
    Atime = 0x05,
    /// Last modification time, microseconds since the Unix epoch (u64)
    Mtime = 0x06,
    /// File type: the format bits of `st_mode`, shifted down by 12 (u8)
    Type = 0x10,
    /// Permission bits of `st_mode` (u16)
    Perms = 0x11,
    /// Last status change time, microseconds since the Unix epoch (u64)
    Ctime = 0x12,
    /// Owning user id (u32)
    Uid = 0x13,
    /// Owning group id (u32)
    Gid = 0x14,
}

impl AttrCode {
    /// Wire type of the field this code selects
    #[must_use]
    pub const fn field_type(self) -> FieldType {
        match self {
            AttrCode::Rights | AttrCode::Type => FieldType::U8,
            AttrCode::Perms => FieldType::U16,
            AttrCode::Links | AttrCode::Uid | AttrCode::Gid => FieldType::U32,
            AttrCode::Size | AttrCode::Atime | AttrCode::Mtime | AttrCode::Ctime => {
                FieldType::U64
            }
        }
    }
}

/// File type values of [`AttrCode::Type`]
pub mod file_type {
    /// Named pipe
    pub const FIFO: u8 = 0o01;
    /// Character device
    pub const CHAR_DEVICE: u8 = 0o02;
    /// Directory
    pub const DIRECTORY: u8 = 0o04;
    /// Block device
    pub const BLOCK_DEVICE: u8 = 0o06;
    /// Regular file
    pub const REGULAR: u8 = 0o10;
    /// Symbolic link
    pub const SYMLINK: u8 = 0o12;
    /// Socket
    pub const SOCKET: u8 = 0o14;
}

/// Largest attribute blob: every code, once each
pub const MAX_BLOB_LEN: usize = 1 + 8 + 4 + 8 + 8 + 1 + 2 + 8 + 4 + 4;

/// A validated attribute specification
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttrSpec(Vec<AttrCode>);

impl AttrSpec {
    /// Parses an attribute specification from the wire.
    ///
    /// An unknown or repeated code invalidates the whole specification ([`Status::BadAttr`]).
    /// A valid specification therefore produces at most [`MAX_BLOB_LEN`] bytes.
    pub fn parse(raw: &[u8]) -> Result<Self, Status> {
        let mut codes = Vec::with_capacity(raw.len());
        for b in raw {
            let code = AttrCode::from_repr(*b).ok_or(Status::BadAttr)?;
            if codes.contains(&code) {
                return Err(Status::BadAttr);
            }
            codes.push(code);
        }
        Ok(Self(codes))
    }

    /// Encodes this specification for the wire
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.iter().map(|c| *c as u8).collect()
    }

    /// The codes in this specification, in order
    #[must_use]
    pub fn codes(&self) -> &[AttrCode] {
        &self.0
    }

    /// Whether this specification includes a given code
    #[must_use]
    pub fn contains(&self, code: AttrCode) -> bool {
        self.0.contains(&code)
    }

    /// Size of the attribute blob this specification produces
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        self.0
            .iter()
            .filter_map(|c| c.field_type().width())
            .sum()
    }

    fn format(&self) -> Vec<FieldType> {
        self.0.iter().map(|c| c.field_type()).collect()
    }
}

impl From<&[AttrCode]> for AttrSpec {
    fn from(codes: &[AttrCode]) -> Self {
        Self(codes.to_vec())
    }
}

/// The full set of attributes the server knows how to report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileAttributes {
    /// See [`AttrCode::Rights`]
    pub rights: u8,
    /// See [`AttrCode::Size`]
    pub size: u64,
    /// See [`AttrCode::Links`]
    pub links: u32,
    /// See [`AttrCode::Atime`]
    pub atime: u64,
    /// See [`AttrCode::Mtime`]
    pub mtime: u64,
    /// See [`AttrCode::Type`]
    pub kind: u8,
    /// See [`AttrCode::Perms`]
    pub perms: u16,
    /// See [`AttrCode::Ctime`]
    pub ctime: u64,
    /// See [`AttrCode::Uid`]
    pub uid: u32,
    /// See [`AttrCode::Gid`]
    pub gid: u32,
}

impl FileAttributes {
    fn value(&self, code: AttrCode) -> Value<'static> {
        match code {
            AttrCode::Rights => Value::U8(self.rights),
            AttrCode::Size => Value::U64(self.size),
            AttrCode::Links => Value::U32(self.links),
            AttrCode::Atime => Value::U64(self.atime),
            AttrCode::Mtime => Value::U64(self.mtime),
            AttrCode::Type => Value::U8(self.kind),
            AttrCode::Perms => Value::U16(self.perms),
            AttrCode::Ctime => Value::U64(self.ctime),
            AttrCode::Uid => Value::U32(self.uid),
            AttrCode::Gid => Value::U32(self.gid),
        }
    }

    /// Packs the fields selected by `spec`, in order
    pub fn encode<B: BufMut>(&self, spec: &AttrSpec, buf: &mut B) -> usize {
        let values: Vec<_> = spec.codes().iter().map(|c| self.value(*c)).collect();
        pack(buf, &values)
    }

    /// Unpacks an attribute blob produced for `spec`.
    ///
    /// Fields not named in the specification are left at zero.
    pub fn decode(spec: &AttrSpec, blob: &[u8]) -> Result<Self, CodecError> {
        let format = spec.format();
        let (values, _) = unpack(blob, &format)?;
        let mut fields = Fields::new(&values);
        let mut attrs = Self::default();
        for code in spec.codes() {
            match code {
                AttrCode::Rights => attrs.rights = fields.u8()?,
                AttrCode::Size => attrs.size = fields.u64()?,
                AttrCode::Links => attrs.links = fields.u32()?,
                AttrCode::Atime => attrs.atime = fields.u64()?,
                AttrCode::Mtime => attrs.mtime = fields.u64()?,
                AttrCode::Type => attrs.kind = fields.u8()?,
                AttrCode::Perms => attrs.perms = fields.u16()?,
                AttrCode::Ctime => attrs.ctime = fields.u64()?,
                AttrCode::Uid => attrs.uid = fields.u32()?,
                AttrCode::Gid => attrs.gid = fields.u32()?,
            }
        }
        Ok(attrs)
    }

    /// Is this a directory?
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == file_type::DIRECTORY
    }
}

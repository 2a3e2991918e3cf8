// (c) 2025 Ross Younger

//! Reply result codes

use rustix::io::Errno;

use super::codec::CodecError;

/// The outcome of a command, carried in the `result` byte of every [`Reply`](super::Reply).
///
/// Values below 0x80 are successes; values with the high bit set are errors.
/// Errors are grouped by their high nibble:
/// * `0x8_` packet, handle and path problems
/// * `0x9_` attribute problems
/// * `0xA_` offset and space problems
/// * `0xB_` namespace (delete/rename/mkdir/listing) problems
/// * `0xF_` generic failures
///
/// **Caution:** These values are part of the wire protocol and must not change.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error, strum::Display, strum::FromRepr,
)]
#[strum(serialize_all = "UPPERCASE")]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Status {
    Ok = 0x00,
    /// A directory page is complete but more entries remain
    Continued = 0x01,
    /// A directory listing is complete
    Finished = 0x02,
    /// A write made partial progress before failing; the payload carries the count
    Partial = 0x03,

    BadPacket = 0x80,
    BadExtension = 0x81,
    BadCommand = 0x82,
    BadHandle = 0x83,
    BadPath = 0x84,
    Denied = 0x85,
    Busy = 0x86,
    Io = 0x87,
    NotFound = 0x88,
    NotDir = 0x89,
    NotFile = 0x8A,

    BadAttr = 0x90,
    CannotSet = 0x91,
    BadValue = 0x92,

    BadOffset = 0xA0,
    TooBig = 0xA1,
    DevFull = 0xA2,

    NotEmpty = 0xB0,
    BadMove = 0xB1,
    CrossDev = 0xB2,
    Exists = 0xB3,
    /// READDIR was sent without an open listing (send REWINDDIR first)
    ReadDir = 0xB4,

    Unsupported = 0xFD,
    Fail = 0xFE,
    ServFail = 0xFF,
}

impl Status {
    /// Decodes a wire result byte
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::from_repr(value)
    }

    /// Is this an error code?
    #[must_use]
    pub const fn is_error(self) -> bool {
        (self as u8) & 0x80 != 0
    }

    /// Wraps this status up as a Result: success codes are `Ok`, error codes `Err`.
    pub fn into_result(self) -> Result<Self, Self> {
        if self.is_error() { Err(self) } else { Ok(self) }
    }

    /// The closest local OS error for this status.
    ///
    /// This is the mapping a POSIX filesystem adapter presents to its callers.
    #[must_use]
    pub fn to_errno(self) -> Errno {
        match self {
            Status::Denied => Errno::ACCESS,
            Status::BadPath | Status::NotFound => Errno::NOENT,
            Status::NotDir => Errno::NOTDIR,
            Status::NotFile => Errno::ISDIR,
            Status::BadOffset => Errno::INVAL,
            Status::TooBig => Errno::FBIG,
            Status::DevFull => Errno::NOSPC,
            Status::NotEmpty => Errno::NOTEMPTY,
            Status::Exists => Errno::EXIST,
            Status::CrossDev => Errno::XDEV,
            Status::Busy => Errno::BUSY,
            _ => Errno::IO,
        }
    }
}

impl From<Status> for u8 {
    fn from(value: Status) -> Self {
        value as u8
    }
}

impl From<CodecError> for Status {
    fn from(_: CodecError) -> Self {
        Status::BadPacket
    }
}

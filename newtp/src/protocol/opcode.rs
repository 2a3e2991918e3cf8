// (c) 2025 Ross Younger

//! Command opcodes

/// The operation requested by a [`Command`](super::Command).
///
/// Opcodes are grouped by their high nibble:
/// `0x0_` handle and attribute operations, `0x1_` file content, `0x2_` namespace changes,
/// `0x3_` directory listing.
///
/// **Caution:** These values are part of the wire protocol and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::FromRepr)]
#[strum(serialize_all = "UPPERCASE")]
#[repr(u8)]
pub enum Opcode {
    /// Binds a handle to a path. Payload: the path bytes.
    Assign = 0x00,
    /// Reads attributes of the handle's path. Payload: an attribute specification.
    Stat = 0x01,
    /// Sets attributes. Not supported by this server.
    SetAttr = 0x02,
    /// Reads filesystem capacity. No payload.
    StatVfs = 0x03,
    /// Reads file data. Payload: offset (u64), length (u16).
    Read = 0x10,
    /// Writes file data. Payload: offset (u64), then the data.
    Write = 0x11,
    /// Sets the length of a file. Payload: offset (u64).
    Truncate = 0x12,
    /// Removes a file or empty directory. No payload.
    Delete = 0x20,
    /// Moves the handle's entity to a new path. Payload: the new path bytes.
    Rename = 0x21,
    /// Creates a directory. No payload.
    MakeDir = 0x22,
    /// Opens (or reopens) a directory listing. No payload.
    RewindDir = 0x30,
    /// Reads the next page of a directory listing. Payload: an attribute specification.
    ReadDir = 0x31,
}

impl From<Opcode> for u8 {
    fn from(value: Opcode) -> Self {
        value as u8
    }
}

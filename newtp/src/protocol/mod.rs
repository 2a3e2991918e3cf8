// (c) 2025 Ross Younger

//! 📖 The NewTP wire protocol
//!
//! NewTP is a binary request/reply protocol giving a client access to files exposed by a
//! server under a namespace of named [shares](crate::shares).
//!
//! It runs over any ordered, reliable, full-duplex byte stream.
//! Transport security and authentication are the business of whatever provides that stream.
//!
//! ## Encoding
//!
//! All integers are unsigned and big-endian. Byte strings carry an explicit 16-bit length
//! prefix and no terminator. See [`codec`].
//!
//! ## Session flow
//!
//! 1. The [intro](intro) exchange: magic, version and a capability summary.
//! 2. A sequence of commands. For each, the client sends a [`Command`] header and its payload;
//!    the server replies with a [`Reply`] header and its payload, echoing the `request_id`.
//!    The server handles one command at a time, in order.
//! 3. Either side closes the stream.
//!
//! ## Handles and paths
//!
//! Every command names a handle: a small integer chosen by the client.
//! [`Opcode::Assign`] binds a handle to a path of the form `/share/dir/file`.
//! The empty path is the _virtual root_, whose directory listing is the set of shares.
//! Paths must start with `/`, and may not contain empty, `.` or `..` segments.
//!
//! ## Commands
//!
//! | Opcode | Payload | Reply payload |
//! |---|---|---|
//! | [ASSIGN](Opcode::Assign) | path | - |
//! | [STAT](Opcode::Stat) | [attribute specification](attributes) | attribute blob |
//! | [SETATTR](Opcode::SetAttr) | _(unsupported)_ | - |
//! | [STATVFS](Opcode::StatVfs) | - | [`FsStats`] |
//! | [READ](Opcode::Read) | [`OffsetLength`] | data |
//! | [WRITE](Opcode::Write) | [`Offset`], data | [`Count`] |
//! | [TRUNCATE](Opcode::Truncate) | [`Offset`] | - |
//! | [DELETE](Opcode::Delete) | - | - |
//! | [RENAME](Opcode::Rename) | new path | - |
//! | [MAKEDIR](Opcode::MakeDir) | - | - |
//! | [REWINDDIR](Opcode::RewindDir) | - | - |
//! | [READDIR](Opcode::ReadDir) | attribute specification | [`Count`], [`DirEntry`]... |
//!
//! ### Reading and writing
//!
//! A READ returns at most the requested length. Fewer bytes (including none) means end of file.
//! A zero-length WRITE asks the server to flush the file to stable storage.
//! A WRITE that fails after making some progress is answered with [`Status::Partial`]
//! and the count of bytes that were written.
//!
//! ### Directory listings
//!
//! REWINDDIR opens a listing on a handle. Each READDIR returns one page of entries,
//! with status [`Status::Continued`] if more remain or [`Status::Finished`] at the end.
//! A page never exceeds the maximum payload size; an entry that does not fit is held over
//! and sent first in the next page, so every entry appears exactly once.
//! READDIR without an open listing fails with [`Status::ReadDir`].

pub mod attributes;
pub mod codec;
pub mod common;
pub mod intro;
pub mod message;
mod opcode;
mod status;

pub use attributes::{AttrCode, AttrSpec, FileAttributes};
pub use codec::CodecError;
pub use message::{
    Command, Count, DirEntry, FsStats, Header, MAX_PAYLOAD, Offset, OffsetLength, Reply,
    WireMessage,
};
pub use opcode::Opcode;
pub use status::Status;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
pub(crate) mod test_helpers;

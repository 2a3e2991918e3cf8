// (c) 2025 Ross Younger

//! Computing file attributes from filesystem metadata

use std::{fs::Metadata, os::unix::fs::MetadataExt as _, path::Path};

use bytes::{Bytes, BytesMut};
use rustix::fs::Access;

use crate::protocol::{
    AttrCode, AttrSpec, DirEntry, FileAttributes, WireMessage as _,
    attributes::{RIGHTS_READ, RIGHTS_WRITE, file_type},
};
use crate::shares::Share;

static_assertions::assert_cfg!(unix, "Only POSIX filesystems can be served");

/// Converts a timestamp to microseconds since the epoch. Times before the epoch become 0.
fn micros(secs: i64, nsecs: i64) -> u64 {
    let Ok(secs) = u64::try_from(secs) else {
        return 0;
    };
    let sub = u64::try_from(nsecs).unwrap_or(0) / 1000;
    secs.saturating_mul(1_000_000).saturating_add(sub)
}

/// What the server process may do with `path`, capped by the share's writability
fn rights(path: &Path, is_dir: bool, writable: bool) -> u8 {
    let read = if is_dir {
        Access::READ_OK | Access::EXEC_OK
    } else {
        Access::READ_OK
    };
    let mut result = 0;
    if rustix::fs::access(path, read).is_ok() {
        result |= RIGHTS_READ;
    }
    if writable && rustix::fs::access(path, Access::WRITE_OK).is_ok() {
        result |= RIGHTS_WRITE;
    }
    result
}

/// Builds the attribute set for `path`.
///
/// Rights are only computed if `spec` asks for them, as that costs extra syscalls.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn attributes(
    path: &Path,
    meta: &Metadata,
    spec: &AttrSpec,
    writable: bool,
) -> FileAttributes {
    let mode = meta.mode();
    FileAttributes {
        rights: if spec.contains(AttrCode::Rights) {
            rights(path, meta.is_dir(), writable)
        } else {
            0
        },
        size: meta.size(),
        links: u32::try_from(meta.nlink()).unwrap_or(u32::MAX),
        atime: micros(meta.atime(), meta.atime_nsec()),
        mtime: micros(meta.mtime(), meta.mtime_nsec()),
        kind: ((mode >> 12) & 0xF) as u8,
        perms: (mode & 0o7777) as u16,
        ctime: micros(meta.ctime(), meta.ctime_nsec()),
        uid: meta.uid(),
        gid: meta.gid(),
    }
}

/// The synthetic directory at the top of the namespace
pub(crate) fn virtual_root() -> FileAttributes {
    FileAttributes {
        rights: RIGHTS_READ,
        kind: file_type::DIRECTORY,
        perms: 0o555,
        ..Default::default()
    }
}

/// Attributes of a share as seen in the virtual root listing.
/// A share whose root cannot be examined is still listed, as an inaccessible directory.
pub(crate) fn share(share: &Share, spec: &AttrSpec) -> FileAttributes {
    match std::fs::metadata(share.root()) {
        Ok(meta) => attributes(share.root(), &meta, spec, share.writable()),
        Err(e) => {
            tracing::debug!("share {}: {e}", share.name());
            FileAttributes {
                kind: file_type::DIRECTORY,
                ..Default::default()
            }
        }
    }
}

/// Encodes the requested attributes alone
pub(crate) fn encode(attrs: &FileAttributes, spec: &AttrSpec) -> Bytes {
    let mut buf = BytesMut::with_capacity(spec.encoded_len());
    let _ = attrs.encode(spec, &mut buf);
    buf.freeze()
}

/// Encodes a complete directory entry
pub(crate) fn entry(name: &[u8], attrs: &FileAttributes, spec: &AttrSpec) -> Bytes {
    DirEntry {
        name: name.to_vec(),
        attributes: encode(attrs, spec).to_vec(),
    }
    .to_bytes()
}

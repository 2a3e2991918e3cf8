// (c) 2025 Ross Younger

//! Client path validation and resolution

use std::{
    ffi::OsStr,
    os::unix::ffi::OsStrExt as _,
    path::PathBuf,
};

use crate::{protocol::Status, shares::ShareNamespace};

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    AfterSlash,
    OneDot,
    TwoDot,
    Other,
}

/// Checks a client-supplied path.
///
/// A path is acceptable if it is empty (the virtual root), or if it starts with `/` and
/// every segment is non-empty, is not `.` or `..`, and contains no NUL bytes.
/// A bare `/` and a trailing `/` are both rejected.
#[must_use]
pub fn validate_path(path: &[u8]) -> bool {
    let Some((&first, rest)) = path.split_first() else {
        return true;
    };
    if first != b'/' {
        return false;
    }
    let mut state = State::AfterSlash;
    for &c in rest {
        state = match (c, state) {
            (0, _) | (b'/', State::AfterSlash | State::OneDot | State::TwoDot) => return false,
            (b'/', State::Other) => State::AfterSlash,
            (b'.', State::AfterSlash) => State::OneDot,
            (b'.', State::OneDot) => State::TwoDot,
            _ => State::Other,
        };
    }
    state == State::Other
}

/// Splits a validated, non-empty path into its share name and the remainder.
///
/// The remainder is empty, or begins with `/`.
#[must_use]
pub fn split(path: &[u8]) -> Option<(&[u8], &[u8])> {
    let path = path.strip_prefix(b"/")?;
    Some(match path.iter().position(|c| *c == b'/') {
        Some(i) => path.split_at(i),
        None => (path, &b""[..]),
    })
}

/// Where a client path leads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// The virtual root, whose listing is the set of shares
    VirtualRoot,
    /// A real filesystem path
    Path {
        /// Absolute path
        path: PathBuf,
        /// Whether the owning share is writable
        writable: bool,
        /// Whether this is the root directory of its share
        share_root: bool,
    },
}

/// Resolves a client path against the share namespace.
///
/// Paths naming a share that does not exist resolve to [`Status::NotFound`].
pub fn resolve(name: &[u8], shares: &ShareNamespace) -> Result<Resolved, Status> {
    if name.is_empty() {
        return Ok(Resolved::VirtualRoot);
    }
    let (share_name, rest) = split(name).ok_or(Status::BadPath)?;
    let share = shares.find(share_name).ok_or(Status::NotFound)?;
    let path = match rest.strip_prefix(b"/") {
        Some(rel) => share.root().join(OsStr::from_bytes(rel)),
        None => share.root().to_path_buf(),
    };
    Ok(Resolved::Path {
        path,
        writable: share.writable(),
        share_root: rest.is_empty(),
    })
}

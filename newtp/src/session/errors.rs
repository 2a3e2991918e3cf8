// (c) 2025 Ross Younger

//! OS error to protocol status translation
//!
//! Each filesystem operation has its own table. An errno not listed in the table maps to
//! the table's fallback.

use std::io;

use rustix::io::Errno;
use tracing::debug;

use crate::protocol::Status;

/// Maps OS errors from one kind of operation to protocol status codes
#[derive(Debug)]
pub(crate) struct ErrorTable {
    /// Operation name, for logging
    pub(crate) operation: &'static str,
    pub(crate) entries: &'static [(Errno, Status)],
    pub(crate) fallback: Status,
}

impl ErrorTable {
    /// Translates an errno
    pub(crate) fn errno(&self, errno: Errno) -> Status {
        let status = self
            .entries
            .iter()
            .find(|(e, _)| *e == errno)
            .map_or(self.fallback, |(_, st)| *st);
        debug!("{}: {errno} -> {status}", self.operation);
        status
    }

    /// Translates an I/O error. Errors that did not come from the OS map to the fallback.
    pub(crate) fn map(&self, err: &io::Error) -> Status {
        match Errno::from_io_error(err) {
            Some(errno) => self.errno(errno),
            None => {
                debug!("{}: {err} -> {}", self.operation, self.fallback);
                self.fallback
            }
        }
    }
}

pub(crate) const OPEN_DIR: ErrorTable = ErrorTable {
    operation: "opendir",
    entries: &[
        (Errno::ACCESS, Status::Denied),
        (Errno::NOENT, Status::NotFound),
        (Errno::NOTDIR, Status::NotDir),
        (Errno::LOOP, Status::NotFound),
        (Errno::MFILE, Status::Busy),
        (Errno::NFILE, Status::Busy),
    ],
    fallback: Status::ServFail,
};

pub(crate) const READ_DIR: ErrorTable = ErrorTable {
    operation: "readdir",
    entries: &[(Errno::IO, Status::Io)],
    fallback: Status::ServFail,
};

/// Attribute lookup on a single directory entry.
/// `ENAMETOOLONG` is not listed: such entries are skipped, not reported.
pub(crate) const ENTRY_STAT: ErrorTable = ErrorTable {
    operation: "stat entry",
    entries: &[
        (Errno::ACCESS, Status::Denied),
        (Errno::NOENT, Status::NotFound),
        (Errno::NOTDIR, Status::NotFound),
        (Errno::LOOP, Status::NotFound),
    ],
    fallback: Status::ServFail,
};

pub(crate) const STAT: ErrorTable = ErrorTable {
    operation: "stat",
    entries: &[
        (Errno::ACCESS, Status::Denied),
        (Errno::NOENT, Status::NotFound),
        (Errno::NOTDIR, Status::NotFound),
        (Errno::LOOP, Status::NotFound),
        (Errno::NAMETOOLONG, Status::BadPath),
    ],
    fallback: Status::ServFail,
};

pub(crate) const STATVFS: ErrorTable = ErrorTable {
    operation: "statvfs",
    entries: &[
        (Errno::ACCESS, Status::Denied),
        (Errno::NOENT, Status::NotFound),
        (Errno::NOTDIR, Status::NotFound),
        (Errno::LOOP, Status::NotFound),
    ],
    fallback: Status::ServFail,
};

pub(crate) const OPEN_READ: ErrorTable = ErrorTable {
    operation: "open for read",
    entries: &[
        (Errno::ACCESS, Status::Denied),
        (Errno::NOENT, Status::NotFound),
        (Errno::NOTDIR, Status::NotFound),
        (Errno::LOOP, Status::NotFound),
        (Errno::MFILE, Status::Busy),
        (Errno::NFILE, Status::Busy),
    ],
    fallback: Status::ServFail,
};

pub(crate) const READ: ErrorTable = ErrorTable {
    operation: "read",
    entries: &[
        (Errno::ISDIR, Status::NotFile),
        (Errno::IO, Status::Io),
        (Errno::INVAL, Status::BadOffset),
    ],
    fallback: Status::ServFail,
};

pub(crate) const OPEN_WRITE: ErrorTable = ErrorTable {
    operation: "open for write",
    entries: &[
        (Errno::ACCESS, Status::Denied),
        (Errno::PERM, Status::Denied),
        (Errno::ROFS, Status::Denied),
        (Errno::ISDIR, Status::NotFile),
        (Errno::NOENT, Status::NotFound),
        (Errno::NOTDIR, Status::NotFound),
        (Errno::LOOP, Status::NotFound),
        (Errno::NOSPC, Status::DevFull),
        (Errno::DQUOT, Status::DevFull),
        (Errno::MFILE, Status::Busy),
        (Errno::NFILE, Status::Busy),
    ],
    fallback: Status::Fail,
};

pub(crate) const WRITE: ErrorTable = ErrorTable {
    operation: "write",
    entries: &[
        (Errno::NOSPC, Status::DevFull),
        (Errno::DQUOT, Status::DevFull),
        (Errno::FBIG, Status::TooBig),
        (Errno::IO, Status::Io),
        (Errno::INVAL, Status::BadOffset),
    ],
    fallback: Status::Fail,
};

/// A zero-length write is a request to flush; any failure is an I/O error
pub(crate) const FSYNC: ErrorTable = ErrorTable {
    operation: "fsync",
    entries: &[],
    fallback: Status::Io,
};

pub(crate) const TRUNCATE: ErrorTable = ErrorTable {
    operation: "truncate",
    entries: &[
        (Errno::ACCESS, Status::Denied),
        (Errno::PERM, Status::Denied),
        (Errno::ROFS, Status::Denied),
        (Errno::NOENT, Status::NotFound),
        (Errno::NOTDIR, Status::NotFound),
        (Errno::LOOP, Status::NotFound),
        (Errno::ISDIR, Status::NotFile),
        (Errno::FBIG, Status::TooBig),
        (Errno::INVAL, Status::BadOffset),
        (Errno::IO, Status::Io),
    ],
    fallback: Status::Fail,
};

pub(crate) const DELETE: ErrorTable = ErrorTable {
    operation: "delete",
    entries: &[
        (Errno::ACCESS, Status::Denied),
        (Errno::PERM, Status::Denied),
        (Errno::ROFS, Status::Denied),
        (Errno::NOENT, Status::NotFound),
        (Errno::NOTDIR, Status::NotFound),
        (Errno::LOOP, Status::NotFound),
        (Errno::NOTEMPTY, Status::NotEmpty),
        (Errno::EXIST, Status::NotEmpty),
        (Errno::BUSY, Status::Busy),
        (Errno::IO, Status::Io),
    ],
    fallback: Status::Fail,
};

pub(crate) const RENAME: ErrorTable = ErrorTable {
    operation: "rename",
    entries: &[
        (Errno::ACCESS, Status::Denied),
        (Errno::PERM, Status::Denied),
        (Errno::ROFS, Status::Denied),
        (Errno::NOENT, Status::NotFound),
        (Errno::LOOP, Status::NotFound),
        (Errno::NOTDIR, Status::NotDir),
        (Errno::ISDIR, Status::BadMove),
        (Errno::INVAL, Status::BadMove),
        (Errno::NOTEMPTY, Status::NotEmpty),
        (Errno::EXIST, Status::NotEmpty),
        (Errno::XDEV, Status::CrossDev),
        (Errno::BUSY, Status::Busy),
        (Errno::NOSPC, Status::DevFull),
        (Errno::DQUOT, Status::DevFull),
        (Errno::IO, Status::Io),
    ],
    fallback: Status::Fail,
};

pub(crate) const MKDIR: ErrorTable = ErrorTable {
    operation: "mkdir",
    entries: &[
        (Errno::ACCESS, Status::Denied),
        (Errno::PERM, Status::Denied),
        (Errno::ROFS, Status::Denied),
        (Errno::EXIST, Status::Exists),
        (Errno::NOENT, Status::NotFound),
        (Errno::NOTDIR, Status::NotFound),
        (Errno::LOOP, Status::NotFound),
        (Errno::NOSPC, Status::DevFull),
        (Errno::DQUOT, Status::DevFull),
        (Errno::IO, Status::Io),
    ],
    fallback: Status::Fail,
};

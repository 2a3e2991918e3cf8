// (c) 2025 Ross Younger

//! 🖥️ The per-connection operation engine
//!
//! A [`Session`] owns one connection's [handle table](crate::handles::HandleTable) and shares
//! the server's [share namespace](crate::shares::ShareNamespace).
//! It turns each command into filesystem syscalls and the result into a reply.
//!
//! Everything here is synchronous and blocking; the [server](crate::server) runs it on
//! tokio's blocking pool.

mod attrs;
mod errors;
mod file;
mod listing;
mod namespace;
mod stat;

use std::sync::Arc;

use bytes::Bytes;
use tracing::trace;

use crate::handles::{HandleTable, Resolved};
use crate::protocol::{Command, Opcode, Status, intro::Intro};
use crate::shares::ShareNamespace;

/// Per-connection resource limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Number of handle slots
    pub max_handles: u16,
    /// Number of directory listings that may be open at once
    pub max_open_dirs: u16,
    /// Largest READ the server will satisfy in one reply
    pub max_read: u16,
    /// Size budget of a READDIR reply payload
    pub page_size: u16,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_handles: 16384,
            max_open_dirs: 5,
            max_read: u16::MAX,
            page_size: u16::MAX,
        }
    }
}

impl Limits {
    /// The capability summary announced to clients
    #[must_use]
    pub fn intro(&self) -> Intro {
        Intro {
            max_handles: self.max_handles,
            max_open_dirs: self.max_open_dirs,
            platform: crate::protocol::intro::PLATFORM.to_string(),
            auth_mechanisms: String::new(),
            extensions: 0,
        }
    }
}

/// The result of one command: a status and the reply payload
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Constructor)]
pub struct Outcome {
    /// Result code
    pub status: Status,
    /// Reply payload
    pub payload: Bytes,
}

impl Outcome {
    /// Success with no payload
    #[must_use]
    pub fn ok() -> Self {
        Self::from(Status::Ok)
    }

    /// Success carrying a payload
    #[must_use]
    pub fn with_payload(payload: Bytes) -> Self {
        Self::new(Status::Ok, payload)
    }
}

impl From<Status> for Outcome {
    fn from(status: Status) -> Self {
        Self::new(status, Bytes::new())
    }
}

/// One connection's server-side state
#[derive(Debug)]
pub struct Session {
    shares: Arc<ShareNamespace>,
    handles: HandleTable,
    limits: Limits,
}

impl Session {
    /// Constructor
    #[must_use]
    pub fn new(shares: Arc<ShareNamespace>, limits: Limits) -> Self {
        Self {
            shares,
            handles: HandleTable::new(limits.max_handles),
            limits,
        }
    }

    /// Accessor
    #[must_use]
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Carries out a single command.
    ///
    /// This never fails as such; problems are reported in the outcome's status.
    pub fn dispatch(&mut self, command: &Command, payload: &[u8]) -> Outcome {
        let outcome = self
            .dispatch_inner(command, payload)
            .unwrap_or_else(Outcome::from);
        trace!(
            "#{} op {:#04x} handle {} -> {} ({} bytes)",
            command.request_id,
            command.opcode,
            command.handle,
            outcome.status,
            outcome.payload.len()
        );
        outcome
    }

    fn dispatch_inner(&mut self, command: &Command, payload: &[u8]) -> Result<Outcome, Status> {
        if command.extension != 0 {
            return Err(Status::BadExtension);
        }
        let opcode = command.opcode().ok_or(Status::BadCommand)?;
        let id = command.handle;
        match opcode {
            Opcode::Assign => {
                self.handles.assign(id, payload)?;
                Ok(Outcome::ok())
            }
            Opcode::Stat => self.stat(id, payload),
            Opcode::SetAttr => self.setattr(id),
            Opcode::StatVfs => self.statvfs(id),
            Opcode::Read => self.read(id, payload),
            Opcode::Write => self.write(id, payload),
            Opcode::Truncate => self.truncate(id, payload),
            Opcode::Delete => self.delete(id),
            Opcode::Rename => self.rename(id, payload),
            Opcode::MakeDir => self.mkdir(id),
            Opcode::RewindDir => self.rewind_dir(id),
            Opcode::ReadDir => self.read_dir(id, payload),
        }
    }
}

/// Returns the filesystem path of a resolved handle if it may be modified
fn mutable_path(resolved: Resolved) -> Result<std::path::PathBuf, Status> {
    match resolved {
        Resolved::Path {
            path,
            writable: true,
            ..
        } => Ok(path),
        _ => Err(Status::Denied),
    }
}

/// Offsets are signed on the OS side
fn file_offset(offset: u64) -> Result<u64, Status> {
    if i64::try_from(offset).is_ok() {
        Ok(offset)
    } else {
        Err(Status::BadOffset)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
pub(crate) mod fixture {
    use std::{path::PathBuf, sync::Arc};

    use bytes::Bytes;
    use tempfile::TempDir;

    use super::{Limits, Outcome, Session};
    use crate::protocol::{Command, Opcode, Status};
    use crate::shares::ShareNamespace;

    /// A session over a temporary directory holding a read-only share `ro`
    /// and a writable share `rw`
    pub(crate) struct Fixture {
        dir: TempDir,
        pub(crate) session: Session,
        next_request: u16,
    }

    impl Fixture {
        pub(crate) fn new() -> Self {
            Self::with_limits(Limits::default())
        }

        pub(crate) fn with_limits(limits: Limits) -> Self {
            let dir = tempfile::tempdir().unwrap();
            std::fs::create_dir(dir.path().join("ro")).unwrap();
            std::fs::create_dir(dir.path().join("rw")).unwrap();
            let mut shares = ShareNamespace::default();
            assert!(shares.add("ro", dir.path().join("ro"), false));
            assert!(shares.add("rw", dir.path().join("rw"), true));
            let session = Session::new(Arc::new(shares), limits);
            Self {
                dir,
                session,
                next_request: 0,
            }
        }

        pub(crate) fn path(&self, rel: &str) -> PathBuf {
            self.dir.path().join(rel)
        }

        #[allow(clippy::cast_possible_truncation)]
        pub(crate) fn run(&mut self, opcode: Opcode, handle: u16, payload: &[u8]) -> Outcome {
            self.next_request = self.next_request.wrapping_add(1);
            let cmd = Command::new(self.next_request, opcode, handle, payload.len() as u16);
            self.session.dispatch(&cmd, payload)
        }

        pub(crate) fn status(&mut self, opcode: Opcode, handle: u16, payload: &[u8]) -> Status {
            self.run(opcode, handle, payload).status
        }

        pub(crate) fn assign(&mut self, handle: u16, path: &str) {
            assert_eq!(
                self.status(Opcode::Assign, handle, path.as_bytes()),
                Status::Ok,
                "assign {path}"
            );
        }

        pub(crate) fn ok(&mut self, opcode: Opcode, handle: u16, payload: &[u8]) -> Bytes {
            let outcome = self.run(opcode, handle, payload);
            assert_eq!(outcome.status, Status::Ok, "{opcode}");
            outcome.payload
        }
    }
}

// (c) 2025 Ross Younger

//! STAT, STATVFS and SETATTR

use rustix::fs::StatVfsMountFlags;

use super::{Outcome, Session, attrs, errors};
use crate::handles::Resolved;
use crate::protocol::{AttrSpec, FsStats, Status, WireMessage as _};

impl Session {
    pub(super) fn stat(&mut self, id: u16, payload: &[u8]) -> Result<Outcome, Status> {
        let handle = self.handles.get_mut(id)?;
        let spec = AttrSpec::parse(payload)?;
        let attributes = match handle.resolve(&self.shares)? {
            Resolved::VirtualRoot => attrs::virtual_root(),
            Resolved::Path { path, writable, .. } => {
                let meta = std::fs::metadata(&path).map_err(|e| errors::STAT.map(&e))?;
                attrs::attributes(&path, &meta, &spec, writable)
            }
        };
        Ok(Outcome::with_payload(attrs::encode(&attributes, &spec)))
    }

    #[allow(clippy::cast_possible_truncation)]
    pub(super) fn statvfs(&mut self, id: u16) -> Result<Outcome, Status> {
        let handle = self.handles.get_mut(id)?;
        let Resolved::Path { path, writable, .. } = handle.resolve(&self.shares)? else {
            return Err(Status::NotFound);
        };
        let vfs = rustix::fs::statvfs(&path).map_err(|e| errors::STATVFS.errno(e))?;
        let stats = FsStats {
            device_id: vfs.f_fsid as u32,
            capacity: vfs.f_blocks.saturating_mul(vfs.f_frsize),
            free: vfs.f_bavail.saturating_mul(vfs.f_frsize),
            readonly: !writable || vfs.f_flag.contains(StatVfsMountFlags::RDONLY),
        };
        Ok(Outcome::with_payload(stats.to_bytes()))
    }

    pub(super) fn setattr(&mut self, id: u16) -> Result<Outcome, Status> {
        let handle = self.handles.get_mut(id)?;
        let _ = handle.resolve(&self.shares)?;
        Err(Status::Unsupported)
    }
}

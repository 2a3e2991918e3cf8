// (c) 2025 Ross Younger

//! DELETE, RENAME and MAKEDIR

use std::{fs::DirBuilder, os::unix::fs::DirBuilderExt as _, path::PathBuf};

use super::{Outcome, Session, errors, mutable_path};
use crate::handles::{Resolved, resolve, validate_path};
use crate::protocol::Status;

/// Permission bits given to directories created by MAKEDIR (before umask)
const DIRECTORY_MODE: u32 = 0o755;

/// Like [`mutable_path`], but share roots may not be removed or moved either
fn removable_path(resolved: Resolved) -> Result<PathBuf, Status> {
    match resolved {
        Resolved::Path {
            path,
            writable: true,
            share_root: false,
        } => Ok(path),
        _ => Err(Status::Denied),
    }
}

impl Session {
    pub(super) fn delete(&mut self, id: u16) -> Result<Outcome, Status> {
        let handle = self.handles.get_mut(id)?;
        let path = removable_path(handle.resolve(&self.shares)?)?;
        let meta = std::fs::symlink_metadata(&path).map_err(|e| errors::DELETE.map(&e))?;
        handle.close_descriptors();
        let result = if meta.is_dir() {
            std::fs::remove_dir(&path)
        } else {
            std::fs::remove_file(&path)
        };
        result.map_err(|e| errors::DELETE.map(&e))?;
        Ok(Outcome::ok())
    }

    /// On success the handle follows the entity to its new path
    pub(super) fn rename(&mut self, id: u16, payload: &[u8]) -> Result<Outcome, Status> {
        let handle = self.handles.get_mut(id)?;
        if !validate_path(payload) {
            return Err(Status::BadPath);
        }
        let source = removable_path(handle.resolve(&self.shares)?)?;
        let destination = match resolve(payload, &self.shares)? {
            Resolved::VirtualRoot
            | Resolved::Path {
                share_root: true, ..
            } => return Err(Status::BadMove),
            Resolved::Path {
                writable: false, ..
            } => return Err(Status::Denied),
            Resolved::Path { path, .. } => path,
        };
        std::fs::rename(&source, &destination).map_err(|e| errors::RENAME.map(&e))?;
        handle.repoint(payload.to_vec());
        Ok(Outcome::ok())
    }

    pub(super) fn mkdir(&mut self, id: u16) -> Result<Outcome, Status> {
        let handle = self.handles.get_mut(id)?;
        let path = mutable_path(handle.resolve(&self.shares)?)?;
        DirBuilder::new()
            .mode(DIRECTORY_MODE)
            .create(&path)
            .map_err(|e| errors::MKDIR.map(&e))?;
        Ok(Outcome::ok())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod test {
    use crate::protocol::{AttrCode, AttrSpec, FileAttributes, Opcode, Status};
    use crate::session::fixture::Fixture;

    use pretty_assertions::assert_eq;

    #[test]
    fn make_and_remove_directory() {
        let mut f = Fixture::new();
        f.assign(1, "/rw/sub");
        let _ = f.ok(Opcode::MakeDir, 1, b"");
        assert!(f.path("rw/sub").is_dir());
        assert_eq!(f.status(Opcode::MakeDir, 1, b""), Status::Exists);
        let _ = f.ok(Opcode::Delete, 1, b"");
        assert!(!f.path("rw/sub").exists());
        assert_eq!(f.status(Opcode::Delete, 1, b""), Status::NotFound);
    }

    #[test]
    fn mkdir_errors() {
        let mut f = Fixture::new();
        f.assign(0, "");
        assert_eq!(f.status(Opcode::MakeDir, 0, b""), Status::Denied);
        f.assign(1, "/ro/sub");
        assert_eq!(f.status(Opcode::MakeDir, 1, b""), Status::Denied);
        assert!(!f.path("ro/sub").exists());
        f.assign(2, "/rw/a/b");
        assert_eq!(f.status(Opcode::MakeDir, 2, b""), Status::NotFound);
    }

    #[test]
    fn delete_file() {
        let mut f = Fixture::new();
        std::fs::write(f.path("rw/data"), b"x").unwrap();
        f.assign(1, "/rw/data");
        let _ = f.ok(Opcode::Delete, 1, b"");
        assert!(!f.path("rw/data").exists());
    }

    #[test]
    fn delete_refused() {
        let mut f = Fixture::new();
        std::fs::write(f.path("ro/data"), b"x").unwrap();
        f.assign(1, "/ro/data");
        assert_eq!(f.status(Opcode::Delete, 1, b""), Status::Denied);
        assert!(f.path("ro/data").exists());

        f.assign(2, "/rw");
        assert_eq!(f.status(Opcode::Delete, 2, b""), Status::Denied);
        f.assign(3, "");
        assert_eq!(f.status(Opcode::Delete, 3, b""), Status::Denied);
    }

    #[test]
    fn delete_non_empty_directory() {
        let mut f = Fixture::new();
        std::fs::create_dir(f.path("rw/sub")).unwrap();
        std::fs::write(f.path("rw/sub/data"), b"x").unwrap();
        f.assign(1, "/rw/sub");
        assert_eq!(f.status(Opcode::Delete, 1, b""), Status::NotEmpty);
    }

    #[test]
    fn rename_follows_the_entity() {
        let mut f = Fixture::new();
        std::fs::write(f.path("rw/old"), b"0123").unwrap();
        f.assign(1, "/rw/old");
        let _ = f.ok(Opcode::Rename, 1, b"/rw/new");
        assert!(!f.path("rw/old").exists());
        assert_eq!(std::fs::read(f.path("rw/new")).unwrap(), b"0123");
        assert_eq!(f.session.handles.get_mut(1).unwrap().name(), b"/rw/new");

        let spec = AttrSpec::from(&[AttrCode::Size][..]);
        let blob = f.ok(Opcode::Stat, 1, &spec.to_bytes());
        assert_eq!(FileAttributes::decode(&spec, &blob).unwrap().size, 4);
    }

    #[test]
    fn rename_destinations() {
        let mut f = Fixture::new();
        std::fs::write(f.path("rw/data"), b"x").unwrap();
        f.assign(1, "/rw/data");
        assert_eq!(f.status(Opcode::Rename, 1, b""), Status::BadMove);
        assert_eq!(f.status(Opcode::Rename, 1, b"/ro"), Status::BadMove);
        assert_eq!(f.status(Opcode::Rename, 1, b"/rw"), Status::BadMove);
        assert_eq!(f.status(Opcode::Rename, 1, b"/ro/data"), Status::Denied);
        assert_eq!(f.status(Opcode::Rename, 1, b"/nope/data"), Status::NotFound);
        assert_eq!(f.status(Opcode::Rename, 1, b"/rw/../x"), Status::BadPath);
        assert_eq!(f.status(Opcode::Rename, 1, b"/rw/a/b"), Status::NotFound);
        // nothing moved, handle unchanged
        assert!(f.path("rw/data").exists());
        assert_eq!(f.session.handles.get_mut(1).unwrap().name(), b"/rw/data");
    }

    #[test]
    fn rename_sources() {
        let mut f = Fixture::new();
        std::fs::write(f.path("ro/data"), b"x").unwrap();
        f.assign(1, "/ro/data");
        assert_eq!(f.status(Opcode::Rename, 1, b"/rw/data"), Status::Denied);
        f.assign(2, "/rw");
        assert_eq!(f.status(Opcode::Rename, 2, b"/rw/x"), Status::Denied);
        f.assign(3, "");
        assert_eq!(f.status(Opcode::Rename, 3, b"/rw/x"), Status::Denied);
        f.assign(4, "/rw/missing");
        assert_eq!(f.status(Opcode::Rename, 4, b"/rw/x"), Status::NotFound);
    }

    #[test]
    fn rename_directory_over_non_empty() {
        let mut f = Fixture::new();
        std::fs::create_dir_all(f.path("rw/a")).unwrap();
        std::fs::create_dir_all(f.path("rw/b/c")).unwrap();
        f.assign(1, "/rw/a");
        assert_eq!(f.status(Opcode::Rename, 1, b"/rw/b"), Status::NotEmpty);
    }
}

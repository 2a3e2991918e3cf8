// (c) 2025 Ross Younger

//! Per-connection handle slots

use std::{
    fs::{File, OpenOptions, ReadDir},
    io,
    os::unix::fs::OpenOptionsExt as _,
    path::{Path, PathBuf},
};

use bytes::Bytes;
use tracing::trace;

use super::path::{Resolved, resolve, validate_path};
use crate::{
    protocol::{AttrSpec, Status},
    shares::ShareNamespace,
};

/// Permission bits given to files created by WRITE (before umask)
pub(crate) const CREATE_MODE: u32 = 0o644;

/// The direction a handle's file descriptor was opened for
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub(crate) enum FileMode {
    Read,
    Write,
}

impl FileMode {
    fn open(self, path: &Path) -> io::Result<File> {
        match self {
            FileMode::Read => File::open(path),
            FileMode::Write => OpenOptions::new()
                .write(true)
                .create(true)
                .mode(CREATE_MODE)
                .open(path),
        }
    }
}

#[derive(Debug)]
struct OpenFile {
    mode: FileMode,
    file: File,
}

/// Source of entries for an open directory listing
#[derive(Debug)]
pub(crate) enum Cursor {
    /// A real directory
    Directory(ReadDir),
    /// The virtual root; holds the position of the next share to list
    Shares(usize),
}

/// An open directory listing
#[derive(Debug)]
pub(crate) struct Listing {
    pub(crate) cursor: Cursor,
    /// An encoded entry that did not fit in the previous page,
    /// with the attribute specification it was encoded under
    pub(crate) pending: Option<(AttrSpec, Bytes)>,
}

impl Listing {
    pub(crate) fn new(cursor: Cursor) -> Self {
        Self {
            cursor,
            pending: None,
        }
    }
}

/// A handle: a client path and the descriptors currently open on it
#[derive(Debug)]
pub struct Handle {
    /// Path as assigned by the client. Empty for the virtual root.
    name: Vec<u8>,
    /// Absolute path as last resolved
    resolved: Option<PathBuf>,
    writable: bool,
    file: Option<OpenFile>,
    listing: Option<Listing>,
}

impl Handle {
    fn new(name: Vec<u8>) -> Self {
        Self {
            name,
            resolved: None,
            writable: false,
            file: None,
            listing: None,
        }
    }

    /// The path this handle was assigned
    #[must_use]
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// Whether the handle's share was writable when last resolved
    #[must_use]
    pub fn writable(&self) -> bool {
        self.writable
    }

    /// Works out where this handle points now.
    ///
    /// If the answer differs from last time, any open descriptors are closed.
    pub fn resolve(&mut self, shares: &ShareNamespace) -> Result<Resolved, Status> {
        let result = resolve(&self.name, shares);
        match &result {
            Ok(Resolved::Path { path, writable, .. }) => {
                if self.resolved.as_ref() != Some(path) {
                    if self.resolved.is_some() {
                        trace!("resolved path changed to {path:?}");
                        self.close_descriptors();
                    }
                    self.resolved = Some(path.clone());
                }
                self.writable = *writable;
            }
            Ok(Resolved::VirtualRoot) => self.writable = false,
            Err(_) => {
                self.close_descriptors();
                self.resolved = None;
                self.writable = false;
            }
        }
        result
    }

    /// Returns a file descriptor on `path` open in the given mode.
    ///
    /// An existing descriptor of the same mode is reused; one of the other mode is closed first.
    pub(crate) fn open_file(&mut self, mode: FileMode, path: &Path) -> io::Result<&mut File> {
        let reuse = self.file.as_ref().is_some_and(|f| f.mode == mode);
        if !reuse {
            self.file = None;
            let file = mode.open(path)?;
            trace!("opened {path:?} for {mode}");
            self.file = Some(OpenFile { mode, file });
        }
        self.file
            .as_mut()
            .map(|f| &mut f.file)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    /// Returns the write descriptor, if one is open
    pub(crate) fn write_descriptor(&mut self) -> Option<&mut File> {
        self.file
            .as_mut()
            .filter(|f| f.mode == FileMode::Write)
            .map(|f| &mut f.file)
    }

    /// The descriptor's current mode, if open
    #[cfg(test)]
    pub(crate) fn file_mode(&self) -> Option<FileMode> {
        self.file.as_ref().map(|f| f.mode)
    }

    pub(crate) fn listing_mut(&mut self) -> Option<&mut Listing> {
        self.listing.as_mut()
    }

    pub(crate) fn set_listing(&mut self, listing: Option<Listing>) {
        self.listing = listing;
    }

    pub(crate) fn has_listing(&self) -> bool {
        self.listing.is_some()
    }

    /// Closes any open file descriptor and directory listing
    pub fn close_descriptors(&mut self) {
        self.file = None;
        self.listing = None;
    }

    /// Points this handle at a new path, closing its descriptors
    pub fn repoint(&mut self, name: Vec<u8>) {
        self.close_descriptors();
        self.name = name;
        self.resolved = None;
    }
}

/// The handles belonging to one session
#[derive(Debug)]
pub struct HandleTable {
    slots: Vec<Option<Box<Handle>>>,
}

impl HandleTable {
    /// Creates a table with `size` empty slots
    #[must_use]
    pub fn new(size: u16) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None)
                .take(usize::from(size))
                .collect(),
        }
    }

    /// Number of slots
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Binds a handle to a path, replacing (and closing) whatever occupied it before.
    ///
    /// # Errors
    /// * [`Status::BadHandle`] if `id` is out of range
    /// * [`Status::BadPath`] if the path is not acceptable; the slot is left untouched
    pub fn assign(&mut self, id: u16, path: &[u8]) -> Result<(), Status> {
        let slot = self
            .slots
            .get_mut(usize::from(id))
            .ok_or(Status::BadHandle)?;
        if !validate_path(path) {
            return Err(Status::BadPath);
        }
        trace!(
            "handle {id} -> {:?}",
            String::from_utf8_lossy(path)
        );
        *slot = Some(Box::new(Handle::new(path.to_vec())));
        Ok(())
    }

    /// Looks up an assigned handle
    ///
    /// # Errors
    /// [`Status::BadHandle`] if `id` is out of range or not assigned
    pub fn get_mut(&mut self, id: u16) -> Result<&mut Handle, Status> {
        self.slots
            .get_mut(usize::from(id))
            .and_then(|s| s.as_deref_mut())
            .ok_or(Status::BadHandle)
    }

    /// Number of handles with an open directory listing
    #[must_use]
    pub fn open_listings(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|h| h.has_listing())
            .count()
    }
}

// (c) 2025 Ross Younger

//! REWINDDIR and READDIR
//!
//! A listing is paged: each READDIR fills one reply with as many entries as fit the
//! configured page size. An entry that does not fit is kept back and starts the next page.

use std::{fs::ReadDir, os::unix::ffi::OsStrExt as _};

use bytes::{BufMut as _, Bytes, BytesMut};
use rustix::io::Errno;
use tracing::{debug, warn};

use super::{Outcome, Session, attrs, errors};
use crate::handles::{Cursor, Listing, Resolved};
use crate::protocol::{AttrSpec, Status};
use crate::shares::ShareNamespace;

/// A READDIR reply under construction
#[derive(Debug)]
struct Page {
    buf: BytesMut,
    count: u16,
    limit: usize,
}

impl Page {
    fn new(limit: usize) -> Self {
        let mut buf = BytesMut::with_capacity(limit.min(8192));
        buf.put_u16(0);
        Self {
            buf,
            count: 0,
            limit,
        }
    }

    fn fits(&self, entry: &[u8]) -> bool {
        self.buf.len() + entry.len() <= self.limit
    }

    /// Whether the entry would fit in a page of its own
    fn fits_alone(&self, entry: &[u8]) -> bool {
        2 + entry.len() <= self.limit
    }

    fn push(&mut self, entry: &[u8]) {
        self.buf.put_slice(entry);
        self.count += 1;
    }

    fn finish(mut self) -> Bytes {
        self.buf[..2].copy_from_slice(&self.count.to_be_bytes());
        self.buf.freeze()
    }
}

/// Produces the next encoded entry of a real directory, or None at the end
fn next_directory_entry(
    dir: &mut ReadDir,
    spec: &AttrSpec,
    writable: bool,
) -> Result<Option<Bytes>, Status> {
    for item in dir.by_ref() {
        let entry = item.map_err(|e| errors::READ_DIR.map(&e))?;
        let name = entry.file_name();
        let name = name.as_bytes();
        if name == b"." || name == b".." {
            continue;
        }
        if spec.codes().is_empty() {
            return Ok(Some(attrs::entry(name, &Default::default(), spec)));
        }
        let path = entry.path();
        let meta = match std::fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if Errno::from_io_error(&e) == Some(Errno::NAMETOOLONG) => {
                debug!("skipping {path:?}: {e}");
                continue;
            }
            Err(e) => return Err(errors::ENTRY_STAT.map(&e)),
        };
        let attributes = attrs::attributes(&path, &meta, spec, writable);
        return Ok(Some(attrs::entry(name, &attributes, spec)));
    }
    Ok(None)
}

/// Produces the next encoded share of the virtual root, or None at the end
fn next_share_entry(
    position: &mut usize,
    shares: &ShareNamespace,
    spec: &AttrSpec,
) -> Option<Bytes> {
    let share = shares.get(*position)?;
    *position += 1;
    let attributes = attrs::share(share, spec);
    Some(attrs::entry(share.name().as_bytes(), &attributes, spec))
}

/// Fills a page from the listing. Returns CONTINUED if entries remain, FINISHED otherwise.
fn fill_page(
    page: &mut Page,
    listing: &mut Listing,
    shares: &ShareNamespace,
    spec: &AttrSpec,
    writable: bool,
) -> Result<Status, Status> {
    if let Some((_, entry)) = listing.pending.take() {
        page.push(&entry);
    }
    loop {
        let next = match &mut listing.cursor {
            Cursor::Directory(dir) => next_directory_entry(dir, spec, writable)?,
            Cursor::Shares(position) => next_share_entry(position, shares, spec),
        };
        let Some(entry) = next else {
            return Ok(Status::Finished);
        };
        if page.fits(&entry) {
            page.push(&entry);
        } else if !page.fits_alone(&entry) {
            warn!(
                "directory entry of {} bytes can never fit in a page; skipped",
                entry.len()
            );
        } else {
            listing.pending = Some((spec.clone(), entry));
            return Ok(Status::Continued);
        }
    }
}

impl Session {
    pub(super) fn rewind_dir(&mut self, id: u16) -> Result<Outcome, Status> {
        let open = self.handles.open_listings();
        let handle = self.handles.get_mut(id)?;
        let resolved = handle.resolve(&self.shares)?;
        let others = open - usize::from(handle.has_listing());
        if others >= usize::from(self.limits.max_open_dirs) {
            return Err(Status::Busy);
        }
        handle.set_listing(None);
        let cursor = match resolved {
            Resolved::VirtualRoot => Cursor::Shares(0),
            Resolved::Path { path, .. } => {
                let dir = std::fs::read_dir(&path).map_err(|e| errors::OPEN_DIR.map(&e))?;
                Cursor::Directory(dir)
            }
        };
        handle.set_listing(Some(Listing::new(cursor)));
        Ok(Outcome::ok())
    }

    /// The listing is closed once it is finished or fails.
    ///
    /// While an entry is held over from the previous page, the attribute specification
    /// must not change; a different one is refused with BADATTR and the listing stays open.
    pub(super) fn read_dir(&mut self, id: u16, payload: &[u8]) -> Result<Outcome, Status> {
        let handle = self.handles.get_mut(id)?;
        let spec = AttrSpec::parse(payload)?;
        let _ = handle.resolve(&self.shares)?;
        let writable = handle.writable();
        let listing = handle.listing_mut().ok_or(Status::ReadDir)?;
        if listing.pending.as_ref().is_some_and(|(held, _)| *held != spec) {
            return Err(Status::BadAttr);
        }

        let mut page = Page::new(usize::from(self.limits.page_size));
        let result = fill_page(&mut page, listing, &self.shares, &spec, writable);
        match result {
            Ok(Status::Continued) => (),
            _ => handle.set_listing(None),
        }
        let status = result?;
        Ok(Outcome::new(status, page.finish()))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod test {
    use std::collections::BTreeSet;

    use super::Page;
    use crate::protocol::{
        AttrCode, AttrSpec, FileAttributes, Opcode, Status, attributes::file_type,
        message::decode_dir_page,
    };
    use crate::session::{Limits, fixture::Fixture};

    use assertables::assert_le;
    use pretty_assertions::assert_eq;

    /// Lists a handle to completion, returning names and the number of pages used
    fn list(f: &mut Fixture, handle: u16, spec: &AttrSpec) -> (Vec<String>, usize) {
        let _ = f.ok(Opcode::RewindDir, handle, b"");
        let mut names = Vec::new();
        let mut pages = 0;
        loop {
            let outcome = f.run(Opcode::ReadDir, handle, &spec.to_bytes());
            pages += 1;
            assert_le!(outcome.payload.len(), usize::from(f.session.limits().page_size));
            for e in decode_dir_page(&outcome.payload).unwrap() {
                names.push(String::from_utf8(e.name).unwrap());
            }
            match outcome.status {
                Status::Continued => (),
                Status::Finished => break,
                other => panic!("unexpected {other}"),
            }
        }
        (names, pages)
    }

    #[test]
    fn page_accounting() {
        let mut page = Page::new(10);
        assert!(page.fits(&[0; 8]));
        assert!(!page.fits(&[0; 9]));
        page.push(&[1, 2, 3]);
        assert!(!page.fits(&[0; 8]));
        assert!(page.fits_alone(&[0; 8]));
        assert_eq!(&page.finish()[..], &[0, 1, 1, 2, 3]);
    }

    #[test]
    fn virtual_root_lists_shares() {
        let mut f = Fixture::new();
        f.assign(0, "");
        let spec = AttrSpec::from(&[AttrCode::Type][..]);
        let (names, pages) = list(&mut f, 0, &spec);
        assert_eq!(names, vec!["ro", "rw"]);
        assert_eq!(pages, 1);
    }

    #[test]
    fn directory_with_attributes() {
        let mut f = Fixture::new();
        std::fs::write(f.path("ro/file"), b"abc").unwrap();
        std::fs::create_dir(f.path("ro/dir")).unwrap();
        f.assign(1, "/ro");
        let spec = AttrSpec::from(&[AttrCode::Type, AttrCode::Size][..]);
        let _ = f.ok(Opcode::RewindDir, 1, b"");
        let outcome = f.run(Opcode::ReadDir, 1, &spec.to_bytes());
        assert_eq!(outcome.status, Status::Finished);
        let mut entries = decode_dir_page(&outcome.payload).unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(entries.len(), 2);
        let dir = FileAttributes::decode(&spec, &entries[0].attributes).unwrap();
        assert_eq!(entries[0].name, b"dir");
        assert_eq!(dir.kind, file_type::DIRECTORY);
        let file = FileAttributes::decode(&spec, &entries[1].attributes).unwrap();
        assert_eq!(file.kind, file_type::REGULAR);
        assert_eq!(file.size, 3);
    }

    #[test]
    fn every_entry_exactly_once_across_pages() {
        let mut f = Fixture::with_limits(Limits {
            page_size: 512,
            ..Limits::default()
        });
        let expected: BTreeSet<String> = (0..200).map(|i| format!("entry-{i:04}")).collect();
        for name in &expected {
            std::fs::write(f.path(&format!("rw/{name}")), b"").unwrap();
        }
        f.assign(1, "/rw");
        let spec = AttrSpec::from(&[AttrCode::Size, AttrCode::Mtime][..]);
        let (names, pages) = list(&mut f, 1, &spec);
        assert_eq!(names.len(), expected.len());
        assert_eq!(names.into_iter().collect::<BTreeSet<_>>(), expected);
        assert!(pages > 1);
    }

    #[test]
    fn readdir_needs_rewind() {
        let mut f = Fixture::new();
        f.assign(1, "/rw");
        assert_eq!(f.status(Opcode::ReadDir, 1, b""), Status::ReadDir);
        let _ = f.ok(Opcode::RewindDir, 1, b"");
        assert_eq!(f.status(Opcode::ReadDir, 1, b""), Status::Finished);
        // finished listings are closed
        assert_eq!(f.status(Opcode::ReadDir, 1, b""), Status::ReadDir);
    }

    #[test]
    fn bad_spec_leaves_listing_open() {
        let mut f = Fixture::new();
        f.assign(1, "/rw");
        let _ = f.ok(Opcode::RewindDir, 1, b"");
        assert_eq!(f.status(Opcode::ReadDir, 1, b"\x03"), Status::BadAttr);
        assert_eq!(f.status(Opcode::ReadDir, 1, b""), Status::Finished);
    }

    #[test]
    fn repeated_codes_rejected() {
        let mut f = Fixture::with_limits(Limits {
            page_size: 512,
            ..Limits::default()
        });
        for i in 0..5 {
            std::fs::write(f.path(&format!("rw/file-{i}")), b"").unwrap();
        }
        f.assign(1, "/rw");
        let _ = f.ok(Opcode::RewindDir, 1, b"");
        // each entry would be larger than a page
        assert_eq!(f.status(Opcode::ReadDir, 1, &[0x02; 100]), Status::BadAttr);
        let (names, _) = list(&mut f, 1, &AttrSpec::from(&[AttrCode::Size][..]));
        assert_eq!(names.len(), 5);
    }

    #[test]
    fn spec_fixed_while_entry_held_over() {
        let mut f = Fixture::with_limits(Limits {
            page_size: 512,
            ..Limits::default()
        });
        let expected: BTreeSet<String> = (0..100).map(|i| format!("entry-{i:03}")).collect();
        for name in &expected {
            std::fs::write(f.path(&format!("rw/{name}")), b"").unwrap();
        }
        f.assign(1, "/rw");
        let wide = AttrSpec::from(&[AttrCode::Size, AttrCode::Mtime][..]);
        let narrow = AttrSpec::from(&[AttrCode::Type][..]);
        let _ = f.ok(Opcode::RewindDir, 1, b"");

        let mut names = Vec::new();
        let first = f.run(Opcode::ReadDir, 1, &wide.to_bytes());
        assert_eq!(first.status, Status::Continued);
        for e in decode_dir_page(&first.payload).unwrap() {
            names.push(String::from_utf8(e.name).unwrap());
        }
        assert_eq!(f.status(Opcode::ReadDir, 1, &narrow.to_bytes()), Status::BadAttr);
        loop {
            let outcome = f.run(Opcode::ReadDir, 1, &wide.to_bytes());
            for e in decode_dir_page(&outcome.payload).unwrap() {
                assert_eq!(e.attributes.len(), wide.encoded_len());
                names.push(String::from_utf8(e.name).unwrap());
            }
            if outcome.status == Status::Finished {
                break;
            }
            assert_eq!(outcome.status, Status::Continued);
        }
        assert_eq!(names.len(), expected.len());
        assert_eq!(names.into_iter().collect::<BTreeSet<_>>(), expected);
    }

    #[test]
    fn rewind_errors() {
        let mut f = Fixture::new();
        std::fs::write(f.path("rw/file"), b"").unwrap();
        f.assign(1, "/rw/file");
        assert_eq!(f.status(Opcode::RewindDir, 1, b""), Status::NotDir);
        f.assign(2, "/rw/missing");
        assert_eq!(f.status(Opcode::RewindDir, 2, b""), Status::NotFound);
        assert_eq!(f.status(Opcode::RewindDir, 3, b""), Status::BadHandle);
    }

    #[test]
    fn open_listing_limit() {
        let mut f = Fixture::with_limits(Limits {
            max_open_dirs: 2,
            ..Limits::default()
        });
        for h in 0..3 {
            f.assign(h, "/rw");
        }
        let _ = f.ok(Opcode::RewindDir, 0, b"");
        let _ = f.ok(Opcode::RewindDir, 1, b"");
        assert_eq!(f.status(Opcode::RewindDir, 2, b""), Status::Busy);
        // rewinding an already open listing is fine
        let _ = f.ok(Opcode::RewindDir, 1, b"");
        // reassignment closes the listing, making room
        f.assign(0, "/ro");
        let _ = f.ok(Opcode::RewindDir, 2, b"");
    }

    #[test]
    fn rewind_restarts() {
        let mut f = Fixture::with_limits(Limits {
            page_size: 512,
            ..Limits::default()
        });
        for i in 0..100 {
            std::fs::write(f.path(&format!("rw/file-{i:03}")), b"").unwrap();
        }
        f.assign(1, "/rw");
        let spec = AttrSpec::default();
        let _ = f.ok(Opcode::RewindDir, 1, b"");
        assert_eq!(f.status(Opcode::ReadDir, 1, &spec.to_bytes()), Status::Continued);
        let (names, _) = list(&mut f, 1, &spec);
        assert_eq!(names.len(), 100);
    }
}

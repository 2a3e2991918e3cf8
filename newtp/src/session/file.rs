// (c) 2025 Ross Younger

//! READ, WRITE and TRUNCATE

use std::{
    fs::OpenOptions,
    io::{ErrorKind, Read as _, Seek as _, SeekFrom, Write},
};

use bytes::BytesMut;
use tracing::debug;

use super::{Outcome, Session, errors, file_offset, mutable_path};
use crate::handles::{FileMode, Resolved};
use crate::protocol::{Count, Offset, OffsetLength, Status, WireMessage as _};

impl Session {
    pub(super) fn read(&mut self, id: u16, payload: &[u8]) -> Result<Outcome, Status> {
        let handle = self.handles.get_mut(id)?;
        let (OffsetLength { offset, length }, _) = OffsetLength::decode(payload)?;
        let Resolved::Path { path, .. } = handle.resolve(&self.shares)? else {
            return Err(Status::NotFile);
        };
        let offset = file_offset(offset)?;
        let wanted = usize::from(length.min(self.limits.max_read));

        let file = handle
            .open_file(FileMode::Read, &path)
            .map_err(|e| errors::OPEN_READ.map(&e))?;
        let _ = file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| errors::READ.map(&e))?;

        let mut buf = BytesMut::zeroed(wanted);
        let mut done = 0;
        while done < wanted {
            match file.read(&mut buf[done..]) {
                Ok(0) => break,
                Ok(n) => done += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => (),
                Err(e) if done > 0 => {
                    debug!("short read after {done} bytes: {e}");
                    break;
                }
                Err(e) => return Err(errors::READ.map(&e)),
            }
        }
        buf.truncate(done);
        Ok(Outcome::with_payload(buf.freeze()))
    }

    #[allow(clippy::cast_possible_truncation)]
    pub(super) fn write(&mut self, id: u16, payload: &[u8]) -> Result<Outcome, Status> {
        let handle = self.handles.get_mut(id)?;
        let (Offset { offset }, used) = Offset::decode(payload)?;
        let data = &payload[used..];
        let path = mutable_path(handle.resolve(&self.shares)?)?;
        let offset = file_offset(offset)?;

        let file = handle
            .open_file(FileMode::Write, &path)
            .map_err(|e| errors::OPEN_WRITE.map(&e))?;
        if data.is_empty() {
            file.sync_all().map_err(|e| errors::FSYNC.map(&e))?;
            return Ok(Outcome::with_payload(Count(0).to_bytes()));
        }
        let _ = file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| errors::WRITE.map(&e))?;

        write_fully(file, data)
    }

    pub(super) fn truncate(&mut self, id: u16, payload: &[u8]) -> Result<Outcome, Status> {
        let handle = self.handles.get_mut(id)?;
        let (Offset { offset }, _) = Offset::decode(payload)?;
        let path = mutable_path(handle.resolve(&self.shares)?)?;
        let length = file_offset(offset)?;

        let result = match handle.write_descriptor() {
            Some(file) => file.set_len(length),
            None => OpenOptions::new()
                .write(true)
                .open(&path)
                .and_then(|file| file.set_len(length)),
        };
        result.map_err(|e| errors::TRUNCATE.map(&e))?;
        Ok(Outcome::ok())
    }
}

/// Writes as much of `data` as the writer accepts.
///
/// A failure after some bytes were written is reported as PARTIAL with the count so far.
/// Nothing written at all is an error.
fn write_fully<W: Write>(w: &mut W, data: &[u8]) -> Result<Outcome, Status> {
    let mut done = 0;
    while done < data.len() {
        match w.write(&data[done..]) {
            Ok(0) => break,
            Ok(n) => done += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => (),
            Err(e) if done > 0 => {
                debug!("partial write of {done} bytes: {e}");
                break;
            }
            Err(e) => return Err(errors::WRITE.map(&e)),
        }
    }
    if done == 0 {
        return Err(Status::Io);
    }
    let status = if done == data.len() {
        Status::Ok
    } else {
        Status::Partial
    };
    // data came from a single payload so always fits
    let count = u16::try_from(done).unwrap_or(u16::MAX);
    Ok(Outcome::new(status, Count(count).to_bytes()))
}

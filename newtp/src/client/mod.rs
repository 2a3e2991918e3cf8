//! 💻 Client side of the protocol
// (c) 2025 Ross Younger
//!
//! [`Client`] wraps a connected stream. It performs the intro when created, then offers one
//! method per operation plus a few conveniences that loop over them
//! ([`list`](Client::list), [`download`](Client::download), [`upload`](Client::upload)).
//!
//! Requests are strictly sequential: each method sends one command and waits for its reply.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt as _, AsyncWrite, AsyncWriteExt as _};
use tracing::trace;

mod commands;
pub use commands::Operation;
pub(crate) use commands::client_main;

use crate::protocol::{
    AttrSpec, CodecError, Command, Count, DirEntry, FileAttributes, FsStats, MAX_PAYLOAD,
    Offset, OffsetLength, Opcode, Reply, Status, WireMessage as _,
    common::{ReceivingStream, SendReceivePair, SendingStream, read_framed, write_framed},
    intro::{INIT_REQUEST_ID, Intro, client_intro},
    message::decode_dir_page,
};

/// Largest amount of data sent in a single WRITE
pub const WRITE_CHUNK: usize = MAX_PAYLOAD - 8;

/// Errors reported by [`Client`]
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server reported an error
    #[error("server replied {0}")]
    Status(#[from] Status),
    /// A write made some progress then failed
    #[error("write stopped after {written} bytes")]
    Partial {
        /// Bytes written before the failure
        written: u16,
    },
    /// The server sent something we could not decode
    #[error("malformed reply: {0}")]
    Codec(#[from] CodecError),
    /// The server broke the protocol
    #[error("protocol error: {0}")]
    Protocol(String),
    /// The transport failed
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
    /// A local I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for [`Client`] operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// One page of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirPage {
    /// Entries in this page
    pub entries: Vec<DirEntry>,
    /// Whether this was the last page
    pub finished: bool,
}

/// A directory entry with decoded attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    /// Entry name
    pub name: Vec<u8>,
    /// The attributes that were asked for. Others are zero.
    pub attributes: FileAttributes,
}

impl ListEntry {
    /// The entry name, lossily converted to a string
    #[must_use]
    pub fn name_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }
}

/// A connected client session
#[derive(Debug)]
pub struct Client<S: SendingStream, R: ReceivingStream> {
    sp: SendReceivePair<S, R>,
    intro: Intro,
    next_request: u16,
}

impl<S: SendingStream, R: ReceivingStream> Client<S, R> {
    /// Performs the intro exchange over a connected stream
    pub async fn connect(mut sp: SendReceivePair<S, R>) -> Result<Self> {
        let intro = client_intro(&mut sp).await?;
        trace!("server intro: {intro:?}");
        Ok(Self {
            sp,
            intro,
            next_request: 0,
        })
    }

    /// The server's capability summary
    #[must_use]
    pub fn server_info(&self) -> &Intro {
        &self.intro
    }

    /// Releases the underlying stream
    #[must_use]
    pub fn into_inner(self) -> SendReceivePair<S, R> {
        self.sp
    }

    fn request_id(&mut self) -> u16 {
        self.next_request = self.next_request.wrapping_add(1);
        if self.next_request == INIT_REQUEST_ID {
            self.next_request = 0;
        }
        self.next_request
    }

    /// Sends a command and waits for its reply.
    /// Error statuses become [`ClientError::Status`]; success statuses are returned.
    async fn request(
        &mut self,
        opcode: Opcode,
        handle: u16,
        payload: &[u8],
    ) -> Result<(Status, Bytes)> {
        let length = u16::try_from(payload.len())
            .map_err(|_| ClientError::Protocol(format!("{opcode} payload too long")))?;
        let id = self.request_id();
        let cmd = Command::new(id, opcode, handle, length);
        write_framed(&mut self.sp.send, &cmd, payload).await?;

        let (reply, payload) = read_framed::<Reply, _>(&mut self.sp.recv)
            .await?
            .ok_or_else(|| ClientError::Protocol("server closed the connection".into()))?;
        if reply.request_id != id {
            return Err(ClientError::Protocol(format!(
                "reply to request {} arrived while waiting for {id}",
                reply.request_id
            )));
        }
        let status = reply.status().ok_or_else(|| {
            ClientError::Protocol(format!("unknown result code {:#04x}", reply.result))
        })?;
        trace!("#{id} {opcode} handle {handle} -> {status}");
        Ok((status.into_result()?, payload))
    }

    async fn simple(&mut self, opcode: Opcode, handle: u16, payload: &[u8]) -> Result<()> {
        let _ = self.request(opcode, handle, payload).await?;
        Ok(())
    }

    /// Binds `handle` to `path`. The empty path is the virtual root.
    pub async fn assign(&mut self, handle: u16, path: &[u8]) -> Result<()> {
        self.simple(Opcode::Assign, handle, path).await
    }

    /// Reads the requested attributes of the handle's path
    pub async fn stat(&mut self, handle: u16, spec: &AttrSpec) -> Result<FileAttributes> {
        let (_, blob) = self.request(Opcode::Stat, handle, &spec.to_bytes()).await?;
        Ok(FileAttributes::decode(spec, &blob)?)
    }

    /// Reads capacity information for the filesystem holding the handle's path
    pub async fn statvfs(&mut self, handle: u16) -> Result<FsStats> {
        let (_, payload) = self.request(Opcode::StatVfs, handle, &[]).await?;
        Ok(FsStats::decode(&payload)?.0)
    }

    /// Reads up to `length` bytes at `offset`. A shorter result (including none) means end of file.
    pub async fn read(&mut self, handle: u16, offset: u64, length: u16) -> Result<Bytes> {
        let req = OffsetLength { offset, length }.to_bytes();
        let (_, data) = self.request(Opcode::Read, handle, &req).await?;
        Ok(data)
    }

    /// Writes `data` at `offset`, creating the file if need be.
    /// An empty `data` asks the server to flush the file to stable storage.
    ///
    /// Returns the number of bytes written.
    pub async fn write(&mut self, handle: u16, offset: u64, data: &[u8]) -> Result<u16> {
        let mut req = Offset { offset }.to_bytes().to_vec();
        req.extend_from_slice(data);
        let (status, payload) = self.request(Opcode::Write, handle, &req).await?;
        let (Count(written), _) = Count::decode(&payload)?;
        if status == Status::Partial {
            return Err(ClientError::Partial { written });
        }
        Ok(written)
    }

    /// Sets the length of the file
    pub async fn truncate(&mut self, handle: u16, length: u64) -> Result<()> {
        self.simple(Opcode::Truncate, handle, &Offset { offset: length }.to_bytes())
            .await
    }

    /// Removes the file or empty directory
    pub async fn delete(&mut self, handle: u16) -> Result<()> {
        self.simple(Opcode::Delete, handle, &[]).await
    }

    /// Moves the handle's entity to `new_path`; the handle follows it
    pub async fn rename(&mut self, handle: u16, new_path: &[u8]) -> Result<()> {
        self.simple(Opcode::Rename, handle, new_path).await
    }

    /// Creates a directory at the handle's path
    pub async fn mkdir(&mut self, handle: u16) -> Result<()> {
        self.simple(Opcode::MakeDir, handle, &[]).await
    }

    /// Opens, or restarts, a directory listing on the handle
    pub async fn rewind_dir(&mut self, handle: u16) -> Result<()> {
        self.simple(Opcode::RewindDir, handle, &[]).await
    }

    /// Reads the next page of a directory listing
    pub async fn read_dir(&mut self, handle: u16, spec: &AttrSpec) -> Result<DirPage> {
        let (status, payload) = self.request(Opcode::ReadDir, handle, &spec.to_bytes()).await?;
        let finished = match status {
            Status::Finished => true,
            Status::Continued => false,
            other => {
                return Err(ClientError::Protocol(format!(
                    "unexpected READDIR result {other}"
                )));
            }
        };
        Ok(DirPage {
            entries: decode_dir_page(&payload)?,
            finished,
        })
    }

    /// Lists a directory from the start
    pub async fn list(&mut self, handle: u16, spec: &AttrSpec) -> Result<Vec<ListEntry>> {
        self.rewind_dir(handle).await?;
        let mut result = Vec::new();
        loop {
            let page = self.read_dir(handle, spec).await?;
            for entry in page.entries {
                result.push(ListEntry {
                    attributes: FileAttributes::decode(spec, &entry.attributes)?,
                    name: entry.name,
                });
            }
            if page.finished {
                return Ok(result);
            }
        }
    }

    /// Copies the whole file to `sink`, returning the number of bytes copied
    pub async fn download<W>(&mut self, handle: u16, sink: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let mut offset = 0u64;
        loop {
            let data = self.read(handle, offset, u16::MAX).await?;
            // The server may cap reads below what we ask for, so only an empty read is the end
            if data.is_empty() {
                break;
            }
            sink.write_all(&data).await?;
            offset += data.len() as u64;
        }
        sink.flush().await?;
        Ok(offset)
    }

    /// Replaces the file's contents with everything read from `source`, then flushes it
    /// to stable storage. Returns the number of bytes copied.
    pub async fn upload<Rd>(&mut self, handle: u16, source: &mut Rd) -> Result<u64>
    where
        Rd: AsyncRead + Unpin,
    {
        let mut buf = vec![0u8; WRITE_CHUNK];
        let mut offset = 0u64;
        loop {
            let n = source.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            let mut sent = 0;
            while sent < n {
                let written = self.write(handle, offset, &buf[sent..n]).await?;
                sent += usize::from(written);
                offset += u64::from(written);
            }
        }
        if offset == 0 {
            // creates the file
            let _ = self.write(handle, 0, &[]).await?;
        }
        self.truncate(handle, offset).await?;
        let _ = self.write(handle, 0, &[]).await?;
        Ok(offset)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod test {
    use std::sync::Arc;

    use super::{Client, ClientError};
    use crate::protocol::{
        AttrCode, AttrSpec, Command, Opcode, Reply, Status, WireMessage as _,
        common::SendReceivePair,
        intro::{EXTENSION_INIT, INIT_REQUEST_ID, Intro, MAGIC, VERSION},
        test_helpers::new_test_plumbing,
    };
    use crate::server::serve_connection;
    use crate::session::Limits;
    use crate::shares::ShareNamespace;

    use assertables::assert_matches;
    use pretty_assertions::assert_eq;
    use tokio::io::AsyncWriteExt as _;
    use tokio_test::io::Builder;

    fn greeting() -> Vec<u8> {
        let mut v = MAGIC.to_vec();
        v.extend_from_slice(&VERSION.to_be_bytes());
        v
    }

    fn intro_reply() -> Vec<u8> {
        let intro = Intro {
            max_handles: 4,
            max_open_dirs: 1,
            platform: "posix".into(),
            ..Default::default()
        }
        .to_bytes();
        let mut v = greeting();
        v.extend_from_slice(
            &Reply {
                request_id: INIT_REQUEST_ID,
                extension: EXTENSION_INIT,
                result: 0,
                length: u16::try_from(intro.len()).unwrap(),
            }
            .to_bytes(),
        );
        v.extend_from_slice(&intro);
        v
    }

    fn intro_command() -> Vec<u8> {
        let mut v = greeting();
        v.extend_from_slice(
            &Command {
                request_id: INIT_REQUEST_ID,
                extension: EXTENSION_INIT,
                opcode: 0,
                handle: 0,
                length: 0,
            }
            .to_bytes(),
        );
        v
    }

    #[tokio::test]
    async fn mismatched_request_id() {
        let assign = Command::new(1, Opcode::Assign, 0, 0).to_bytes();
        let send = Builder::new()
            .write(&intro_command())
            .write(&assign)
            .build();
        let recv = Builder::new()
            .read(&intro_reply())
            .read(&Reply::new(7, Status::Ok, 0).to_bytes())
            .build();
        let mut client = Client::connect(SendReceivePair::from((send, recv)))
            .await
            .unwrap();
        assert_eq!(client.server_info().max_handles, 4);
        let err = client.assign(0, b"").await.unwrap_err();
        assert_matches!(err, ClientError::Protocol(_));
    }

    #[tokio::test]
    async fn error_status_surfaces() {
        let (client_side, server_side) = new_test_plumbing();
        let server = tokio::spawn(serve_connection(
            server_side,
            Arc::new(ShareNamespace::default()),
            Limits::default(),
        ));
        let mut client = Client::connect(client_side).await.unwrap();
        assert_matches!(
            client.assign(0, b"no-slash").await,
            Err(ClientError::Status(Status::BadPath))
        );
        assert_matches!(
            client.stat(1, &AttrSpec::default()).await,
            Err(ClientError::Status(Status::BadHandle))
        );
        client.assign(0, b"").await.unwrap();
        let attrs = client
            .stat(0, &AttrSpec::from(&[AttrCode::Perms][..]))
            .await
            .unwrap();
        assert_eq!(attrs.perms, 0o555);
        assert!(client.list(0, &AttrSpec::default()).await.unwrap().is_empty());

        let mut sp = client.into_inner();
        sp.send.shutdown().await.unwrap();
        server.await.unwrap().unwrap();
    }
}

// (c) 2025 Ross Younger

//! Session intro
//!
//! Once the transport is up, both sides exchange the protocol [`MAGIC`] and [`VERSION`].
//! The client follows its greeting with an INIT/WELCOME command; the server answers
//! with its own greeting and an [`Intro`] describing its capabilities.
//!
//! ```text
//! client                                   server
//!   | "NewTP" u16:version                    |
//!   | Command{0xffff, INIT, WELCOME}  ---->  |
//!   |                                        |
//!   |  <----  "NewTP" u16:version            |
//!   |  <----  Reply{0xffff, INIT, OK} Intro  |
//! ```
//!
//! Any mismatch in the greeting is fatal to the connection.
//! After the intro the session is ready for normal commands.

use anyhow::Context as _;
use bytes::{BufMut as _, BytesMut};
use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
use tracing::{debug, trace};

use super::{
    Command, Reply, Status,
    codec::{CodecError, FieldType, Fields, Format, Value},
    common::{ReceivingStream, SendReceivePair, SendingStream, read_framed, write_framed},
    message::WireMessage,
};

/// Protocol magic string
pub const MAGIC: &[u8; 5] = b"NewTP";
/// The single protocol version this implementation speaks
pub const VERSION: u16 = 1;
/// Extension selector used by the intro exchange
pub const EXTENSION_INIT: u8 = 0xFF;
/// Opcode of the intro command, within [`EXTENSION_INIT`]
pub const INIT_WELCOME: u8 = 0x00;
/// Request id used by the intro command
pub const INIT_REQUEST_ID: u16 = 0xFFFF;
/// Platform name announced by this server
pub const PLATFORM: &str = "posix";

const GREETING_SIZE: usize = MAGIC.len() + 2;

/// Server capability summary, sent at the end of the intro
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Intro {
    /// Number of handle slots available to the session
    pub max_handles: u16,
    /// Number of directory listings that may be open at once
    pub max_open_dirs: u16,
    /// Server platform name
    pub platform: String,
    /// Space-separated authentication mechanisms. Empty if no authentication step follows.
    pub auth_mechanisms: String,
    /// Number of protocol extensions supported
    pub extensions: u16,
}

impl WireMessage for Intro {
    const FORMAT: Format = &[
        FieldType::U16,
        FieldType::U16,
        FieldType::U16,
        FieldType::Bytes,
        FieldType::U16,
        FieldType::Bytes,
        FieldType::U16,
    ];

    #[allow(clippy::cast_possible_truncation)]
    fn values(&self) -> Vec<Value<'_>> {
        // Both strings are short and server-generated
        let platform = self.platform.as_bytes();
        let auth = self.auth_mechanisms.as_bytes();
        vec![
            Value::U16(self.max_handles),
            Value::U16(self.max_open_dirs),
            Value::U16(platform.len() as u16),
            Value::Bytes(platform),
            Value::U16(auth.len() as u16),
            Value::Bytes(auth),
            Value::U16(self.extensions),
        ]
    }

    fn from_fields(f: &mut Fields<'_, '_>) -> Result<Self, CodecError> {
        let max_handles = f.u16()?;
        let max_open_dirs = f.u16()?;
        let _ = f.u16()?;
        let platform = String::from_utf8_lossy(f.bytes()?).into_owned();
        let _ = f.u16()?;
        let auth_mechanisms = String::from_utf8_lossy(f.bytes()?).into_owned();
        Ok(Self {
            max_handles,
            max_open_dirs,
            platform,
            auth_mechanisms,
            extensions: f.u16()?,
        })
    }
}

fn greeting() -> BytesMut {
    let mut buf = BytesMut::with_capacity(GREETING_SIZE);
    buf.put_slice(MAGIC);
    buf.put_u16(VERSION);
    buf
}

async fn check_greeting<R: ReceivingStream>(recv: &mut R) -> anyhow::Result<()> {
    let mut buf = [0u8; GREETING_SIZE];
    let _ = recv
        .read_exact(&mut buf)
        .await
        .context("reading protocol greeting")?;
    anyhow::ensure!(
        &buf[..MAGIC.len()] == MAGIC,
        "peer did not send the protocol magic"
    );
    let version = u16::from_be_bytes([buf[MAGIC.len()], buf[MAGIC.len() + 1]]);
    anyhow::ensure!(
        version == VERSION,
        "unsupported protocol version {version} (we speak {VERSION})"
    );
    Ok(())
}

/// Server side of the intro exchange
pub async fn server_intro<S, R>(sp: &mut SendReceivePair<S, R>, intro: &Intro) -> anyhow::Result<()>
where
    S: SendingStream,
    R: ReceivingStream,
{
    check_greeting(&mut sp.recv).await?;
    let (cmd, _) = read_framed::<Command, _>(&mut sp.recv)
        .await?
        .context("connection closed during intro")?;
    anyhow::ensure!(
        cmd.extension == EXTENSION_INIT && cmd.opcode == INIT_WELCOME,
        "expected an intro command, got extension {:#x} opcode {:#x}",
        cmd.extension,
        cmd.opcode
    );
    trace!("intro command received");

    let payload = intro.to_bytes();
    let reply = Reply {
        request_id: cmd.request_id,
        extension: EXTENSION_INIT,
        result: Status::Ok.into(),
        length: u16::try_from(payload.len())?,
    };
    sp.send.write_all(&greeting()).await?;
    write_framed(&mut sp.send, &reply, &payload).await?;
    debug!("intro complete");
    Ok(())
}

/// Client side of the intro exchange
pub async fn client_intro<S, R>(sp: &mut SendReceivePair<S, R>) -> anyhow::Result<Intro>
where
    S: SendingStream,
    R: ReceivingStream,
{
    let cmd = Command {
        request_id: INIT_REQUEST_ID,
        extension: EXTENSION_INIT,
        opcode: INIT_WELCOME,
        handle: 0,
        length: 0,
    };
    sp.send.write_all(&greeting()).await?;
    write_framed(&mut sp.send, &cmd, &[]).await?;

    check_greeting(&mut sp.recv).await?;
    let (reply, payload) = read_framed::<Reply, _>(&mut sp.recv)
        .await?
        .context("connection closed during intro")?;
    anyhow::ensure!(
        reply.extension == EXTENSION_INIT && reply.request_id == INIT_REQUEST_ID,
        "unexpected reply to intro command"
    );
    anyhow::ensure!(
        reply.status() == Some(Status::Ok),
        "server refused intro with result {:#x}",
        reply.result
    );
    let (intro, _) = Intro::decode(&payload)?;
    Ok(intro)
}

// (c) 2025 Ross Younger

//! Stream plumbing shared by client and server
//!
//! # On-Wire Framing
//!
//! Every message is sent in two parts:
//!
//! * A fixed-size [`Header`] ([`Command`](super::Command) or [`Reply`](super::Reply)),
//!   whose final field is the payload length
//! * The payload, of exactly that length
//!
//! There is no other framing or padding.

use anyhow::Context as _;
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt as _, AsyncWrite, AsyncWriteExt as _};

use super::message::{Header, MAX_PAYLOAD};

/////////////////////////////////////////////////////////////////////////////////////////////
// STREAM TYPEDEFS

/// Marker trait for streams used for sending data
pub trait SendingStream: AsyncWrite + Send + Unpin {}
impl<T: AsyncWrite + Send + Unpin> SendingStream for T {}

/// Marker trait for streams used for receiving data
pub trait ReceivingStream: AsyncRead + Send + Unpin {}
impl<T: AsyncRead + Send + Unpin> ReceivingStream for T {}

/// Syntactic sugar helper type
#[derive(Debug)]
pub struct SendReceivePair<S: SendingStream, R: ReceivingStream> {
    /// outbound data
    pub send: S,
    /// inbound data
    pub recv: R,
}

impl<S: SendingStream, R: ReceivingStream> From<(S, R)> for SendReceivePair<S, R> {
    fn from(value: (S, R)) -> Self {
        Self {
            send: value.0,
            recv: value.1,
        }
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////
// WIRE MESSAGE FRAMING

/// Reads a header and its payload.
///
/// # Return
/// * `Ok(None)` if the stream ended cleanly before the first byte of a header
/// * `Ok(Some(...))` on success
/// * `Err` if the stream failed or ended part way through a message
pub async fn read_framed<H, R>(recv: &mut R) -> anyhow::Result<Option<(H, Bytes)>>
where
    H: Header,
    R: ReceivingStream,
{
    let mut header = BytesMut::zeroed(H::SIZE);
    let mut filled = 0;
    while filled < H::SIZE {
        let n = recv.read(&mut header[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            anyhow::bail!("stream ended inside a message header");
        }
        filled += n;
    }
    let (hdr, _) = H::decode(&header)?;
    let mut payload = BytesMut::zeroed(usize::from(hdr.payload_length()));
    let _ = recv
        .read_exact(&mut payload)
        .await
        .context("stream ended inside a message payload")?;
    Ok(Some((hdr, payload.freeze())))
}

/// Writes a header and its payload, then flushes.
///
/// The header's length field must already match the payload.
pub async fn write_framed<H, S>(send: &mut S, header: &H, payload: &[u8]) -> anyhow::Result<()>
where
    H: Header,
    S: SendingStream,
{
    anyhow::ensure!(
        payload.len() <= MAX_PAYLOAD && usize::from(header.payload_length()) == payload.len(),
        "payload length {} does not match header length {}",
        payload.len(),
        header.payload_length()
    );
    let mut buf = BytesMut::with_capacity(H::SIZE + payload.len());
    let _ = header.encode(&mut buf);
    buf.extend_from_slice(payload);
    send.write_all(&buf).await?;
    send.flush().await?;
    Ok(())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod test {
    use super::{read_framed, write_framed};
    use crate::protocol::{Command, Opcode, Reply, Status, WireMessage as _};

    use pretty_assertions::assert_eq;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn write_then_read() {
        let cmd = Command::new(3, Opcode::Assign, 1, 4);
        let mut buf = Vec::new();
        write_framed(&mut buf, &cmd, b"/foo").await.unwrap();
        assert_eq!(buf.len(), 12);

        let mut reader = &buf[..];
        let (got, payload) = read_framed::<Command, _>(&mut reader)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, cmd);
        assert_eq!(&payload[..], b"/foo");
        // and now the stream is at a clean end
        assert!(read_framed::<Command, _>(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn header_arrives_in_pieces() {
        let reply = Reply::new(1, Status::Ok, 2).to_bytes();
        let mut mock = Builder::new()
            .read(&reply[0..2])
            .read(&reply[2..])
            .read(b"hi")
            .build();
        let (hdr, payload) = read_framed::<Reply, _>(&mut mock).await.unwrap().unwrap();
        assert_eq!(hdr.status(), Some(Status::Ok));
        assert_eq!(&payload[..], b"hi");
    }

    #[tokio::test]
    async fn truncated_header() {
        let mut reader = &[0u8, 1, 2][..];
        assert!(read_framed::<Command, _>(&mut reader).await.is_err());
    }

    #[tokio::test]
    async fn truncated_payload() {
        let cmd = Command::new(3, Opcode::Assign, 1, 10).to_bytes();
        let mut data = cmd.to_vec();
        data.extend_from_slice(b"abc");
        let mut reader = &data[..];
        assert!(read_framed::<Command, _>(&mut reader).await.is_err());
    }

    #[tokio::test]
    async fn length_mismatch_is_refused() {
        let mut buf = Vec::new();
        let cmd = Command::new(3, Opcode::Assign, 1, 1);
        assert!(write_framed(&mut buf, &cmd, b"toolong").await.is_err());
        assert!(buf.is_empty());
    }
}

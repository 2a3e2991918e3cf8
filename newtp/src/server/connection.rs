// (c) 2025 Ross Younger

//! Handler for a single client connection

use std::sync::Arc;

use anyhow::Context as _;
use tracing::{debug, trace};

use crate::protocol::{
    Command, Reply,
    common::{ReceivingStream, SendReceivePair, SendingStream, read_framed, write_framed},
    intro::server_intro,
};
use crate::session::{Limits, Session};
use crate::shares::ShareNamespace;

/// Runs the intro, then serves commands one at a time until the client closes the stream.
///
/// Protocol errors are reported to the client and the connection carries on.
/// Transport errors end the connection.
pub async fn serve_connection<S, R>(
    mut sp: SendReceivePair<S, R>,
    shares: Arc<ShareNamespace>,
    limits: Limits,
) -> anyhow::Result<()>
where
    S: SendingStream,
    R: ReceivingStream,
{
    server_intro(&mut sp, &limits.intro()).await?;
    let mut session = Session::new(shares, limits);

    while let Some((command, payload)) = read_framed::<Command, _>(&mut sp.recv).await? {
        trace!("command {command:?}");
        // Filesystem calls block, so the session takes a trip to the blocking pool.
        let (returned, outcome) = tokio::task::spawn_blocking(move || {
            let outcome = session.dispatch(&command, &payload);
            (session, outcome)
        })
        .await
        .context("command handler panicked")?;
        session = returned;

        let reply = Reply::new(
            command.request_id,
            outcome.status,
            u16::try_from(outcome.payload.len())?,
        );
        write_framed(&mut sp.send, &reply, &outcome.payload).await?;
    }
    debug!("client closed the connection");
    Ok(())
}

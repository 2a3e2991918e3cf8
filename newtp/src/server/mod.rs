//! 🖥️ Server-side event loop
// (c) 2024 Ross Younger
//!
//! The server listens on TCP. Each connection gets its own task and its own
//! [session](crate::session::Session); all sessions share one read-only
//! [share namespace](crate::shares::ShareNamespace).

use std::{future::Future, sync::Arc};

use anyhow::Context as _;
use tokio::{net::TcpListener, task::JoinSet};
use tracing::{Instrument as _, debug, error, info, trace, trace_span, warn};

use crate::config::Configuration;
use crate::protocol::common::SendReceivePair;
use crate::session::Limits;
use crate::shares::ShareNamespace;

mod connection;
pub use connection::serve_connection;

/// Server event loop. Runs until interrupted.
#[cfg_attr(coverage_nightly, coverage(off))] // This is a thin adaptor, not worth testing
pub async fn server_main(config: &Configuration) -> anyhow::Result<()> {
    let shares = Arc::new(ShareNamespace::from_specs(&config.shares)?);
    if shares.is_empty() {
        warn!("no shares are configured");
    }
    for share in shares.iter() {
        info!(
            "share {} -> {:?}{}",
            share.name(),
            share.root(),
            if share.writable() { " (writable)" } else { "" }
        );
    }
    let listener = TcpListener::bind((config.listen.as_str(), config.port))
        .await
        .with_context(|| format!("binding to {}:{}", config.listen, config.port))?;
    info!("listening on {}", listener.local_addr()?);

    serve(listener, shares, config.limits(), async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("unable to wait for interrupt: {e}");
            std::future::pending::<()>().await;
        }
    })
    .await
}

/// Accepts connections from `listener` until `shutdown` completes
pub async fn serve<F>(
    listener: TcpListener,
    shares: Arc<ShareNamespace>,
    limits: Limits,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()>,
{
    let mut tasks = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => {
                info!("shutting down");
                break;
            }
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(a) => a,
                    Err(e) => {
                        warn!("accept failed: {e}");
                        continue;
                    }
                };
                let shares = Arc::clone(&shares);
                let span = trace_span!("CONN", %peer);
                let _ = tasks.spawn(
                    async move {
                        debug!("accepted connection");
                        let (recv, send) = stream.into_split();
                        let sp = SendReceivePair::from((send, recv));
                        match serve_connection(sp, shares, limits).await {
                            Ok(()) => debug!("connection closed"),
                            Err(e) => warn!("connection failed: {e:#}"),
                        }
                    }
                    .instrument(span),
                );
            }
            Some(result) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = result {
                    error!("connection task failed: {e}");
                }
            }
        }
    }

    trace!("closing {} open connection(s)", tasks.len());
    tasks.shutdown().await;
    Ok(())
}

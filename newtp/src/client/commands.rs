//! Client operations available from the command line
// (c) 2025 Ross Younger

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use chrono::{DateTime, Local};
use clap::Subcommand;
use human_repr::HumanCount as _;
use tokio::net::TcpStream;
use tracing::{debug, info};

use super::Client;
use crate::{
    config::Configuration,
    protocol::{AttrCode, AttrSpec, FsStats, common::SendReceivePair},
};

const PRIMARY: u16 = 0;
const SECONDARY: u16 = 1;

/// Remote operations. Remote paths have the form `/share/dir/file`.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Operation {
    /// Lists a remote directory, or the available shares
    Ls {
        /// Directory to list. Omit to list the shares.
        #[arg(value_name = "PATH", default_value = "")]
        path: String,
        /// Long format: type, permissions, size and modification time
        #[arg(long)]
        long: bool,
    },
    /// Downloads a remote file
    Get {
        /// Remote file
        #[arg(value_name = "REMOTE")]
        remote: String,
        /// Local destination. Defaults to the remote file name in the current directory.
        #[arg(value_name = "LOCAL")]
        local: Option<PathBuf>,
    },
    /// Uploads a local file, replacing any existing remote file
    Put {
        /// Local file
        #[arg(value_name = "LOCAL")]
        local: PathBuf,
        /// Remote destination
        #[arg(value_name = "REMOTE")]
        remote: String,
    },
    /// Creates a remote directory
    Mkdir {
        /// Directory to create
        #[arg(value_name = "PATH")]
        path: String,
    },
    /// Removes a remote file or empty directory
    Rm {
        /// Entity to remove
        #[arg(value_name = "PATH")]
        path: String,
    },
    /// Renames a remote file or directory within its share
    Mv {
        /// Current path
        #[arg(value_name = "FROM")]
        from: String,
        /// New path
        #[arg(value_name = "TO")]
        to: String,
    },
    /// Reports capacity of the filesystem holding a remote path
    Df {
        /// Any path within the share
        #[arg(value_name = "PATH")]
        path: String,
    },
}

fn long_spec() -> AttrSpec {
    AttrSpec::from(
        &[
            AttrCode::Type,
            AttrCode::Perms,
            AttrCode::Size,
            AttrCode::Mtime,
        ][..],
    )
}

fn format_time(micros: u64) -> String {
    i64::try_from(micros)
        .ok()
        .and_then(DateTime::from_timestamp_micros)
        .map_or_else(
            || "-".into(),
            |t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        )
}

fn format_df(path: &str, stats: &FsStats) -> String {
    let used = stats.capacity.saturating_sub(stats.free);
    let mut out = format!(
        "{path}: {} total, {} used, {} free",
        stats.capacity.human_count_bytes(),
        used.human_count_bytes(),
        stats.free.human_count_bytes(),
    );
    if stats.readonly {
        out.push_str(" (read-only)");
    }
    out
}

fn local_name(remote: &str) -> Result<PathBuf> {
    let name = remote.rsplit('/').next().unwrap_or_default();
    anyhow::ensure!(!name.is_empty(), "cannot work out a local file name for {remote:?}");
    Ok(PathBuf::from(name))
}

impl Operation {
    /// Runs this operation over a connected client, writing any results to `out`
    pub async fn run<S, R>(&self, client: &mut Client<S, R>, out: &mut String) -> Result<()>
    where
        S: crate::protocol::common::SendingStream,
        R: crate::protocol::common::ReceivingStream,
    {
        match self {
            Operation::Ls { path, long } => {
                client.assign(PRIMARY, path.as_bytes()).await?;
                let spec = if *long {
                    long_spec()
                } else {
                    AttrSpec::default()
                };
                for entry in client.list(PRIMARY, &spec).await? {
                    if *long {
                        let a = &entry.attributes;
                        let _ = writeln!(
                            out,
                            "{} {:04o} {:>12} {} {}",
                            if a.is_dir() { 'd' } else { '-' },
                            a.perms,
                            a.size,
                            format_time(a.mtime),
                            entry.name_lossy()
                        );
                    } else {
                        let _ = writeln!(out, "{}", entry.name_lossy());
                    }
                }
            }
            Operation::Get { remote, local } => {
                let local = match local {
                    Some(l) => l.clone(),
                    None => local_name(remote)?,
                };
                client.assign(PRIMARY, remote.as_bytes()).await?;
                let mut file = tokio::fs::File::create(&local)
                    .await
                    .with_context(|| format!("creating {}", local.display()))?;
                let n = client.download(PRIMARY, &mut file).await?;
                info!("{remote} -> {}: {}", local.display(), n.human_count_bytes());
            }
            Operation::Put { local, remote } => {
                let mut file = tokio::fs::File::open(local)
                    .await
                    .with_context(|| format!("opening {}", local.display()))?;
                client.assign(PRIMARY, remote.as_bytes()).await?;
                let n = client.upload(PRIMARY, &mut file).await?;
                info!("{} -> {remote}: {}", local.display(), n.human_count_bytes());
            }
            Operation::Mkdir { path } => {
                client.assign(PRIMARY, path.as_bytes()).await?;
                client.mkdir(PRIMARY).await?;
            }
            Operation::Rm { path } => {
                client.assign(PRIMARY, path.as_bytes()).await?;
                client.delete(PRIMARY).await?;
            }
            Operation::Mv { from, to } => {
                client.assign(PRIMARY, from.as_bytes()).await?;
                client.rename(PRIMARY, to.as_bytes()).await?;
            }
            Operation::Df { path } => {
                client.assign(SECONDARY, path.as_bytes()).await?;
                let stats = client.statvfs(SECONDARY).await?;
                let _ = writeln!(out, "{}", format_df(path, &stats));
            }
        }
        Ok(())
    }
}

/// Connects to the configured server and runs one operation
#[cfg_attr(coverage_nightly, coverage(off))] // thin adaptor
pub(crate) async fn client_main(config: &Configuration, op: &Operation) -> Result<()> {
    let stream = TcpStream::connect((config.server.as_str(), config.port))
        .await
        .with_context(|| format!("connecting to {}:{}", config.server, config.port))?;
    let (recv, send) = stream.into_split();
    let mut client = Client::connect(SendReceivePair::from((send, recv))).await?;
    debug!("connected: {:?}", client.server_info());
    let mut out = String::new();
    let result = op.run(&mut client, &mut out).await;
    print!("{out}");
    result
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod test {
    use std::sync::Arc;

    use super::{Operation, format_df, format_time, local_name};
    use crate::client::{Client, ClientError};
    use crate::protocol::{FsStats, Status, test_helpers::new_test_plumbing};
    use crate::server::serve_connection;
    use crate::session::Limits;
    use crate::shares::ShareNamespace;

    use assertables::{assert_contains, assert_starts_with};
    use pretty_assertions::assert_eq;
    use tokio::io::AsyncWriteExt as _;

    #[test]
    fn df_output() {
        let stats = FsStats {
            device_id: 1,
            capacity: 2_000_000,
            free: 500_000,
            readonly: true,
        };
        let s = format_df("/pub", &stats);
        assert_starts_with!(s, "/pub: 2MB total");
        assert_contains!(s, "1.5MB used");
        assert_contains!(s, "(read-only)");
    }

    #[test]
    fn times() {
        assert_eq!(format_time(u64::MAX), "-");
        assert_eq!(format_time(0).len(), 16);
    }

    #[test]
    fn local_names() {
        assert_eq!(local_name("/pub/a/b.txt").unwrap().to_str(), Some("b.txt"));
        assert!(local_name("/pub/").is_err());
        assert!(local_name("").is_err());
    }

    #[tokio::test]
    async fn operations() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), b"hello").unwrap();
        let mut ns = ShareNamespace::default();
        assert!(ns.add("pub", dir.path(), true));

        let (client_side, server_side) = new_test_plumbing();
        let server = tokio::spawn(serve_connection(
            server_side,
            Arc::new(ns),
            Limits::default(),
        ));
        let mut client = Client::connect(client_side).await.unwrap();
        let mut out = String::new();

        Operation::Ls {
            path: String::new(),
            long: false,
        }
        .run(&mut client, &mut out)
        .await
        .unwrap();
        assert_eq!(out, "pub\n");

        Operation::Mkdir {
            path: "/pub/sub".into(),
        }
        .run(&mut client, &mut out)
        .await
        .unwrap();
        Operation::Mv {
            from: "/pub/hello.txt".into(),
            to: "/pub/sub/moved.txt".into(),
        }
        .run(&mut client, &mut out)
        .await
        .unwrap();
        assert_eq!(
            std::fs::read(dir.path().join("sub/moved.txt")).unwrap(),
            b"hello"
        );

        out.clear();
        Operation::Ls {
            path: "/pub/sub".into(),
            long: true,
        }
        .run(&mut client, &mut out)
        .await
        .unwrap();
        assert_starts_with!(out, "- 0");
        assert_contains!(out, " 5 ");
        assert_contains!(out, "moved.txt\n");

        let err = Operation::Rm {
            path: "/pub/sub".into(),
        }
        .run(&mut client, &mut out)
        .await
        .unwrap_err();
        let err = err.downcast::<ClientError>().unwrap();
        assert!(matches!(err, ClientError::Status(Status::NotEmpty)));

        let mut sp = client.into_inner();
        sp.send.shutdown().await.unwrap();
        server.await.unwrap().unwrap();
    }
}

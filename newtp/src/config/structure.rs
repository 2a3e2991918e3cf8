//! Configuration structure
// (c) 2025 Ross Younger

use std::sync::LazyLock;

use anyhow::Result;
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::{session::Limits, shares::ShareSpec, util::TimeFormat};

/// Smallest permitted directory page budget.
/// A page must be able to hold at least one entry with a long name.
pub const MIN_PAGE_SIZE: u16 = 512;

// Entry count, entry header, longest name, largest attribute blob.
static_assertions::const_assert!(
    MIN_PAGE_SIZE as usize >= 2 + 4 + 255 + crate::protocol::attributes::MAX_BLOB_LEN
);

/// Default TCP port
pub const DEFAULT_PORT: u16 = 63987;

/// The set of configurable options supported by newtp.
///
/// ### Configuration files
///
/// Configuration files are TOML. Field names are as below, in `snake_case`.
///
/// [More details about the configuration mechanism](crate::config).
///
/// ### Command line
///
/// All configurable options except `shares` may be used on the command line, in kebab-case.
/// Shares are given to `newtp serve` as arguments.
///
/// ### Developer notes
/// There is no `default()`.
/// You can access the hard-wired configuration defaults through
/// [`Configuration::system_default()`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Configuration {
    // SERVER ======================================================================================
    /// Address the server listens on
    pub listen: String,
    /// TCP port the server listens on, and that clients connect to
    pub port: u16,
    /// Number of handle slots in each session (1 to 65535)
    pub max_handles: u16,
    /// Number of directory listings a session may have open at once
    pub max_open_dirs: u16,
    /// Largest amount of data returned by a single READ
    pub max_read: u16,
    /// Size budget for a page of directory entries
    pub page_size: u16,
    /// Exported directories, as `[ro:|rw:]PATH=NAME`
    pub shares: Vec<ShareSpec>,

    // CLIENT ======================================================================================
    /// Server that client commands connect to
    pub server: String,

    // OUTPUT ======================================================================================
    /// Format of timestamps in log messages
    pub time_format: TimeFormat,
}

static SYSTEM_DEFAULT_CONFIG: LazyLock<Configuration> = LazyLock::new(|| {
    let limits = Limits::default();
    Configuration {
        listen: "0.0.0.0".into(),
        port: DEFAULT_PORT,
        max_handles: limits.max_handles,
        max_open_dirs: limits.max_open_dirs,
        max_read: limits.max_read,
        page_size: limits.page_size,
        shares: Vec::new(),
        server: "localhost".into(),
        time_format: TimeFormat::Local,
    }
});

impl Configuration {
    /// Field names, in display order
    pub const FIELDS: &[&str] = &[
        "listen",
        "port",
        "max_handles",
        "max_open_dirs",
        "max_read",
        "page_size",
        "shares",
        "server",
        "time_format",
    ];

    /// The hard-wired defaults
    #[must_use]
    pub fn system_default() -> &'static Self {
        &SYSTEM_DEFAULT_CONFIG
    }

    /// The per-session limits this configuration describes
    #[must_use]
    pub fn limits(&self) -> Limits {
        Limits {
            max_handles: self.max_handles,
            max_open_dirs: self.max_open_dirs,
            max_read: self.max_read,
            page_size: self.page_size,
        }
    }

    /// Checks that values are in range
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.max_handles > 0, "max_handles must be at least 1");
        anyhow::ensure!(self.max_open_dirs > 0, "max_open_dirs must be at least 1");
        anyhow::ensure!(self.max_read > 0, "max_read must be at least 1");
        anyhow::ensure!(
            self.page_size >= MIN_PAGE_SIZE,
            "page_size ({}) must be at least {MIN_PAGE_SIZE}",
            self.page_size
        );
        Ok(())
    }
}

/// Configuration options given on the command line.
///
/// Each field overrides the corresponding [`Configuration`] field when present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args, Serialize)]
pub struct ConfigurationArgs {
    /// Address the server listens on [default: 0.0.0.0]
    #[arg(long, value_name("ADDR"), help_heading("Server"), global(true))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listen: Option<String>,

    /// TCP port to listen on or connect to [default: 63987]
    #[arg(short, long, help_heading("Connection"), global(true))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Number of handle slots per session [default: 16384]
    #[arg(long, value_name("N"), help_heading("Server"), global(true))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_handles: Option<u16>,

    /// Number of directory listings a session may hold open [default: 5]
    #[arg(long, value_name("N"), help_heading("Server"), global(true))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_open_dirs: Option<u16>,

    /// Largest READ the server will satisfy, in bytes [default: 65535]
    #[arg(long, value_name("BYTES"), help_heading("Server"), global(true))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_read: Option<u16>,

    /// Size budget of a directory page, in bytes [default: 65535]
    #[arg(long, value_name("BYTES"), help_heading("Server"), global(true))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u16>,

    /// Server to connect to [default: localhost]
    #[arg(short, long, value_name("HOST"), help_heading("Connection"), global(true))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    /// Format of timestamps in log messages [default: local]
    #[arg(
        short = 'T',
        long,
        value_name("FORMAT"),
        help_heading("Output"),
        global(true)
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_format: Option<TimeFormat>,

    /// Shares given on the command line. These replace any configured shares.
    #[arg(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shares: Option<Vec<ShareSpec>>,
}

// (c) 2024 Ross Younger

#![allow(clippy::doc_markdown)]
//! NewTP gives a client access to directories exported by a server, over a compact binary
//! request/reply protocol.
//!
//! ## 📖 Documentation
//!
//! * [About the NewTP protocol](protocol)
//! * [Shares](shares) and [handles](handles)
//! * [Configuring newtp](config)
//!
//! ## Overview
//!
//! - 🗂️ The server exports one or more local directories, each under a short _share_ name.
//!   Each share is either read-only or writable.
//! - 🔗 A client binds small-integer _handles_ to paths such as `/share/dir/file`,
//!   then issues operations against them: stat, read, write, truncate, delete, rename,
//!   make directory, and paginated directory listing.
//! - 🛡️ Paths are validated before anything touches the filesystem.
//!   `.` and `..` segments are rejected outright, so a client can never escape a share.
//! - 🚀 Each connection is served by its own task; blocking filesystem work runs on
//!   tokio's blocking pool.
//!
//! #### What newtp is not
//!
//! * A secure transport. NewTP runs over any reliable byte stream and leaves encryption and
//!   authentication to whatever provides it (an ssh tunnel, a VPN, a private network).
//! * A full POSIX filesystem. There are no symlink, lock or ownership operations.
//!
//! ## 🧰 Getting Started
//!
//! On the server:
//!
//! ```text
//! newtp serve /srv/public=pub --rw /srv/incoming=incoming
//! ```
//!
//! On the client:
//!
//! ```text
//! newtp -s myserver ls
//! newtp -s myserver ls --long /pub
//! newtp -s myserver get /pub/readme.txt
//! newtp -s myserver put report.pdf /incoming/report.pdf
//! newtp -s myserver df /incoming
//! ```
//!
//! Options can also be set in a [config](config) file.
//!
//! ## Miscellanea
//!
//! #### MSRV policy
//!
//! As this is an application crate, the MSRV is not guaranteed to remain stable.
//! The MSRV may be upgraded from time to time to take advantage of new language features.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub(crate) mod cli;
pub use cli::cli as main;

pub mod client;
pub use client::{Client, ClientError};

pub mod config;
pub use config::Configuration;

pub mod handles;
pub mod protocol;
pub mod server;
pub mod session;
pub mod shares;
pub(crate) mod util;
pub use util::TimeFormat;

mod version;

// (c) 2024 Ross Younger
//! # 📖 Configuration management
//!
//! newtp obtains run-time configuration from the following sources, in order of priority:
//! 1. Command-line options
//! 2. Environment variables named `NEWTP_<OPTION>`, for example `NEWTP_MAX_OPEN_DIRS=8`
//! 3. The user's configuration file, `newtp.toml` in the platform configuration directory
//!    (`~/.config/newtp.toml` on most Unix systems)
//! 4. The system-wide configuration file, `/etc/newtp.toml`
//! 5. Hard-wired defaults
//!
//! Run `newtp --config-files` for a list of which files we read.
//!
//! ## File format
//!
//! Configuration files are [TOML](https://toml.io). Option names are the fields of [Configuration].
//!
//! ```toml
//! port = 63987
//! max_open_dirs = 8
//! page_size = 16384
//! shares = [
//!     "/srv/public=pub",
//!     "rw:/srv/incoming=incoming",
//! ]
//! ```
//!
//! ## Shares
//!
//! Each share is written `PATH=NAME`. A share is read-only unless prefixed `rw:`
//! (`ro:` is accepted for symmetry).
//! Shares given on the `newtp serve` command line replace those from configuration.
//!
//! ## Inspecting the configuration
//!
//! * `newtp --show-config` outputs every option, its current value, and where that value came from.
//! * `newtp --config-files` outputs the list of configuration files
//!   for the current user and platform.

mod structure;
pub use structure::{Configuration, ConfigurationArgs, DEFAULT_PORT, MIN_PAGE_SIZE};

mod sysdefault;
use sysdefault::SystemDefault;

mod manager;
pub use manager::{ENV_PREFIX, Manager};

mod prettyprint;
pub use prettyprint::DisplayAdapter;

pub(crate) const BASE_CONFIG_FILENAME: &str = "newtp.toml";

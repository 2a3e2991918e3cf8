//! Command line argument definitions
// (c) 2025 Ross Younger

use std::ffi::OsString;

use clap::{Args, Parser, Subcommand};

use crate::{client::Operation, config::ConfigurationArgs, shares::ShareSpec};

/// Remote filesystem access over the NewTP protocol
#[derive(Debug, Clone, Parser)]
#[command(
    author,
    version(crate::version::short()),
    about,
    infer_subcommands(true),
    subcommand_required(false),
    arg_required_else_help(true)
)]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct CliArgs {
    /// Enable detailed debug output
    ///
    /// This has the same effect as setting `RUST_LOG=newtp=debug` in the environment.
    /// If present, `RUST_LOG` overrides this option.
    #[arg(short, long, action, global(true), help_heading("Debug"), display_order(0))]
    pub(crate) debug: bool,

    /// Quiet mode: reports only errors
    #[arg(
        short,
        long,
        action,
        global(true),
        conflicts_with("debug"),
        help_heading("Output")
    )]
    pub(crate) quiet: bool,

    /// Log to a file
    ///
    /// By default the log receives everything printed to stderr.
    /// To override this behaviour, set the environment variable `RUST_LOG_FILE_DETAIL`
    /// (same semantics as `RUST_LOG`).
    #[arg(
        short('l'),
        long,
        action,
        global(true),
        value_name("FILE"),
        help_heading("Output"),
        next_line_help(true)
    )]
    pub(crate) log_file: Option<String>,

    /// Outputs the configuration, then exits
    #[arg(long, help_heading("Configuration"), display_order(0))]
    pub(crate) show_config: bool,

    /// Outputs the paths to configuration file(s), then exits
    #[arg(long, help_heading("Configuration"), display_order(0))]
    pub(crate) config_files: bool,

    #[command(flatten)]
    pub(crate) config: ConfigurationArgs,

    #[command(subcommand)]
    pub(crate) mode: Option<Mode>,
}

/// What to do
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub(crate) enum Mode {
    /// Runs the server
    Serve(ServeArgs),
    #[command(flatten)]
    Client(Operation),
}

/// Options for `newtp serve`
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub(crate) struct ServeArgs {
    /// Exports a directory read-only, as PATH=NAME
    #[arg(long, value_name("PATH=NAME"))]
    pub(crate) ro: Vec<ShareSpec>,

    /// Exports a directory read-write, as PATH=NAME
    #[arg(long, value_name("PATH=NAME"))]
    pub(crate) rw: Vec<ShareSpec>,

    /// Shares to export, as `[ro:|rw:]PATH=NAME`.
    /// If any shares are given on the command line, configured shares are ignored.
    #[arg(value_name("SHARE"))]
    pub(crate) shares: Vec<ShareSpec>,
}

impl ServeArgs {
    /// All the shares given, in command line order within each kind
    pub(crate) fn shares(&self) -> Vec<ShareSpec> {
        let ro = self.ro.iter().cloned().map(|s| ShareSpec {
            writable: false,
            ..s
        });
        let rw = self.rw.iter().cloned().map(|s| ShareSpec {
            writable: true,
            ..s
        });
        self.shares.iter().cloned().chain(ro).chain(rw).collect()
    }
}

impl CliArgs {
    /// Parses arguments, folding any shares given to `serve` into the configuration overrides
    pub(crate) fn custom_parse<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let mut args = Self::try_parse_from(args)?;
        if let Some(Mode::Serve(serve)) = &args.mode {
            let shares = serve.shares();
            if !shares.is_empty() {
                args.config.shares = Some(shares);
            }
        }
        Ok(args)
    }
}

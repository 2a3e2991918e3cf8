//! Main CLI for newtp
// (c) 2024 Ross Younger

use std::ffi::OsString;
use std::io::IsTerminal as _;
use std::process::ExitCode;

use super::{CliArgs, Mode};
use crate::{
    config::{Configuration, Manager},
    util::{ConsoleTraceType, setup_tracing, trace_level},
};

use anyhow::{Context as _, Result};
use figment::providers::Serialized;

/// Main CLI entrypoint
///
/// Call this from `main`, passing the arguments to use.
/// Normally you will call `cli(std::env::args_os())`,
/// but you can pass in alternate arguments for CLI testing.
///
/// # Safety
/// - This function may start a tokio runtime and perform work in it.
/// - This function is not safe to call from multi-threaded code.
#[must_use]
pub fn cli<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    cli_inner(args)
        .inspect_err(|e| {
            if crate::util::tracing_is_initialised() {
                tracing::error!("{e:#}");
            } else {
                eprintln!("Error: {e:#}");
            }
        })
        .map_or(ExitCode::FAILURE, |()| ExitCode::SUCCESS)
}

/// Inner CLI logic
///
/// # Note
/// - This function starts a tokio runtime and performs work in it.
fn cli_inner<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let Some(args) = parse_args(args)? else {
        return Ok(()); // help/version shown; exit
    };

    let mut manager = Manager::standard();
    manager.merge_provider(Serialized::defaults(&args.config));
    manager.apply_system_default();

    if args.config_files {
        println!("{:?}", Manager::config_files());
        return Ok(());
    }
    if args.show_config {
        print!("{}", show_config_data(&manager));
        let _ = manager.validated()?;
        return Ok(());
    }

    let config = manager.validated()?;
    let Some(mode) = args.mode else {
        anyhow::bail!("a command is required (try --help)");
    };
    setup_tracing(
        trace_level(args.debug, args.quiet),
        ConsoleTraceType::Standard,
        args.log_file.as_ref(),
        config.time_format,
        std::io::stderr().is_terminal(),
    )?;
    handle_mode(&mode, &config)
}

fn parse_args<I, T>(args: I) -> Result<Option<CliArgs>>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    use clap::error::ErrorKind::{DisplayHelp, DisplayVersion};
    match CliArgs::custom_parse(args) {
        Ok(args) => Ok(Some(args)),
        Err(e) if matches!(e.kind(), DisplayHelp | DisplayVersion) => {
            let _ = e.print();
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn show_config_data(manager: &Manager) -> String {
    format!("Configuration:\n{}", manager.to_display_adapter())
}

// MODE HANDLERS ///////////////////////////////////////////////////////////

#[tokio::main]
async fn handle_mode(mode: &Mode, config: &Configuration) -> Result<()> {
    match mode {
        Mode::Serve(_) => crate::server::server_main(config)
            .await
            .context("[Server] failed"),
        Mode::Client(op) => crate::client::client_main(config, op).await,
    }
}

//! cmux - GSM 07.10 multiplexer bring-up
//!
//! Puts the modem on a serial line into CMUX mode, hands the line to the
//! kernel n_gsm driver and keeps the channel nodes alive until SIGINT or
//! SIGTERM.

use clap::Parser;
use cmux_core::cli::{exit_code_description, logging, Cli, CliResult, ExitCodes};
use cmux_core::{Config, Error, ProcessLifecycle, SerialLine, Supervisor, NAME, VERSION};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Nothing touches the device before the configuration is known good
    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(ExitCodes::CONFIG_ERROR);
        }
    };

    if let Err(e) = logging::init(&config) {
        eprintln!("{e:#}");
        return ExitCode::from(ExitCodes::ERROR);
    }

    tracing::info!("Starting {} v{}", NAME, VERSION);
    for line in config.to_string().lines() {
        tracing::debug!("{}", line);
    }

    let result = CliResult::from(run(&config));
    if let CliResult::Error(code, msg) = &result {
        tracing::error!("{} ({})", msg, exit_code_description(*code));
    }
    result.to_exit_code()
}

fn run(config: &Config) -> Result<(), Error> {
    let line = SerialLine::open(config.serial_config())?;
    tracing::info!("Opened {}", line.connection_info());

    let report = Supervisor::new(config, line).run(&mut ProcessLifecycle::new())?;

    match report.nodes {
        Some(nodes) => tracing::info!(
            "Mux closed after {} probe tries, {} nodes removed",
            report.probe_attempt,
            nodes.count()
        ),
        None => tracing::info!("Mux closed after {} probe tries", report.probe_attempt),
    }
    Ok(())
}

// Entrypoint for the CLI application.
// Keeps `main` small: parse arguments, set up logging and hand over to the
// interactive session. Errors surface here and only here.

use anyhow::Context;
use clap::Parser;
use kos_cli::config::{Args, Config};
use kos_cli::{logging, ui};
use std::io::{self, IsTerminal};
use std::process::ExitCode;
use yansi::Paint;

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init_logger(args.verbose);
    if !io::stdout().is_terminal() {
        yansi::disable();
    }

    ExitCode::from(exit_status(&run(&args)))
}

/// A quit from the menu exits 0. Any failure is reported on stderr and
/// exits 1.
fn exit_status(result: &anyhow::Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "session failed");
            eprintln!("{} {e:#}", "Error:".red().bold());
            1
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let config = Config::from_args(args).context("Invalid configuration")?;
    let mut prompt = ui::TerminalPrompt;
    let mut stdout = io::stdout().lock();
    ui::run(&config, &mut prompt, &mut stdout)?;
    Ok(())
}

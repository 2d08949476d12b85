mod args;
mod exit;
mod logging;
mod session;

use clap::Parser;

use crate::args::{normalize_legacy_args, Cli, EnvDefaults};
use crate::exit::{parse_error_code, CliResult, INTERNAL, INTERRUPTED};
use crate::logging::init_logging;
use crate::session::Opening;

fn main() {
    let cli = match Cli::try_parse_from(normalize_legacy_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            std::process::exit(parse_error_code(&err));
        }
    };
    init_logging(cli.log_format, cli.log_level);

    if let Err(err) = ctrlc::set_handler(|| {
        tracing::warn!("interrupted");
        std::process::exit(INTERRUPTED);
    }) {
        eprintln!("error: failed to install signal handler: {err}");
        std::process::exit(INTERNAL);
    }

    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

fn run(cli: &Cli) -> CliResult<i32> {
    let env = EnvDefaults::from_process();
    let endpoint = cli.endpoint(&env)?;
    let config = cli.client_config(&env)?;
    let opening = if cli.schema {
        Opening::SchemaTest
    } else {
        Opening::Envelope
    };
    session::run(&endpoint, config, opening)
}

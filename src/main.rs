use std::process::ExitCode;

use jd_curves::cli::Command;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    let cli = jd_curves::app::parse_cli();

    // Log lines would tear through the TUI's alternate screen.
    let default_level = if cli.verbose {
        "debug"
    } else if matches!(cli.command, Command::Tui(_)) {
        "error"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match jd_curves::app::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}

use clap::Parser;
use prism::cli::commands::Cli;
use prism::cli::handlers;
use tracing_subscriber::EnvFilter;

/// Log filter, e.g. `PRISM_LOG=prism=debug`
const LOG_ENV: &str = "PRISM_LOG";

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

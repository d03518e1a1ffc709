//! forgesetup CLI: declarative developer-machine bootstrap.

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Log filter variable; overrides `--verbose`.
const LOG_ENV: &str = "FORGE_LOG";

#[derive(Parser, Debug)]
#[command(
    name = "forgesetup",
    version,
    about = "Bootstrap a developer machine from a declarative YAML spec"
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: forgesetup::cli::Commands,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(e) = forgesetup::cli::dispatch(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

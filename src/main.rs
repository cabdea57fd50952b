use clap::Parser;
use navtree::cli::commands::Cli;
use navtree::cli::handlers;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Diagnostics go to stderr so `--json` output stays clean. Level comes from
/// `NAVTREE_LOG` (e.g. `NAVTREE_LOG=debug`), warn by default.
fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .with_env_var("NAVTREE_LOG")
        .from_env_lossy();
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

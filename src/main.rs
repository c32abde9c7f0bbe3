use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod aggregate;
mod api;
mod cli;
mod config;
mod error;
mod extract;
mod invocation;
mod model;
mod render;
mod repository;
mod resolve;
mod view;

use cli::{Command, RootArgs};

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.verbose);

    match args.command {
        Command::View(view_args) => view::run_view(view_args),
    }
}

/// Logs go to stderr; `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "gh_effective_workflow=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

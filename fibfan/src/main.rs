//! fibfan: parallel Fibonacci fan-out/fan-in pipeline.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use fibfan::{app, config};

fn main() -> anyhow::Result<()> {
    let cli = config::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(cli.log_level().into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    app::run(cli)
}

//! Command line configuration, with environment fallbacks.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::level_filters::LevelFilter;

use crate::pipeline::{self, BatchSpec, PipelineConfig};
use crate::WorkKey;

/// Compute Fibonacci numbers in parallel, store each one as an artifact, then gather them all into a CSV table.
#[derive(Parser, Debug)]
#[command(name = "fibfan", version, about)]
pub struct Cli {
    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace).
    ///
    /// Ignored when `RUST_LOG` is set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Default log level, from the verbosity flag.
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute a batch of ordinals, then gather the results into the output table.
    Run(RunArgs),
    /// Gather every artifact already present in the artifact directory into the output table.
    Collect(StoreArgs),
}

/// Options shared by all commands.
#[derive(Args, Debug)]
pub struct StoreArgs {
    /// Artifact directory, one `<ordinal>.txt` file per computed value.
    #[arg(short, long, default_value = pipeline::DEFAULT_ARTIFACT_DIR, env = "FIBFAN_DIR")]
    pub dir: PathBuf,

    /// Output table path [default: <DIR>/result.csv].
    #[arg(short, long, env = "FIBFAN_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Number of concurrent artifact reads.
    #[arg(long, default_value = "16", env = "FIBFAN_IO_WORKERS")]
    pub io_workers: NonZeroUsize,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Explicit comma separated ordinals, instead of a random batch.
    #[arg(short, long, value_delimiter = ',', conflicts_with_all = ["count", "min", "max", "seed"])]
    pub keys: Vec<WorkKey>,

    /// Number of random ordinals to compute.
    #[arg(short = 'n', long, default_value = "500", env = "FIBFAN_COUNT")]
    pub count: usize,

    /// Smallest random ordinal.
    #[arg(long, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..))]
    pub min: WorkKey,

    /// Largest random ordinal.
    #[arg(long, default_value = "100000", value_parser = clap::value_parser!(u64).range(1..=crate::sequence::MAX_ORDINAL))]
    pub max: WorkKey,

    /// Seed for a reproducible random batch.
    #[arg(long, env = "FIBFAN_SEED")]
    pub seed: Option<u64>,

    /// Number of compute threads [default: number of cores].
    #[arg(short = 'j', long, env = "FIBFAN_COMPUTE_WORKERS")]
    pub compute_workers: Option<NonZeroUsize>,
}

impl StoreArgs {
    /// Convert into a pipeline configuration with a default batch.
    pub fn into_config(self) -> PipelineConfig {
        let output = self.output.unwrap_or_else(|| self.dir.join(pipeline::DEFAULT_TABLE_NAME));

        PipelineConfig {
            artifact_dir: self.dir,
            output,
            io_workers: self.io_workers,
            ..PipelineConfig::default()
        }
    }
}

impl RunArgs {
    /// Convert into a pipeline configuration.
    pub fn into_config(self) -> anyhow::Result<PipelineConfig> {
        let batch = if self.keys.is_empty() {
            anyhow::ensure!(self.min <= self.max, "--min ({}) must not exceed --max ({})", self.min, self.max);

            BatchSpec::Random {
                count: self.count,
                range: self.min..=self.max,
                seed: self.seed,
            }
        } else {
            BatchSpec::Keys(self.keys)
        };

        Ok(PipelineConfig {
            batch,
            compute_workers: self.compute_workers.unwrap_or_else(pipeline::default_compute_workers),
            ..self.store.into_config()
        })
    }
}

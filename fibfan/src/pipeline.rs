//! End-to-end pipeline: fan-out, fan-in, then write the result table.

use std::num::NonZeroUsize;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::fanin::run_fanin;
use crate::fanout::run_fanout;
use crate::table::write_table;
use crate::{ArtifactStore, DirStore, Error, WorkKey};

pub const DEFAULT_ARTIFACT_DIR: &str = "output";
pub const DEFAULT_TABLE_NAME: &str = "result.csv";
pub const DEFAULT_BATCH_COUNT: usize = 500;
pub const DEFAULT_BATCH_RANGE: RangeInclusive<WorkKey> = 1_000..=100_000;
pub const DEFAULT_IO_WORKERS: NonZeroUsize = match NonZeroUsize::new(16) {
    Some(n) => n,
    None => unreachable!(),
};

/// A pipeline failure, tagged with the phase it happened in.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("artifact store setup failed")]
    Setup(#[source] Error),
    #[error("fan-out phase failed")]
    FanOut(#[source] Error),
    #[error("fan-in phase failed")]
    FanIn(#[source] Error),
    #[error("writing the result table failed")]
    Output(#[source] Error),
}

impl PipelineError {
    /// The underlying failure, whatever the phase.
    pub fn inner(&self) -> &Error {
        match self {
            PipelineError::Setup(err) | PipelineError::FanOut(err) | PipelineError::FanIn(err) | PipelineError::Output(err) => err,
        }
    }

    /// The offending work key, when it is known.
    #[inline]
    pub fn key(&self) -> Option<WorkKey> {
        self.inner().key()
    }
}

/// Where the work keys of a batch come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchSpec {
    /// An explicit list of keys.
    Keys(Vec<WorkKey>),
    /// `count` keys drawn uniformly from `range`, reproducible when `seed` is set.
    Random {
        count: usize,
        range: RangeInclusive<WorkKey>,
        seed: Option<u64>,
    },
}

impl Default for BatchSpec {
    fn default() -> Self {
        BatchSpec::Random {
            count: DEFAULT_BATCH_COUNT,
            range: DEFAULT_BATCH_RANGE,
            seed: None,
        }
    }
}

impl BatchSpec {
    /// Materialize the keys of the batch.
    ///
    /// Random batches may contain duplicates, which end up as a single artifact and a single row.
    /// An empty range yields no keys.
    pub fn keys(&self) -> Vec<WorkKey> {
        match self {
            BatchSpec::Keys(keys) => keys.clone(),
            BatchSpec::Random { range, .. } if range.is_empty() => vec![],
            BatchSpec::Random { count, range, seed } => {
                let mut rng = match seed {
                    Some(seed) => StdRng::seed_from_u64(*seed),
                    None => StdRng::from_entropy(),
                };

                (0..*count).map(|_| rng.gen_range(range.clone())).collect()
            }
        }
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding one artifact per work key.
    pub artifact_dir: PathBuf,
    /// Path of the result table.
    pub output: PathBuf,
    pub batch: BatchSpec,
    /// Number of threads computing work units.
    pub compute_workers: NonZeroUsize,
    /// Number of concurrent artifact reads.
    pub io_workers: NonZeroUsize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let artifact_dir = PathBuf::from(DEFAULT_ARTIFACT_DIR);

        Self {
            output: artifact_dir.join(DEFAULT_TABLE_NAME),
            artifact_dir,
            batch: BatchSpec::default(),
            compute_workers: default_compute_workers(),
            io_workers: DEFAULT_IO_WORKERS,
        }
    }
}

/// One compute thread per available core.
pub fn default_compute_workers() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

/// Summary of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Report {
    /// Number of rows in the result table.
    pub rows: usize,
    pub fan_out: Duration,
    pub fan_in: Duration,
}

/// The fan-out/fan-in pipeline.
///
/// Nothing happens until [`Pipeline::run()`] or [`Pipeline::collect()`] is called.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Compute an artifact for every key of the batch, read them all back and write the result table.
    ///
    /// The artifact directory is created if missing. The table holds exactly one row per distinct key of the batch,
    /// in ascending key order, and is not written at all when any phase fails.
    pub fn run(&self) -> Result<Report, PipelineError> {
        let store = DirStore::create(&self.config.artifact_dir).map_err(PipelineError::Setup)?;
        let keys = self.config.batch.keys();

        tracing::info!("Computing {} work units into `{}`", keys.len(), store.path().display());

        let start = Instant::now();
        run_fanout(&store, &keys, self.config.compute_workers).map_err(PipelineError::FanOut)?;
        let fan_out = start.elapsed();

        self.fan_in(&store, keys, fan_out)
    }

    /// Read back every artifact currently stored in the artifact directory and write the result table.
    ///
    /// Fails with [`Error::StorageUnavailable`] if the artifact directory does not exist.
    pub fn collect(&self) -> Result<Report, PipelineError> {
        let store = DirStore::open(&self.config.artifact_dir).map_err(PipelineError::Setup)?;
        let keys = store.list_keys().map_err(PipelineError::FanIn)?;

        tracing::info!("Found {} artifacts in `{}`", keys.len(), store.path().display());

        self.fan_in(&store, keys, Duration::ZERO)
    }

    fn fan_in(&self, store: &DirStore, keys: impl IntoIterator<Item = WorkKey>, fan_out: Duration) -> Result<Report, PipelineError> {
        let start = Instant::now();
        let rows = run_fanin(store, keys, self.config.io_workers).map_err(PipelineError::FanIn)?;
        let fan_in = start.elapsed();

        write_table(&rows, &self.config.output).map_err(PipelineError::Output)?;

        let report = Report {
            rows: rows.len(),
            fan_out,
            fan_in,
        };

        tracing::info!(
            "Wrote {} rows to `{}` (fan-out {:?}, fan-in {:?})",
            report.rows,
            self.config.output.display(),
            report.fan_out,
            report.fan_in
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use tempfile::TempDir;

    fn config(dir: &TempDir, keys: Vec<WorkKey>) -> PipelineConfig {
        PipelineConfig {
            artifact_dir: dir.path().join("artifacts"),
            output: dir.path().join("result.csv"),
            batch: BatchSpec::Keys(keys),
            compute_workers: NonZeroUsize::new(4).unwrap(),
            io_workers: NonZeroUsize::new(8).unwrap(),
        }
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();

        assert_eq!(config.output, PathBuf::from("output/result.csv"));
        assert_eq!(config.io_workers.get(), 16);
        assert_eq!(config.batch, BatchSpec::default());
    }

    #[test]
    fn test_random_batch() {
        let batch = BatchSpec::Random {
            count: 50,
            range: 10..=20,
            seed: Some(7),
        };

        let keys = batch.keys();

        assert_eq!(keys.len(), 50);
        assert!(keys.iter().all(|key| (10..=20).contains(key)));
        assert_eq!(keys, batch.keys());
    }

    #[test]
    fn test_empty_range() {
        #[allow(clippy::reversed_empty_ranges)]
        let batch = BatchSpec::Random {
            count: 5,
            range: 20..=10,
            seed: None,
        };

        assert!(batch.keys().is_empty());
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_run() {
        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(config(&dir, vec![50, 3, 10, 1, 2, 10]));

        let report = pipeline.run().unwrap();

        assert_eq!(report.rows, 5);
        assert_eq!(
            fs::read_to_string(&pipeline.config().output).unwrap(),
            "1,1\n2,1\n3,2\n10,55\n50,12586269025\n"
        );
        assert!(logs_contain("Wrote 5 rows"));
    }

    #[test]
    fn test_run_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(PipelineConfig {
            batch: BatchSpec::Random {
                count: 64,
                range: 1..=5_000,
                seed: Some(42),
            },
            ..config(&dir, vec![])
        });

        pipeline.run().unwrap();
        let first = fs::read(&pipeline.config().output).unwrap();
        pipeline.run().unwrap();
        let second = fs::read(&pipeline.config().output).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_run_with_duplicate_keys() {
        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(PipelineConfig {
            batch: BatchSpec::Random {
                count: 400,
                range: 1..=300,
                seed: Some(0),
            },
            compute_workers: NonZeroUsize::new(8).unwrap(),
            ..config(&dir, vec![])
        });

        let distinct: std::collections::BTreeSet<_> = pipeline.config().batch.keys().into_iter().collect();
        let report = pipeline.run().unwrap();

        assert_eq!(report.rows, distinct.len());
        assert!(report.rows < 400);
    }

    #[test]
    fn test_collect() {
        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(config(&dir, vec![4, 5, 6]));

        pipeline.run().unwrap();
        fs::remove_file(&pipeline.config().output).unwrap();

        let report = pipeline.collect().unwrap();

        assert_eq!(report.rows, 3);
        assert_eq!(report.fan_out, Duration::ZERO);
        assert_eq!(fs::read_to_string(&pipeline.config().output).unwrap(), "4,3\n5,5\n6,8\n");
    }

    #[test]
    fn test_collect_missing_directory() {
        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(config(&dir, vec![]));

        let err = pipeline.collect().unwrap_err();

        assert!(matches!(err, PipelineError::Setup(Error::StorageUnavailable { .. })), "{err:?}");
        assert!(!pipeline.config().output.exists());
    }

    #[test]
    fn test_fan_out_failure() {
        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(config(&dir, vec![1, crate::sequence::MAX_ORDINAL + 1]));

        let err = pipeline.run().unwrap_err();

        assert!(matches!(err, PipelineError::FanOut(_)), "{err:?}");
        assert_eq!(err.key(), Some(crate::sequence::MAX_ORDINAL + 1));
        assert!(!pipeline.config().output.exists());
    }

    #[test]
    fn test_empty_batch() {
        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(config(&dir, vec![]));

        assert_eq!(pipeline.run().unwrap().rows, 0);
        assert_eq!(fs::read_to_string(&pipeline.config().output).unwrap(), "");
    }
}

//! Fan-out phase: compute work units in parallel and persist each result as an artifact.

use std::num::NonZeroUsize;

use rayon::prelude::*;

use crate::sequence::fibonacci;
use crate::{ArtifactStore, Error, Result, WorkKey};

/// One unit of work: compute the value of a key and store it as an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkUnit {
    key: WorkKey,
}

impl WorkUnit {
    #[inline]
    pub fn new(key: WorkKey) -> Self {
        Self { key }
    }

    #[inline]
    pub fn key(&self) -> WorkKey {
        self.key
    }

    /// Compute the value of this unit and write it to `store`.
    pub fn execute<S: ArtifactStore + ?Sized>(&self, store: &S) -> Result<()> {
        let value = fibonacci(self.key)?;

        store.write(self.key, &value)
    }
}

/// A fixed-size pool of OS threads dedicated to CPU-bound work units.
///
/// Units are handed out one at a time to whichever thread becomes idle first (work stealing), so a few large ordinals
/// do not hold back a shard of small ones.
#[derive(Debug)]
pub struct ComputePool {
    pool: rayon::ThreadPool,
}

impl ComputePool {
    /// Build a pool of exactly `size` threads.
    pub fn new(size: NonZeroUsize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(size.get())
            .thread_name(|i| format!("fibfan-compute-{i}"))
            .build()
            .map_err(|e| Error::Pool(format!("failed to create compute pool: {e}")))?;

        Ok(Self { pool })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Execute a work unit for every key, blocking until all of them are stored.
    ///
    /// All-or-nothing: once a unit fails, units that have not started yet are skipped and the failure is returned.
    /// Artifacts already written by then are left in place.
    pub fn run<S: ArtifactStore + ?Sized>(&self, store: &S, keys: &[WorkKey]) -> Result<()> {
        store.ensure_available()?;

        tracing::debug!("Fanning out {} work units over {} compute threads", keys.len(), self.size());

        self.pool.install(|| {
            keys.par_iter().with_max_len(1).try_for_each(|&key| {
                let unit = WorkUnit::new(key);

                unit.execute(store).inspect_err(|err| {
                    tracing::debug!("Work unit {} failed: {err}", unit.key());
                })
            })
        })
    }
}

/// Compute and store an artifact for every key on a fresh pool of `worker_count` compute threads.
///
/// Blocks until every key is processed. Duplicate keys write the same artifact more than once.
pub fn run_fanout<S: ArtifactStore + ?Sized>(store: &S, keys: &[WorkKey], worker_count: NonZeroUsize) -> Result<()> {
    ComputePool::new(worker_count)?.run(store, keys)
}

//! Fan-in phase: read every artifact back concurrently and reassemble the result rows.
//!
//! Rows are collected in completion order, which depends on how reads interleave, then sorted by ascending key
//! so that the same set of artifacts always yields the same table.
//!
//! The phase is fail-fast: the first missing or corrupted artifact cancels all outstanding reads and is returned
//! as the phase error, since a silently incomplete table is worse than no table.

use std::collections::BTreeSet;
use std::num::NonZeroUsize;

use futures::stream::{FuturesUnordered, StreamExt};

use crate::task::IoPool;
use crate::{DirStore, Error, Result, ResultRow, WorkKey};

/// Read back the artifact of every key on a pool of `worker_count` I/O workers.
///
/// Must be awaited from within a tokio runtime, see [`run_fanin()`] for the blocking counterpart.
pub async fn collect(
    store: &DirStore,
    keys: impl IntoIterator<Item = WorkKey>,
    worker_count: NonZeroUsize,
) -> Result<Vec<ResultRow>> {
    let keys: BTreeSet<_> = keys.into_iter().collect();

    tracing::debug!("Fanning in {} artifacts over {worker_count} I/O workers", keys.len());

    let mut pool = IoPool::default();
    pool.start(worker_count);

    let rows = gather(&pool, store, keys).await;

    pool.close().await;

    rows
}

/// Blocking counterpart of [`collect()`], driving its own single-threaded runtime.
///
/// # Panics
/// Like any blocking call, this function panics when called from within an asynchronous context.
pub fn run_fanin(
    store: &DirStore,
    keys: impl IntoIterator<Item = WorkKey>,
    worker_count: NonZeroUsize,
) -> Result<Vec<ResultRow>> {
    let runtime = tokio::runtime::Builder::new_current_thread().build().map_err(Error::Runtime)?;

    runtime.block_on(collect(store, keys, worker_count))
}

async fn gather(pool: &IoPool, store: &DirStore, keys: BTreeSet<WorkKey>) -> Result<Vec<ResultRow>> {
    let mut pending = FuturesUnordered::new();
    let mut abort_handles = Vec::with_capacity(keys.len());

    for key in keys {
        let store = store.clone();

        let (remote_handle, abort_handle) = pool.execute(async move {
            let value = store.load(key).await?;

            Ok::<_, Error>(ResultRow::new(key, value))
        })?;

        pending.push(remote_handle);
        abort_handles.push(abort_handle);
    }

    let mut rows = Vec::with_capacity(pending.len());

    while let Some(outcome) = pending.next().await {
        match outcome {
            Ok(Ok(row)) => rows.push(row),
            Ok(Err(err)) => {
                tracing::debug!("Cancelling {} outstanding reads: {err}", pending.len());

                abort_handles.iter().for_each(|handle| handle.abort());

                return Err(err);
            }
            Err(_aborted) => return Err(Error::Pool("artifact read was aborted".into())),
        }
    }

    rows.sort_unstable_by_key(|row| row.key);

    Ok(rows)
}

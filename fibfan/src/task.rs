//! This module provides the I/O-bound worker pool used by the fan-in phase.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::{self, Future, FutureExt};
use tokio::sync::{mpsc, Mutex};

pub use future::{AbortHandle, Aborted, RemoteHandle};

use crate::{Error, Result};

type Task = future::BoxFuture<'static, ()>;

/// A lightweight pool of asynchronous workers for I/O-bound tasks.
///
/// Every worker is a task spawned on the current tokio runtime, pulling the next pending task from a shared queue as soon as it is idle.
/// No more than `size` tasks are thus in flight at once, whatever the number of tasks pushed to the pool, and a task suspended on I/O
/// leaves room for the runtime to drive the other workers.
///
/// # Example
/// ```
/// # tokio_test::block_on(async {
/// # use fibfan::task::IoPool;
/// let mut pool = IoPool::default();
/// pool.start(3.try_into().unwrap());
///
/// let (remote_handle, _) = pool.execute(async { 6 * 7 }).unwrap();
///
/// assert_eq!(remote_handle.await, Ok(42));
///
/// pool.close().await;
/// # })
/// ```
#[derive(Debug, Default)]
pub struct IoPool {
    /// The pool of workers.
    workers: Vec<Worker>,
    /// The sending part of a channel to push tasks to the workers.
    ///
    /// The next available worker will wait for a task to be received through the channel.
    sender: Option<mpsc::UnboundedSender<Task>>,
}

impl IoPool {
    /// Start a pool with `size` workers.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Panics
    /// This method panics if the pool is already running, ie. when called more than once without stopping the pool in between.
    pub fn start(&mut self, size: NonZeroUsize) {
        assert!(!self.is_running() && self.workers.is_empty());

        let (sender, receiver) = mpsc::unbounded_channel();

        let receiver = Arc::new(Mutex::new(receiver));

        static WORKER_ID: AtomicUsize = AtomicUsize::new(0);
        let size = size.get();
        let id = WORKER_ID.fetch_add(size, Ordering::Relaxed);

        self.workers = (0..size).map(|i| Worker::new(id.wrapping_add(i), Arc::clone(&receiver))).collect();
        self.sender = Some(sender);
    }

    /// Whether the pool has been started and not stopped since.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.sender.is_some()
    }

    /// Number of running workers.
    #[inline]
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Push a task and keep remote and abort handles on it.
    ///
    /// Await on the remote handle to retrieve the task output on completion. Calling `abort()` on the abort handle cancels the task,
    /// the remote handle then returns an `Err(Aborted)`:
    /// ```
    /// # tokio_test::block_on(async {
    /// # use fibfan::task::{Aborted, IoPool};
    /// # let mut pool = IoPool::default();
    /// # pool.start(3.try_into().unwrap());
    /// let (remote_handle, abort_handle) = pool.execute(async { "Hello world!" }).unwrap();
    ///
    /// abort_handle.abort();
    ///
    /// assert_eq!(remote_handle.await, Err(Aborted));
    /// # })
    /// ```
    /// **Be aware that dropping the remote handle also cancels the task.**
    ///
    /// Fails with [`Error::Pool`] when the pool is not running.
    pub fn execute<T: Send + 'static>(
        &self,
        future: impl Future<Output = T> + Send + 'static,
    ) -> Result<(RemoteHandle<Result<T, Aborted>>, AbortHandle)> {
        let sender = self.sender.as_ref().ok_or_else(|| Error::Pool("I/O pool is not running".into()))?;

        let (abortable, abort_handle) = future::abortable(future);
        let (remote, remote_handle) = abortable.remote_handle();

        sender
            .send(remote.boxed())
            .map_err(|_| Error::Pool("all I/O workers are gone".into()))?;

        Ok((remote_handle, abort_handle))
    }

    /// Stop current pool of workers, waiting for all pending tasks to complete.
    ///
    /// Once stopped, the pool can be started again with any number of workers.
    pub async fn stop(&mut self) {
        drop(self.sender.take());
        let workers = std::mem::take(&mut self.workers);

        let results = future::join_all(workers.into_iter().inspect(|worker| {
            tracing::debug!("Stopping I/O worker {}...", worker.id);
        }))
        .await;

        for err in results.into_iter().filter_map(|result| result.err()) {
            tracing::warn!("I/O worker did not shut down cleanly: {err}");
        }
    }

    /// Close current pool of workers, waiting for all pending tasks to complete.
    ///
    /// Once closed, the pool cannot be used since it is consumed.
    pub async fn close(mut self) {
        self.stop().await
    }
}

#[derive(Debug)]
struct Worker {
    id: usize,
    handle: tokio::task::JoinHandle<()>,
}

impl Worker {
    fn new(id: usize, receiver: Arc<Mutex<mpsc::UnboundedReceiver<Task>>>) -> Worker {
        tracing::debug!("Starting I/O worker {id}...");

        Worker {
            id,
            handle: tokio::spawn(async move {
                loop {
                    let message = receiver.lock().await.recv().await;

                    match message {
                        Some(task) => {
                            tracing::trace!("Executing task on I/O worker {id}...");

                            task.await;
                        }
                        None => {
                            tracing::debug!("All tasks exhausted, shutting down I/O worker {id}.");
                            break;
                        }
                    }
                }
            }),
        }
    }
}

impl Future for Worker {
    type Output = std::result::Result<(), tokio::task::JoinError>;

    #[inline]
    fn poll(mut self: std::pin::Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> std::task::Poll<Self::Output> {
        self.handle.poll_unpin(cx)
    }
}

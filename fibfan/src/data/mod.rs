use std::collections::BTreeSet;

use num_bigint::BigUint;

use crate::Result;

mod store;
pub use store::*;

mod utils;

/// A unit of work id, ie. a Fibonacci ordinal.
pub type WorkKey = u64;
/// The value computed for a [`WorkKey`].
pub type WorkResult = BigUint;

/// One line of the result table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResultRow {
    /// Work key the value was computed for.
    pub key: WorkKey,
    /// Computed value.
    pub value: WorkResult,
}

impl ResultRow {
    /// Create a new `ResultRow`.
    #[inline]
    pub fn new(key: WorkKey, value: WorkResult) -> Self {
        Self { key, value }
    }
}

/// Artifact store interface.
///
/// An artifact is the durable record of one computed [`WorkResult`], keyed by its [`WorkKey`].
/// Artifacts are written once by the fan-out phase and read back by the fan-in phase.
pub trait ArtifactStore: Send + Sync {
    /// Check the store can accept writes, failing with [`Error::StorageUnavailable`](crate::Error::StorageUnavailable) otherwise.
    fn ensure_available(&self) -> Result<()>;

    /// Create or overwrite the artifact for `key`.
    fn write(&self, key: WorkKey, value: &WorkResult) -> Result<()>;

    /// List keys of all currently stored artifacts.
    fn list_keys(&self) -> Result<BTreeSet<WorkKey>>;

    /// Read back the artifact for `key`.
    fn read(&self, key: WorkKey) -> Result<WorkResult>;
}

//! Run stores: factories and lifecycle for the ephemeral runs of a sort.

use std::fmt;

use crate::Result;
use crate::cursor::MutableCursor;
use crate::tuple::SchemaRef;

pub mod file;
pub mod memory;

pub use file::{FileCursor, FileRunStore};
pub use memory::{MemoryCursor, MemoryRunStore};

/// Opaque identifier of one run inside a store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunHandle(pub u64);

impl fmt::Display for RunHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run#{}", self.0)
    }
}

/// Opaque transaction handle, passed through unmodified to every store call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TxnHandle(u64);

impl TxnHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Auxiliary storage for materialized runs.
///
/// Stores are shared between merge workers, so every method takes `&self`.
/// A run is opened by at most one cursor at a time; the sort operator
/// guarantees this by moving runs between its stages.
pub trait RunStore: Send + Sync {
    type Cursor: MutableCursor + Send;

    /// Allocates an empty run. Fails with `RunStoreExhausted` when the store
    /// cannot hold another run.
    fn create(&self, schema: &SchemaRef, txn: TxnHandle) -> Result<RunHandle>;

    /// Opens a cursor positioned before the first row of the run.
    fn open(&self, handle: RunHandle, txn: TxnHandle) -> Result<Self::Cursor>;

    /// Releases the run's storage.
    fn destroy(&self, handle: RunHandle, txn: TxnHandle) -> Result<()>;

    /// Number of runs created and not yet destroyed.
    fn live_runs(&self) -> usize;

    /// Number of runs created over the store's lifetime.
    fn runs_created(&self) -> usize;
}

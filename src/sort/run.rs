use std::sync::Arc;

use tracing::warn;

use crate::cursor::{Cursor, MutableCursor};
use crate::store::{RunHandle, RunStore, TxnHandle};
use crate::tuple::{SchemaRef, Tuple};
use crate::{Result, SortError};

pub trait RunSummary {
    fn total_entries(&self) -> usize;
}

/// An ephemeral, materialized run owned by the sort.
///
/// A `Run` is a move-only owner of its storage: handing it to a merge moves
/// it, reading it through `into_reader` consumes it, and dropping it
/// destroys it in the store. Errors and panics therefore release every run
/// that has not been merged yet.
pub struct Run<S: RunStore> {
    store: Arc<S>,
    schema: SchemaRef,
    handle: RunHandle,
    txn: TxnHandle,
    entries: usize,
    released: bool,
}

impl<S: RunStore> Run<S> {
    pub fn handle(&self) -> RunHandle {
        self.handle
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn txn(&self) -> TxnHandle {
        self.txn
    }

    /// Opens the single consuming reader of this run. The reader destroys
    /// the run once it is exhausted or dropped.
    pub fn into_reader(self) -> Result<RunReader<S>> {
        let mut cursor = self.store.open(self.handle, self.txn)?;
        cursor.reset_to_start()?;
        Ok(RunReader {
            cursor: Some(cursor),
            run: self,
        })
    }

    /// Opens a cursor positioned before the first row without consuming the
    /// run. The caller must not hold it across a hand-off of the run.
    pub(crate) fn open_cursor(&self) -> Result<S::Cursor> {
        let mut cursor = self.store.open(self.handle, self.txn)?;
        cursor.reset_to_start()?;
        Ok(cursor)
    }

    /// Snapshot of the run's rows, for inspection between merge passes.
    pub fn read_all(&self) -> Result<Vec<Tuple>> {
        let mut cursor = self.open_cursor()?;
        let mut rows = Vec::with_capacity(self.entries);
        while cursor.advance()? {
            rows.push(Tuple::read_from(&cursor, &self.schema)?);
        }
        Ok(rows)
    }

    /// Destroys the run, reporting a store failure instead of logging it.
    pub fn destroy(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.store.destroy(self.handle, self.txn)
    }
}

impl<S: RunStore> RunSummary for Run<S> {
    fn total_entries(&self) -> usize {
        self.entries
    }
}

impl<S: RunStore> Drop for Run<S> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(handle = %self.handle, "failed to destroy run: {e}");
        }
    }
}

impl<S: RunStore> std::fmt::Debug for Run<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Run")
            .field("handle", &self.handle)
            .field("entries", &self.entries)
            .finish()
    }
}

/// Append-only writer of a freshly created run.
pub struct RunWriter<S: RunStore> {
    cursor: S::Cursor,
    run: Run<S>,
}

impl<S: RunStore> RunWriter<S> {
    pub fn create(store: &Arc<S>, schema: &SchemaRef, txn: TxnHandle) -> Result<Self> {
        let handle = store.create(schema, txn)?;
        let run = Run {
            store: Arc::clone(store),
            schema: Arc::clone(schema),
            handle,
            txn,
            entries: 0,
            released: false,
        };
        // If opening fails, dropping `run` destroys the fresh allocation.
        let cursor = run.open_cursor()?;
        Ok(Self { cursor, run })
    }

    /// Inserts a new row holding a copy of every field of the source's
    /// current row.
    pub fn copy_from<C: Cursor + ?Sized>(&mut self, src: &C) -> Result<()> {
        self.cursor.insert_here()?;
        for field in self.run.schema.fields() {
            let value = src.field(&field.name)?.clone();
            self.cursor.set_field(&field.name, value)?;
        }
        self.run.entries += 1;
        Ok(())
    }

    pub fn push(&mut self, tuple: &Tuple) -> Result<()> {
        tuple.insert_into(&mut self.cursor, &self.run.schema)?;
        self.run.entries += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.run.entries
    }

    pub fn is_empty(&self) -> bool {
        self.run.entries == 0
    }

    /// Closes the write cursor and hands back the finished run.
    pub fn finish(self) -> Run<S> {
        let RunWriter { cursor, run } = self;
        drop(cursor);
        run
    }
}

/// The one consuming reader of a run.
///
/// Once `advance` reports exhaustion the cursor is closed and the run's
/// storage released; dropping an unfinished reader releases it as well.
pub struct RunReader<S: RunStore> {
    cursor: Option<S::Cursor>,
    run: Run<S>,
}

impl<S: RunStore> RunReader<S> {
    pub fn advance(&mut self) -> Result<bool> {
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(false);
        };
        if cursor.advance()? {
            return Ok(true);
        }
        self.close()?;
        Ok(false)
    }

    /// The underlying cursor, positioned on the current row.
    pub fn cursor(&self) -> Result<&S::Cursor> {
        self.cursor.as_ref().ok_or(SortError::NoCurrentRow)
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor.is_none()
    }

    pub fn handle(&self) -> RunHandle {
        self.run.handle
    }

    pub fn close(&mut self) -> Result<()> {
        self.cursor.take();
        self.run.release()
    }
}

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};
use tracing::trace;

use crate::cursor::{Cursor, MutableCursor, RowId};
use crate::store::{RunHandle, RunStore, TxnHandle};
use crate::tuple::{SchemaRef, Tuple, Value};
use crate::{Result, SortError};

// Deleted rows leave an empty slot behind, like a slotted page.
struct MemRun {
    slots: Vec<Option<Tuple>>,
}

/// Run store keeping every run in process memory.
///
/// An optional capacity bounds the number of live runs, which models a store
/// that can run out of ephemeral space.
pub struct MemoryRunStore {
    runs: Mutex<HashMap<RunHandle, (SchemaRef, Arc<RwLock<MemRun>>)>>,
    next_id: AtomicU64,
    created: AtomicUsize,
    capacity: Option<usize>,
}

impl Default for MemoryRunStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self {
            runs: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            created: AtomicUsize::new(0),
            capacity: None,
        }
    }

    pub fn with_capacity(max_live_runs: usize) -> Self {
        Self {
            capacity: Some(max_live_runs),
            ..Self::new()
        }
    }
}

impl RunStore for MemoryRunStore {
    type Cursor = MemoryCursor;

    fn create(&self, schema: &SchemaRef, txn: TxnHandle) -> Result<RunHandle> {
        let mut runs = self.runs.lock();
        if let Some(capacity) = self.capacity {
            if runs.len() >= capacity {
                return Err(SortError::RunStoreExhausted { capacity });
            }
        }
        let handle = RunHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        runs.insert(
            handle,
            (
                Arc::clone(schema),
                Arc::new(RwLock::new(MemRun { slots: Vec::new() })),
            ),
        );
        self.created.fetch_add(1, Ordering::Relaxed);
        trace!(%handle, txn = txn.id(), "created in-memory run");
        Ok(handle)
    }

    fn open(&self, handle: RunHandle, _txn: TxnHandle) -> Result<MemoryCursor> {
        let runs = self.runs.lock();
        let (schema, run) = runs.get(&handle).ok_or(SortError::RunNotFound(handle))?;
        Ok(MemoryCursor {
            run: Arc::clone(run),
            schema: Arc::clone(schema),
            slot: None,
            current: None,
        })
    }

    fn destroy(&self, handle: RunHandle, txn: TxnHandle) -> Result<()> {
        self.runs
            .lock()
            .remove(&handle)
            .ok_or(SortError::RunNotFound(handle))?;
        trace!(%handle, txn = txn.id(), "destroyed in-memory run");
        Ok(())
    }

    fn live_runs(&self) -> usize {
        self.runs.lock().len()
    }

    fn runs_created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

/// Cursor over one in-memory run.
pub struct MemoryCursor {
    run: Arc<RwLock<MemRun>>,
    schema: SchemaRef,
    // None before the first row; otherwise the slot last visited.
    slot: Option<usize>,
    // Copy of the row under the cursor.
    current: Option<Tuple>,
}

impl MemoryCursor {
    fn current_slot(&self) -> Result<usize> {
        match (self.slot, &self.current) {
            (Some(slot), Some(_)) => Ok(slot),
            _ => Err(SortError::NoCurrentRow),
        }
    }
}

impl Cursor for MemoryCursor {
    fn reset_to_start(&mut self) -> Result<()> {
        self.slot = None;
        self.current = None;
        Ok(())
    }

    fn advance(&mut self) -> Result<bool> {
        let data = self.run.read();
        let start = self.slot.map_or(0, |s| s + 1);
        for idx in start..data.slots.len() {
            if let Some(tuple) = &data.slots[idx] {
                self.slot = Some(idx);
                self.current = Some(tuple.clone());
                return Ok(true);
            }
        }
        self.slot = Some(data.slots.len());
        self.current = None;
        Ok(false)
    }

    fn field(&self, name: &str) -> Result<&Value> {
        let idx = self
            .schema
            .index_of(name)
            .ok_or_else(|| SortError::field_not_found(name))?;
        let tuple = self.current.as_ref().ok_or(SortError::NoCurrentRow)?;
        tuple
            .get(idx)
            .ok_or_else(|| SortError::field_not_found(name))
    }

    fn has_field(&self, name: &str) -> bool {
        self.schema.has_field(name)
    }
}

impl MutableCursor for MemoryCursor {
    fn insert_here(&mut self) -> Result<()> {
        let mut data = self.run.write();
        let start = self.slot.map_or(0, |s| s + 1).min(data.slots.len());
        let tuple = self.schema.default_tuple();
        let idx = match data.slots[start..].iter().position(Option::is_none) {
            Some(offset) => start + offset,
            None => {
                data.slots.push(None);
                data.slots.len() - 1
            }
        };
        data.slots[idx] = Some(tuple.clone());
        self.slot = Some(idx);
        self.current = Some(tuple);
        Ok(())
    }

    fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
        let slot = self.current_slot()?;
        let idx = self.schema.check_value(name, &value)?;
        let mut data = self.run.write();
        let stored = data.slots[slot].as_mut().ok_or(SortError::NoCurrentRow)?;
        stored.set(idx, value.clone());
        if let Some(current) = self.current.as_mut() {
            current.set(idx, value);
        }
        Ok(())
    }

    fn delete_here(&mut self) -> Result<()> {
        let slot = self.current_slot()?;
        self.run.write().slots[slot] = None;
        self.current = None;
        Ok(())
    }

    fn current_row_id(&self) -> Result<RowId> {
        self.current_slot().map(RowId)
    }

    fn move_to(&mut self, id: RowId) -> Result<()> {
        let data = self.run.read();
        match data.slots.get(id.0) {
            Some(Some(tuple)) => {
                self.slot = Some(id.0);
                self.current = Some(tuple.clone());
                Ok(())
            }
            _ => Err(SortError::RowNotFound(id)),
        }
    }
}

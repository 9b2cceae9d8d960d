use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use rand::Rng;
use tracing::{debug, trace, warn};

use crate::cursor::{Cursor, MutableCursor, RowId};
use crate::store::{RunHandle, RunStore, TxnHandle};
use crate::tuple::{FieldType, SLOT_FLAG_SIZE, Schema, SchemaRef, Tuple, Value};
use crate::{Result, SortError};

const SLOT_EMPTY: u32 = 0;
const SLOT_USED: u32 = 1;

// Private spill directory, removed together with the store.
struct TempDirInfo {
    path: PathBuf,
    should_delete: bool,
}

impl TempDirInfo {
    fn new(path: PathBuf, should_delete: bool) -> std::io::Result<Self> {
        std::fs::create_dir_all(&path)?;
        Ok(Self {
            path,
            should_delete,
        })
    }
}

impl Drop for TempDirInfo {
    fn drop(&mut self) {
        if self.should_delete {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }
}

/// Backing file of one run. The file is unlinked when the run is destroyed,
/// or at the latest when the last cursor over it goes away.
struct RunFile {
    file: File,
    path: PathBuf,
    handle: RunHandle,
    schema: SchemaRef,
    unlinked: AtomicBool,
}

impl RunFile {
    fn create(path: PathBuf, handle: RunHandle, schema: SchemaRef) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;
        Ok(Self {
            file,
            path,
            handle,
            schema,
            unlinked: AtomicBool::new(false),
        })
    }

    // Marked done only once the file is gone, so a failed attempt is
    // retried from `Drop`.
    fn unlink(&self) -> std::io::Result<()> {
        if self.unlinked.load(Ordering::Acquire) {
            return Ok(());
        }
        // Drop the blocks right away even if a cursor still holds the fd.
        self.file.set_len(0)?;
        std::fs::remove_file(&self.path)?;
        self.unlinked.store(true, Ordering::Release);
        Ok(())
    }

    fn slot_count(&self) -> Result<usize> {
        let len = self.file.metadata()?.len() as usize;
        Ok(len / self.schema.slot_size())
    }

    fn slot_offset(&self, slot: usize) -> u64 {
        (slot * self.schema.slot_size()) as u64
    }

    fn read_slot(&self, slot: usize, buf: &mut [u8]) -> Result<()> {
        self.file.read_exact_at(buf, self.slot_offset(slot))?;
        Ok(())
    }

    fn write_at(&self, slot: usize, offset_in_slot: usize, bytes: &[u8]) -> Result<()> {
        self.file
            .write_all_at(bytes, self.slot_offset(slot) + offset_in_slot as u64)?;
        Ok(())
    }

    fn corrupted(&self, reason: impl Into<String>) -> SortError {
        SortError::RunCorrupted {
            handle: self.handle,
            reason: reason.into(),
        }
    }
}

impl Drop for RunFile {
    fn drop(&mut self) {
        if let Err(e) = self.unlink() {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), "failed to remove run file: {e}");
            }
        }
    }
}

/// Run store that materializes every run as a file of fixed-size slots.
///
/// Each store owns a private directory under `base_dir`; the directory and
/// anything left inside it are removed when the store is dropped.
pub struct FileRunStore {
    files: Mutex<HashMap<RunHandle, Arc<RunFile>>>,
    dir: TempDirInfo,
    next_id: AtomicU64,
    created: AtomicUsize,
}

impl FileRunStore {
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let random = rand::rng().random::<u32>();
        let path = base_dir
            .as_ref()
            .join(format!("tuplesort_{}_{}", random, timestamp));
        let dir = TempDirInfo::new(path, true)?;
        debug!(dir = %dir.path.display(), "created run spill directory");
        Ok(Self {
            files: Mutex::new(HashMap::new()),
            dir,
            next_id: AtomicU64::new(0),
            created: AtomicUsize::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir.path
    }
}

impl RunStore for FileRunStore {
    type Cursor = FileCursor;

    fn create(&self, schema: &SchemaRef, txn: TxnHandle) -> Result<RunHandle> {
        let handle = RunHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        let path = self
            .dir
            .path
            .join(format!("run_{}_{}.dat", txn.id(), handle.0));
        let run_file = RunFile::create(path, handle, Arc::clone(schema))?;
        self.files.lock().insert(handle, Arc::new(run_file));
        self.created.fetch_add(1, Ordering::Relaxed);
        trace!(%handle, txn = txn.id(), "created run file");
        Ok(handle)
    }

    fn open(&self, handle: RunHandle, _txn: TxnHandle) -> Result<FileCursor> {
        let file = self
            .files
            .lock()
            .get(&handle)
            .cloned()
            .ok_or(SortError::RunNotFound(handle))?;
        let buf = vec![0u8; file.schema.slot_size()];
        Ok(FileCursor {
            file,
            buf,
            slot: None,
            current: None,
        })
    }

    fn destroy(&self, handle: RunHandle, txn: TxnHandle) -> Result<()> {
        let file = self
            .files
            .lock()
            .remove(&handle)
            .ok_or(SortError::RunNotFound(handle))?;
        file.unlink()?;
        trace!(%handle, txn = txn.id(), "destroyed run file");
        Ok(())
    }

    fn live_runs(&self) -> usize {
        self.files.lock().len()
    }

    fn runs_created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

/// Cursor over one run file.
///
/// Slot layout: a little-endian `u32` in-use flag followed by the fields in
/// schema order. Ints take 4 bytes; a `Varchar(n)` takes a 4-byte length and
/// `n` bytes of zero-padded data.
pub struct FileCursor {
    file: Arc<RunFile>,
    buf: Vec<u8>,
    slot: Option<usize>,
    current: Option<Tuple>,
}

impl FileCursor {
    fn schema(&self) -> &Schema {
        &self.file.schema
    }

    fn current_slot(&self) -> Result<usize> {
        match (self.slot, &self.current) {
            (Some(slot), Some(_)) => Ok(slot),
            _ => Err(SortError::NoCurrentRow),
        }
    }

    fn slot_flag(&self) -> u32 {
        let mut flag = [0u8; SLOT_FLAG_SIZE];
        flag.copy_from_slice(&self.buf[..SLOT_FLAG_SIZE]);
        u32::from_le_bytes(flag)
    }

    fn decode_slot(&self) -> Result<Tuple> {
        let schema = self.schema();
        let mut values = Vec::with_capacity(schema.len());
        for (idx, field) in schema.fields().iter().enumerate() {
            let offset = schema.field_offset(idx);
            let value = match field.field_type {
                FieldType::Int => {
                    let mut raw = [0u8; 4];
                    raw.copy_from_slice(&self.buf[offset..offset + 4]);
                    Value::Int(i32::from_le_bytes(raw))
                }
                FieldType::Varchar(max_len) => {
                    let mut raw = [0u8; 4];
                    raw.copy_from_slice(&self.buf[offset..offset + 4]);
                    let len = u32::from_le_bytes(raw) as usize;
                    if len > max_len {
                        return Err(self.file.corrupted(format!(
                            "field {} length {} exceeds {}",
                            field.name, len, max_len
                        )));
                    }
                    let bytes = &self.buf[offset + 4..offset + 4 + len];
                    let s = std::str::from_utf8(bytes)
                        .map_err(|e| self.file.corrupted(e.to_string()))?;
                    Value::Str(s.to_string())
                }
            };
            values.push(value);
        }
        Ok(Tuple::new(values))
    }

    fn encode_field(field_type: FieldType, value: &Value) -> Vec<u8> {
        let mut out = Vec::with_capacity(field_type.encoded_len());
        match value {
            Value::Int(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Str(s) => {
                out.extend_from_slice(&(s.len() as u32).to_le_bytes());
                out.extend_from_slice(s.as_bytes());
            }
        }
        out.resize(field_type.encoded_len(), 0);
        out
    }

    fn write_slot(&self, slot: usize, tuple: &Tuple) -> Result<()> {
        let schema = self.schema();
        let mut bytes = Vec::with_capacity(schema.slot_size());
        bytes.extend_from_slice(&SLOT_USED.to_le_bytes());
        for (field, value) in schema.fields().iter().zip(tuple.values()) {
            bytes.extend_from_slice(&Self::encode_field(field.field_type, value));
        }
        self.file.write_at(slot, 0, &bytes)
    }
}

impl Cursor for FileCursor {
    fn reset_to_start(&mut self) -> Result<()> {
        self.slot = None;
        self.current = None;
        Ok(())
    }

    fn advance(&mut self) -> Result<bool> {
        let slot_count = self.file.slot_count()?;
        let mut idx = self.slot.map_or(0, |s| s + 1);
        while idx < slot_count {
            self.file.read_slot(idx, &mut self.buf)?;
            if self.slot_flag() == SLOT_USED {
                let tuple = self.decode_slot()?;
                self.slot = Some(idx);
                self.current = Some(tuple);
                return Ok(true);
            }
            idx += 1;
        }
        self.slot = Some(slot_count);
        self.current = None;
        Ok(false)
    }

    fn field(&self, name: &str) -> Result<&Value> {
        let idx = self
            .schema()
            .index_of(name)
            .ok_or_else(|| SortError::field_not_found(name))?;
        let tuple = self.current.as_ref().ok_or(SortError::NoCurrentRow)?;
        tuple
            .get(idx)
            .ok_or_else(|| SortError::field_not_found(name))
    }

    fn has_field(&self, name: &str) -> bool {
        self.schema().has_field(name)
    }
}

impl MutableCursor for FileCursor {
    fn insert_here(&mut self) -> Result<()> {
        let slot_count = self.file.slot_count()?;
        let mut idx = self.slot.map_or(0, |s| s + 1).min(slot_count);
        while idx < slot_count {
            self.file.read_slot(idx, &mut self.buf)?;
            if self.slot_flag() == SLOT_EMPTY {
                break;
            }
            idx += 1;
        }
        let tuple = self.schema().default_tuple();
        self.write_slot(idx, &tuple)?;
        self.slot = Some(idx);
        self.current = Some(tuple);
        Ok(())
    }

    fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
        let slot = self.current_slot()?;
        let schema = Arc::clone(&self.file.schema);
        let idx = schema.check_value(name, &value)?;
        let bytes = Self::encode_field(schema.fields()[idx].field_type, &value);
        self.file.write_at(slot, schema.field_offset(idx), &bytes)?;
        if let Some(current) = self.current.as_mut() {
            current.set(idx, value);
        }
        Ok(())
    }

    fn delete_here(&mut self) -> Result<()> {
        let slot = self.current_slot()?;
        self.file.write_at(slot, 0, &SLOT_EMPTY.to_le_bytes())?;
        self.current = None;
        Ok(())
    }

    fn current_row_id(&self) -> Result<RowId> {
        self.current_slot().map(RowId)
    }

    fn move_to(&mut self, id: RowId) -> Result<()> {
        if id.0 >= self.file.slot_count()? {
            return Err(SortError::RowNotFound(id));
        }
        self.file.read_slot(id.0, &mut self.buf)?;
        if self.slot_flag() != SLOT_USED {
            return Err(SortError::RowNotFound(id));
        }
        let tuple = self.decode_slot()?;
        self.slot = Some(id.0);
        self.current = Some(tuple);
        Ok(())
    }
}

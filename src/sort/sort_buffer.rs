use std::sync::Arc;

use crate::comparator::RecordComparator;
use crate::sort::run::{Run, RunSummary, RunWriter};
use crate::store::RunStore;
use crate::tuple::Tuple;
use crate::{Result, SortError};

/// In-memory buffer for one bounded chunk of tuples.
pub struct SortBuffer {
    tuples: Vec<Tuple>,
    capacity: usize,
}

impl SortBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            tuples: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn has_space(&self) -> bool {
        self.tuples.len() < self.capacity
    }

    /// Returns false, leaving the buffer untouched, when it is full.
    pub fn append(&mut self, tuple: Tuple) -> bool {
        if !self.has_space() {
            return false;
        }
        self.tuples.push(tuple);
        true
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// Sorts the buffered tuples. The sort is stable: tuples with equal keys
    /// keep their arrival order.
    pub fn sort(&mut self, comparator: &RecordComparator) {
        self.tuples.sort_by(|a, b| comparator.compare_tuples(a, b));
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.tuples.iter()
    }

    pub fn reset(&mut self) {
        self.tuples.clear();
    }
}

/// Sorts one bounded chunk into a fresh run.
#[derive(Clone)]
pub struct RunSorter {
    comparator: Arc<RecordComparator>,
}

impl RunSorter {
    pub fn new(comparator: Arc<RecordComparator>) -> Self {
        Self { comparator }
    }

    /// Consumes `chunk` and returns a new run holding the same tuples in
    /// ascending key order. The chunk is destroyed once it has been read.
    pub fn sort<S: RunStore>(&self, chunk: Run<S>) -> Result<Run<S>> {
        let store = Arc::clone(chunk.store());
        let schema = Arc::clone(chunk.schema());
        let txn = chunk.txn();

        let handle = chunk.handle();
        let expected = chunk.total_entries();
        let mut buffer = SortBuffer::new(expected);
        let mut reader = chunk.into_reader()?;
        while reader.advance()? {
            let tuple = Tuple::read_from(reader.cursor()?, &schema)?;
            if !buffer.append(tuple) {
                return Err(SortError::RunCorrupted {
                    handle,
                    reason: format!("chunk holds more than the {expected} rows it reported"),
                });
            }
        }

        buffer.sort(&self.comparator);

        let mut writer = RunWriter::create(&store, &schema, txn)?;
        for tuple in buffer.iter() {
            writer.push(tuple)?;
        }
        Ok(writer.finish())
    }
}

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::trace;

use crate::Result;
use crate::comparator::RecordComparator;
use crate::sort::run::{Run, RunReader, RunSummary, RunWriter};
use crate::store::{RunStore, TxnHandle};
use crate::tuple::SchemaRef;

/// Merges a group of sorted runs into one sorted run.
///
/// The minimum is found by a linear scan over the active readers, comparing
/// the full sort key. Ties go to the reader that comes first in the group,
/// so equal keys keep the group order of the runs they came from.
pub struct KWayMerger<S: RunStore> {
    store: Arc<S>,
    schema: SchemaRef,
    txn: TxnHandle,
    comparator: Arc<RecordComparator>,
}

impl<S: RunStore> KWayMerger<S> {
    pub fn new(
        store: Arc<S>,
        schema: SchemaRef,
        txn: TxnHandle,
        comparator: Arc<RecordComparator>,
    ) -> Self {
        Self {
            store,
            schema,
            txn,
            comparator,
        }
    }

    /// Consumes every run of `group`. Each input run is destroyed as soon as
    /// its reader is exhausted.
    pub fn merge(&self, group: Vec<Run<S>>) -> Result<Run<S>> {
        let input_runs = group.len();
        let mut output = RunWriter::create(&self.store, &self.schema, self.txn)?;

        let mut active: Vec<RunReader<S>> = Vec::with_capacity(group.len());
        for run in group {
            let mut reader = run.into_reader()?;
            if reader.advance()? {
                active.push(reader);
            }
        }

        while !active.is_empty() {
            let winner = self.select_min(&active)?;
            output.copy_from(active[winner].cursor()?)?;
            if !active[winner].advance()? {
                // `remove` rather than `swap_remove`: tie-breaking relies on
                // the readers staying in group order.
                active.remove(winner);
            }
        }

        let merged = output.finish();
        trace!(
            inputs = input_runs,
            handle = %merged.handle(),
            entries = merged.total_entries(),
            "merged run group"
        );
        Ok(merged)
    }

    fn select_min(&self, active: &[RunReader<S>]) -> Result<usize> {
        let mut winner = 0;
        for candidate in 1..active.len() {
            let ord = self
                .comparator
                .compare(active[candidate].cursor()?, active[winner].cursor()?)?;
            if ord == Ordering::Less {
                winner = candidate;
            }
        }
        Ok(winner)
    }
}

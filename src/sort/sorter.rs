use std::sync::Arc;

use tracing::info;

use crate::comparator::{RecordComparator, SortKey};
use crate::config::SortConfig;
use crate::query::{Plan, materialized_blocks};
use crate::sort::merge::KWayMerger;
use crate::sort::output::SortedOutput;
use crate::sort::run_generation::RunGenerator;
use crate::sort::scheduler::{MergeScheduler, NoopObserver, PassObserver, PassStage};
use crate::sort::sort_buffer::RunSorter;
use crate::store::{RunStore, TxnHandle};
use crate::tuple::SchemaRef;
use crate::{Result, SortStats};

/// Sort operator: orders the output of `input` by a sort key.
///
/// Every `open` runs the whole pipeline: the input is split into sorted
/// runs of at most `run_size` tuples, the runs are merged `merge_fanin` at a
/// time until one is left, and that run backs the returned cursor.
pub struct SortPlan<P: Plan, S: RunStore> {
    input: P,
    comparator: Arc<RecordComparator>,
    store: Arc<S>,
    txn: TxnHandle,
    config: SortConfig,
}

impl<P: Plan, S: RunStore> SortPlan<P, S> {
    /// Fails with `FieldNotFound` if a key field is missing from the input
    /// schema and with `InvalidConfig` on a bad configuration.
    pub fn new(
        input: P,
        key: SortKey,
        store: Arc<S>,
        txn: TxnHandle,
        config: SortConfig,
    ) -> Result<Self> {
        config.validate()?;
        let comparator = RecordComparator::new(key, input.schema())?;
        Ok(Self {
            input,
            comparator: Arc::new(comparator),
            store,
            txn,
            config,
        })
    }

    pub fn sort_key(&self) -> &SortKey {
        self.comparator.sort_key()
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    pub fn input(&self) -> &P {
        &self.input
    }

    pub fn open_with_stats(&self) -> Result<(SortedOutput<S>, SortStats)> {
        self.open_observed(&mut NoopObserver)
    }

    /// Like `open_with_stats`, showing the run sequence to `observer` after
    /// run generation and after every merge pass.
    pub fn open_observed(
        &self,
        observer: &mut dyn PassObserver<S>,
    ) -> Result<(SortedOutput<S>, SortStats)> {
        let schema = Arc::clone(self.input.schema());
        info!(
            key = ?self.comparator.sort_key().fields(),
            run_size = self.config.run_size,
            fanin = self.config.merge_fanin,
            threads = self.config.merge_threads,
            "Starting sort"
        );

        let generator = RunGenerator::new(
            Arc::clone(&self.store),
            Arc::clone(&schema),
            self.txn,
            self.config.run_size,
            RunSorter::new(Arc::clone(&self.comparator)),
        );
        let (runs, run_gen_stats) = {
            let mut scan = self.input.open()?;
            generator.generate(&mut scan)?
        };
        observer.observe(PassStage::Initial, &runs)?;

        let merger = KWayMerger::new(
            Arc::clone(&self.store),
            Arc::clone(&schema),
            self.txn,
            Arc::clone(&self.comparator),
        );
        let scheduler =
            MergeScheduler::new(merger, self.config.merge_fanin, self.config.merge_threads)?;
        let (sorted, per_merge_stats) = scheduler.reduce(runs, observer)?;

        let output = SortedOutput::new(schema, sorted)?;
        Ok((output, SortStats::new(run_gen_stats, per_merge_stats)))
    }
}

impl<P: Plan, S: RunStore> Plan for SortPlan<P, S> {
    type Scan = SortedOutput<S>;

    fn open(&self) -> Result<SortedOutput<S>> {
        self.open_with_stats().map(|(output, _)| output)
    }

    fn schema(&self) -> &SchemaRef {
        self.input.schema()
    }

    /// Cost of the materialized output, not of the sort itself.
    fn blocks_accessed(&self) -> usize {
        materialized_blocks(
            self.input.records_output(),
            self.input.schema().slot_size(),
            self.config.block_size,
        )
    }

    fn records_output(&self) -> usize {
        self.input.records_output()
    }

    fn distinct_values(&self, field: &str) -> Result<usize> {
        self.input.distinct_values(field)
    }
}

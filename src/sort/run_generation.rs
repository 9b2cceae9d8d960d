use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::cursor::Cursor;
use crate::sort::run::{Run, RunSummary, RunWriter};
use crate::sort::sort_buffer::RunSorter;
use crate::store::{RunStore, TxnHandle};
use crate::tuple::SchemaRef;
use crate::{Result, RunGenerationStats, RunInfo};

/// Splits raw input into sorted runs of at most `run_size` tuples.
pub struct RunGenerator<S: RunStore> {
    store: Arc<S>,
    schema: SchemaRef,
    txn: TxnHandle,
    run_size: usize,
    sorter: RunSorter,
}

impl<S: RunStore> RunGenerator<S> {
    pub fn new(
        store: Arc<S>,
        schema: SchemaRef,
        txn: TxnHandle,
        run_size: usize,
        sorter: RunSorter,
    ) -> Self {
        Self {
            store,
            schema,
            txn,
            run_size,
            sorter,
        }
    }

    /// Reads `input` once from the start. Every tuple is copied into the
    /// current chunk; a chunk is sorted into a run as soon as it holds
    /// `run_size` tuples, and the last partial chunk when the input ends.
    /// Empty input yields no runs and allocates nothing.
    ///
    /// On failure the runs produced so far are dropped, which destroys them.
    pub fn generate<C: Cursor + ?Sized>(
        &self,
        input: &mut C,
    ) -> Result<(Vec<Run<S>>, RunGenerationStats)> {
        let start = Instant::now();
        let mut runs = Vec::new();
        let mut chunk: Option<RunWriter<S>> = None;

        input.reset_to_start()?;
        while input.advance()? {
            let mut writer = match chunk.take() {
                Some(writer) => writer,
                None => RunWriter::create(&self.store, &self.schema, self.txn)?,
            };
            writer.copy_from(&*input)?;

            if writer.len() >= self.run_size {
                runs.push(self.sort_chunk(writer, runs.len())?);
            } else {
                chunk = Some(writer);
            }
        }
        if let Some(partial) = chunk.take() {
            runs.push(self.sort_chunk(partial, runs.len())?);
        }

        let time_ms = start.elapsed().as_millis();
        let runs_info: Vec<RunInfo> = runs
            .iter()
            .map(|run| RunInfo {
                entries: run.total_entries(),
            })
            .collect();
        let total_entries: usize = runs_info.iter().map(|info| info.entries).sum();
        info!(
            "Generated {} runs ({} tuples) in {} ms",
            runs.len(),
            total_entries,
            time_ms
        );

        let stats = RunGenerationStats {
            num_runs: runs.len(),
            runs_info,
            time_ms,
        };
        Ok((runs, stats))
    }

    fn sort_chunk(&self, chunk: RunWriter<S>, run_idx: usize) -> Result<Run<S>> {
        let run = self.sorter.sort(chunk.finish())?;
        debug!(
            run = run_idx,
            handle = %run.handle(),
            entries = run.total_entries(),
            "sorted chunk into run"
        );
        Ok(run)
    }
}

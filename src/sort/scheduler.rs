use std::thread;
use std::time::Instant;

use tracing::{debug, info};

use crate::sort::merge::KWayMerger;
use crate::sort::run::{Run, RunSummary};
use crate::store::RunStore;
use crate::{MergeStats, Result, SortError};

/// Point of the pipeline at which a `PassObserver` is called.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassStage {
    /// Right after run generation.
    Initial,
    /// After the given (1-based) merge pass.
    MergePass(usize),
}

/// Hook that sees the run sequence between passes.
pub trait PassObserver<S: RunStore> {
    fn observe(&mut self, stage: PassStage, runs: &[Run<S>]) -> Result<()>;
}

pub struct NoopObserver;

impl<S: RunStore> PassObserver<S> for NoopObserver {
    fn observe(&mut self, _stage: PassStage, _runs: &[Run<S>]) -> Result<()> {
        Ok(())
    }
}

/// Splits `runs` left to right into groups of `fanin`; the last group holds
/// whatever remains.
pub fn partition<T>(runs: Vec<T>, fanin: usize) -> Vec<Vec<T>> {
    let mut groups = Vec::with_capacity(runs.len().div_ceil(fanin));
    let mut iter = runs.into_iter().peekable();
    while iter.peek().is_some() {
        groups.push(iter.by_ref().take(fanin).collect());
    }
    groups
}

/// Reduces a run sequence to a single run by repeated fan-in-k passes.
pub struct MergeScheduler<S: RunStore> {
    merger: KWayMerger<S>,
    fanin: usize,
    merge_threads: usize,
}

impl<S: RunStore> MergeScheduler<S> {
    /// Fails with `InvalidConfig` when `fanin` is below 2. A thread count of
    /// zero is treated as one.
    pub fn new(merger: KWayMerger<S>, fanin: usize, merge_threads: usize) -> Result<Self> {
        if fanin < 2 {
            return Err(SortError::InvalidConfig(format!(
                "merge_fanin must be at least 2, got {fanin}"
            )));
        }
        Ok(Self {
            merger,
            fanin,
            merge_threads: merge_threads.max(1),
        })
    }

    /// While more than one run remains, partitions the sequence into groups
    /// of `fanin` and merges every group holding more than one run; a lone
    /// run passes through untouched. Returns `None` for an empty sequence.
    pub fn reduce(
        &self,
        mut runs: Vec<Run<S>>,
        observer: &mut dyn PassObserver<S>,
    ) -> Result<(Option<Run<S>>, Vec<MergeStats>)> {
        let mut per_merge_stats = Vec::new();
        if runs.is_empty() {
            return Ok((None, per_merge_stats));
        }

        let initial_runs = runs.len();
        let mut pass = 0;
        while runs.len() > 1 {
            pass += 1;
            let pass_start = Instant::now();
            let input_runs = runs.len();

            let groups = partition(runs, self.fanin);
            let merges = groups.iter().filter(|g| g.len() > 1).count();
            debug!(
                pass,
                input_runs,
                groups = groups.len(),
                merges,
                "starting merge pass"
            );

            let (merged, per_thread_times_ms) = if self.merge_threads > 1 && merges > 1 {
                self.merge_parallel(groups)?
            } else {
                (self.merge_sequential(groups)?, vec![])
            };
            runs = merged;

            let stats = MergeStats {
                pass,
                input_runs,
                output_runs: runs.len(),
                merges,
                merge_entry_num: runs.iter().map(|r| r.total_entries() as u64).collect(),
                time_ms: pass_start.elapsed().as_millis(),
                per_thread_times_ms,
            };
            info!(
                "Merge pass {} took {} ms | {} runs -> {} runs",
                pass, stats.time_ms, input_runs, stats.output_runs
            );
            per_merge_stats.push(stats);

            observer.observe(PassStage::MergePass(pass), &runs)?;
        }

        debug!(initial_runs, passes = pass, "merge phase finished");
        Ok((runs.pop(), per_merge_stats))
    }

    fn merge_group(&self, mut group: Vec<Run<S>>) -> Result<Run<S>> {
        if group.len() == 1 {
            if let Some(run) = group.pop() {
                return Ok(run);
            }
        }
        self.merger.merge(group)
    }

    fn merge_sequential(&self, groups: Vec<Vec<Run<S>>>) -> Result<Vec<Run<S>>> {
        groups
            .into_iter()
            .map(|group| self.merge_group(group))
            .collect()
    }

    // Groups of one pass share nothing, so they are spread round-robin over
    // scoped workers. The scope joins every worker before the pass ends.
    fn merge_parallel(&self, groups: Vec<Vec<Run<S>>>) -> Result<(Vec<Run<S>>, Vec<u128>)> {
        let num_groups = groups.len();
        let threads = self.merge_threads.min(num_groups);
        let mut buckets: Vec<Vec<(usize, Vec<Run<S>>)>> =
            (0..threads).map(|_| Vec::new()).collect();
        for (idx, group) in groups.into_iter().enumerate() {
            buckets[idx % threads].push((idx, group));
        }

        let joined = thread::scope(|scope| {
            let handles: Vec<_> = buckets
                .into_iter()
                .map(|bucket| {
                    scope.spawn(move || {
                        let start = Instant::now();
                        let merged = bucket
                            .into_iter()
                            .map(|(idx, group)| self.merge_group(group).map(|run| (idx, run)))
                            .collect::<Result<Vec<_>>>()?;
                        Ok::<_, SortError>((merged, start.elapsed().as_millis()))
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .map_err(|_| SortError::WorkerPanicked("Merge".to_string()))
                        .and_then(|result| result)
                })
                .collect::<Vec<_>>()
        });

        let mut slots: Vec<Option<Run<S>>> = (0..num_groups).map(|_| None).collect();
        let mut per_thread_times_ms = Vec::with_capacity(threads);
        let mut first_error = None;
        for result in joined {
            match result {
                Ok((merged, elapsed_ms)) => {
                    per_thread_times_ms.push(elapsed_ms);
                    for (idx, run) in merged {
                        slots[idx] = Some(run);
                    }
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        // Runs merged by the healthy workers are dropped, and destroyed, here.
        if let Some(e) = first_error {
            return Err(e);
        }
        Ok((slots.into_iter().flatten().collect(), per_thread_times_ms))
    }
}

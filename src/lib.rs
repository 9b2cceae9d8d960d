// External merge sort operator for relational tuples

/// Statistics about a sort operation
#[derive(Clone, Debug)]
pub struct SortStats {
    pub run_gen_stats: RunGenerationStats,
    pub per_merge_stats: Vec<MergeStats>,
}

impl SortStats {
    pub fn new(run_gen_stats: RunGenerationStats, per_merge_stats: Vec<MergeStats>) -> Self {
        Self {
            run_gen_stats,
            per_merge_stats,
        }
    }

    pub fn merge_passes(&self) -> usize {
        self.per_merge_stats.len()
    }

    /// Number of KWayMerger invocations over all passes.
    pub fn total_merges(&self) -> usize {
        self.per_merge_stats.iter().map(|m| m.merges).sum()
    }
}

impl std::fmt::Display for SortStats {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "SortStats:")?;
        let rg = &self.run_gen_stats;
        writeln!(f, "  Number of runs: {}", rg.num_runs)?;
        writeln!(f, "  (R) time: {} ms", rg.time_ms)?;
        if !rg.runs_info.is_empty() && rg.runs_info.len() <= 32 {
            let entries: Vec<usize> = rg.runs_info.iter().map(|r| r.entries).collect();
            writeln!(f, "  (R) run sizes: {:?}", entries)?;
        }

        let total_merge_time_ms: u128 = self.per_merge_stats.iter().map(|m| m.time_ms).sum();
        writeln!(f, "  (M) time: {} ms", total_merge_time_ms)?;
        writeln!(f, "  (M) passes: {}", self.merge_passes())?;

        for merge_stat in &self.per_merge_stats {
            writeln!(f, "    Merge pass {}:", merge_stat.pass)?;
            writeln!(f, "      Time: {} ms", merge_stat.time_ms)?;
            writeln!(
                f,
                "      Runs: {} -> {} ({} merges)",
                merge_stat.input_runs, merge_stat.output_runs, merge_stat.merges
            )?;

            if !merge_stat.per_thread_times_ms.is_empty() {
                let min_time = *merge_stat.per_thread_times_ms.iter().min().unwrap_or(&0);
                let max_time = *merge_stat.per_thread_times_ms.iter().max().unwrap_or(&0);
                let avg_time = merge_stat.per_thread_times_ms.iter().sum::<u128>() as f64
                    / merge_stat.per_thread_times_ms.len() as f64;
                writeln!(
                    f,
                    "      Thread time: min={} ms, max={} ms, avg={:.0} ms",
                    min_time, max_time, avg_time
                )?;
            }

            if merge_stat.merge_entry_num.len() > 1 {
                let total: u64 = merge_stat.merge_entry_num.iter().sum();
                let avg = total as f64 / merge_stat.merge_entry_num.len() as f64;
                let max = *merge_stat.merge_entry_num.iter().max().unwrap_or(&0);
                writeln!(f, "      Run size imbalance: {:.2}x", max as f64 / avg)?;
            }
        }

        Ok(())
    }
}

/// Information about a single run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunInfo {
    pub entries: usize,
}

impl std::fmt::Display for RunInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "entries={}", self.entries)
    }
}

/// Statistics from the run generation phase
#[derive(Clone, Debug)]
pub struct RunGenerationStats {
    pub num_runs: usize,
    pub runs_info: Vec<RunInfo>,
    pub time_ms: u128,
}

/// Statistics from one merge pass
#[derive(Clone, Debug)]
pub struct MergeStats {
    /// 1-based pass number.
    pub pass: usize,
    pub input_runs: usize,
    pub output_runs: usize,
    /// Groups that actually went through a merge; lone runs are not counted.
    pub merges: usize,
    /// Entries of every run left after the pass, in sequence order.
    pub merge_entry_num: Vec<u64>,
    pub time_ms: u128,
    pub per_thread_times_ms: Vec<u128>,
}

// Implementations
pub mod comparator;
pub mod config;
pub mod cursor;
pub mod error;
pub mod query;
pub mod sort;
pub mod store;
pub mod tuple;

// Export the main types
pub use comparator::{RecordComparator, SortKey};
pub use config::SortConfig;
pub use cursor::{Cursor, MutableCursor, RowId};
pub use error::{Result, SortError};
pub use query::{Plan, TablePlan};
pub use sort::{PassObserver, PassStage, Run, SortPlan, SortedOutput};
pub use store::{FileRunStore, MemoryRunStore, RunHandle, RunStore, TxnHandle};
pub use tuple::{FieldType, Schema, SchemaRef, Tuple, Value};

/// Default block size in bytes used by the materialized-cost estimate.
pub const DEFAULT_BLOCK_SIZE: usize = 400;

/// Tunables of one sort operator.
///
/// `run_size` is the record budget B: the largest number of tuples a
/// generated run may hold. `merge_fanin` is k, the largest number of runs
/// merged by one merge step. Both are supplied by the caller; the defaults
/// only exist for convenience constructors and the driver binary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortConfig {
    pub run_size: usize,
    pub merge_fanin: usize,
    pub merge_threads: usize,
    pub block_size: usize,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            run_size: 5,
            merge_fanin: 2,
            merge_threads: 1,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl SortConfig {
    pub fn new(run_size: usize, merge_fanin: usize) -> Self {
        Self {
            run_size,
            merge_fanin,
            ..Self::default()
        }
    }

    pub fn with_merge_threads(mut self, merge_threads: usize) -> Self {
        self.merge_threads = merge_threads;
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn validate(&self) -> crate::Result<()> {
        use crate::SortError::InvalidConfig;

        if self.run_size == 0 {
            return Err(InvalidConfig("run_size must be at least 1".to_string()));
        }
        if self.merge_fanin < 2 {
            return Err(InvalidConfig(format!(
                "merge_fanin must be at least 2, got {}",
                self.merge_fanin
            )));
        }
        if self.merge_threads == 0 {
            return Err(InvalidConfig("merge_threads must be at least 1".to_string()));
        }
        if self.block_size == 0 {
            return Err(InvalidConfig("block_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

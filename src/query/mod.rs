//! The plan-shaped contract shared by the sort and its inputs.

pub mod table;

pub use table::{TablePlan, TableScan};

use crate::Result;
use crate::cursor::Cursor;
use crate::tuple::SchemaRef;

/// A node of a physical query plan.
///
/// `open` may be called more than once; each call yields an independent scan
/// positioned before the first row.
pub trait Plan {
    type Scan: Cursor;

    fn open(&self) -> Result<Self::Scan>;

    fn schema(&self) -> &SchemaRef;

    /// Estimated number of block accesses needed to produce the output.
    fn blocks_accessed(&self) -> usize;

    /// Estimated number of output records.
    fn records_output(&self) -> usize;

    /// Estimated number of distinct values of `field` in the output.
    fn distinct_values(&self, field: &str) -> Result<usize>;
}

/// Blocks needed to materialize `records` fixed-size slots.
///
/// A block always holds at least one slot, so an oversized slot costs one
/// block per record.
pub fn materialized_blocks(records: usize, slot_size: usize, block_size: usize) -> usize {
    let per_block = (block_size / slot_size.max(1)).max(1);
    records.div_ceil(per_block)
}

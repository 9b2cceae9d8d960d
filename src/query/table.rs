use std::collections::HashSet;
use std::sync::Arc;

use crate::config::DEFAULT_BLOCK_SIZE;
use crate::cursor::Cursor;
use crate::query::{Plan, materialized_blocks};
use crate::tuple::{SchemaRef, Tuple, Value};
use crate::{Result, SortError};

/// In-memory table used as a plan leaf.
#[derive(Clone)]
pub struct TablePlan {
    schema: SchemaRef,
    rows: Arc<Vec<Tuple>>,
    block_size: usize,
}

impl TablePlan {
    /// Every row is checked against the schema up front.
    pub fn new(schema: SchemaRef, rows: Vec<Tuple>) -> Result<Self> {
        for row in &rows {
            schema.check_tuple(row)?;
        }
        Ok(Self {
            schema,
            rows: Arc::new(rows),
            block_size: DEFAULT_BLOCK_SIZE,
        })
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn rows(&self) -> &[Tuple] {
        &self.rows
    }
}

impl Plan for TablePlan {
    type Scan = TableScan;

    fn open(&self) -> Result<TableScan> {
        Ok(TableScan {
            schema: Arc::clone(&self.schema),
            rows: Arc::clone(&self.rows),
            pos: None,
        })
    }

    fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    fn blocks_accessed(&self) -> usize {
        materialized_blocks(self.rows.len(), self.schema.slot_size(), self.block_size)
    }

    fn records_output(&self) -> usize {
        self.rows.len()
    }

    fn distinct_values(&self, field: &str) -> Result<usize> {
        let idx = self
            .schema
            .index_of(field)
            .ok_or_else(|| SortError::field_not_found(field))?;
        let distinct: HashSet<&Value> = self.rows.iter().filter_map(|row| row.get(idx)).collect();
        Ok(distinct.len())
    }
}

/// Read-only scan over a `TablePlan`.
pub struct TableScan {
    schema: SchemaRef,
    rows: Arc<Vec<Tuple>>,
    pos: Option<usize>,
}

impl TableScan {
    fn current(&self) -> Result<&Tuple> {
        self.pos
            .and_then(|pos| self.rows.get(pos))
            .ok_or(SortError::NoCurrentRow)
    }
}

impl Cursor for TableScan {
    fn reset_to_start(&mut self) -> Result<()> {
        self.pos = None;
        Ok(())
    }

    fn advance(&mut self) -> Result<bool> {
        let next = self.pos.map_or(0, |pos| (pos + 1).min(self.rows.len()));
        self.pos = Some(next);
        Ok(next < self.rows.len())
    }

    fn field(&self, name: &str) -> Result<&Value> {
        let idx = self
            .schema
            .index_of(name)
            .ok_or_else(|| SortError::field_not_found(name))?;
        self.current()?
            .get(idx)
            .ok_or_else(|| SortError::field_not_found(name))
    }

    fn has_field(&self, name: &str) -> bool {
        self.schema.has_field(name)
    }
}

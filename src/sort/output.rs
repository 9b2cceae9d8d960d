use crate::cursor::{Cursor, MutableCursor, RowId};
use crate::sort::run::{Run, RunSummary};
use crate::store::RunStore;
use crate::tuple::{SchemaRef, Tuple, Value};
use crate::{Result, SortError};

/// Read-only cursor over the final sorted run.
///
/// Supports rewinding and row-id bookmarks for consumers such as merge
/// joins. The backing run is released by `close` or when the cursor is
/// dropped.
///
/// Unlike the readers a merge consumes its inputs with, this cursor does
/// not release on exhaustion: after `advance` returns `false` the run stays
/// allocated, and readable through `reset_to_start` or `restore_position`,
/// until `close` or drop.
pub struct SortedOutput<S: RunStore> {
    schema: SchemaRef,
    cursor: Option<S::Cursor>,
    run: Option<Run<S>>,
}

impl<S: RunStore> SortedOutput<S> {
    pub(crate) fn new(schema: SchemaRef, run: Option<Run<S>>) -> Result<Self> {
        let cursor = match &run {
            Some(run) => Some(run.open_cursor()?),
            None => None,
        };
        Ok(Self {
            schema,
            cursor,
            run,
        })
    }

    /// Output of an empty input: no rows, nothing to release.
    pub fn empty(schema: SchemaRef) -> Self {
        Self {
            schema,
            cursor: None,
            run: None,
        }
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Number of tuples in the output.
    pub fn len(&self) -> usize {
        self.run.as_ref().map_or(0, |run| run.total_entries())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.run.is_none()
    }

    /// Bookmarks the current row.
    pub fn save_position(&self) -> Result<RowId> {
        self.cursor
            .as_ref()
            .ok_or(SortError::NoCurrentRow)?
            .current_row_id()
    }

    /// Returns to a row bookmarked by `save_position`.
    pub fn restore_position(&mut self, id: RowId) -> Result<()> {
        self.cursor
            .as_mut()
            .ok_or(SortError::RowNotFound(id))?
            .move_to(id)
    }

    /// Rewinds and reads every row.
    pub fn collect_tuples(&mut self) -> Result<Vec<Tuple>> {
        self.reset_to_start()?;
        let mut rows = Vec::with_capacity(self.len());
        while self.advance()? {
            rows.push(Tuple::read_from(&*self, &self.schema)?);
        }
        Ok(rows)
    }

    /// Releases the backing run. Further reads see an empty sequence.
    pub fn close(&mut self) -> Result<()> {
        self.cursor.take();
        match self.run.take() {
            Some(run) => run.destroy(),
            None => Ok(()),
        }
    }
}

impl<S: RunStore> Cursor for SortedOutput<S> {
    fn reset_to_start(&mut self) -> Result<()> {
        match self.cursor.as_mut() {
            Some(cursor) => cursor.reset_to_start(),
            None => Ok(()),
        }
    }

    fn advance(&mut self) -> Result<bool> {
        match self.cursor.as_mut() {
            Some(cursor) => cursor.advance(),
            None => Ok(false),
        }
    }

    fn field(&self, name: &str) -> Result<&Value> {
        match self.cursor.as_ref() {
            Some(cursor) => cursor.field(name),
            None if self.schema.has_field(name) => Err(SortError::NoCurrentRow),
            None => Err(SortError::field_not_found(name)),
        }
    }

    fn has_field(&self, name: &str) -> bool {
        self.schema.has_field(name)
    }
}

use std::fmt;

use crate::Result;
use crate::tuple::Value;

/// Physical position of a row inside a run or table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowId(pub usize);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row#{}", self.0)
    }
}

/// Sequential, read-only iteration over a tuple sequence.
///
/// A fresh or reset cursor sits before the first row; `advance` moves it onto
/// the next row and returns `false` once the sequence is exhausted. `field`
/// reads from the current row.
pub trait Cursor {
    fn reset_to_start(&mut self) -> Result<()>;

    fn advance(&mut self) -> Result<bool>;

    /// Fails with `FieldNotFound` when the schema has no such field and with
    /// `NoCurrentRow` when the cursor is not positioned on a row.
    fn field(&self, name: &str) -> Result<&Value>;

    fn has_field(&self, name: &str) -> bool;
}

/// Cursor that can also modify the sequence it walks.
pub trait MutableCursor: Cursor {
    /// Inserts a row with default field values and positions the cursor on it.
    fn insert_here(&mut self) -> Result<()>;

    fn set_field(&mut self, name: &str, value: Value) -> Result<()>;

    /// Removes the current row. The cursor keeps its place, so the following
    /// `advance` lands on the next surviving row.
    fn delete_here(&mut self) -> Result<()>;

    fn current_row_id(&self) -> Result<RowId>;

    fn move_to(&mut self, id: RowId) -> Result<()>;
}

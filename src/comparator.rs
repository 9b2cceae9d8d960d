use std::cmp::Ordering;

use crate::cursor::Cursor;
use crate::tuple::{Schema, Tuple};
use crate::{Result, SortError};

/// Ordered, non-empty list of field names defining the sort order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    fields: Vec<String>,
}

impl SortKey {
    pub fn new<I, S>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if fields.is_empty() {
            return Err(SortError::InvalidConfig(
                "sort key must name at least one field".to_string(),
            ));
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

/// Total order over tuples, lexicographic over every field of the sort key.
///
/// Comparisons always walk the whole key; a tie on a leading field falls
/// through to the next one.
#[derive(Clone, Debug)]
pub struct RecordComparator {
    key: SortKey,
    // Schema positions of the key fields, for buffered tuples.
    positions: Vec<usize>,
}

impl RecordComparator {
    pub fn new(key: SortKey, schema: &Schema) -> Result<Self> {
        let positions = key
            .fields()
            .iter()
            .map(|name| {
                schema
                    .index_of(name)
                    .ok_or_else(|| SortError::field_not_found(name.as_str()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { key, positions })
    }

    pub fn sort_key(&self) -> &SortKey {
        &self.key
    }

    /// Compares the current rows of two cursors.
    pub fn compare<A, B>(&self, a: &A, b: &B) -> Result<Ordering>
    where
        A: Cursor + ?Sized,
        B: Cursor + ?Sized,
    {
        for name in self.key.fields() {
            match a.field(name)?.cmp(b.field(name)?) {
                Ordering::Equal => continue,
                other => return Ok(other),
            }
        }
        Ok(Ordering::Equal)
    }

    /// Compares two buffered tuples laid out by the schema this comparator
    /// was built against.
    pub fn compare_tuples(&self, a: &Tuple, b: &Tuple) -> Ordering {
        for &idx in &self.positions {
            match a.get(idx).cmp(&b.get(idx)) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        Ordering::Equal
    }
}

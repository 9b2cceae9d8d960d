use std::fmt;
use std::sync::Arc;

use crate::cursor::{Cursor, MutableCursor};
use crate::{Result, SortError};

/// Size in bytes of the in-use flag that prefixes every stored slot.
pub const SLOT_FLAG_SIZE: usize = std::mem::size_of::<u32>();

/// A single field value.
///
/// Values of the same type are ordered naturally (integers numerically,
/// strings bytewise). Stores reject values that do not match the schema, so
/// the cross-type order (every `Int` before every `Str`) only exists to keep
/// `Ord` total.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    Int(i32),
    Str(String),
}

impl Value {
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Int(_) => None,
            Value::Str(s) => Some(s),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Str(_) => "varchar",
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    Int,
    /// Variable-length string holding at most this many bytes.
    Varchar(usize),
}

impl FieldType {
    /// Bytes the field occupies inside a fixed-size slot.
    pub fn encoded_len(&self) -> usize {
        match self {
            FieldType::Int => std::mem::size_of::<i32>(),
            FieldType::Varchar(max_len) => std::mem::size_of::<u32>() + max_len,
        }
    }

    pub fn default_value(&self) -> Value {
        match self {
            FieldType::Int => Value::Int(0),
            FieldType::Varchar(_) => Value::Str(String::new()),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Int => write!(f, "int"),
            FieldType::Varchar(n) => write!(f, "varchar({n})"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: String,
    pub field_type: FieldType,
}

pub type SchemaRef = Arc<Schema>;

/// Ordered field list shared by every tuple of one sort operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<FieldInfo>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_int(mut self, name: impl Into<String>) -> Self {
        self.add_field(name, FieldType::Int);
        self
    }

    pub fn with_varchar(mut self, name: impl Into<String>, max_len: usize) -> Self {
        self.add_field(name, FieldType::Varchar(max_len));
        self
    }

    pub fn add_field(&mut self, name: impl Into<String>, field_type: FieldType) {
        self.fields.push(FieldInfo {
            name: name.into(),
            field_type,
        });
    }

    pub fn into_ref(self) -> SchemaRef {
        Arc::new(self)
    }

    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.index_of(name).map(|idx| self.fields[idx].field_type)
    }

    /// Bytes of field data in one record, excluding the slot flag.
    pub fn record_len(&self) -> usize {
        self.fields.iter().map(|f| f.field_type.encoded_len()).sum()
    }

    /// Bytes of one stored slot: in-use flag followed by the record.
    pub fn slot_size(&self) -> usize {
        SLOT_FLAG_SIZE + self.record_len()
    }

    /// Offset of field `idx` inside a slot, flag included.
    pub fn field_offset(&self, idx: usize) -> usize {
        SLOT_FLAG_SIZE
            + self.fields[..idx]
                .iter()
                .map(|f| f.field_type.encoded_len())
                .sum::<usize>()
    }

    pub fn default_tuple(&self) -> Tuple {
        Tuple::new(
            self.fields
                .iter()
                .map(|f| f.field_type.default_value())
                .collect(),
        )
    }

    /// Resolves `name` and checks that `value` fits its declared type.
    pub fn check_value(&self, name: &str, value: &Value) -> Result<usize> {
        let idx = self
            .index_of(name)
            .ok_or_else(|| SortError::field_not_found(name))?;
        match (self.fields[idx].field_type, value) {
            (FieldType::Int, Value::Int(_)) => Ok(idx),
            (FieldType::Varchar(max), Value::Str(s)) => {
                if s.len() > max {
                    Err(SortError::ValueTooLong {
                        field: name.to_string(),
                        len: s.len(),
                        max,
                    })
                } else {
                    Ok(idx)
                }
            }
            (expected, actual) => Err(SortError::TypeMismatch {
                field: name.to_string(),
                expected: expected.to_string(),
                actual: actual.type_name().to_string(),
            }),
        }
    }

    pub fn check_tuple(&self, tuple: &Tuple) -> Result<()> {
        if tuple.len() != self.len() {
            return Err(SortError::TypeMismatch {
                field: "<tuple>".to_string(),
                expected: format!("{} fields", self.len()),
                actual: format!("{} fields", tuple.len()),
            });
        }
        for (field, value) in self.fields.iter().zip(tuple.values()) {
            self.check_value(&field.name, value)?;
        }
        Ok(())
    }
}

/// One relation row, values laid out in schema order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tuple {
    values: Vec<Value>,
}

impl Tuple {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    pub fn set(&mut self, idx: usize, value: Value) {
        self.values[idx] = value;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copies every schema field out of the cursor's current row.
    pub fn read_from<C: Cursor + ?Sized>(cursor: &C, schema: &Schema) -> Result<Self> {
        let values = schema
            .fields()
            .iter()
            .map(|f| cursor.field(&f.name).cloned())
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { values })
    }

    /// Inserts this tuple at the cursor's position.
    pub fn insert_into<C: MutableCursor + ?Sized>(
        &self,
        cursor: &mut C,
        schema: &Schema,
    ) -> Result<()> {
        cursor.insert_here()?;
        for (field, value) in schema.fields().iter().zip(&self.values) {
            cursor.set_field(&field.name, value.clone())?;
        }
        Ok(())
    }
}

impl From<Vec<Value>> for Tuple {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, ")")
    }
}

#![allow(dead_code)]

use std::sync::Arc;

use tuplesort::{
    Plan, RunStore, Schema, SchemaRef, SortConfig, SortKey, SortPlan, SortStats, TablePlan, Tuple,
    TxnHandle, Value,
};

pub mod sorter_behavior;

pub fn test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create test directory")
}

/// `k` int key plus a `tag` recording the input position.
pub fn keyed_schema() -> SchemaRef {
    Schema::new()
        .with_int("k")
        .with_varchar("tag", 16)
        .into_ref()
}

pub fn tag(idx: usize) -> String {
    format!("r{:05}", idx)
}

pub fn keyed_table(keys: &[i32]) -> TablePlan {
    let rows = keys
        .iter()
        .enumerate()
        .map(|(idx, &k)| Tuple::new(vec![Value::Int(k), Value::Str(tag(idx))]))
        .collect();
    TablePlan::new(keyed_schema(), rows).expect("rows match schema")
}

/// Sorts `table`, reads the whole output and closes it.
pub fn sort_table<S: RunStore>(
    table: TablePlan,
    key: &[&str],
    store: &Arc<S>,
    config: SortConfig,
) -> (Vec<Tuple>, SortStats) {
    let plan = SortPlan::new(
        table,
        SortKey::new(key.iter().copied()).unwrap(),
        Arc::clone(store),
        TxnHandle::new(1),
        config,
    )
    .unwrap();
    let (mut output, stats) = plan.open_with_stats().unwrap();
    let rows = output.collect_tuples().unwrap();
    output.close().unwrap();
    assert_eq!(plan.records_output(), rows.len());
    (rows, stats)
}

pub fn int_column(rows: &[Tuple], idx: usize) -> Vec<i32> {
    rows.iter()
        .map(|row| row.get(idx).and_then(Value::as_int).expect("int column"))
        .collect()
}

pub fn str_column(rows: &[Tuple], idx: usize) -> Vec<String> {
    rows.iter()
        .map(|row| {
            row.get(idx)
                .and_then(Value::as_str)
                .expect("str column")
                .to_string()
        })
        .collect()
}

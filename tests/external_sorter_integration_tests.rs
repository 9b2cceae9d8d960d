mod common;
use common::sorter_behavior;
use common::{int_column, keyed_table, sort_table, str_column, test_dir};

use std::fs;
use std::sync::Arc;

use rand::Rng;
use tuplesort::{
    Cursor, FileRunStore, Plan, RunStore, Schema, SortConfig, SortKey, SortPlan, TablePlan, Tuple,
    TxnHandle, Value,
};

fn spill_count(store: &FileRunStore) -> usize {
    fs::read_dir(store.dir()).unwrap().count()
}

// Each behaviour gets its own store under a shared temp directory; the
// directory outlives every store created by the factory.
macro_rules! file_store_test {
    ($name:ident, $behaviour:ident) => {
        #[test]
        fn $name() {
            let dir = test_dir();
            let path = dir.path().to_path_buf();
            sorter_behavior::$behaviour(move || Arc::new(FileRunStore::new(&path).unwrap()));
        }
    };
}

file_store_test!(test_basic_functionality, basic_sort);
file_store_test!(test_run_size_and_fanin_grid, run_size_and_fanin_grid);
file_store_test!(test_empty_input, empty_input);
file_store_test!(test_single_element, single_element);
file_store_test!(
    test_exact_run_size_needs_no_merge,
    exact_run_size_needs_no_merge
);
file_store_test!(
    test_already_sorted_is_unchanged,
    already_sorted_is_unchanged
);
file_store_test!(
    test_conserves_shuffled_multiset,
    conserves_shuffled_multiset
);
file_store_test!(
    test_duplicate_keys_keep_input_order,
    duplicate_keys_keep_input_order
);
file_store_test!(test_multi_field_key, multi_field_key);
file_store_test!(test_string_key, string_key);
file_store_test!(test_pass_count_follows_fanin, pass_count_follows_fanin);
file_store_test!(
    test_parallel_merge_matches_sequential,
    parallel_merge_matches_sequential
);
file_store_test!(test_larger_dataset, larger_dataset);
file_store_test!(test_rewind_and_bookmark, rewind_and_bookmark);

#[test]
fn test_real_world_log_sorting() {
    // Log lines sorted by level, then timestamp
    let dir = test_dir();
    let store = Arc::new(FileRunStore::new(dir.path()).unwrap());

    let log_levels = ["DEBUG", "ERROR", "INFO", "WARN"];
    let schema = Schema::new()
        .with_varchar("level", 5)
        .with_varchar("ts", 24)
        .with_int("seq")
        .into_ref();

    let mut rng = rand::rng();
    let rows: Vec<Tuple> = (0..2000)
        .map(|i| {
            let level = log_levels[rng.random_range(0..log_levels.len())];
            let ts = format!(
                "2024-01-15T{:02}:{:02}:{:02}Z",
                (i / 3600) % 24,
                (i / 60) % 60,
                i % 60
            );
            Tuple::new(vec![level.into(), Value::Str(ts), Value::Int(i)])
        })
        .collect();
    let table = TablePlan::new(schema, rows).unwrap();

    let (rows, stats) = sort_table(table, &["level", "ts"], &store, SortConfig::new(100, 4));
    assert_eq!(rows.len(), 2000);
    assert_eq!(stats.run_gen_stats.num_runs, 20);
    for pair in rows.windows(2) {
        let a = (pair[0].get(0), pair[0].get(1));
        let b = (pair[1].get(0), pair[1].get(1));
        assert!(a <= b);
    }
    assert_eq!(spill_count(&store), 0);
}

#[test]
fn test_run_files_removed_after_close() {
    let dir = test_dir();
    let store = Arc::new(FileRunStore::new(dir.path()).unwrap());
    let plan = SortPlan::new(
        keyed_table(&(0..40).rev().collect::<Vec<_>>()),
        SortKey::new(["k"]).unwrap(),
        Arc::clone(&store),
        TxnHandle::new(9),
        SortConfig::new(5, 3),
    )
    .unwrap();

    let mut output = plan.open().unwrap();
    // Only the final run is still on disk.
    assert_eq!(spill_count(&store), 1);
    assert_eq!(store.live_runs(), 1);

    assert!(output.advance().unwrap());
    assert_eq!(output.field("k").unwrap(), &Value::Int(0));
    output.close().unwrap();
    assert_eq!(spill_count(&store), 0);
    assert_eq!(store.live_runs(), 0);
}

#[test]
fn test_spill_directory_removed_on_drop() {
    let dir = test_dir();
    let spill_dir = {
        let store = Arc::new(FileRunStore::new(dir.path()).unwrap());
        let (rows, _) = sort_table(
            keyed_table(&[9, 3, 6, 1]),
            &["k"],
            &store,
            SortConfig::new(2, 2),
        );
        assert_eq!(int_column(&rows, 0), vec![1, 3, 6, 9]);
        assert!(store.dir().exists());
        store.dir().to_path_buf()
    };
    assert!(!spill_dir.exists());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_sorted_output_survives_long_strings() {
    let dir = test_dir();
    let store = Arc::new(FileRunStore::new(dir.path()).unwrap());
    let schema = Schema::new().with_varchar("s", 64).into_ref();
    let words: Vec<String> = (0..30)
        .map(|i| format!("{}{}", "x".repeat(i % 7), (30 - i)))
        .collect();
    let rows = words
        .iter()
        .map(|w| Tuple::new(vec![Value::Str(w.clone())]))
        .collect();
    let table = TablePlan::new(schema, rows).unwrap();
    assert_eq!(table.records_output(), 30);

    let (rows, _) = sort_table(table, &["s"], &store, SortConfig::new(4, 2));
    let mut expected = words;
    expected.sort();
    assert_eq!(str_column(&rows, 0), expected);
}

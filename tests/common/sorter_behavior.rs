#![allow(dead_code)]

use std::sync::Arc;

use rand::seq::SliceRandom;
use tuplesort::{
    Cursor, Plan, RunStore, Schema, SortConfig, SortKey, SortPlan, TablePlan, Tuple, TxnHandle,
    Value,
};

use super::{int_column, keyed_table, sort_table, str_column, tag};

pub fn basic_sort<S, F>(factory: F)
where
    S: RunStore,
    F: FnOnce() -> Arc<S>,
{
    let store = factory();
    let (rows, _) = sort_table(
        keyed_table(&[26, 1, 13]),
        &["k"],
        &store,
        SortConfig::new(2, 2),
    );
    assert_eq!(int_column(&rows, 0), vec![1, 13, 26]);
    assert_eq!(str_column(&rows, 1), vec![tag(1), tag(2), tag(0)]);
    assert_eq!(store.live_runs(), 0);
}

pub fn run_size_and_fanin_grid<S, F>(factory: F)
where
    S: RunStore,
    F: Fn() -> Arc<S>,
{
    let input = [5, 3, 8, 1, 9, 2, 7, 4, 6];
    for run_size in [1, 3, 9] {
        for fanin in [2, 3, 9] {
            let store = factory();
            let (rows, _) = sort_table(
                keyed_table(&input),
                &["k"],
                &store,
                SortConfig::new(run_size, fanin),
            );
            assert_eq!(
                int_column(&rows, 0),
                (1..=9).collect::<Vec<_>>(),
                "run_size={run_size} fanin={fanin}"
            );
            assert_eq!(store.live_runs(), 0);
        }
    }
}

pub fn empty_input<S, F>(factory: F)
where
    S: RunStore,
    F: FnOnce() -> Arc<S>,
{
    let store = factory();
    let (rows, stats) = sort_table(keyed_table(&[]), &["k"], &store, SortConfig::default());
    assert!(rows.is_empty());
    assert_eq!(stats.run_gen_stats.num_runs, 0);
    assert_eq!(stats.merge_passes(), 0);
    assert_eq!(store.runs_created(), 0);
}

pub fn single_element<S, F>(factory: F)
where
    S: RunStore,
    F: FnOnce() -> Arc<S>,
{
    let store = factory();
    let (rows, stats) = sort_table(keyed_table(&[42]), &["k"], &store, SortConfig::new(3, 2));
    assert_eq!(
        rows,
        vec![Tuple::new(vec![Value::Int(42), Value::Str(tag(0))])]
    );
    assert_eq!(stats.merge_passes(), 0);
}

pub fn exact_run_size_needs_no_merge<S, F>(factory: F)
where
    S: RunStore,
    F: FnOnce() -> Arc<S>,
{
    let store = factory();
    let (rows, stats) = sort_table(
        keyed_table(&[4, 2, 3, 1, 5]),
        &["k"],
        &store,
        SortConfig::new(5, 2),
    );
    assert_eq!(int_column(&rows, 0), vec![1, 2, 3, 4, 5]);
    assert_eq!(stats.run_gen_stats.num_runs, 1);
    assert_eq!(stats.merge_passes(), 0);
}

pub fn already_sorted_is_unchanged<S, F>(factory: F)
where
    S: RunStore,
    F: FnOnce() -> Arc<S>,
{
    let store = factory();
    let table = keyed_table(&(0..50).collect::<Vec<_>>());
    let expected = table.rows().to_vec();
    let (rows, _) = sort_table(table, &["k"], &store, SortConfig::new(4, 3));
    assert_eq!(rows, expected);
}

pub fn conserves_shuffled_multiset<S, F>(factory: F)
where
    S: RunStore,
    F: FnOnce() -> Arc<S>,
{
    let store = factory();
    let mut keys: Vec<i32> = (0..300).map(|i| i % 37).collect();
    keys.shuffle(&mut rand::rng());
    let table = keyed_table(&keys);
    let mut expected = table.rows().to_vec();

    let (rows, _) = sort_table(table, &["k"], &store, SortConfig::new(7, 3));
    for pair in rows.windows(2) {
        assert!(pair[0].get(0) <= pair[1].get(0));
    }
    let mut actual = rows.clone();
    expected.sort_by(|a, b| a.values().cmp(b.values()));
    actual.sort_by(|a, b| a.values().cmp(b.values()));
    assert_eq!(actual, expected);
}

pub fn duplicate_keys_keep_input_order<S, F>(factory: F)
where
    S: RunStore,
    F: FnOnce() -> Arc<S>,
{
    let store = factory();
    let keys: Vec<i32> = (0..60).map(|i| (i * 7) % 4).collect();
    let (rows, _) = sort_table(keyed_table(&keys), &["k"], &store, SortConfig::new(5, 3));

    let ks = int_column(&rows, 0);
    let tags = str_column(&rows, 1);
    for i in 1..rows.len() {
        if ks[i - 1] == ks[i] {
            assert!(tags[i - 1] < tags[i], "{} before {}", tags[i - 1], tags[i]);
        }
    }
    for k in 0..4 {
        assert_eq!(ks.iter().filter(|&&x| x == k).count(), 15);
    }
}

pub fn multi_field_key<S, F>(factory: F)
where
    S: RunStore,
    F: FnOnce() -> Arc<S>,
{
    let store = factory();
    let schema = Schema::new()
        .with_int("dept")
        .with_varchar("name", 8)
        .with_int("id")
        .into_ref();
    let data = [
        (2, "bob", 1),
        (1, "zed", 2),
        (2, "amy", 3),
        (1, "amy", 4),
        (3, "cal", 5),
        (1, "kim", 6),
        (2, "amy", 7),
    ];
    let rows = data
        .iter()
        .map(|&(dept, name, id)| Tuple::new(vec![Value::Int(dept), name.into(), Value::Int(id)]))
        .collect();
    let table = TablePlan::new(schema, rows).unwrap();

    let (rows, _) = sort_table(table, &["dept", "name"], &store, SortConfig::new(2, 2));
    assert_eq!(int_column(&rows, 2), vec![4, 6, 2, 3, 7, 1, 5]);
}

pub fn string_key<S, F>(factory: F)
where
    S: RunStore,
    F: FnOnce() -> Arc<S>,
{
    let store = factory();
    let words = ["pear", "Apple", "apple", "123", "zebra", "école", "fig"];
    let keys: Vec<i32> = (0..words.len() as i32).collect();
    let schema = Schema::new()
        .with_int("k")
        .with_varchar("word", 8)
        .into_ref();
    let rows = keys
        .iter()
        .zip(words)
        .map(|(&k, w)| Tuple::new(vec![Value::Int(k), w.into()]))
        .collect();
    let table = TablePlan::new(schema, rows).unwrap();

    let (rows, _) = sort_table(table, &["word"], &store, SortConfig::new(2, 3));
    let mut expected: Vec<String> = words.iter().map(|w| w.to_string()).collect();
    expected.sort();
    assert_eq!(str_column(&rows, 1), expected);
}

pub fn fanin_covering_all_runs_merges_once<S, F>(factory: F)
where
    S: RunStore,
    F: FnOnce() -> Arc<S>,
{
    let store = factory();
    let keys: Vec<i32> = (0..20).rev().collect();
    let (rows, stats) = sort_table(keyed_table(&keys), &["k"], &store, SortConfig::new(4, 5));
    assert_eq!(int_column(&rows, 0), (0..20).collect::<Vec<_>>());
    assert_eq!(stats.run_gen_stats.num_runs, 5);
    assert_eq!(stats.merge_passes(), 1);
    assert_eq!(stats.total_merges(), 1);
}

pub fn pass_count_follows_fanin<S, F>(factory: F)
where
    S: RunStore,
    F: Fn() -> Arc<S>,
{
    // 10 runs: 10 -> 5 -> 3 -> 2 -> 1 with k = 2, 10 -> 4 -> 2 -> 1 with k = 3
    for (fanin, passes) in [(2, 4), (3, 3), (10, 1)] {
        let store = factory();
        let keys: Vec<i32> = (0..100).map(|i| (i * 37) % 100).collect();
        let (rows, stats) = sort_table(
            keyed_table(&keys),
            &["k"],
            &store,
            SortConfig::new(10, fanin),
        );
        assert_eq!(int_column(&rows, 0), (0..100).collect::<Vec<_>>());
        assert_eq!(stats.merge_passes(), passes, "fanin={fanin}");
        assert_eq!(stats.per_merge_stats.last().map(|m| m.output_runs), Some(1));
    }
}

pub fn parallel_merge_matches_sequential<S, F>(factory: F)
where
    S: RunStore,
    F: Fn() -> Arc<S>,
{
    let keys: Vec<i32> = (0..2000).map(|i| (i * 7919) % 500).collect();
    let sequential_store = factory();
    let (sequential, _) = sort_table(
        keyed_table(&keys),
        &["k"],
        &sequential_store,
        SortConfig::new(16, 2),
    );
    let parallel_store = factory();
    let (parallel, stats) = sort_table(
        keyed_table(&keys),
        &["k"],
        &parallel_store,
        SortConfig::new(16, 2).with_merge_threads(4),
    );
    assert_eq!(parallel, sequential);
    assert!(!stats.per_merge_stats[0].per_thread_times_ms.is_empty());
    assert_eq!(parallel_store.live_runs(), 0);
}

pub fn larger_dataset<S, F>(factory: F)
where
    S: RunStore,
    F: FnOnce() -> Arc<S>,
{
    let store = factory();
    let keys: Vec<i32> = (0..5000).map(|i| (i * 7919) % 5000).collect();
    let (rows, stats) = sort_table(keyed_table(&keys), &["k"], &store, SortConfig::new(64, 4));
    assert_eq!(int_column(&rows, 0), (0..5000).collect::<Vec<_>>());
    assert_eq!(stats.run_gen_stats.num_runs, 79);
    let runs_info = &stats.run_gen_stats.runs_info;
    assert!(runs_info.iter().all(|r| r.entries <= 64));
    assert_eq!(store.live_runs(), 0);
}

pub fn rewind_and_bookmark<S, F>(factory: F)
where
    S: RunStore,
    F: FnOnce() -> Arc<S>,
{
    let store = factory();
    let plan = SortPlan::new(
        keyed_table(&[30, 10, 20, 50, 40]),
        SortKey::new(["k"]).unwrap(),
        Arc::clone(&store),
        TxnHandle::new(3),
        SortConfig::new(2, 2),
    )
    .unwrap();
    let mut output = plan.open().unwrap();

    let mut mark = None;
    let mut first_pass = Vec::new();
    while output.advance().unwrap() {
        let k = output.field("k").unwrap().as_int().unwrap();
        if k == 30 {
            mark = Some(output.save_position().unwrap());
        }
        first_pass.push(k);
    }
    assert_eq!(first_pass, vec![10, 20, 30, 40, 50]);
    // The output stays readable after exhaustion until it is closed.
    assert_eq!(store.live_runs(), 1);

    output.restore_position(mark.unwrap()).unwrap();
    assert_eq!(output.field("k").unwrap(), &Value::Int(30));
    assert!(output.advance().unwrap());
    assert_eq!(output.field("k").unwrap(), &Value::Int(40));

    output.reset_to_start().unwrap();
    assert!(output.advance().unwrap());
    assert_eq!(output.field("k").unwrap(), &Value::Int(10));
    assert!(output.field("nope").is_err());

    drop(output);
    assert_eq!(store.live_runs(), 0);
}

pub fn reopen_sorts_again<S, F>(factory: F)
where
    S: RunStore,
    F: FnOnce() -> Arc<S>,
{
    let store = factory();
    let plan = SortPlan::new(
        keyed_table(&[3, 1, 2]),
        SortKey::new(["k"]).unwrap(),
        Arc::clone(&store),
        TxnHandle::default(),
        SortConfig::new(1, 2),
    )
    .unwrap();
    for _ in 0..2 {
        let mut output = plan.open().unwrap();
        let rows = output.collect_tuples().unwrap();
        assert_eq!(int_column(&rows, 0), vec![1, 2, 3]);
    }
    assert_eq!(store.live_runs(), 0);
}

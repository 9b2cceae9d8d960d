use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;

use tuplesort::{
    Cursor, FileRunStore, MemoryRunStore, PassObserver, PassStage, Plan, Result, Run, RunStore,
    Schema, SortConfig, SortKey, SortPlan, TablePlan, Tuple, TxnHandle, Value,
};

const COL2_LEN: usize = 64;

#[derive(Parser, Debug)]
#[command(
    name = "merge_driver",
    version,
    about = "Sorts a demo table and shows the runs after every merge pass"
)]
struct Args {
    /// Comma separated sort key, e.g. "col1" or "col2,col1"
    #[arg(long, default_value = "col1")]
    keys: String,
    /// Largest number of tuples in a generated run
    #[arg(long = "run-size", default_value_t = 5)]
    run_size: usize,
    /// Largest number of runs merged at once
    #[arg(long, default_value_t = 2)]
    fanin: usize,
    /// Worker threads per merge pass
    #[arg(long, default_value_t = 1)]
    threads: usize,
    /// Number of row pairs in the demo table
    #[arg(long, default_value_t = 40)]
    pairs: i32,
    /// Spill runs to files under this directory instead of memory
    #[arg(long = "spill-dir")]
    spill_dir: Option<PathBuf>,
    /// Skip the per-pass run dump
    #[arg(long)]
    quiet: bool,
}

fn parse_keys(s: &str) -> Result<SortKey> {
    SortKey::new(s.split(',').map(str::trim).filter(|t| !t.is_empty()))
}

// Two interleaved sequences, one descending from 180 and one ascending
// from 101, so the generated runs overlap.
fn demo_table(pairs: i32) -> Result<TablePlan> {
    let schema = Schema::new()
        .with_int("col1")
        .with_varchar("col2", COL2_LEN)
        .into_ref();
    let pad = |n: i32| format!("{:0>width$}", n, width = COL2_LEN);
    let mut rows = Vec::with_capacity(pairs.max(0) as usize * 2);
    for i in 0..pairs {
        let high = 180 - i;
        let low = 101 + i;
        rows.push(Tuple::new(vec![Value::Int(high), Value::Str(pad(high))]));
        rows.push(Tuple::new(vec![Value::Int(low), Value::Str(pad(low))]));
    }
    TablePlan::new(schema, rows)
}

/// Prints the leading key of every row of every run.
struct RunPrinter {
    key: String,
}

impl<S: RunStore> PassObserver<S> for RunPrinter {
    fn observe(&mut self, stage: PassStage, runs: &[Run<S>]) -> Result<()> {
        match stage {
            PassStage::Initial => println!("== after run generation: {} runs", runs.len()),
            PassStage::MergePass(pass) => {
                println!("== after merge pass {}: {} runs", pass, runs.len())
            }
        }
        let idx = runs
            .first()
            .and_then(|run| run.schema().index_of(&self.key));
        for run in runs {
            let keys: Vec<String> = run
                .read_all()?
                .iter()
                .map(|row| {
                    idx.and_then(|i| row.get(i))
                        .map(Value::to_string)
                        .unwrap_or_default()
                })
                .collect();
            println!("  {}: [{}]", run.handle(), keys.join(", "));
        }
        Ok(())
    }
}

fn sort_with<S: RunStore>(args: &Args, table: TablePlan, store: Arc<S>) -> Result<()> {
    let key = parse_keys(&args.keys)?;
    let leading = key.fields()[0].clone();
    let config = SortConfig::new(args.run_size, args.fanin).with_merge_threads(args.threads);
    let plan = SortPlan::new(table, key, Arc::clone(&store), TxnHandle::new(1), config)?;

    println!(
        "Sorting {} rows ({} blocks) by {:?}",
        plan.records_output(),
        plan.blocks_accessed(),
        plan.sort_key().fields()
    );

    let (mut output, stats) = if args.quiet {
        plan.open_with_stats()?
    } else {
        plan.open_observed(&mut RunPrinter { key: leading })?
    };

    println!("== sorted output");
    let schema = Arc::clone(output.schema());
    while output.advance()? {
        let values: Vec<String> = schema
            .fields()
            .iter()
            .map(|f| output.field(&f.name).map(Value::to_string))
            .collect::<Result<_>>()?;
        println!("  {}", values.join(" | "));
    }
    output.close()?;

    println!("{}", stats);
    println!(
        "Runs created: {}, still live: {}",
        store.runs_created(),
        store.live_runs()
    );
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let table = demo_table(args.pairs)?;
    match &args.spill_dir {
        Some(dir) => {
            let store = Arc::new(FileRunStore::new(dir)?);
            sort_with(&args, table, store)
        }
        None => sort_with(&args, table, Arc::new(MemoryRunStore::new())),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(err) = run(Args::parse()) {
        eprintln!("merge_driver: {err}");
        process::exit(1);
    }
}

pub mod merge;
pub mod output;
pub mod run;
pub mod run_generation;
pub mod scheduler;
pub mod sort_buffer;
pub mod sorter;

pub use self::merge::KWayMerger;
pub use self::output::SortedOutput;
pub use self::run::{Run, RunReader, RunSummary, RunWriter};
pub use self::run_generation::RunGenerator;
pub use self::scheduler::{MergeScheduler, NoopObserver, PassObserver, PassStage};
pub use self::sort_buffer::{RunSorter, SortBuffer};
pub use self::sorter::SortPlan;

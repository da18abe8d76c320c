//! Dataset profiling and correlation checks
//!
//! Everything here reads the raw feature/target split and never fails the pipeline
//! for data-quality reasons; only an unusable target is an error.

mod leakage;
mod profiler;
pub mod stats;
mod task_type;

pub use leakage::{CollinearityFinding, CorrelationMethod, LeakageDetector, LeakageFinding};
pub use profiler::{ColumnProfile, DatasetProfiler, Profile};
pub use task_type::{TaskType, TaskTypeClassifier};

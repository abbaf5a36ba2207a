//! A parallel Fibonacci fan-out/fan-in pipeline.
//!
//! The pipeline runs in two phases, each on its own kind of worker pool:
//! - the **fan-out** phase computes the Fibonacci number of every requested ordinal on a [`ComputePool`](fanout::ComputePool)
//!   of OS threads, as computing large ordinals is CPU-bound, and persists each value as an artifact;
//! - the **fan-in** phase reads every artifact back on an [`IoPool`](task::IoPool) of lightweight asynchronous workers,
//!   as reading many small files is I/O-bound, and writes all `(ordinal, value)` rows to a single CSV table.
//!
//! Both phases block the caller until the whole batch is done, and both are all-or-nothing: the first failure aborts
//! the phase, no partial table is ever written.
//!
//! As a **strong hypothesis**, work keys are made **unique** within a batch: duplicates just overwrite the same artifact
//! and end up as a single row.
//!
//! Artifacts are stored flat in a single directory, next to the default location of the result table:
//!
//! ```text
//!     - artifact dir
//!       L {ordinal}.txt          decimal value
//!       L {ordinal}.{random}.tmp artifact being written
//!       L result.csv             `{ordinal},{value}` lines in ascending ordinal order
//! ```
//!
//! ```no_run
//! use fibfan::pipeline::{BatchSpec, Pipeline, PipelineConfig};
//!
//! let pipeline = Pipeline::new(PipelineConfig {
//!     batch: BatchSpec::Keys(vec![1, 2, 3, 10, 50]),
//!     ..PipelineConfig::default()
//! });
//!
//! let report = pipeline.run()?;
//! println!("{} rows", report.rows);
//! # Ok::<_, fibfan::pipeline::PipelineError>(())
//! ```

mod data;
pub use data::*;

mod error;
pub use error::*;

pub mod app;
pub mod config;
pub mod fanin;
pub mod fanout;
pub mod pipeline;
pub mod sequence;
pub mod table;
pub mod task;

pub use fanin::run_fanin;
pub use fanout::run_fanout;
pub use sequence::fibonacci;
pub use table::write_table;

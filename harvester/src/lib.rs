//! Downloads subreddit text into the `category/subcategory/subreddit` tree
//! with one authenticated worker per credential pair.

pub mod pool;
pub mod render;
pub mod shard;
pub mod worker;

pub use pool::run_pool;
pub use render::{render_submission, to_ascii_lossy};
pub use shard::partition_interleaved;
pub use worker::{AuthOutcome, HarvestOptions, ShardWorker, WorkerReport};

//! Job queue client (§4.8, §6): a Redis Streams consumer group providing the
//! "find-one-and-set-status" atomic claim the Job Runner polls.

pub mod error;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use queue::{ClaimedJob, JobQueue, QueueConfig};

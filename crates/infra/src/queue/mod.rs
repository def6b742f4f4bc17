//! Background recompilation of availability expressions

pub mod compile_queue;
pub mod error;

pub use compile_queue::{CompilationQueue, CompilationQueueConfig, QueueStats, RecompileJob};
pub use error::{QueueError, QueueResult};

//! netdeck store
//!
//! Durable key-value persistence for stacks, service instances and the
//! task-id history of each instance.

pub mod backend;
pub mod error;
pub mod file;
pub mod maintenance;
pub mod memory;
pub mod records;

pub use backend::KvStore;
pub use error::{Result, StoreError};
pub use file::FileStore;
pub use maintenance::{PurgeReport, clear_instances, purge_corrupt_instances};
pub use memory::MemoryStore;
pub use records::{Records, TaskKind, TaskRecord};

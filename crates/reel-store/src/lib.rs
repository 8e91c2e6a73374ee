//! Persistent job records.
//!
//! The pipeline reads and writes [`Job`](reel_models::Job) records through
//! the [`JobRepository`] trait. Two backends are provided: Redis for
//! deployments and an in-memory map for tests and single-process runs.

pub mod error;
pub mod memory;
pub mod redis_store;
pub mod repository;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryJobRepository;
pub use redis_store::{RedisJobRepository, StoreConfig};
pub use repository::JobRepository;

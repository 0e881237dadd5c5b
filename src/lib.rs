// todostore - Local task and category store with write-through key-value persistence

pub mod clock;
pub mod config;
pub mod kv;
pub mod models;
pub mod record;
pub mod store;
pub mod view;

// Re-export main types for convenience
pub use config::{Backend, Config};
pub use kv::{FileKv, KvStore, MemoryKv, SqliteKv, Substrate};
pub use models::{Category, NewCategory, NewTask, Priority, Task, TaskPatch, default_categories};
pub use record::Record;
pub use store::TaskStore;
pub use view::{CategoryFilter, Stats};

mod init;
pub mod kv;
pub mod lock;

pub use init::{init_db, migrate};
pub use kv::{get_json, keys, set_json, Area, KvStore, MemoryKvStore, SqliteKvStore};
pub use lock::{StorageLock, StorageLockGuard};

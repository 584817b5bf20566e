use anyhow::Result;
use std::sync::Arc;

use crate::clock::SystemClock;
use crate::config::Config;
use crate::db::{self, SqliteKvStore, StorageLock};
use crate::links::LinkStore;
use crate::meeting::{SessionStore, StoreLimits};
use crate::transcript::TranscriptStore;

pub mod args;
pub mod discover;
pub mod links;
pub mod meetings;

pub use args::{Cli, CliCommand};
pub use discover::handle_discover_command;
pub use links::handle_links_command;
pub use meetings::{handle_export_command, handle_meetings_command};

/// Stores over the on-disk database, for one-shot commands.
pub(crate) struct Stores {
    pub sessions: SessionStore,
    pub transcripts: TranscriptStore,
    pub links: LinkStore,
}

impl Stores {
    pub fn open(config: &Config) -> Result<Self> {
        let conn = db::init_db(&config.db_path()?)?;
        let kv = Arc::new(SqliteKvStore::new(conn));
        let lock = Arc::new(StorageLock::new(config.storage.lock_retry()));

        Ok(Self {
            sessions: SessionStore::new(
                kv.clone(),
                lock.clone(),
                StoreLimits {
                    max_meetings: config.tracker.max_meetings,
                    max_history: config.tracker.max_history,
                },
            ),
            transcripts: TranscriptStore::new(
                kv.clone(),
                lock.clone(),
                Arc::new(SystemClock),
                config.tracker.max_meetings,
            ),
            links: LinkStore::new(kv, lock),
        })
    }
}

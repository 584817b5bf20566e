//! Saved meeting links, kept in the order the user added them.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::db::{get_json, keys, set_json, Area, KvStore, StorageLock};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedLink {
    pub name: String,
    pub url: String,
}

impl SavedLink {
    /// Trims both fields; a link needs a name and a URL.
    pub fn new(name: &str, url: &str) -> Result<Self> {
        let (name, url) = (name.trim(), url.trim());
        if name.is_empty() || url.is_empty() {
            bail!("A saved link needs both a name and a URL");
        }
        Ok(Self {
            name: name.to_string(),
            url: url.to_string(),
        })
    }

    fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.url.is_empty()
    }
}

#[derive(Clone)]
pub struct LinkStore {
    kv: Arc<dyn KvStore>,
    lock: Arc<StorageLock>,
}

impl LinkStore {
    pub fn new(kv: Arc<dyn KvStore>, lock: Arc<StorageLock>) -> Self {
        Self { kv, lock }
    }

    /// Stored links, skipping incomplete entries left by older writers.
    pub async fn list(&self) -> Result<Vec<SavedLink>> {
        let links: Vec<Option<SavedLink>> = get_json(self.kv.as_ref(), Area::Sync, keys::LINKS)
            .await?
            .unwrap_or_default();
        Ok(links
            .into_iter()
            .flatten()
            .filter(SavedLink::is_complete)
            .collect())
    }

    pub async fn add(&self, link: SavedLink) -> Result<usize> {
        self.modify(|links| {
            links.push(link);
            Ok(links.len() - 1)
        })
        .await
    }

    pub async fn update(&self, index: usize, link: SavedLink) -> Result<()> {
        self.modify(|links| match links.get_mut(index) {
            Some(slot) => {
                *slot = link;
                Ok(())
            }
            None => bail!("No saved link at position {}", index),
        })
        .await
    }

    pub async fn remove(&self, index: usize) -> Result<SavedLink> {
        self.modify(|links| {
            if index >= links.len() {
                bail!("No saved link at position {}", index);
            }
            Ok(links.remove(index))
        })
        .await
    }

    async fn modify<T>(&self, change: impl FnOnce(&mut Vec<SavedLink>) -> Result<T>) -> Result<T> {
        let _guard = self.lock.acquire().await;

        let mut links = self.list().await?;
        let result = change(&mut links)?;
        set_json(self.kv.as_ref(), Area::Sync, keys::LINKS, &links).await?;

        info!("Saved links updated ({} total)", links.len());
        Ok(result)
    }
}

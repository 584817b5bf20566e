//! In-process model of the browser's tabs.
//!
//! The service cannot reach into pages, so each tab has an outbox that the
//! page drains over HTTP.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use super::message::Message;
use super::{TabHost, TabInfo};
use crate::meeting::TabId;

#[derive(Default)]
struct HostState {
    tabs: BTreeMap<TabId, String>,
    active: Option<TabId>,
    outbox: HashMap<TabId, VecDeque<Message>>,
}

#[derive(Clone, Default)]
pub struct BrowserHost {
    state: Arc<Mutex<HostState>>,
}

impl BrowserHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Records the tab's new URL. A tab seen for the first time becomes active
    /// when no other tab is.
    pub fn navigated(&self, tab_id: TabId, url: &str) {
        let mut state = self.state();
        state.tabs.insert(tab_id, url.to_string());
        if state.active.is_none() {
            state.active = Some(tab_id);
        }
    }

    pub fn activate(&self, tab_id: TabId) -> bool {
        let mut state = self.state();
        if !state.tabs.contains_key(&tab_id) {
            return false;
        }
        state.active = Some(tab_id);
        true
    }

    pub fn remove(&self, tab_id: TabId) {
        let mut state = self.state();
        state.tabs.remove(&tab_id);
        state.outbox.remove(&tab_id);
        if state.active == Some(tab_id) {
            state.active = None;
        }
    }

    pub fn url(&self, tab_id: TabId) -> Option<String> {
        self.state().tabs.get(&tab_id).cloned()
    }

    /// Queues a message for an open tab. Returns false when the tab is gone.
    pub fn enqueue(&self, tab_id: TabId, message: Message) -> bool {
        let mut state = self.state();
        if !state.tabs.contains_key(&tab_id) {
            return false;
        }
        debug!("Queued {} for tab {}", message.kind(), tab_id);
        state.outbox.entry(tab_id).or_default().push_back(message);
        true
    }

    pub fn drain(&self, tab_id: TabId) -> Vec<Message> {
        self.state()
            .outbox
            .get_mut(&tab_id)
            .map(|queue| queue.drain(..).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TabHost for BrowserHost {
    async fn active_tab(&self) -> Option<TabId> {
        self.state().active
    }

    async fn tabs(&self) -> Vec<TabInfo> {
        self.state()
            .tabs
            .iter()
            .map(|(id, url)| TabInfo {
                id: *id,
                url: url.clone(),
            })
            .collect()
    }

    async fn send(&self, tab_id: TabId, message: Message) -> Result<()> {
        if !self.enqueue(tab_id, message) {
            bail!("No tab with id {}", tab_id);
        }
        Ok(())
    }
}

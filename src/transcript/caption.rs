//! Caption snapshots and the sources that produce them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::meeting::TabId;

/// One speaker block as rendered in the caption area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionBlock {
    /// Stable for one speaking turn; changes when the block is recycled.
    pub unique_tag: String,
    pub speaker_name: String,
    pub utterance_lines: Vec<String>,
}

/// Caption blocks visible at one instant, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptionSnapshot {
    pub blocks: Vec<CaptionBlock>,
}

impl CaptionSnapshot {
    pub fn new(blocks: Vec<CaptionBlock>) -> Self {
        Self { blocks }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Reads the caption area. `None` means the caption container is not rendered
/// yet, which is not an error.
pub trait CaptionSource: Send {
    fn caption_snapshot(&mut self) -> Option<CaptionSnapshot>;
}

/// Latest caption snapshot reported by each tab.
#[derive(Clone, Default)]
pub struct SnapshotMailbox {
    latest: Arc<Mutex<HashMap<TabId, CaptionSnapshot>>>,
}

impl SnapshotMailbox {
    pub fn publish(&self, tab_id: TabId, snapshot: CaptionSnapshot) {
        if let Ok(mut latest) = self.latest.lock() {
            latest.insert(tab_id, snapshot);
        }
    }

    pub fn latest(&self, tab_id: TabId) -> Option<CaptionSnapshot> {
        self.latest
            .lock()
            .ok()
            .and_then(|latest| latest.get(&tab_id).cloned())
    }

    pub fn forget(&self, tab_id: TabId) {
        if let Ok(mut latest) = self.latest.lock() {
            latest.remove(&tab_id);
        }
    }

    pub fn source_for(&self, tab_id: TabId) -> MailboxSource {
        MailboxSource {
            mailbox: self.clone(),
            tab_id,
        }
    }
}

/// Caption source backed by the snapshots a tab pushes into the mailbox.
pub struct MailboxSource {
    mailbox: SnapshotMailbox,
    tab_id: TabId,
}

impl CaptionSource for MailboxSource {
    fn caption_snapshot(&mut self) -> Option<CaptionSnapshot> {
        self.mailbox.latest(self.tab_id)
    }
}

/// Replays a fixed sequence of snapshots, then reports the container as gone.
pub struct ScriptedSource {
    frames: std::collections::VecDeque<Option<CaptionSnapshot>>,
}

impl ScriptedSource {
    pub fn new(frames: impl IntoIterator<Item = Option<CaptionSnapshot>>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

impl CaptionSource for ScriptedSource {
    fn caption_snapshot(&mut self) -> Option<CaptionSnapshot> {
        self.frames.pop_front().flatten()
    }
}

//! A meeting page living in a browser tab.
//!
//! The page reports its phase indicators over HTTP and drains queued actions
//! from its outbox.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{MeetingPage, PageAction, PhaseIndicators};
use crate::meeting::TabId;
use crate::relay::{BrowserHost, Message};

/// Last phase indicators reported by each tab.
#[derive(Clone, Default)]
pub struct PhaseBoard {
    phases: Arc<Mutex<HashMap<TabId, PhaseIndicators>>>,
}

impl PhaseBoard {
    pub fn report(&self, tab_id: TabId, phase: PhaseIndicators) {
        if let Ok(mut phases) = self.phases.lock() {
            phases.insert(tab_id, phase);
        }
    }

    pub fn get(&self, tab_id: TabId) -> PhaseIndicators {
        self.phases
            .lock()
            .ok()
            .and_then(|phases| phases.get(&tab_id).copied())
            .unwrap_or_default()
    }

    pub fn forget(&self, tab_id: TabId) {
        if let Ok(mut phases) = self.phases.lock() {
            phases.remove(&tab_id);
        }
    }
}

pub struct RemotePage {
    tab_id: TabId,
    board: PhaseBoard,
    host: BrowserHost,
}

impl RemotePage {
    pub fn new(tab_id: TabId, board: PhaseBoard, host: BrowserHost) -> Self {
        Self {
            tab_id,
            board,
            host,
        }
    }
}

impl MeetingPage for RemotePage {
    fn phase_indicators(&self) -> PhaseIndicators {
        self.board.get(self.tab_id)
    }

    fn perform(&self, action: PageAction) -> bool {
        self.host.enqueue(self.tab_id, Message::PageAction(action))
    }
}

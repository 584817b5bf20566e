//! Feature toggles chosen by the user.
//!
//! Stored as a flat `option → bool` map. Every save is a locked
//! read-modify-write so concurrent toggles of different options never drop
//! each other's update.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::db::{get_json, keys, set_json, Area, KvStore, StorageLock};
use crate::page::PageAction;

pub type SettingsMap = BTreeMap<String, bool>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureOption {
    AutoMute,
    AutoVideoOff,
    DisableMic,
    DisableCamera,
    PushToTalk,
    AutoJoin,
    LeaveConfirmation,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown option '{0}'")]
pub struct UnknownOption(pub String);

impl FeatureOption {
    pub const ALL: [FeatureOption; 7] = [
        FeatureOption::AutoMute,
        FeatureOption::AutoVideoOff,
        FeatureOption::DisableMic,
        FeatureOption::DisableCamera,
        FeatureOption::PushToTalk,
        FeatureOption::AutoJoin,
        FeatureOption::LeaveConfirmation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureOption::AutoMute => "auto-mute",
            FeatureOption::AutoVideoOff => "auto-video-off",
            FeatureOption::DisableMic => "disable-mic",
            FeatureOption::DisableCamera => "disable-camera",
            FeatureOption::PushToTalk => "push-to-talk",
            FeatureOption::AutoJoin => "auto-join",
            FeatureOption::LeaveConfirmation => "leave-confirmation",
        }
    }

    /// Page action for switching this option on or off while in a meeting.
    pub fn action(&self, checked: bool) -> Option<PageAction> {
        match (self, checked) {
            (FeatureOption::AutoMute, true) => Some(PageAction::TurnOffMic),
            (FeatureOption::AutoMute, false) => None,
            (FeatureOption::AutoVideoOff, true) => Some(PageAction::TurnOffCamera),
            (FeatureOption::AutoVideoOff, false) => None,
            (FeatureOption::DisableMic, true) => Some(PageAction::DisableMic),
            (FeatureOption::DisableMic, false) => Some(PageAction::EnableMic),
            (FeatureOption::DisableCamera, true) => Some(PageAction::DisableCamera),
            (FeatureOption::DisableCamera, false) => Some(PageAction::EnableCamera),
            (FeatureOption::PushToTalk, true) => Some(PageAction::EnablePushToTalk),
            (FeatureOption::PushToTalk, false) => Some(PageAction::DisablePushToTalk),
            (FeatureOption::AutoJoin, true) => Some(PageAction::Join),
            (FeatureOption::AutoJoin, false) => None,
            (FeatureOption::LeaveConfirmation, true) => Some(PageAction::AttachLeaveConfirmation),
            (FeatureOption::LeaveConfirmation, false) => {
                Some(PageAction::DetachLeaveConfirmation)
            }
        }
    }
}

impl fmt::Display for FeatureOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureOption {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureOption::ALL
            .into_iter()
            .find(|option| option.as_str() == s)
            .ok_or_else(|| UnknownOption(s.to_string()))
    }
}

/// Typed view over a settings map.
pub fn is_enabled(settings: &SettingsMap, option: FeatureOption) -> bool {
    settings.get(option.as_str()).copied().unwrap_or(false)
}

#[derive(Clone)]
pub struct SettingsStore {
    kv: Arc<dyn KvStore>,
    lock: Arc<StorageLock>,
}

impl SettingsStore {
    pub fn new(kv: Arc<dyn KvStore>, lock: Arc<StorageLock>) -> Self {
        Self { kv, lock }
    }

    pub async fn load(&self) -> Result<SettingsMap> {
        Ok(get_json(self.kv.as_ref(), Area::Sync, keys::SETTINGS)
            .await?
            .unwrap_or_default())
    }

    pub async fn save(&self, option: FeatureOption, checked: bool) -> Result<()> {
        let _guard = self.lock.acquire().await;

        let mut settings = self.load().await?;
        settings.insert(option.as_str().to_string(), checked);
        set_json(self.kv.as_ref(), Area::Sync, keys::SETTINGS, &settings).await?;

        debug!("Saved setting {} = {}", option, checked);
        Ok(())
    }
}

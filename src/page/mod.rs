//! In-meeting page automation.
//!
//! The meeting page is reached only through [`MeetingPage`]: three phase
//! indicators and a set of discrete actions. Options that need the page to
//! reach a certain phase poll until it does; an absent element is "not ready
//! yet", never an error.

pub mod remote;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::settings::{is_enabled, FeatureOption, SettingsMap};

pub use remote::{PhaseBoard, RemotePage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PageAction {
    TurnOffMic,
    TurnOffCamera,
    DisableMic,
    EnableMic,
    DisableCamera,
    EnableCamera,
    EnablePushToTalk,
    DisablePushToTalk,
    Join,
    AttachLeaveConfirmation,
    DetachLeaveConfirmation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseIndicators {
    /// The lobby finished loading and the join button is present.
    pub join_ready: bool,
    pub in_call: bool,
    pub leave_available: bool,
}

pub trait MeetingPage: Send + Sync {
    fn phase_indicators(&self) -> PhaseIndicators;

    /// Returns false when the element the action needs is not on the page.
    fn perform(&self, action: PageAction) -> bool;
}

/// When an enabled option's action is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Apply on every tick until the lobby is ready.
    RepeatUntilReady(PageAction),
    WhenJoinReady(PageAction),
    WhenInCall(PageAction),
    WhenLeaveAvailable(PageAction),
    Immediately(PageAction),
}

impl Schedule {
    pub fn for_option(option: FeatureOption) -> Schedule {
        match option {
            FeatureOption::AutoMute => Schedule::RepeatUntilReady(PageAction::TurnOffMic),
            FeatureOption::AutoVideoOff => Schedule::RepeatUntilReady(PageAction::TurnOffCamera),
            FeatureOption::DisableMic => Schedule::WhenInCall(PageAction::DisableMic),
            FeatureOption::DisableCamera => Schedule::WhenInCall(PageAction::DisableCamera),
            FeatureOption::PushToTalk => Schedule::Immediately(PageAction::EnablePushToTalk),
            FeatureOption::AutoJoin => Schedule::WhenJoinReady(PageAction::Join),
            FeatureOption::LeaveConfirmation => {
                Schedule::WhenLeaveAvailable(PageAction::AttachLeaveConfirmation)
            }
        }
    }

    /// One attempt; true once the schedule is satisfied.
    fn step(&self, page: &dyn MeetingPage) -> bool {
        match *self {
            Schedule::RepeatUntilReady(action) => {
                page.perform(action);
                page.phase_indicators().join_ready
            }
            Schedule::WhenJoinReady(action) => {
                page.phase_indicators().join_ready && page.perform(action)
            }
            Schedule::WhenInCall(action) => page.phase_indicators().in_call && page.perform(action),
            Schedule::WhenLeaveAvailable(action) => {
                page.phase_indicators().leave_available && page.perform(action)
            }
            Schedule::Immediately(action) => {
                page.perform(action);
                true
            }
        }
    }
}

pub struct PageAutomation<P: MeetingPage + 'static> {
    page: Arc<P>,
    interval: Duration,
}

impl<P: MeetingPage + 'static> PageAutomation<P> {
    pub fn new(page: Arc<P>, interval: Duration) -> Self {
        Self { page, interval }
    }

    /// Runs the schedules of every enabled option until each is satisfied or
    /// `cancel` fires. Returns how many schedules completed.
    pub async fn run(&self, settings: &SettingsMap, cancel: CancellationToken) -> usize {
        let mut tasks = JoinSet::new();

        for option in FeatureOption::ALL {
            if !is_enabled(settings, option) {
                continue;
            }
            let schedule = Schedule::for_option(option);
            let page = self.page.clone();
            let interval = self.interval;
            let cancel = cancel.clone();
            tasks.spawn(async move { poll_schedule(page, schedule, interval, cancel).await });
        }

        let mut completed = 0;
        while let Some(result) = tasks.join_next().await {
            if matches!(result, Ok(true)) {
                completed += 1;
            }
        }
        info!("Page automation finished ({} schedule(s) applied)", completed);
        completed
    }
}

async fn poll_schedule<P: MeetingPage>(
    page: Arc<P>,
    schedule: Schedule,
    interval: Duration,
    cancel: CancellationToken,
) -> bool {
    loop {
        if schedule.step(page.as_ref()) {
            debug!("Schedule {:?} satisfied", schedule);
            return true;
        }
        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

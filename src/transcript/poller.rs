//! Periodic sampling of the caption area.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::caption::CaptionSource;
use super::reconciler::{TranscriptEntry, TranscriptReconciler};
use crate::clock::Clock;

pub struct CaptionPoller<S: CaptionSource> {
    source: S,
    reconciler: TranscriptReconciler,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl<S: CaptionSource> CaptionPoller<S> {
    pub fn new(
        source: S,
        reconciler: TranscriptReconciler,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            reconciler,
            clock,
            interval,
        }
    }

    /// One sample. A missing caption container yields no entries.
    pub fn poll_once(&mut self) -> Vec<TranscriptEntry> {
        match self.source.caption_snapshot() {
            Some(snapshot) => self.reconciler.reconcile(&snapshot, self.clock.now()),
            None => Vec::new(),
        }
    }

    /// Samples every interval until cancelled or the receiver goes away.
    pub async fn run(mut self, sink: mpsc::Sender<TranscriptEntry>, cancel: CancellationToken) {
        let meeting_id = self.reconciler.meeting_id().clone();
        info!("Caption polling started for {}", meeting_id);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    for entry in self.poll_once() {
                        if sink.send(entry).await.is_err() {
                            debug!("Transcript receiver closed, stopping poller");
                            return;
                        }
                    }
                }
            }
        }

        info!("Caption polling stopped for {}", meeting_id);
    }
}

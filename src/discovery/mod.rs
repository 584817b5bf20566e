//! Meeting URL discovery.
//!
//! Each candidate comes from following the "new meeting" endpoint to the room
//! it redirects to. Only one run is live at a time: starting a run cancels the
//! previous one, which then returns [`DiscoveryError::Cancelled`] and drops
//! whatever it had collected.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::meeting::{MeetingId, MeetingUrlMatcher, UrlKind};

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("discovery run was superseded")]
    Cancelled,
    #[error("failed to fetch candidate: {0:#}")]
    Fetch(anyhow::Error),
    #[error("no meeting id in '{0}'")]
    NoMeetingId(String),
    #[error("asked for {requested} meeting URLs, at most {max} per run")]
    TooMany { requested: usize, max: usize },
}

/// Upper bound on candidates fetched in one run unless configured otherwise.
pub const DEFAULT_MAX_COUNT: usize = 50;

/// Produces one candidate meeting URL per call.
#[async_trait]
pub trait CandidateFetcher: Send + Sync {
    async fn fetch_candidate(&self) -> Result<String, DiscoveryError>;
}

pub struct HttpCandidateFetcher {
    client: reqwest::Client,
    url: String,
}

impl HttpCandidateFetcher {
    pub fn new(url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl CandidateFetcher for HttpCandidateFetcher {
    async fn fetch_candidate(&self) -> Result<String, DiscoveryError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| DiscoveryError::Fetch(e.into()))?;

        Ok(response.url().to_string())
    }
}

pub struct MeetingUrlDiscovery {
    fetcher: Arc<dyn CandidateFetcher>,
    matcher: MeetingUrlMatcher,
    max_count: usize,
    current: Mutex<Option<CancellationToken>>,
}

impl MeetingUrlDiscovery {
    pub fn new(fetcher: Arc<dyn CandidateFetcher>, matcher: MeetingUrlMatcher) -> Self {
        Self {
            fetcher,
            matcher,
            max_count: DEFAULT_MAX_COUNT,
            current: Mutex::new(None),
        }
    }

    pub fn with_max_count(mut self, max_count: usize) -> Self {
        self.max_count = max_count;
        self
    }

    /// Fetches `count` candidates one after another. Candidates that fail or
    /// do not point at a meeting room are skipped. A count above the
    /// configured maximum is refused before anything is fetched.
    pub async fn discover(&self, count: usize) -> Result<Vec<MeetingId>, DiscoveryError> {
        if count > self.max_count {
            return Err(DiscoveryError::TooMany {
                requested: count,
                max: self.max_count,
            });
        }

        let token = self.begin_run();
        let mut found = Vec::new();

        for attempt in 1..=count {
            let candidate = tokio::select! {
                _ = token.cancelled() => return Err(DiscoveryError::Cancelled),
                candidate = self.fetcher.fetch_candidate() => candidate,
            };

            match candidate.and_then(|url| self.meeting_id(&url)) {
                Ok(id) => {
                    debug!("Candidate {}/{}: {}", attempt, count, id);
                    found.push(id);
                }
                Err(e) => warn!("Skipping candidate {}/{}: {}", attempt, count, e),
            }
        }

        if token.is_cancelled() {
            return Err(DiscoveryError::Cancelled);
        }

        info!("Discovered {} meeting URL(s)", found.len());
        Ok(found)
    }

    pub fn meeting_url(&self, id: &MeetingId) -> String {
        self.matcher.meeting_url(id)
    }

    fn begin_run(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = current.replace(token.clone()) {
            if !previous.is_cancelled() {
                info!("Cancelling previous discovery run");
            }
            previous.cancel();
        }
        token
    }

    fn meeting_id(&self, url: &str) -> Result<MeetingId, DiscoveryError> {
        match self.matcher.classify(url) {
            UrlKind::Meeting(id) => Ok(id),
            _ => Err(DiscoveryError::NoMeetingId(url.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Hands out scripted URLs, taking `delay` per fetch.
    struct ScriptedFetcher {
        urls: Vec<Option<&'static str>>,
        next: AtomicUsize,
        delay: Duration,
    }

    impl ScriptedFetcher {
        fn new(urls: Vec<Option<&'static str>>, delay: Duration) -> Self {
            Self {
                urls,
                next: AtomicUsize::new(0),
                delay,
            }
        }
    }

    #[async_trait]
    impl CandidateFetcher for ScriptedFetcher {
        async fn fetch_candidate(&self) -> Result<String, DiscoveryError> {
            tokio::time::sleep(self.delay).await;
            let i = self.next.fetch_add(1, Ordering::SeqCst);
            match self.urls.get(i % self.urls.len()).copied().flatten() {
                Some(url) => Ok(url.to_string()),
                None => Err(DiscoveryError::Fetch(anyhow!("connection reset"))),
            }
        }
    }

    fn discovery(fetcher: ScriptedFetcher) -> Arc<MeetingUrlDiscovery> {
        Arc::new(MeetingUrlDiscovery::new(
            Arc::new(fetcher),
            MeetingUrlMatcher::new("meet.google.com").unwrap(),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_skips_bad_candidates() {
        let d = discovery(ScriptedFetcher::new(
            vec![
                Some("https://meet.google.com/abc-defg-hij"),
                None,
                Some("https://accounts.google.com/signin"),
                Some("https://meet.google.com/xyz-wxyz-xyz"),
            ],
            Duration::from_millis(100),
        ));

        let ids = d.discover(4).await.unwrap();
        assert_eq!(
            ids,
            vec![
                MeetingId::parse("abc-defg-hij").unwrap(),
                MeetingId::parse("xyz-wxyz-xyz").unwrap()
            ]
        );
        assert_eq!(
            d.meeting_url(&ids[0]),
            "https://meet.google.com/abc-defg-hij"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_run_cancels_previous() {
        let d = discovery(ScriptedFetcher::new(
            vec![Some("https://meet.google.com/abc-defg-hij")],
            Duration::from_millis(100),
        ));

        let first = tokio::spawn({
            let d = d.clone();
            async move { d.discover(10).await }
        });
        tokio::time::sleep(Duration::from_millis(250)).await;

        let second = d.discover(2).await.unwrap();
        assert_eq!(second.len(), 2);
        assert!(matches!(
            first.await.unwrap(),
            Err(DiscoveryError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn test_count_above_max_is_refused() {
        let fetcher = Arc::new(ScriptedFetcher::new(
            vec![Some("https://meet.google.com/abc-defg-hij")],
            Duration::ZERO,
        ));
        let d = MeetingUrlDiscovery::new(
            fetcher.clone(),
            MeetingUrlMatcher::new("meet.google.com").unwrap(),
        )
        .with_max_count(5);

        assert!(matches!(
            d.discover(usize::MAX).await,
            Err(DiscoveryError::TooMany { requested: usize::MAX, max: 5 })
        ));
        assert!(matches!(
            d.discover(6).await,
            Err(DiscoveryError::TooMany { requested: 6, max: 5 })
        ));
        assert_eq!(fetcher.next.load(Ordering::SeqCst), 0);
        assert_eq!(d.discover(5).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_zero_count_is_empty() {
        let d = discovery(ScriptedFetcher::new(vec![None], Duration::ZERO));
        assert!(d.discover(0).await.unwrap().is_empty());
    }
}

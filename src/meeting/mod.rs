//! Meeting session tracking.
//!
//! Watches tab navigation for meeting room URLs, keeps one open session per
//! tab, and folds finished sessions into a bounded recent-meetings history.

pub mod id;
pub mod session;
pub mod store;
pub mod tracker;

pub use id::{MeetingId, MeetingIdError, MeetingUrlMatcher, UrlKind};
pub use session::{MeetingHistoryEntry, MeetingRecord, Session, StoreLimits, TabId};
pub use store::{OpenSessions, SessionStore};
pub use tracker::{CompletedSession, SessionTracker, TabEvent, Transition};

//! Live caption capture.
//!
//! caption area → [`CaptionPoller`] → [`TranscriptReconciler`] → [`TranscriptStore`] → CSV

pub mod caption;
pub mod csv;
pub mod poller;
pub mod reconciler;
pub mod store;

pub use caption::{
    CaptionBlock, CaptionSnapshot, CaptionSource, MailboxSource, ScriptedSource, SnapshotMailbox,
};
pub use csv::ExportRow;
pub use poller::CaptionPoller;
pub use reconciler::{TranscriptEntry, TranscriptReconciler};
pub use store::{MeetingTranscript, StoredTurn, TranscriptStore};

//! Wire format shared by the popup, the background relay and meeting pages.
//!
//! Every message is a JSON object `{"type": ..., "data": ...}`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::RelayError;
use crate::meeting::MeetingId;
use crate::page::PageAction;
use crate::settings::{FeatureOption, SettingsMap};
use crate::transcript::TranscriptEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckboxChange {
    pub option: FeatureOption,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A page asks for the current settings.
    Init,
    InitData(SettingsMap),
    Checkbox(CheckboxChange),
    Transcript(TranscriptEntry),
    DownloadTranscript(MeetingId),
    /// Instruction for a page to apply one action.
    PageAction(PageAction),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Init => "init",
            Message::InitData(_) => "initData",
            Message::Checkbox(_) => "checkbox",
            Message::Transcript(_) => "transcript",
            Message::DownloadTranscript(_) => "download_transcript",
            Message::PageAction(_) => "pageAction",
        }
    }

    pub fn from_value(value: Value) -> Result<Message, RelayError> {
        let envelope: Envelope =
            serde_json::from_value(value).map_err(|e| RelayError::Malformed(e.to_string()))?;
        let data = envelope.data;

        let message = match envelope.kind.as_str() {
            // The page sends a placeholder payload with init; it carries nothing.
            "init" => Message::Init,
            "initData" => Message::InitData(decode(data)?),
            "checkbox" => Message::Checkbox(decode(data)?),
            "transcript" => Message::Transcript(decode(data)?),
            "download_transcript" => Message::DownloadTranscript(decode(data)?),
            "pageAction" => Message::PageAction(decode(data)?),
            other => return Err(RelayError::UnknownType(other.to_string())),
        };
        Ok(message)
    }

    pub fn parse(raw: &str) -> Result<Message, RelayError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| RelayError::Malformed(e.to_string()))?;
        Message::from_value(value)
    }

    pub fn to_value(&self) -> Value {
        let data = match self {
            Message::Init => Value::String("init".to_string()),
            Message::InitData(settings) => json!(settings),
            Message::Checkbox(change) => json!(change),
            Message::Transcript(entry) => json!(entry),
            Message::DownloadTranscript(meeting_id) => json!(meeting_id),
            Message::PageAction(action) => json!(action),
        };
        json!({ "type": self.kind(), "data": data })
    }
}

impl Serialize for Message {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

fn decode<T: serde::de::DeserializeOwned>(data: Value) -> Result<T, RelayError> {
    serde_json::from_value(data).map_err(|e| RelayError::Malformed(e.to_string()))
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::decoder::EventFrame;
use crate::error::FrameDecodeError;
use crate::types::HostRecord;

/// One semantic event of the scan feed, tagged by its `type` field.
///
/// Discriminators this client does not know decode to `Unknown`, which every
/// consumer treats as a no-op. So do payloads that carry no string `type` at all.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanEvent {
    Status { message: String },
    HostResult { data: HostRecord },
    Error { message: String },
    #[serde(other)]
    Unknown,
}

impl ScanEvent {
    pub fn status(message: impl Into<String>) -> Self {
        ScanEvent::Status { message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ScanEvent::Error { message: message.into() }
    }

    pub fn host(data: HostRecord) -> Self {
        ScanEvent::HostResult { data }
    }
}

/// Strip the data prefix from `frame` and parse its JSON payload.
///
/// Only text that is not JSON, or a known event whose body has the wrong
/// shape, is an error. Valid JSON without a string `type` is `Unknown`.
pub fn decode_frame(frame: &EventFrame) -> Result<ScanEvent, FrameDecodeError> {
    let payload = frame.payload().ok_or(FrameDecodeError::MissingPrefix)?;
    let value: Value = serde_json::from_str(payload)?;
    if !value.get("type").is_some_and(Value::is_string) {
        return Ok(ScanEvent::Unknown);
    }
    Ok(serde_json::from_value(value)?)
}

use serde::{Deserialize, Serialize};
use tally_vision::{Detection, Mode};

/// One input line: a frame's detections plus optional control fields that
/// apply before the frame is processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRecord {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub detections: Vec<Detection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reset: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountEvent {
    pub ts_unix_ms: i64,
    pub frame: u64,
    pub mode: Mode,
    pub in_count: u64,
    pub out_count: u64,
    pub net_total: i64,
    pub active_tracks: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub ts_unix_ms: i64,
    pub subject: String,
    pub body: String,
}

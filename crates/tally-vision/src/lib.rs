mod geometry;
pub mod doctor;
pub mod annotate;
pub mod counter;
pub mod engine;
pub mod raster;
pub mod tracker;

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub use engine::{CountingEngine, FrameOutcome};
pub use geometry::{centroid, distance_sq, Point};

/// One detector output for one object in one frame (pixel coordinates).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub label: String,
}

impl Detection {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32, label: impl Into<String>) -> Self {
        Self { x1, y1, x2, y2, label: label.into() }
    }

    pub fn bbox(&self) -> BBox {
        BBox { x1: self.x1, y1: self.y1, x2: self.x2, y2: self.y2 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Per-frame count of tracked-class detections.
    Occupancy,
    /// Cumulative entries minus exits across the boundary lines.
    Directional,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Occupancy => "occupancy",
            Mode::Directional => "directional",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mode: {0} (expected occupancy | directional)")]
pub struct ParseModeError(pub String);

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "occupancy" | "eagle-eye" => Ok(Mode::Occupancy),
            "directional" | "lane-counter" => Ok(Mode::Directional),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tracked_class: String,
    /// Association gate on squared centroid distance (strict).
    pub max_dist_sq: i64,
    /// A track is evicted once `frame - last_seen` exceeds this.
    pub stale_frames: u64,
    pub entry_frac: f64,
    pub exit_frac: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tracked_class: "person".into(),
            max_dist_sq: 5000,
            stale_frames: 30,
            entry_frac: 0.9,
            exit_frac: 0.1,
        }
    }
}

/// Keeps only detections of `class`, preserving detector order.
pub fn filter_class<'a>(dets: &'a [Detection], class: &str) -> Vec<&'a Detection> {
    dets.iter().filter(|d| d.label == class).collect()
}

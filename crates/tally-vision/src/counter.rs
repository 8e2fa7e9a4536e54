use serde::Serialize;

use crate::tracker::{Lane, Track};

/// Counting geometry, fixed once derived from the first frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Boundary {
    pub lane_split_x: i32,
    pub entry_y: i32,
    pub exit_y: i32,
}

impl Boundary {
    pub fn from_frame(width: u32, height: u32, entry_frac: f64, exit_frac: f64) -> Self {
        Self {
            lane_split_x: (width / 2) as i32,
            entry_y: (height as f64 * entry_frac) as i32,
            exit_y: (height as f64 * exit_frac) as i32,
        }
    }

    pub fn lane_of(&self, x: i32) -> Lane {
        if x < self.lane_split_x { Lane::Entering } else { Lane::Exiting }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crossing {
    pub track_id: u64,
    pub direction: Direction,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineCounter {
    in_count: u64,
    out_count: u64,
}

impl LineCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reclassifies each track's lane and commits at most one crossing per
    /// track per direction. Entering tracks count when their bottom edge is
    /// below `entry_y`; exiting tracks when their top edge is above `exit_y`.
    pub fn apply<'a, I>(&mut self, boundary: &Boundary, tracks: I) -> Vec<Crossing>
    where
        I: IntoIterator<Item = &'a mut Track>,
    {
        let mut crossings = Vec::new();
        for t in tracks {
            t.lane = boundary.lane_of(t.centroid.x);

            if t.lane == Lane::Entering && t.bbox.y2 > boundary.entry_y && !t.counted_in {
                self.in_count += 1;
                t.counted_in = true;
                crossings.push(Crossing { track_id: t.id, direction: Direction::In });
            }

            if t.lane == Lane::Exiting && t.bbox.y1 < boundary.exit_y && !t.counted_out {
                self.out_count += 1;
                t.counted_out = true;
                crossings.push(Crossing { track_id: t.id, direction: Direction::Out });
            }
        }
        crossings
    }

    pub fn in_count(&self) -> u64 { self.in_count }

    pub fn out_count(&self) -> u64 { self.out_count }

    /// Entries minus exits; negative when more exits were seen.
    pub fn net(&self) -> i64 {
        self.in_count as i64 - self.out_count as i64
    }

    pub fn reset(&mut self) {
        self.in_count = 0;
        self.out_count = 0;
    }
}

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::{centroid, distance_sq, BBox, Detection, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    Unknown,
    Entering,
    Exiting,
}

impl Lane {
    pub fn as_str(self) -> &'static str {
        match self {
            Lane::Unknown => "unknown",
            Lane::Entering => "enter",
            Lane::Exiting => "exit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: u64,
    pub bbox: BBox,
    pub centroid: Point,
    pub lane: Lane,
    pub counted_in: bool,
    pub counted_out: bool,
    pub last_seen_frame: u64,
}

impl Track {
    fn spawn(id: u64, bbox: BBox, frame: u64) -> Self {
        Self {
            id,
            bbox,
            centroid: centroid(&bbox),
            lane: Lane::Unknown,
            counted_in: false,
            counted_out: false,
            last_seen_frame: frame,
        }
    }

    fn refresh(&mut self, bbox: BBox, frame: u64) {
        self.bbox = bbox;
        self.centroid = centroid(&bbox);
        self.last_seen_frame = frame;
    }

    pub fn frames_unseen(&self, frame: u64) -> u64 {
        frame.saturating_sub(self.last_seen_frame)
    }
}

/// What happened to one detection during association.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    Matched(u64),
    Spawned(u64),
}

impl Assignment {
    pub fn track_id(self) -> u64 {
        match self {
            Assignment::Matched(id) | Assignment::Spawned(id) => id,
        }
    }
}

/// Arena of live tracks keyed by id. Ids are allocated monotonically, so
/// key order is also creation order.
#[derive(Debug, Clone)]
pub struct Tracker {
    max_dist_sq: i64,
    stale_frames: u64,
    next_id: u64,
    tracks: BTreeMap<u64, Track>,
}

impl Tracker {
    pub fn new(max_dist_sq: i64, stale_frames: u64) -> Self {
        Self { max_dist_sq, stale_frames, next_id: 0, tracks: BTreeMap::new() }
    }

    /// Greedy nearest-centroid matching, one detection at a time in input
    /// order. A track claimed earlier in the frame is not a candidate for
    /// later detections. Ties keep the lowest id.
    pub fn associate(&mut self, dets: &[&Detection], frame: u64) -> Vec<Assignment> {
        let mut claimed = BTreeSet::new();
        let mut out = Vec::with_capacity(dets.len());

        for d in dets {
            let bbox = d.bbox();
            let c = centroid(&bbox);

            let mut best: Option<(u64, i64)> = None;
            for (id, t) in &self.tracks {
                if claimed.contains(id) { continue; }
                let dist = distance_sq(c, t.centroid);
                if dist >= self.max_dist_sq { continue; }
                if best.map_or(true, |(_, b)| dist < b) {
                    best = Some((*id, dist));
                }
            }

            let assignment = match best {
                Some((id, _)) => {
                    if let Some(t) = self.tracks.get_mut(&id) {
                        t.refresh(bbox, frame);
                    }
                    Assignment::Matched(id)
                }
                None => {
                    let id = self.insert(bbox, frame);
                    debug!(id, cx = c.x, cy = c.y, "track: spawned");
                    Assignment::Spawned(id)
                }
            };
            claimed.insert(assignment.track_id());
            out.push(assignment);
        }
        out
    }

    /// Drops every track unseen for more than the staleness window.
    /// Returns the evicted ids in ascending order.
    pub fn evict_stale(&mut self, frame: u64) -> Vec<u64> {
        let stale = self.stale_frames;
        let evicted: Vec<u64> = self
            .tracks
            .values()
            .filter(|t| t.frames_unseen(frame) > stale)
            .map(|t| t.id)
            .collect();
        for id in &evicted {
            self.remove(*id);
            debug!(id, frame, "track: evicted");
        }
        evicted
    }

    pub fn insert(&mut self, bbox: BBox, frame: u64) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.tracks.insert(id, Track::spawn(id, bbox, frame));
        id
    }

    pub fn remove(&mut self, id: u64) -> Option<Track> {
        self.tracks.remove(&id)
    }

    pub fn get(&self, id: u64) -> Option<&Track> {
        self.tracks.get(&id)
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    pub fn tracks_mut(&mut self) -> impl Iterator<Item = &mut Track> {
        self.tracks.values_mut()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn reset(&mut self) {
        self.tracks.clear();
        self.next_id = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person_at(cx: i32, cy: i32) -> Detection {
        Detection::new(cx - 10, cy - 20, cx + 10, cy + 20, "person")
    }

    #[test]
    fn nearby_detection_keeps_id() {
        let mut tr = Tracker::new(5000, 30);
        let d = person_at(100, 100);
        assert_eq!(tr.associate(&[&d], 1), vec![Assignment::Spawned(0)]);

        let d = person_at(110, 100);
        assert_eq!(tr.associate(&[&d], 2), vec![Assignment::Matched(0)]);
        let t = tr.get(0).unwrap();
        assert_eq!(t.centroid, Point { x: 110, y: 100 });
        assert_eq!(t.last_seen_frame, 2);
    }

    #[test]
    fn gate_is_strict() {
        let mut tr = Tracker::new(100, 30);
        tr.associate(&[&person_at(0, 0)], 1);
        // exactly on the gate: 10^2 == 100
        let out = tr.associate(&[&person_at(10, 0)], 2);
        assert_eq!(out, vec![Assignment::Spawned(1)]);
        assert_eq!(tr.len(), 2);
    }

    #[test]
    fn one_track_per_detection_per_frame() {
        let mut tr = Tracker::new(5000, 30);
        tr.associate(&[&person_at(100, 100)], 1);

        let a = person_at(102, 100);
        let b = person_at(104, 100);
        let out = tr.associate(&[&a, &b], 2);
        assert_eq!(out, vec![Assignment::Matched(0), Assignment::Spawned(1)]);
    }

    #[test]
    fn nearest_track_wins() {
        let mut tr = Tracker::new(5000, 30);
        let a = person_at(100, 100);
        let b = person_at(200, 100);
        tr.associate(&[&a, &b], 1);

        let out = tr.associate(&[&person_at(190, 100)], 2);
        assert_eq!(out, vec![Assignment::Matched(1)]);
        assert_eq!(tr.get(0).unwrap().last_seen_frame, 1);
    }

    #[test]
    fn equidistant_tie_goes_to_older_track() {
        let mut tr = Tracker::new(5000, 30);
        let a = person_at(100, 100);
        let b = person_at(140, 100);
        tr.associate(&[&a, &b], 1);

        let out = tr.associate(&[&person_at(120, 100)], 2);
        assert_eq!(out, vec![Assignment::Matched(0)]);
    }

    #[test]
    fn eviction_after_window() {
        let mut tr = Tracker::new(5000, 30);
        tr.associate(&[&person_at(100, 100)], 1);

        assert!(tr.evict_stale(31).is_empty());
        assert_eq!(tr.evict_stale(32), vec![0]);
        assert!(tr.is_empty());
    }

    #[test]
    fn ids_are_never_reused_until_reset() {
        let mut tr = Tracker::new(5000, 0);
        tr.associate(&[&person_at(100, 100)], 1);
        tr.evict_stale(2);
        let out = tr.associate(&[&person_at(100, 100)], 3);
        assert_eq!(out, vec![Assignment::Spawned(1)]);

        tr.reset();
        assert!(tr.is_empty());
        assert_eq!(tr.next_id(), 0);
    }
}

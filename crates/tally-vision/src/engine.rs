use tracing::{debug, info};

use crate::annotate::{self, DrawOp};
use crate::counter::{Boundary, Crossing, Direction, LineCounter};
use crate::tracker::{Track, Tracker};
use crate::{filter_class, Detection, EngineConfig, Mode};

/// Result of one processed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutcome {
    pub frame: u64,
    pub in_count: u64,
    pub out_count: u64,
    /// Occupancy: tracked-class detections this frame.
    /// Directional: `in_count - out_count`.
    pub net_total: i64,
    pub crossings: Vec<Crossing>,
    pub evicted: Vec<u64>,
    pub draw: Vec<DrawOp>,
}

/// Frame-at-a-time people counter. One instance per stream; not meant to be
/// driven from more than one thread at once.
#[derive(Debug, Clone)]
pub struct CountingEngine {
    cfg: EngineConfig,
    mode: Mode,
    boundary: Option<Boundary>,
    tracker: Tracker,
    counter: LineCounter,
    frame_counter: u64,
}

impl CountingEngine {
    pub fn new(mode: Mode, cfg: EngineConfig) -> Self {
        let tracker = Tracker::new(cfg.max_dist_sq, cfg.stale_frames);
        Self { cfg, mode, boundary: None, tracker, counter: LineCounter::new(), frame_counter: 0 }
    }

    pub fn mode(&self) -> Mode { self.mode }

    pub fn set_mode(&mut self, mode: Mode) {
        if mode != self.mode {
            info!(from = %self.mode, to = %mode, "engine: mode changed");
            self.mode = mode;
        }
    }

    pub fn config(&self) -> &EngineConfig { &self.cfg }

    /// `None` until the first frame has been processed.
    pub fn boundary(&self) -> Option<Boundary> { self.boundary }

    pub fn frame_counter(&self) -> u64 { self.frame_counter }

    pub fn in_count(&self) -> u64 { self.counter.in_count() }

    pub fn out_count(&self) -> u64 { self.counter.out_count() }

    pub fn next_id(&self) -> u64 { self.tracker.next_id() }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracker.tracks()
    }

    pub fn track(&self, id: u64) -> Option<&Track> {
        self.tracker.get(id)
    }

    pub fn active_tracks(&self) -> usize {
        self.tracker.len()
    }

    /// Associate, evict, count, annotate. Non-tracked labels are ignored by
    /// association but still drawn in occupancy mode.
    pub fn process(&mut self, dets: &[Detection], width: u32, height: u32) -> FrameOutcome {
        self.frame_counter += 1;
        let frame = self.frame_counter;
        let cfg = &self.cfg;
        let boundary = *self.boundary.get_or_insert_with(|| {
            Boundary::from_frame(width, height, cfg.entry_frac, cfg.exit_frac)
        });

        let people = filter_class(dets, &self.cfg.tracked_class);
        self.tracker.associate(&people, frame);
        let evicted = self.tracker.evict_stale(frame);

        let (net_total, crossings, draw) = match self.mode {
            Mode::Occupancy => {
                let draw = annotate::occupancy(dets, &self.cfg.tracked_class);
                (people.len() as i64, Vec::new(), draw)
            }
            Mode::Directional => {
                let crossings = self.counter.apply(&boundary, self.tracker.tracks_mut());
                for c in &crossings {
                    let (total, what) = match c.direction {
                        Direction::In => (self.counter.in_count(), "entry"),
                        Direction::Out => (self.counter.out_count(), "exit"),
                    };
                    info!(track = c.track_id, total, "count: {}", what);
                }
                let draw = annotate::directional(&boundary, width, height, self.tracker.tracks());
                (self.counter.net(), crossings, draw)
            }
        };

        debug!(
            frame,
            people = people.len(),
            tracks = self.tracker.len(),
            net_total,
            "engine: frame done"
        );

        FrameOutcome {
            frame,
            in_count: self.counter.in_count(),
            out_count: self.counter.out_count(),
            net_total,
            crossings,
            evicted,
            draw,
        }
    }

    /// Clears counts, tracks, id allocation and the frame counter. The
    /// boundary derived from the first frame is kept.
    pub fn reset(&mut self) {
        self.counter.reset();
        self.tracker.reset();
        self.frame_counter = 0;
        info!("engine: counts reset");
    }
}

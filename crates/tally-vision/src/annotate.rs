//! Draw instructions for an external renderer. Nothing here touches pixels.

use serde::Serialize;

use crate::counter::Boundary;
use crate::tracker::{Lane, Track};
use crate::{Detection, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const GREEN: Rgb = Rgb(0, 255, 0);
    pub const RED: Rgb = Rgb(255, 0, 0);
    pub const BLUE: Rgb = Rgb(0, 0, 255);
    pub const YELLOW: Rgb = Rgb(255, 255, 0);
    pub const CYAN: Rgb = Rgb(0, 255, 255);
    pub const ORANGE: Rgb = Rgb(255, 165, 0);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum DrawOp {
    Rect { from: Point, to: Point, color: Rgb, thickness: u32 },
    Line { from: Point, to: Point, color: Rgb, thickness: u32 },
    Text { at: Point, caption: String, color: Rgb, scale: f32 },
}

impl DrawOp {
    pub fn text(x: i32, y: i32, caption: impl Into<String>, color: Rgb, scale: f32) -> Self {
        DrawOp::Text { at: Point { x, y }, caption: caption.into(), color, scale }
    }

    fn line(x1: i32, y1: i32, x2: i32, y2: i32, color: Rgb, thickness: u32) -> Self {
        DrawOp::Line { from: Point { x: x1, y: y1 }, to: Point { x: x2, y: y2 }, color, thickness }
    }

    fn rect(x1: i32, y1: i32, x2: i32, y2: i32, color: Rgb) -> Self {
        let (from, to) = (Point { x: x1, y: y1 }, Point { x: x2, y: y2 });
        DrawOp::Rect { from, to, color, thickness: 2 }
    }
}

pub fn lane_color(lane: Lane) -> Rgb {
    match lane {
        Lane::Entering => Rgb::CYAN,
        Lane::Exiting => Rgb::ORANGE,
        Lane::Unknown => Rgb::GREEN,
    }
}

/// Boundary lines plus one labelled box per active track.
pub fn directional<'a>(
    boundary: &Boundary,
    width: u32,
    height: u32,
    tracks: impl IntoIterator<Item = &'a Track>,
) -> Vec<DrawOp> {
    let (w, h) = (width as i32, height as i32);
    let mut ops = vec![
        DrawOp::line(boundary.lane_split_x, 0, boundary.lane_split_x, h, Rgb::YELLOW, 2),
        DrawOp::line(0, boundary.entry_y, w, boundary.entry_y, Rgb::GREEN, 1),
        DrawOp::line(0, boundary.exit_y, w, boundary.exit_y, Rgb::RED, 1),
        DrawOp::text(10, boundary.entry_y - 10, "Entry Line", Rgb::GREEN, 0.5),
        DrawOp::text(10, boundary.exit_y + 20, "Exit Line", Rgb::RED, 0.5),
    ];

    for t in tracks {
        let color = lane_color(t.lane);
        let b = t.bbox;
        ops.push(DrawOp::rect(b.x1, b.y1, b.x2, b.y2, color));
        ops.push(DrawOp::text(b.x1, b.y1 - 20, format!("ID: {}", t.id), color, 0.5));
        ops.push(DrawOp::text(b.x1, b.y1 - 5, t.lane.as_str(), color, 0.5));
    }
    ops
}

/// Every detection of the frame, tracked class in green, the rest in blue.
pub fn occupancy(dets: &[Detection], tracked_class: &str) -> Vec<DrawOp> {
    let mut ops = Vec::with_capacity(dets.len() * 2);
    for d in dets {
        let color = if d.label == tracked_class { Rgb::GREEN } else { Rgb::BLUE };
        ops.push(DrawOp::rect(d.x1, d.y1, d.x2, d.y2, color));
        ops.push(DrawOp::text(d.x1, d.y1 - 5, d.label.clone(), color, 0.5));
    }
    ops
}

use crate::BBox;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Integer box center, rounding toward negative infinity.
pub fn centroid(b: &BBox) -> Point {
    Point {
        x: (b.x1 + b.x2).div_euclid(2),
        y: (b.y1 + b.y2).div_euclid(2),
    }
}

pub fn distance_sq(a: Point, b: Point) -> i64 {
    let dx = (a.x - b.x) as i64;
    let dy = (a.y - b.y) as i64;
    dx * dx + dy * dy
}

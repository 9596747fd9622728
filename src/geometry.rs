use serde::{Deserialize, Serialize};

/// Map distance a marker covers in one second of round time
pub const PIXELS_PER_SECOND: f64 = 45.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

impl From<(f64, f64)> for Point {
    fn from(v: (f64, f64)) -> Self {
        Point { x: v.0, y: v.1 }
    }
}

impl From<Point> for (f64, f64) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

/// Whole seconds needed to walk from (x1, y1) to (x2, y2).
///
/// Rounds half away from zero, so a zero-length segment costs nothing and a
/// 22.5px hop already costs a full second.
pub fn segment_duration(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    let distance = (x2 - x1).hypot(y2 - y1);
    (distance / PIXELS_PER_SECOND).round()
}

/// Linear interpolation between two points, `progress` clamped to [0, 1]
pub fn interpolate(from: Point, to: Point, progress: f64) -> Point {
    let progress = if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    };

    Point {
        x: from.x + (to.x - from.x) * progress,
        y: from.y + (to.y - from.y) * progress,
    }
}

/// Shortest distance from `p` to the segment `a`-`b`
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;

    if len_sq == 0.0 {
        return p.distance_to(a);
    }

    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance_to(Point::new(a.x + t * dx, a.y + t * dy))
}

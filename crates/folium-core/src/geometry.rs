//! Image-space geometry.
//!
//! Points and polygons are expressed in image pixels. On-screen coordinates are
//! derived through [`ScaleTransform`] (image to displayed size) and the viewport
//! transform owned by the editor crate.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// A point in image-pixel space.
///
/// Serialized as a `[x, y]` pair, which is how the document service encodes
/// baselines and masks.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Rotates the point by `angle` radians around `center`.
    pub fn rotate_around(&self, center: &Point, angle: f64) -> Point {
        let (sin, cos) = angle.sin_cos();
        let dx = self.x - center.x;
        let dy = self.y - center.y;
        Point::new(center.x + dx * cos - dy * sin, center.y + dx * sin + dy * cos)
    }
}

impl From<[f64; 2]> for Point {
    fn from(p: [f64; 2]) -> Self {
        Point::new(p[0], p[1])
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Normalized box spanned by two corners given in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self::new(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y))
    }

    /// Bounding box of a point sequence, `None` when empty.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = Bounds::new(first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            bounds.min_x = bounds.min_x.min(p.x);
            bounds.min_y = bounds.min_y.min(p.y);
            bounds.max_x = bounds.max_x.max(p.x);
            bounds.max_y = bounds.max_y.max(p.y);
        }
        Some(bounds)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    pub fn expand(&self, margin: f64) -> Bounds {
        Bounds::new(
            self.min_x - margin,
            self.min_y - margin,
            self.max_x + margin,
            self.max_y + margin,
        )
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.min_x, self.min_y),
            Point::new(self.max_x, self.min_y),
            Point::new(self.max_x, self.max_y),
            Point::new(self.min_x, self.max_y),
        ]
    }
}

/// Signed area of a polygon (shoelace formula).
///
/// Positive for counter-clockwise winding in a y-up frame, which is clockwise
/// on screen where y grows downwards.
pub fn signed_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        sum += p.x * q.y - q.x * p.y;
    }
    sum / 2.0
}

/// Even-odd point-in-polygon test for a closed outline.
pub fn polygon_contains(points: &[Point], p: &Point) -> bool {
    if points.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let (a, b) = (&points[i], &points[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Closest point on segment `a`-`b` to `p`, with the segment parameter `t`.
pub fn project_on_segment(p: &Point, a: &Point, b: &Point) -> (Point, f64) {
    let ab = *b - *a;
    let len_sq = ab.x * ab.x + ab.y * ab.y;
    if len_sq < 1e-12 {
        return (*a, 0.0);
    }
    let t = (((p.x - a.x) * ab.x + (p.y - a.y) * ab.y) / len_sq).clamp(0.0, 1.0);
    (*a + ab * t, t)
}

/// Result of projecting a point onto a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathProjection {
    /// The closest point on the path.
    pub point: Point,
    /// Index of the segment start vertex; the segment ends at `segment + 1`
    /// (wrapping to 0 for the closing edge of a closed path).
    pub segment: usize,
    /// Distance from the query point to `point`.
    pub distance: f64,
}

/// Nearest point on a polyline (or closed outline when `closed`).
///
/// Ties keep the earliest segment. Returns `None` for paths with fewer than
/// two points.
pub fn nearest_point_on_path(path: &[Point], p: &Point, closed: bool) -> Option<PathProjection> {
    if path.len() < 2 {
        return None;
    }
    let segment_count = if closed && path.len() > 2 {
        path.len()
    } else {
        path.len() - 1
    };
    let mut best: Option<PathProjection> = None;
    for i in 0..segment_count {
        let a = &path[i];
        let b = &path[(i + 1) % path.len()];
        let (point, _) = project_on_segment(p, a, b);
        let distance = point.distance_to(p);
        if best.map_or(true, |current| distance < current.distance) {
            best = Some(PathProjection {
                point,
                segment: i,
                distance,
            });
        }
    }
    best
}

/// Intersection point of segments `p1`-`p2` and `q1`-`q2`, if they cross.
pub fn segment_intersection(p1: &Point, p2: &Point, q1: &Point, q2: &Point) -> Option<Point> {
    let r = *p2 - *p1;
    let s = *q2 - *q1;
    let denom = r.x * s.y - r.y * s.x;
    if denom.abs() < 1e-12 {
        return None;
    }
    let qp = *q1 - *p1;
    let t = (qp.x * s.y - qp.y * s.x) / denom;
    let u = (qp.x * r.y - qp.y * r.x) / denom;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(*p1 + r * t)
    } else {
        None
    }
}

/// Whether a path (or closed outline) touches a rectangle.
pub fn path_intersects_rect(path: &[Point], rect: &Bounds, closed: bool) -> bool {
    let Some(bounds) = Bounds::from_points(path) else {
        return false;
    };
    if !bounds.intersects(rect) {
        return false;
    }
    if path.iter().any(|p| rect.contains(p)) {
        return true;
    }
    let corners = rect.corners();
    let edges = [
        (corners[0], corners[1]),
        (corners[1], corners[2]),
        (corners[2], corners[3]),
        (corners[3], corners[0]),
    ];
    let segment_count = if closed && path.len() > 2 {
        path.len()
    } else {
        path.len().saturating_sub(1)
    };
    for i in 0..segment_count {
        let a = &path[i];
        let b = &path[(i + 1) % path.len()];
        if edges
            .iter()
            .any(|(c, d)| segment_intersection(a, b, c, d).is_some())
        {
            return true;
        }
    }
    // Rectangle entirely inside a closed outline.
    closed && polygon_contains(path, &corners[0])
}

fn perpendicular_distance(p: &Point, start: &Point, end: &Point) -> f64 {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq < 1e-12 {
        return p.distance_to(start);
    }
    ((dx * (start.y - p.y) - (start.x - p.x) * dy).abs()) / len_sq.sqrt()
}

/// Ramer-Douglas-Peucker polyline simplification.
///
/// Keeps both endpoints; the result never has more points than the input.
pub fn simplify(points: &[Point], tolerance: f64) -> Vec<Point> {
    if points.len() <= 2 {
        return points.to_vec();
    }
    let first = points[0];
    let last = points[points.len() - 1];

    let mut max_dist = 0.0;
    let mut max_idx = 0;
    for (i, p) in points.iter().enumerate().take(points.len() - 1).skip(1) {
        let dist = perpendicular_distance(p, &first, &last);
        if dist > max_dist {
            max_dist = dist;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        let mut left = simplify(&points[..=max_idx], tolerance);
        let right = simplify(&points[max_idx..], tolerance);
        left.pop();
        left.extend(right);
        left
    } else {
        vec![first, last]
    }
}

/// Uniform scale between image pixels and the displayed (unzoomed) image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleTransform {
    /// Displayed pixels per image pixel.
    pub ratio: f64,
}

impl ScaleTransform {
    pub fn new(ratio: f64) -> Self {
        Self { ratio }
    }

    /// Ratio that fits an image of `image_width` into `display_width`.
    pub fn fit_width(image_width: f64, display_width: f64) -> Self {
        if image_width <= 0.0 {
            return Self::identity();
        }
        Self::new(display_width / image_width)
    }

    pub fn identity() -> Self {
        Self::new(1.0)
    }

    pub fn to_screen(&self, p: &Point) -> Point {
        *p * self.ratio
    }

    pub fn to_image(&self, p: &Point) -> Point {
        *p * (1.0 / self.ratio)
    }

    pub fn path_to_screen(&self, path: &[Point]) -> Vec<Point> {
        path.iter().map(|p| self.to_screen(p)).collect()
    }

    /// Converts a screen distance (e.g. a hit tolerance) to image pixels.
    pub fn length_to_image(&self, length: f64) -> f64 {
        length / self.ratio
    }
}

impl Default for ScaleTransform {
    fn default() -> Self {
        Self::identity()
    }
}

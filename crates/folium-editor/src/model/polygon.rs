//! Ordered point sequences used for baselines, masks and region outlines.

use folium_core::geometry::{self, Bounds, Point};
use serde::{Deserialize, Serialize};

/// Ordered sequence of image-space points.
///
/// Order defines path direction. Point insertion does no deduplication, so
/// zero-length segments are allowed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Axis-aligned rectangle outline, clockwise from `a`'s corner.
    pub fn rectangle(a: Point, b: Point) -> Self {
        Self::new(Bounds::from_corners(a, b).corners().to_vec())
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&Point> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&Point> {
        self.points.last()
    }

    pub fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    /// Inserts `point` before `index`; `index == len` appends.
    pub fn insert_point(&mut self, index: usize, point: Point) -> bool {
        if index > self.points.len() {
            return false;
        }
        self.points.insert(index, point);
        true
    }

    /// Removes an interior point. Endpoints are never removed.
    pub fn delete_point(&mut self, index: usize) -> bool {
        if index == 0 || index + 1 >= self.points.len() {
            return false;
        }
        self.points.remove(index);
        true
    }

    pub fn move_point(&mut self, index: usize, point: Point) -> bool {
        match self.points.get_mut(index) {
            Some(p) => {
                *p = point;
                true
            }
            None => false,
        }
    }

    pub fn translate(&mut self, delta: Point) {
        for p in &mut self.points {
            *p = *p + delta;
        }
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.points)
    }

    /// Signed area of the closed outline (positive when counter-clockwise
    /// in a y-up frame).
    pub fn area(&self) -> f64 {
        geometry::signed_area(&self.points)
    }

    /// Reduces the point count with the given tolerance. Returns true when
    /// points were dropped.
    pub fn simplify(&mut self, tolerance: f64) -> bool {
        let simplified = geometry::simplify(&self.points, tolerance);
        if simplified.len() == self.points.len() {
            return false;
        }
        self.points = simplified;
        true
    }

    /// Splits the path at the first crossing with the segment `a`-`b`.
    ///
    /// Returns the part up to the crossing and the part after it; both
    /// contain the crossing point.
    pub fn split_at_crossing(&self, a: &Point, b: &Point) -> Option<(Polygon, Polygon)> {
        for (i, pair) in self.points.windows(2).enumerate() {
            if let Some(x) = geometry::segment_intersection(&pair[0], &pair[1], a, b) {
                if x == self.points[0] || x == self.points[self.points.len() - 1] {
                    continue;
                }
                let mut head = self.points[..=i].to_vec();
                head.push(x);
                let mut tail = vec![x];
                tail.extend_from_slice(&self.points[i + 1..]);
                return Some((Polygon::new(head), Polygon::new(tail)));
            }
        }
        None
    }
}

impl From<Vec<Point>> for Polygon {
    fn from(points: Vec<Point>) -> Self {
        Self::new(points)
    }
}

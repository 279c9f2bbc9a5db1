//! Freehand item: an open stroke through sampled pointer positions.

use super::polygon::localize;
use super::{ItemId, ItemMeta, ItemStyle, ItemTrait, Transform};
use kurbo::{BezPath, Point};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A freehand drawing. Points are relative to `transform.position`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Freehand {
    pub(crate) id: ItemId,
    pub transform: Transform,
    pub points: Vec<Point>,
    pub style: ItemStyle,
    #[serde(default)]
    pub meta: ItemMeta,
}

impl Freehand {
    /// Build from sampled page-space points. Returns `None` with fewer than two.
    pub fn from_page_points(points: &[Point]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let (transform, points) = localize(points)?;
        Some(Self {
            id: Uuid::new_v4(),
            transform,
            points,
            style: Self::default_style(),
            meta: ItemMeta::default(),
        })
    }

    /// Get the number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the path is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Drop redundant points, then re-anchor the transform on the remaining bbox.
    pub fn simplify(&mut self, tolerance: f64) {
        if self.points.len() < 3 {
            return;
        }
        let origin = self.transform.position.to_vec2();
        let page: Vec<Point> = rdp_simplify(&self.points, tolerance)
            .into_iter()
            .map(|p| p + origin)
            .collect();
        if let Some((transform, points)) = localize(&page) {
            self.transform.position = transform.position;
            self.transform.size = transform.size;
            self.points = points;
        }
    }
}

/// Ramer-Douglas-Peucker line simplification.
pub fn rdp_simplify(points: &[Point], tolerance: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let first = points[0];
    let last = points[points.len() - 1];

    let mut max_dist = 0.0;
    let mut max_index = 0;
    for (i, point) in points.iter().enumerate().skip(1).take(points.len() - 2) {
        let dist = perpendicular_distance(*point, first, last);
        if dist > max_dist {
            max_dist = dist;
            max_index = i;
        }
    }

    if max_dist > tolerance {
        let mut left = rdp_simplify(&points[..=max_index], tolerance);
        let right = rdp_simplify(&points[max_index..], tolerance);
        // Junction point appears in both halves.
        left.pop();
        left.extend(right);
        left
    } else {
        vec![first, last]
    }
}

fn perpendicular_distance(point: Point, line_start: Point, line_end: Point) -> f64 {
    let d = line_end - line_start;
    let len = d.hypot();
    if len < f64::EPSILON {
        return (point - line_start).hypot();
    }
    (point - line_start).cross(d).abs() / len
}

impl ItemTrait for Freehand {
    fn id(&self) -> ItemId {
        self.id
    }

    fn transform(&self) -> &Transform {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    fn style(&self) -> &ItemStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ItemStyle {
        &mut self.style
    }

    fn meta(&self) -> &ItemMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ItemMeta {
        &mut self.meta
    }

    fn local_path(&self) -> BezPath {
        let mut path = BezPath::new();
        let mut iter = self.points.iter();
        if let Some(first) = iter.next() {
            path.move_to(*first);
            for p in iter {
                path.line_to(*p);
            }
        }
        path
    }

    fn default_style() -> ItemStyle {
        ItemStyle::stroked(2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_two_points() {
        assert!(Freehand::from_page_points(&[Point::ZERO]).is_none());
        assert!(Freehand::from_page_points(&[Point::ZERO, Point::new(1.0, 1.0)]).is_some());
    }

    #[test]
    fn test_simplify_collinear() {
        let points: Vec<Point> = (0..10).map(|i| Point::new(10.0 + i as f64, 10.0)).collect();
        let mut stroke = Freehand::from_page_points(&points).unwrap();
        stroke.simplify(2.0);
        assert_eq!(stroke.len(), 2);
        assert_eq!(stroke.transform.position, Point::new(10.0, 10.0));
    }

    #[test]
    fn test_simplify_keeps_corner() {
        let simplified = rdp_simplify(
            &[
                Point::new(0.0, 0.0),
                Point::new(5.0, 0.1),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
            ],
            2.0,
        );
        assert_eq!(simplified.len(), 3);
        assert_eq!(simplified[1], Point::new(10.0, 0.0));
    }
}

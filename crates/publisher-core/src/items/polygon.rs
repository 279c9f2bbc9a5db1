//! Polygon item: a closed outline through a vertex list.

use super::{points_bounds, ItemId, ItemMeta, ItemStyle, ItemTrait, Transform};
use kurbo::{BezPath, Point, Size};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A closed polygon. Vertices are relative to `transform.position`, which is
/// the top-left corner of their bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub(crate) id: ItemId,
    pub transform: Transform,
    pub points: Vec<Point>,
    pub style: ItemStyle,
    #[serde(default)]
    pub meta: ItemMeta,
}

impl Polygon {
    /// Minimum number of vertices for a closed outline.
    pub const MIN_VERTICES: usize = 3;

    /// Build from vertices in page coordinates. Returns `None` with fewer than three.
    pub fn from_page_points(points: &[Point]) -> Option<Self> {
        if points.len() < Self::MIN_VERTICES {
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

    /// Vertices in page coordinates, ignoring rotation and flips.
    pub fn page_points(&self) -> Vec<Point> {
        let origin = self.transform.position.to_vec2();
        self.points.iter().map(|p| *p + origin).collect()
    }
}

/// Split page-space points into a transform at their bbox origin and local offsets.
pub(crate) fn localize(points: &[Point]) -> Option<(Transform, Vec<Point>)> {
    let bbox = points_bounds(points)?;
    let origin = bbox.origin();
    let local = points.iter().map(|p| (*p - origin).to_point()).collect();
    Some((
        Transform::new(origin, Size::new(bbox.width(), bbox.height())),
        local,
    ))
}

impl ItemTrait for Polygon {
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
            path.close_path();
        }
        path
    }

    fn default_style() -> ItemStyle {
        ItemStyle::filled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_three_vertices() {
        assert!(Polygon::from_page_points(&[Point::ZERO, Point::new(1.0, 1.0)]).is_none());
    }

    #[test]
    fn test_points_normalized_to_bbox_origin() {
        let poly = Polygon::from_page_points(&[
            Point::new(20.0, 30.0),
            Point::new(60.0, 30.0),
            Point::new(40.0, 70.0),
        ])
        .unwrap();
        assert_eq!(poly.transform.position, Point::new(20.0, 30.0));
        assert_eq!(poly.points[0], Point::ZERO);
        assert_eq!(poly.points[2], Point::new(20.0, 40.0));
        assert!((poly.transform.size.width - 40.0).abs() < f64::EPSILON);
        assert_eq!(poly.page_points()[1], Point::new(60.0, 30.0));
    }
}

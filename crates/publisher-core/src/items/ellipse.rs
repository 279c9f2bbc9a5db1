//! Ellipse item.

use super::{ItemId, ItemMeta, ItemStyle, ItemTrait, Transform};
use kurbo::{BezPath, Point, Rect, Shape as KurboShape, Size};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An ellipse inscribed in its transform box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub(crate) id: ItemId,
    pub transform: Transform,
    pub style: ItemStyle,
    #[serde(default)]
    pub meta: ItemMeta,
}

impl Ellipse {
    /// Create an ellipse filling the given box.
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            transform: Transform::new(position, Size::new(width, height)),
            style: Self::default_style(),
            meta: ItemMeta::default(),
        }
    }

    /// Create an ellipse from center and radii.
    pub fn from_center(center: Point, radius_x: f64, radius_y: f64) -> Self {
        Self::new(
            Point::new(center.x - radius_x, center.y - radius_y),
            radius_x * 2.0,
            radius_y * 2.0,
        )
    }

    pub fn from_corners(p1: Point, p2: Point) -> Self {
        let rect = Rect::from_points(p1, p2);
        Self::new(rect.origin(), rect.width(), rect.height())
    }
}

impl ItemTrait for Ellipse {
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
        kurbo::Ellipse::from_rect(self.local_bounds()).to_path(0.1)
    }

    fn default_style() -> ItemStyle {
        ItemStyle::filled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_center() {
        let e = Ellipse::from_center(Point::new(50.0, 50.0), 20.0, 10.0);
        assert!((e.transform.position.x - 30.0).abs() < f64::EPSILON);
        assert!((e.transform.position.y - 40.0).abs() < f64::EPSILON);
        assert!((e.transform.size.width - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_path_fits_box() {
        let e = Ellipse::new(Point::ZERO, 80.0, 40.0);
        let bbox = e.local_path().bounding_box();
        assert!((bbox.width() - 80.0).abs() < 1e-6);
        assert!((bbox.height() - 40.0).abs() < 1e-6);
    }
}

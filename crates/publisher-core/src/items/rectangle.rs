//! Rectangle item.

use super::{ItemId, ItemMeta, ItemStyle, ItemTrait, Transform};
use kurbo::{BezPath, Point, Rect, RoundedRect, Shape as KurboShape, Size};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A rectangle with optional rounded corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub(crate) id: ItemId,
    pub transform: Transform,
    /// Corner radius (0 = sharp corners).
    #[serde(default)]
    pub corner_radius: f64,
    pub style: ItemStyle,
    #[serde(default)]
    pub meta: ItemMeta,
}

impl Rectangle {
    /// Create a new rectangle.
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            transform: Transform::new(position, Size::new(width, height)),
            corner_radius: 0.0,
            style: Self::default_style(),
            meta: ItemMeta::default(),
        }
    }

    /// Create a rectangle from two corner points.
    pub fn from_corners(p1: Point, p2: Point) -> Self {
        let rect = Rect::from_points(p1, p2);
        Self::new(rect.origin(), rect.width(), rect.height())
    }

    pub fn with_corner_radius(mut self, radius: f64) -> Self {
        self.corner_radius = radius.max(0.0);
        self
    }
}

impl ItemTrait for Rectangle {
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
        let rect = self.local_bounds();
        // Radius can never exceed half the shorter side.
        let max_radius = rect.width().min(rect.height()) / 2.0;
        let radius = self.corner_radius.min(max_radius);
        if radius > 0.0 {
            RoundedRect::from_rect(rect, radius).to_path(0.1)
        } else {
            rect.to_path(0.1)
        }
    }

    fn default_style() -> ItemStyle {
        ItemStyle::filled()
    }
}

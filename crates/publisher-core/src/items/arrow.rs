//! Arrow item: a line with a head at its end point.

use super::line::{resized_end, segment_bounds};
use super::{ItemId, ItemMeta, ItemStyle, ItemTrait, Transform};
use kurbo::{BezPath, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_head_size() -> f64 {
    Arrow::DEFAULT_HEAD_SIZE
}

/// An arrow from `transform.position` to `end` (page coordinates).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arrow {
    pub(crate) id: ItemId,
    pub transform: Transform,
    pub end: Point,
    /// Length of the arrowhead legs.
    #[serde(default = "default_head_size")]
    pub head_size: f64,
    pub style: ItemStyle,
    #[serde(default)]
    pub meta: ItemMeta,
}

impl Arrow {
    pub const DEFAULT_HEAD_SIZE: f64 = 12.0;

    pub fn new(start: Point, end: Point) -> Self {
        Self {
            id: Uuid::new_v4(),
            transform: Transform::new(start, Size::ZERO),
            end,
            head_size: Self::DEFAULT_HEAD_SIZE,
            style: Self::default_style(),
            meta: ItemMeta::default(),
        }
    }

    pub fn start(&self) -> Point {
        self.transform.position
    }

    /// Unit direction from start to end, or +x for a zero-length arrow.
    pub fn direction(&self) -> Vec2 {
        let d = self.end - self.start();
        let len = d.hypot();
        if len > f64::EPSILON {
            d / len
        } else {
            Vec2::new(1.0, 0.0)
        }
    }

    pub(crate) fn set_extent(&mut self, size: Size) {
        self.end = resized_end(self.start(), self.end, size);
    }
}

impl ItemTrait for Arrow {
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
        let tip = (self.end - self.start()).to_point();
        if tip == Point::ZERO {
            return path;
        }
        path.move_to(Point::ZERO);
        path.line_to(tip);

        let dir = self.direction();
        let perp = Vec2::new(-dir.y, dir.x);
        let back = tip - dir * self.head_size;
        path.move_to(tip);
        path.line_to(back + perp * self.head_size * 0.5);
        path.move_to(tip);
        path.line_to(back - perp * self.head_size * 0.5);
        path
    }

    fn local_bounds(&self) -> Rect {
        segment_bounds(self.start(), self.end)
    }

    fn default_style() -> ItemStyle {
        ItemStyle::stroked(1.0)
    }
}

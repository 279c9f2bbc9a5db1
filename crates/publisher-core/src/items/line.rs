//! Line item.

use super::{ItemId, ItemMeta, ItemStyle, ItemTrait, Transform};
use kurbo::{BezPath, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A straight segment. The start point is `transform.position`; `end` is in
/// page coordinates. The transform size is unused and stays zero, so rotation
/// and flips pivot on the start point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub(crate) id: ItemId,
    pub transform: Transform,
    pub end: Point,
    pub style: ItemStyle,
    #[serde(default)]
    pub meta: ItemMeta,
}

impl Line {
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            id: Uuid::new_v4(),
            transform: Transform::new(start, Size::ZERO),
            end,
            style: Self::default_style(),
            meta: ItemMeta::default(),
        }
    }

    pub fn start(&self) -> Point {
        self.transform.position
    }

    /// Get the length of the line.
    pub fn length(&self) -> f64 {
        (self.end - self.start()).hypot()
    }

    pub(crate) fn set_extent(&mut self, size: Size) {
        self.end = resized_end(self.start(), self.end, size);
    }
}

/// Move `end` so the segment spans `size`, keeping its direction signs.
pub(crate) fn resized_end(start: Point, end: Point, size: Size) -> Point {
    let delta = end - start;
    let sx = if delta.x < 0.0 { -1.0 } else { 1.0 };
    let sy = if delta.y < 0.0 { -1.0 } else { 1.0 };
    start + Vec2::new(sx * size.width, sy * size.height)
}

/// Local box spanned by a segment starting at the origin.
pub(crate) fn segment_bounds(start: Point, end: Point) -> Rect {
    Rect::from_points(Point::ZERO, (end - start).to_point())
}

impl ItemTrait for Line {
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
        path.move_to(Point::ZERO);
        path.line_to((self.end - self.start()).to_point());
        path
    }

    fn local_bounds(&self) -> Rect {
        segment_bounds(self.start(), self.end)
    }

    fn default_style() -> ItemStyle {
        ItemStyle::stroked(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::Item;

    #[test]
    fn test_line_length() {
        let line = Line::new(Point::new(0.0, 0.0), Point::new(3.0, 4.0));
        assert!((line.length() - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_line_bounds_any_direction() {
        let line = Item::Line(Line::new(Point::new(50.0, 50.0), Point::new(10.0, 80.0)));
        let bounds = line.bounds();
        assert!((bounds.x0 - 10.0).abs() < f64::EPSILON);
        assert!((bounds.y0 - 50.0).abs() < f64::EPSILON);
        assert!((bounds.x1 - 50.0).abs() < f64::EPSILON);
        assert!((bounds.y1 - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_set_extent_keeps_direction() {
        let mut line = Line::new(Point::new(10.0, 10.0), Point::new(0.0, 20.0));
        line.set_extent(Size::new(20.0, 20.0));
        assert_eq!(line.end, Point::new(-10.0, 30.0));
    }

    #[test]
    fn test_no_fill_by_default() {
        assert!(Line::default_style().fill_color.is_none());
    }
}

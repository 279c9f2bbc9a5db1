//! Selection set and the manipulation handles drawn around it.

use crate::document::Page;
use crate::items::ItemId;
use kurbo::{Point, Rect};

/// Handle hit tolerance in points.
pub const HANDLE_HIT_TOLERANCE: f64 = 6.0;

/// Distance of the rotate handle above the top edge, in points.
pub const ROTATE_HANDLE_OFFSET: f64 = 20.0;

/// Ordered set of selected item ids on the current page.
///
/// Order is the order of selection, which is what alignment uses as the
/// reference item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<ItemId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[ItemId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.ids.contains(&id)
    }

    /// The only selected id, if exactly one is selected.
    pub fn single(&self) -> Option<ItemId> {
        match self.ids.as_slice() {
            [id] => Some(*id),
            _ => None,
        }
    }

    /// Replace the selection.
    pub fn set(&mut self, ids: impl IntoIterator<Item = ItemId>) {
        self.ids.clear();
        for id in ids {
            self.add(id);
        }
    }

    pub fn add(&mut self, id: ItemId) {
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
    }

    /// Add if absent, remove if present.
    pub fn toggle(&mut self, id: ItemId) {
        if let Some(pos) = self.ids.iter().position(|s| *s == id) {
            self.ids.remove(pos);
        } else {
            self.ids.push(id);
        }
    }

    pub fn remove(&mut self, id: ItemId) {
        self.ids.retain(|s| *s != id);
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drop ids that no longer exist on `page`. Returns whether anything was dropped.
    pub fn retain_existing(&mut self, page: &Page) -> bool {
        let before = self.ids.len();
        self.ids.retain(|id| page.contains(*id));
        self.ids.len() != before
    }

    /// Union of the selected items' bounds.
    pub fn bounds(&self, page: &Page) -> Option<Rect> {
        page.bounds_of(&self.ids)
    }
}

/// Position of the resize handle for an item box: its bottom-right corner.
pub fn resize_handle(bounds: Rect) -> Point {
    Point::new(bounds.x1, bounds.y1)
}

/// Check if `point` hits the resize handle of `bounds`.
pub fn hits_resize_handle(bounds: Rect, point: Point) -> bool {
    (point - resize_handle(bounds)).hypot() <= HANDLE_HIT_TOLERANCE
}

/// Position of the rotate handle: centred above the top edge.
pub fn rotate_handle(bounds: Rect) -> Point {
    Point::new(bounds.center().x, bounds.y0 - ROTATE_HANDLE_OFFSET)
}

pub fn hits_rotate_handle(bounds: Rect, point: Point) -> bool {
    (point - rotate_handle(bounds)).hypot() <= HANDLE_HIT_TOLERANCE
}

/// Index of the vertex handle under `point`, nearest first.
pub fn vertex_handle_at(vertices: &[Point], point: Point) -> Option<usize> {
    vertices
        .iter()
        .enumerate()
        .map(|(index, vertex)| (index, (point - *vertex).hypot()))
        .filter(|(_, distance)| *distance <= HANDLE_HIT_TOLERANCE)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(index, _)| index)
}

/// The outermost group containing `id`, or `id` itself when it is top-level.
pub fn top_level_ancestor(page: &Page, id: ItemId) -> ItemId {
    let mut current = id;
    // Bounded by page length so a malformed cycle cannot spin forever.
    for _ in 0..page.len() {
        match page.groups_referencing(current).first() {
            Some(parent) => current = *parent,
            None => break,
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::new_item_id;

    #[test]
    fn test_set_dedupes_and_keeps_order() {
        let a = new_item_id();
        let b = new_item_id();
        let mut selection = Selection::new();
        selection.set([b, a, b]);
        assert_eq!(selection.ids(), &[b, a]);
        assert_eq!(selection.single(), None);
    }

    #[test]
    fn test_toggle() {
        let a = new_item_id();
        let mut selection = Selection::new();
        selection.toggle(a);
        assert_eq!(selection.single(), Some(a));
        selection.toggle(a);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_handle_hit() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 50.0);
        assert!(hits_resize_handle(bounds, Point::new(103.0, 52.0)));
        assert!(!hits_resize_handle(bounds, Point::new(50.0, 25.0)));
        assert_eq!(rotate_handle(bounds), Point::new(50.0, -20.0));
        assert!(hits_rotate_handle(bounds, Point::new(52.0, -18.0)));
        assert!(!hits_rotate_handle(bounds, Point::new(50.0, 0.0)));
    }

    #[test]
    fn test_vertex_handle_prefers_nearest() {
        let vertices = [Point::new(0.0, 0.0), Point::new(4.0, 0.0), Point::new(50.0, 50.0)];
        assert_eq!(vertex_handle_at(&vertices, Point::new(3.0, 0.0)), Some(1));
        assert_eq!(vertex_handle_at(&vertices, Point::new(-1.0, 0.0)), Some(0));
        assert_eq!(vertex_handle_at(&vertices, Point::new(25.0, 25.0)), None);
    }
}

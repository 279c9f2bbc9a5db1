//! Group item: references sibling records on the same page by id.

use super::{ItemId, ItemMeta, ItemStyle, ItemTrait, Transform};
use kurbo::{BezPath, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A group of items that are manipulated as a single unit.
///
/// Children stay in the page's item list; the group only holds their ids.
/// Its transform caches the union of the children's bounds and is refreshed
/// whenever children change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub(crate) id: ItemId,
    pub transform: Transform,
    pub child_ids: Vec<ItemId>,
    pub style: ItemStyle,
    #[serde(default)]
    pub meta: ItemMeta,
}

impl Group {
    /// Create a new group referencing the given children.
    pub fn new(child_ids: Vec<ItemId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            transform: Transform::default(),
            child_ids,
            style: Self::default_style(),
            meta: ItemMeta::default(),
        }
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.child_ids.contains(&id)
    }

    /// Set the cached box to the union of the children's bounds.
    pub fn fit_to(&mut self, child_bounds: impl IntoIterator<Item = Rect>) {
        let union = child_bounds.into_iter().reduce(|acc, r| acc.union(r));
        if let Some(rect) = union {
            self.transform.position = rect.origin();
            self.transform.size = rect.size();
            self.transform.rotation = 0.0;
            self.transform.flip_h = false;
            self.transform.flip_v = false;
        }
    }
}

impl ItemTrait for Group {
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
        self.local_bounds().to_path(0.1)
    }

    fn default_style() -> ItemStyle {
        ItemStyle::unpainted()
    }
}

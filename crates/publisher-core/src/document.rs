//! Document and page containers.
//!
//! Mutators here are crate-private: outside callers change a document only
//! through [`crate::commands`], so every mutation is undoable.

use crate::error::{EditorError, EditorResult};
use crate::items::{Item, ItemId};
use crate::serializer::copy_with_fresh_ids;
use crate::units::{PageSize, Unit};
use chrono::{DateTime, Utc};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Current persisted format version.
pub const FORMAT_VERSION: u32 = 1;

fn default_page_name() -> String {
    "Page".to_string()
}

/// A single page: an ordered item list (index = z-order, back to front).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default = "default_page_name")]
    pub name: String,
    #[serde(default)]
    pub size: PageSize,
    #[serde(default)]
    pub(crate) items: Vec<Item>,
}

impl Default for Page {
    fn default() -> Self {
        Self::new(PageSize::INFINITE)
    }
}

impl Page {
    pub fn new(size: PageSize) -> Self {
        Self {
            name: default_page_name(),
            size,
            items: Vec::new(),
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    pub fn index_of(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.index_of(id).is_some()
    }

    /// Ids of groups whose `child_ids` mention `id`.
    pub fn groups_referencing(&self, id: ItemId) -> Vec<ItemId> {
        self.items
            .iter()
            .filter(|item| item.referenced_ids().contains(&id))
            .map(Item::id)
            .collect()
    }

    /// Check that every reference resolves on this page.
    pub fn validate_references(&self) -> EditorResult<()> {
        for item in &self.items {
            self.check_references(item)?;
        }
        Ok(())
    }

    fn check_references(&self, item: &Item) -> EditorResult<()> {
        if let Some(missing) = item
            .referenced_ids()
            .iter()
            .find(|id| !self.contains(**id))
        {
            return Err(EditorError::DanglingReference {
                group: item.id(),
                missing: *missing,
            });
        }
        // Reaching `item` again from its own children means a cycle.
        if self.with_descendants(item.referenced_ids()).contains(&item.id()) {
            return Err(EditorError::ReferenceCycle(item.id()));
        }
        Ok(())
    }

    /// Topmost visible item whose bounds contain `point`.
    pub fn item_at(&self, point: Point, tolerance: f64) -> Option<&Item> {
        self.items
            .iter()
            .rev()
            .find(|item| item.meta().visible && item.hit_test(point, tolerance))
    }

    /// Visible items entirely inside `rect`, in z-order.
    pub fn items_in_rect(&self, rect: Rect) -> Vec<ItemId> {
        self.items
            .iter()
            .filter(|item| item.meta().visible)
            .filter(|item| {
                let b = item.bounds();
                rect.contains(b.origin()) && rect.contains(Point::new(b.x1, b.y1))
            })
            .map(Item::id)
            .collect()
    }

    /// Union of the bounds of the given items that exist on this page.
    pub fn bounds_of(&self, ids: &[ItemId]) -> Option<Rect> {
        ids.iter()
            .filter_map(|id| self.item(*id))
            .map(Item::bounds)
            .reduce(|a, b| a.union(b))
    }

    /// Top-level items: those not referenced by any group.
    pub fn top_level(&self) -> impl Iterator<Item = &Item> {
        self.items
            .iter()
            .filter(|item| self.groups_referencing(item.id()).is_empty())
    }

    /// `ids` plus every id reachable through group references, without duplicates.
    pub fn with_descendants(&self, ids: &[ItemId]) -> Vec<ItemId> {
        let mut out: Vec<ItemId> = Vec::new();
        let mut stack: Vec<ItemId> = ids.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if out.contains(&id) {
                continue;
            }
            out.push(id);
            if let Some(item) = self.item(id) {
                stack.extend(item.referenced_ids().iter().rev());
            }
        }
        out
    }

    pub(crate) fn insert_item(&mut self, index: usize, item: Item) -> EditorResult<()> {
        if index > self.items.len() {
            return Err(EditorError::item_index(index, self.items.len()));
        }
        if self.contains(item.id()) {
            return Err(EditorError::InvalidOperation(format!(
                "item {} already exists",
                item.id()
            )));
        }
        self.check_references(&item)?;
        self.items.insert(index, item);
        Ok(())
    }

    pub(crate) fn remove_item(&mut self, index: usize) -> EditorResult<Item> {
        let Some(item) = self.items.get(index) else {
            return Err(EditorError::item_index(index, self.items.len()));
        };
        let owners = self.groups_referencing(item.id());
        if let Some(owner) = owners.first() {
            return Err(EditorError::InvalidOperation(format!(
                "item {} is still referenced by group {owner}",
                item.id()
            )));
        }
        Ok(self.items.remove(index))
    }

    /// Replace the record at `index` with a new version of the same item.
    pub(crate) fn replace_item(&mut self, index: usize, item: Item) -> EditorResult<Item> {
        let len = self.items.len();
        let Some(current) = self.items.get(index) else {
            return Err(EditorError::item_index(index, len));
        };
        if current.id() != item.id() {
            return Err(EditorError::InvalidOperation(format!(
                "replacement id {} does not match {}",
                item.id(),
                current.id()
            )));
        }
        self.check_references(&item)?;
        Ok(std::mem::replace(&mut self.items[index], item))
    }

    pub(crate) fn move_item(&mut self, from: usize, to: usize) -> EditorResult<()> {
        let len = self.items.len();
        if from >= len {
            return Err(EditorError::item_index(from, len));
        }
        if to >= len {
            return Err(EditorError::item_index(to, len));
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        Ok(())
    }

    /// Recompute every group's cached box from its children.
    ///
    /// Repeats until nested groups settle. Returns the ids of groups whose box
    /// changed.
    pub(crate) fn refresh_group_bounds(&mut self) -> Vec<ItemId> {
        let mut changed = Vec::new();
        for _ in 0..self.items.len() {
            let mut dirty = false;
            for index in 0..self.items.len() {
                let Some(group) = self.items[index].as_group() else {
                    continue;
                };
                let bounds: Vec<Rect> = group
                    .child_ids
                    .iter()
                    .filter_map(|id| self.item(*id))
                    .map(Item::bounds)
                    .collect();
                let before = *self.items[index].transform();
                if let Some(group) = self.items[index].as_group_mut() {
                    group.fit_to(bounds);
                }
                if *self.items[index].transform() != before {
                    dirty = true;
                    let id = self.items[index].id();
                    if !changed.contains(&id) {
                        changed.push(id);
                    }
                }
            }
            if !dirty {
                break;
            }
        }
        changed
    }
}

/// Top-level document: ordered pages plus display metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub format_version: u32,
    #[serde(default)]
    pub unit: Unit,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub modified_at: DateTime<Utc>,
    pub(crate) pages: Vec<Page>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document with one unbounded page.
    pub fn new() -> Self {
        Self::with_page_size(PageSize::INFINITE)
    }

    pub fn with_page_size(size: PageSize) -> Self {
        let now = Utc::now();
        Self {
            format_version: FORMAT_VERSION,
            unit: Unit::default(),
            created_at: now,
            modified_at: now,
            pages: vec![Page::new(size)],
        }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, index: usize) -> EditorResult<&Page> {
        self.pages
            .get(index)
            .ok_or_else(|| EditorError::page_index(index, self.pages.len()))
    }

    pub(crate) fn page_mut(&mut self, index: usize) -> EditorResult<&mut Page> {
        let len = self.pages.len();
        self.pages
            .get_mut(index)
            .ok_or_else(|| EditorError::page_index(index, len))
    }

    /// Locate an item: `(page index, item index)`.
    pub fn find_item(&self, id: ItemId) -> Option<(usize, usize)> {
        self.pages
            .iter()
            .enumerate()
            .find_map(|(p, page)| page.index_of(id).map(|i| (p, i)))
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.find_item(id)
            .and_then(|(p, i)| self.pages.get(p).and_then(|page| page.get(i)))
    }

    pub fn item_count(&self) -> usize {
        self.pages.iter().map(Page::len).sum()
    }

    /// Insert a page at `index` (append when `None`). Returns the index used.
    pub(crate) fn add_page(&mut self, index: Option<usize>, page: Page) -> EditorResult<usize> {
        let index = index.unwrap_or(self.pages.len());
        if index > self.pages.len() {
            return Err(EditorError::page_index(index, self.pages.len()));
        }
        if let Some(dup) = page.items.iter().find(|item| self.find_item(item.id()).is_some()) {
            return Err(EditorError::InvalidOperation(format!(
                "item {} already exists",
                dup.id()
            )));
        }
        page.validate_references()?;
        self.pages.insert(index, page);
        Ok(index)
    }

    pub(crate) fn remove_page(&mut self, index: usize) -> EditorResult<Page> {
        if index >= self.pages.len() {
            return Err(EditorError::page_index(index, self.pages.len()));
        }
        if self.pages.len() <= 1 {
            return Err(EditorError::InvalidOperation(
                "cannot remove the last page".to_string(),
            ));
        }
        Ok(self.pages.remove(index))
    }

    pub(crate) fn move_page(&mut self, from: usize, to: usize) -> EditorResult<()> {
        let len = self.pages.len();
        if from >= len {
            return Err(EditorError::page_index(from, len));
        }
        if to >= len {
            return Err(EditorError::page_index(to, len));
        }
        let page = self.pages.remove(from);
        self.pages.insert(to, page);
        Ok(())
    }

    /// Deep copy of a page with fresh item ids and remapped group references.
    /// The document itself is not changed.
    pub fn duplicate_page(&self, index: usize) -> EditorResult<Page> {
        let source = self.page(index)?;
        Ok(Page {
            name: format!("{} (copy)", source.name),
            size: source.size,
            items: copy_with_fresh_ids(&source.items),
        })
    }

    /// Set a page's size, returning the previous one.
    pub(crate) fn set_page_size(&mut self, index: usize, size: PageSize) -> EditorResult<PageSize> {
        let page = self.page_mut(index)?;
        Ok(std::mem::replace(&mut page.size, size))
    }

    /// Insert an item, rejecting ids already used anywhere in the document.
    pub(crate) fn insert_item(&mut self, page: usize, index: usize, item: Item) -> EditorResult<()> {
        if self.find_item(item.id()).is_some() {
            return Err(EditorError::InvalidOperation(format!(
                "item {} already exists",
                item.id()
            )));
        }
        self.page_mut(page)?.insert_item(index, item)
    }

    /// Stamp the modification time. Called on save only.
    pub(crate) fn touch(&mut self) {
        self.modified_at = Utc::now();
    }

    /// Check every page's references and document-wide id uniqueness.
    pub fn validate(&self) -> EditorResult<()> {
        let mut seen = std::collections::HashSet::new();
        for page in &self.pages {
            for item in &page.items {
                if !seen.insert(item.id()) {
                    return Err(EditorError::InvalidOperation(format!(
                        "duplicate item id {}",
                        item.id()
                    )));
                }
            }
            page.validate_references()?;
        }
        Ok(())
    }

    /// Bring every cached group box in line with its children.
    pub(crate) fn refresh_group_bounds(&mut self) -> usize {
        self.pages
            .iter_mut()
            .map(|page| page.refresh_group_bounds().len())
            .sum()
    }
}

//! Reversible document commands.

use crate::document::{Document, Page};
use crate::error::{EditorError, EditorResult};
use crate::items::{Item, ItemId};
use crate::scene::Change;
use crate::units::{PageSize, Unit};

/// A reversible document mutation.
///
/// Each variant carries enough before/after state that [`Command::inverse`]
/// undoes it exactly.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// An item was inserted at `index` on `page`.
    InsertItem { page: usize, index: usize, item: Item },
    /// The item at `index` on `page` was removed.
    RemoveItem { page: usize, index: usize, item: Item },
    /// An item's record changed. `before` and `after` share an id.
    UpdateItem { page: usize, before: Item, after: Item },
    /// Z-order change within a page.
    MoveItem { page: usize, from: usize, to: usize },
    InsertPage { index: usize, page: Page },
    RemovePage { index: usize, page: Page },
    MovePage { from: usize, to: usize },
    ResizePage { page: usize, before: PageSize, after: PageSize },
    SetUnit { before: Unit, after: Unit },
}

impl Command {
    /// The command that exactly reverts this one.
    pub fn inverse(&self) -> Command {
        match self {
            Command::InsertItem { page, index, item } => Command::RemoveItem {
                page: *page,
                index: *index,
                item: item.clone(),
            },
            Command::RemoveItem { page, index, item } => Command::InsertItem {
                page: *page,
                index: *index,
                item: item.clone(),
            },
            Command::UpdateItem { page, before, after } => Command::UpdateItem {
                page: *page,
                before: after.clone(),
                after: before.clone(),
            },
            Command::MoveItem { page, from, to } => Command::MoveItem {
                page: *page,
                from: *to,
                to: *from,
            },
            Command::InsertPage { index, page } => Command::RemovePage {
                index: *index,
                page: page.clone(),
            },
            Command::RemovePage { index, page } => Command::InsertPage {
                index: *index,
                page: page.clone(),
            },
            Command::MovePage { from, to } => Command::MovePage { from: *to, to: *from },
            Command::ResizePage { page, before, after } => Command::ResizePage {
                page: *page,
                before: *after,
                after: *before,
            },
            Command::SetUnit { before, after } => Command::SetUnit {
                before: *after,
                after: *before,
            },
        }
    }

    /// Default history label.
    pub fn label(&self) -> String {
        match self {
            Command::InsertItem { item, .. } => format!("Add {}", item.kind().tag()),
            Command::RemoveItem { item, .. } => format!("Delete {}", item.kind().tag()),
            Command::UpdateItem { after, .. } => format!("Edit {}", after.kind().tag()),
            Command::MoveItem { .. } => "Change Z-Order".to_string(),
            Command::InsertPage { .. } => "Add Page".to_string(),
            Command::RemovePage { .. } => "Delete Page".to_string(),
            Command::MovePage { .. } => "Move Page".to_string(),
            Command::ResizePage { .. } => "Resize Page".to_string(),
            Command::SetUnit { .. } => "Change Unit".to_string(),
        }
    }

    /// Page whose contents this command touches, if any.
    pub fn page(&self) -> Option<usize> {
        match self {
            Command::InsertItem { page, .. }
            | Command::RemoveItem { page, .. }
            | Command::UpdateItem { page, .. }
            | Command::MoveItem { page, .. }
            | Command::ResizePage { page, .. } => Some(*page),
            Command::InsertPage { index, .. } | Command::RemovePage { index, .. } => Some(*index),
            Command::MovePage { to, .. } => Some(*to),
            Command::SetUnit { .. } => None,
        }
    }

    /// Apply the forward mutation. On error the document is unchanged.
    pub(crate) fn apply(&self, document: &mut Document) -> EditorResult<Vec<Change>> {
        let changes = match self {
            Command::InsertItem { page, index, item } => {
                document.insert_item(*page, *index, item.clone())?;
                vec![Change::ItemInserted { page: *page, index: *index }]
            }
            Command::RemoveItem { page, index, item } => {
                let target = document.page_mut(*page)?;
                expect_item_at(target, *index, item.id())?;
                target.remove_item(*index)?;
                vec![Change::ItemRemoved { page: *page, index: *index }]
            }
            Command::UpdateItem { page, before, after } => {
                let target = document.page_mut(*page)?;
                let index = target
                    .index_of(before.id())
                    .ok_or(EditorError::ItemNotFound(before.id()))?;
                target.replace_item(index, after.clone())?;
                vec![Change::ItemUpdated { page: *page, id: after.id() }]
            }
            Command::MoveItem { page, from, to } => {
                document.page_mut(*page)?.move_item(*from, *to)?;
                vec![Change::ItemMoved { page: *page, from: *from, to: *to }]
            }
            Command::InsertPage { index, page } => {
                document.add_page(Some(*index), page.clone())?;
                vec![Change::PageInserted(*index)]
            }
            Command::RemovePage { index, page } => {
                if document.page(*index)? != page {
                    return Err(EditorError::InvalidOperation(format!(
                        "page {index} does not match the recorded page"
                    )));
                }
                document.remove_page(*index)?;
                vec![Change::PageRemoved(*index)]
            }
            Command::MovePage { from, to } => {
                document.move_page(*from, *to)?;
                vec![Change::PageMoved { from: *from, to: *to }]
            }
            Command::ResizePage { page, after, .. } => {
                document.set_page_size(*page, *after)?;
                vec![Change::PageResized(*page)]
            }
            Command::SetUnit { after, .. } => {
                document.unit = *after;
                vec![Change::UnitChanged]
            }
        };
        Ok(changes)
    }

    /// Updates that bring the group boxes on this command's page back in line
    /// with their children. Empty for page and unit commands.
    pub(crate) fn group_refresh(&self, document: &Document) -> EditorResult<Vec<Command>> {
        let Some(page) = self.item_page() else {
            return Ok(Vec::new());
        };
        let current = document.page(page)?;
        let mut settled = current.clone();
        let refreshed = settled.refresh_group_bounds();
        Ok(refreshed
            .into_iter()
            .filter_map(|id| {
                Some(Command::UpdateItem {
                    page,
                    before: current.item(id)?.clone(),
                    after: settled.item(id)?.clone(),
                })
            })
            .collect())
    }

    fn item_page(&self) -> Option<usize> {
        match self {
            Command::InsertItem { page, .. }
            | Command::RemoveItem { page, .. }
            | Command::UpdateItem { page, .. } => Some(*page),
            _ => None,
        }
    }

    /// Append `item` to the top of `page`.
    pub fn add_item(document: &Document, page: usize, item: Item) -> EditorResult<Command> {
        let index = document.page(page)?.len();
        Self::insert_item_at(document, page, index, item)
    }

    /// Insert `item` at a specific z-index on `page`.
    pub fn insert_item_at(
        document: &Document,
        page: usize,
        index: usize,
        item: Item,
    ) -> EditorResult<Command> {
        let len = document.page(page)?.len();
        if index > len {
            return Err(EditorError::item_index(index, len));
        }
        Ok(Command::InsertItem { page, index, item })
    }

    /// Remove the item with `id`, wherever it is.
    pub fn remove_item(document: &Document, id: ItemId) -> EditorResult<Command> {
        let (page, index) = document.find_item(id).ok_or(EditorError::ItemNotFound(id))?;
        let item = document.page(page)?.items()[index].clone();
        Ok(Command::RemoveItem { page, index, item })
    }

    /// Capture an edit: `edit` runs on a copy of the current record.
    pub fn update_item(
        document: &Document,
        id: ItemId,
        edit: impl FnOnce(&mut Item),
    ) -> EditorResult<Command> {
        let before = document.item(id).ok_or(EditorError::ItemNotFound(id))?.clone();
        let mut after = before.clone();
        edit(&mut after);
        Self::replace_item(document, before, after)
    }

    /// Capture a replacement record computed elsewhere (e.g. a committed gesture).
    pub fn replace_item(document: &Document, before: Item, after: Item) -> EditorResult<Command> {
        let id = before.id();
        if after.id() != id {
            return Err(EditorError::InvalidOperation(format!(
                "replacement id {} does not match {id}",
                after.id()
            )));
        }
        let (page, _) = document.find_item(id).ok_or(EditorError::ItemNotFound(id))?;
        Ok(Command::UpdateItem { page, before, after })
    }

    /// Move the item with `id` to z-index `to` on its page.
    pub fn reorder(document: &Document, id: ItemId, to: usize) -> EditorResult<Command> {
        let (page, from) = document.find_item(id).ok_or(EditorError::ItemNotFound(id))?;
        let len = document.page(page)?.len();
        if to >= len {
            return Err(EditorError::item_index(to, len));
        }
        Ok(Command::MoveItem { page, from, to })
    }

    /// Add an empty page at `index` (append when `None`).
    pub fn add_page(document: &Document, index: Option<usize>, size: PageSize) -> EditorResult<Command> {
        let count = document.page_count();
        let index = index.unwrap_or(count);
        if index > count {
            return Err(EditorError::page_index(index, count));
        }
        Ok(Command::InsertPage {
            index,
            page: Page::new(size),
        })
    }

    pub fn remove_page(document: &Document, index: usize) -> EditorResult<Command> {
        let page = document.page(index)?.clone();
        if document.page_count() <= 1 {
            return Err(EditorError::InvalidOperation(
                "cannot remove the last page".to_string(),
            ));
        }
        Ok(Command::RemovePage { index, page })
    }

    /// Insert a deep copy of page `index` right after it, with fresh ids.
    pub fn duplicate_page(document: &Document, index: usize) -> EditorResult<Command> {
        let page = document.duplicate_page(index)?;
        Ok(Command::InsertPage {
            index: index + 1,
            page,
        })
    }

    pub fn move_page(document: &Document, from: usize, to: usize) -> EditorResult<Command> {
        let count = document.page_count();
        if from >= count {
            return Err(EditorError::page_index(from, count));
        }
        if to >= count {
            return Err(EditorError::page_index(to, count));
        }
        Ok(Command::MovePage { from, to })
    }

    pub fn resize_page(document: &Document, page: usize, size: PageSize) -> EditorResult<Command> {
        let before = document.page(page)?.size;
        Ok(Command::ResizePage {
            page,
            before,
            after: size,
        })
    }

    pub fn set_unit(document: &Document, unit: Unit) -> Command {
        Command::SetUnit {
            before: document.unit,
            after: unit,
        }
    }
}

fn expect_item_at(page: &Page, index: usize, id: ItemId) -> EditorResult<()> {
    match page.get(index) {
        Some(item) if item.id() == id => Ok(()),
        Some(_) => Err(EditorError::InvalidOperation(format!(
            "item {id} is not at index {index}"
        ))),
        None => Err(EditorError::item_index(index, page.len())),
    }
}

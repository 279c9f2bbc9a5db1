//! Editing session: owns the document, history, scene, selection and tools.
//!
//! Every mutation the host asks for is routed through the command stack.
//! Multi-command operations run as one macro, so each call is one undo step.

use crate::commands::{Command, CommandStack};
use crate::document::Document;
use crate::error::{EditorError, EditorResult};
use crate::input::InputEvent;
use crate::items::{Group, Image, Item, ItemId, SerializableColor, TextAlign, TextFormat};
use crate::notify::{Listener, ListenerId, Notification, Notifier};
use crate::scene::SceneGraph;
use crate::selection::Selection;
use crate::serializer::{copy_with_fresh_ids, deserialize_items, serialize_items};
use crate::settings::Settings;
use crate::storage::{Storage, StorageResult};
use crate::tools::{ToolContext, ToolKind, ToolMachine, ToolRequest, ToolResponse};
use crate::units::{PageSize, Unit};
use kurbo::{Point, Rect, Vec2};

/// Listener follow-ups may trigger further notifications; stop after this many rounds.
const MAX_DISPATCH_ROUNDS: usize = 8;

/// Edge or centre line used by [`Editor::align`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Right,
    Top,
    Bottom,
    CenterHorizontal,
    CenterVertical,
}

impl Alignment {
    /// Offset moving `bounds` onto this line of `reference`.
    fn offset(self, bounds: Rect, reference: Rect) -> Vec2 {
        match self {
            Alignment::Left => Vec2::new(reference.x0 - bounds.x0, 0.0),
            Alignment::Right => Vec2::new(reference.x1 - bounds.x1, 0.0),
            Alignment::Top => Vec2::new(0.0, reference.y0 - bounds.y0),
            Alignment::Bottom => Vec2::new(0.0, reference.y1 - bounds.y1),
            Alignment::CenterHorizontal => Vec2::new(reference.center().x - bounds.center().x, 0.0),
            Alignment::CenterVertical => Vec2::new(0.0, reference.center().y - bounds.center().y),
        }
    }
}

/// Z-order step for [`Editor::reorder_selection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZOrder {
    BringToFront,
    SendToBack,
    BringForward,
    SendBackward,
}

/// Serialized records waiting to be pasted.
#[derive(Debug, Clone)]
struct Clipboard {
    payload: String,
    /// Pastes made from this payload so far; each one lands one offset further.
    pastes: usize,
}

/// One editing session.
pub struct Editor {
    document: Document,
    stack: CommandStack,
    scene: SceneGraph,
    settings: Settings,
    selection: Selection,
    tools: ToolMachine,
    notifier: Notifier,
    current_page: usize,
    clipboard: Option<Clipboard>,
    /// Storage id the document was opened from or last saved to.
    document_id: Option<String>,
    /// Text item the host should open an inline editor for.
    editing_text: Option<ItemId>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl Editor {
    /// Start with an empty document using the settings' unit.
    pub fn new(settings: Settings) -> Self {
        let mut document = Document::new();
        document.unit = settings.unit;
        Self::with_document(document, settings)
    }

    /// Start editing an existing document.
    pub fn with_document(document: Document, settings: Settings) -> Self {
        let scene = SceneGraph::build(&document);
        Self {
            stack: CommandStack::with_limit(settings.history_limit),
            document,
            scene,
            settings,
            selection: Selection::new(),
            tools: ToolMachine::new(),
            notifier: Notifier::new(),
            current_page: 0,
            clipboard: None,
            document_id: None,
            editing_text: None,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    /// Scene mutation is limited to draining renderer events.
    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    pub fn history(&self) -> &CommandStack {
        &self.stack
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn tools(&self) -> &ToolMachine {
        &self.tools
    }

    pub fn tool(&self) -> ToolKind {
        self.tools.tool()
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    pub fn editing_text(&self) -> Option<ItemId> {
        self.editing_text
    }

    pub fn is_dirty(&self) -> bool {
        self.stack.is_dirty()
    }

    pub fn subscribe(&mut self, listener: Listener) -> ListenerId {
        self.notifier.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.notifier.unsubscribe(id)
    }

    /// Preview record for gestures not yet in the scene (freehand, polygon).
    pub fn tool_preview(&self) -> Option<Item> {
        self.tools.preview(&self.settings)
    }

    /// Replace the settings. The history limit applies immediately.
    pub fn set_settings(&mut self, settings: Settings) {
        self.stack.set_limit(settings.history_limit);
        self.settings = settings;
    }

    // ---- input and tools ----

    /// Feed one input event to the active tool.
    pub fn handle_input(&mut self, event: InputEvent) -> EditorResult<ToolResponse> {
        let selection_before = self.selection.clone();
        let tool_before = self.tools.tool();
        let mut ctx = ToolContext::new(
            &mut self.document,
            &mut self.stack,
            &mut self.scene,
            &self.settings,
            &mut self.selection,
            self.current_page,
        );
        let response = self.tools.handle(event, &mut ctx)?;
        match response {
            ToolResponse::Committed | ToolResponse::Created(_) => {
                self.notifier.notify(Notification::DocumentChanged);
            }
            ToolResponse::Request(ToolRequest::DeleteSelection) => self.delete_selection()?,
            ToolResponse::Request(ToolRequest::EditText(id)) => self.editing_text = Some(id),
            ToolResponse::Ignored | ToolResponse::Updated | ToolResponse::Cancelled => {}
        }
        self.finish(selection_before, tool_before);
        Ok(response)
    }

    /// Switch tools, committing or cancelling the gesture in progress.
    pub fn set_tool(&mut self, tool: ToolKind) -> EditorResult<ToolResponse> {
        let selection_before = self.selection.clone();
        let tool_before = self.tools.tool();
        let mut ctx = ToolContext::new(
            &mut self.document,
            &mut self.stack,
            &mut self.scene,
            &self.settings,
            &mut self.selection,
            self.current_page,
        );
        let response = self.tools.set_tool(tool, &mut ctx)?;
        if let ToolResponse::Created(_) = response {
            self.notifier.notify(Notification::DocumentChanged);
        }
        self.finish(selection_before, tool_before);
        Ok(response)
    }

    /// Hand a decoded image to the image tool and activate it.
    pub fn stage_image(&mut self, image: Image) -> EditorResult<()> {
        self.tools.stage_image(image);
        self.set_tool(ToolKind::Image).map(|_| ())
    }

    /// Abandon any gesture that holds an open macro.
    fn settle(&mut self) -> EditorResult<()> {
        if !self.stack.is_macro_open() {
            return Ok(());
        }
        let mut ctx = ToolContext::new(
            &mut self.document,
            &mut self.stack,
            &mut self.scene,
            &self.settings,
            &mut self.selection,
            self.current_page,
        );
        self.tools.cancel(&mut ctx)?;
        Ok(())
    }

    // ---- selection ----

    /// Select items on the current page. Unknown ids are ignored.
    pub fn select(&mut self, ids: impl IntoIterator<Item = ItemId>) {
        let Ok(page) = self.document.page(self.current_page) else {
            return;
        };
        let before = self.selection.clone();
        self.selection.set(ids.into_iter().filter(|id| page.contains(*id)));
        self.finish(before, self.tools.tool());
    }

    pub fn select_all(&mut self) {
        let ids: Vec<ItemId> = match self.document.page(self.current_page) {
            Ok(page) => page.top_level().map(Item::id).collect(),
            Err(_) => Vec::new(),
        };
        self.select(ids);
    }

    pub fn clear_selection(&mut self) {
        self.select(std::iter::empty());
    }

    // ---- items ----

    /// Add an item on top of the current page.
    pub fn add_item(&mut self, item: Item) -> EditorResult<ItemId> {
        self.add_item_to(self.current_page, item)
    }

    pub fn add_item_to(&mut self, page: usize, item: Item) -> EditorResult<ItemId> {
        self.settle()?;
        let id = item.id();
        let command = Command::add_item(&self.document, page, item)?;
        self.stack.execute(command, &mut self.document, &mut self.scene)?;
        self.changed();
        Ok(id)
    }

    /// Delete items. Group descendants go with their group; a deleted child
    /// is detached from a surviving group, and a group left empty is deleted.
    pub fn delete_items(&mut self, ids: &[ItemId]) -> EditorResult<()> {
        self.delete_items_labeled("Delete", ids)
    }

    pub fn delete_selection(&mut self) -> EditorResult<()> {
        let ids = self.selection.ids().to_vec();
        self.delete_items(&ids)
    }

    fn delete_items_labeled(&mut self, label: &str, ids: &[ItemId]) -> EditorResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.settle()?;
        self.stack
            .run_macro(label, &mut self.document, &mut self.scene, |stack, document, scene| {
                Edit::new(stack, document, scene).remove_detached(ids).map(|_| ())
            })?;
        self.changed();
        Ok(())
    }

    /// Move items (with their group descendants) to the top of another page.
    pub fn move_items_to_page(&mut self, ids: &[ItemId], target: usize) -> EditorResult<()> {
        self.settle()?;
        self.document.page(target)?;
        let moving: Vec<ItemId> = ids
            .iter()
            .copied()
            .filter(|id| self.document.find_item(*id).is_some_and(|(page, _)| page != target))
            .collect();
        if moving.is_empty() {
            return Ok(());
        }
        self.stack.run_macro(
            "Move to Page",
            &mut self.document,
            &mut self.scene,
            |stack, document, scene| {
                let mut edit = Edit::new(stack, document, scene);
                let records = edit.records_with_descendants(&moving)?;
                edit.remove_detached(&moving)?;
                edit.insert_records(target, records)
            },
        )?;
        self.changed();
        Ok(())
    }

    pub fn set_fill(&mut self, color: Option<SerializableColor>) -> EditorResult<()> {
        self.edit_selection("Change Fill", |item| item.style_mut().fill_color = color)
    }

    pub fn set_stroke(&mut self, color: Option<SerializableColor>) -> EditorResult<()> {
        self.edit_selection("Change Stroke", |item| item.style_mut().stroke_color = color)
    }

    pub fn set_stroke_width(&mut self, width: f64) -> EditorResult<()> {
        let width = width.max(0.0);
        self.edit_selection("Change Stroke Width", |item| item.style_mut().stroke_width = width)
    }

    pub fn set_opacity(&mut self, opacity: f64) -> EditorResult<()> {
        let opacity = opacity.clamp(0.0, 1.0);
        self.edit_selection("Change Opacity", |item| item.style_mut().opacity = opacity)
    }

    /// Set the content of every selected text item.
    pub fn set_text_content(&mut self, content: &str) -> EditorResult<()> {
        self.edit_selection("Edit Text", |item| {
            if let Item::Text(text) = item {
                text.content = content.to_string();
                text.invalidate_cache();
            }
        })
    }

    /// Finish inline editing started by double-activating a text item.
    pub fn commit_text_edit(&mut self, content: &str) -> EditorResult<()> {
        let Some(id) = self.editing_text.take() else {
            return Err(EditorError::InvalidOperation("no text is being edited".to_string()));
        };
        self.settle()?;
        let command = Command::update_item(&self.document, id, |item| {
            if let Item::Text(text) = item {
                text.content = content.to_string();
                text.invalidate_cache();
            }
        })?;
        if matches!(&command, Command::UpdateItem { before, after, .. } if before == after) {
            return Ok(());
        }
        self.stack.execute(command, &mut self.document, &mut self.scene)?;
        self.changed();
        Ok(())
    }

    pub fn cancel_text_edit(&mut self) {
        self.editing_text = None;
    }

    /// Apply font changes to every selected text item, group members included.
    pub fn set_text_format(&mut self, format: &TextFormat) -> EditorResult<()> {
        if format.is_empty() {
            return Ok(());
        }
        self.edit_selection("Change Font", |item| {
            if let Item::Text(text) = item {
                format.apply_to(text);
            }
        })
    }

    pub fn set_font_family(&mut self, family: &str) -> EditorResult<()> {
        self.set_text_format(&TextFormat {
            font_family: Some(family.to_string()),
            ..TextFormat::default()
        })
    }

    pub fn set_font_size(&mut self, size: f64) -> EditorResult<()> {
        self.set_text_format(&TextFormat {
            font_size: Some(size),
            ..TextFormat::default()
        })
    }

    pub fn set_bold(&mut self, bold: bool) -> EditorResult<()> {
        self.set_text_format(&TextFormat {
            bold: Some(bold),
            ..TextFormat::default()
        })
    }

    pub fn set_italic(&mut self, italic: bool) -> EditorResult<()> {
        self.set_text_format(&TextFormat {
            italic: Some(italic),
            ..TextFormat::default()
        })
    }

    pub fn set_underline(&mut self, underline: bool) -> EditorResult<()> {
        self.set_text_format(&TextFormat {
            underline: Some(underline),
            ..TextFormat::default()
        })
    }

    pub fn set_text_alignment(&mut self, alignment: TextAlign) -> EditorResult<()> {
        self.set_text_format(&TextFormat {
            alignment: Some(alignment),
            ..TextFormat::default()
        })
    }

    pub fn set_text_color(&mut self, color: SerializableColor) -> EditorResult<()> {
        self.set_text_format(&TextFormat {
            color: Some(color),
            ..TextFormat::default()
        })
    }

    /// Lock or unlock one item. Locked items stay selectable; tools leave them in place.
    pub fn set_locked(&mut self, id: ItemId, locked: bool) -> EditorResult<()> {
        let label = if locked { "Lock Item" } else { "Unlock Item" };
        self.edit_item(label, id, |item| item.meta_mut().locked = locked)
    }

    /// Show or hide one item. Hidden items are skipped by hit testing.
    pub fn set_visible(&mut self, id: ItemId, visible: bool) -> EditorResult<()> {
        let label = if visible { "Show Item" } else { "Hide Item" };
        self.edit_item(label, id, |item| item.meta_mut().visible = visible)
    }

    pub fn rename_item(&mut self, id: ItemId, name: &str) -> EditorResult<()> {
        let name = name.trim().to_string();
        self.edit_item("Rename Item", id, |item| item.meta_mut().name = name)
    }

    /// Move vertex `index` of a polygon or freehand stroke to `to` (page coordinates).
    pub fn move_vertex(&mut self, id: ItemId, index: usize, to: Point) -> EditorResult<()> {
        let mut found = false;
        self.edit_item("Edit Vertex", id, |item| found = item.move_vertex(index, to))?;
        if !found {
            return Err(EditorError::InvalidOperation(format!(
                "item {id} has no vertex {index}"
            )));
        }
        Ok(())
    }

    pub fn flip_horizontal(&mut self) -> EditorResult<()> {
        self.transform_selection("Flip Horizontal", |item, pivot| item.flip_about(pivot, true))
    }

    pub fn flip_vertical(&mut self) -> EditorResult<()> {
        self.transform_selection("Flip Vertical", |item, pivot| item.flip_about(pivot, false))
    }

    /// Rotate each selected item clockwise about its own centre.
    pub fn rotate(&mut self, degrees: f64) -> EditorResult<()> {
        self.transform_selection("Rotate", |item, pivot| item.rotate_about(pivot, degrees))
    }

    pub fn reorder_selection(&mut self, step: ZOrder) -> EditorResult<()> {
        self.settle()?;
        let page_index = self.current_page;
        let page = self.document.page(page_index)?;
        let mut indices: Vec<usize> = self
            .selection
            .ids()
            .iter()
            .filter_map(|id| page.index_of(*id))
            .collect();
        if indices.is_empty() {
            return Ok(());
        }
        // Front/forward moves walk from the top so selected items keep their relative order.
        match step {
            ZOrder::BringToFront | ZOrder::SendBackward => indices.sort_unstable(),
            ZOrder::SendToBack | ZOrder::BringForward => indices.sort_unstable_by(|a, b| b.cmp(a)),
        }
        let ids: Vec<ItemId> = indices.iter().map(|i| page.items()[*i].id()).collect();
        let selected = self.selection.clone();
        self.stack.run_macro(
            "Change Z-Order",
            &mut self.document,
            &mut self.scene,
            |stack, document, scene| {
                for id in ids {
                    let page = document.page(page_index)?;
                    let (Some(from), len) = (page.index_of(id), page.len()) else {
                        continue;
                    };
                    let to = match step {
                        ZOrder::BringToFront => len - 1,
                        ZOrder::SendToBack => 0,
                        ZOrder::BringForward => {
                            let next = from + 1;
                            if next >= len || selected.contains(page.items()[next].id()) {
                                continue;
                            }
                            next
                        }
                        ZOrder::SendBackward => {
                            if from == 0 || selected.contains(page.items()[from - 1].id()) {
                                continue;
                            }
                            from - 1
                        }
                    };
                    if to != from {
                        let command = Command::reorder(document, id, to)?;
                        stack.execute(command, document, scene)?;
                    }
                }
                Ok(())
            },
        )?;
        self.changed();
        Ok(())
    }

    pub fn bring_to_front(&mut self) -> EditorResult<()> {
        self.reorder_selection(ZOrder::BringToFront)
    }

    pub fn send_to_back(&mut self) -> EditorResult<()> {
        self.reorder_selection(ZOrder::SendToBack)
    }

    pub fn bring_forward(&mut self) -> EditorResult<()> {
        self.reorder_selection(ZOrder::BringForward)
    }

    pub fn send_backward(&mut self) -> EditorResult<()> {
        self.reorder_selection(ZOrder::SendBackward)
    }

    /// Group the selected items. Needs at least two.
    pub fn group_selection(&mut self) -> EditorResult<ItemId> {
        self.settle()?;
        let page = self.document.page(self.current_page)?;
        let mut members: Vec<(usize, ItemId)> = self
            .selection
            .ids()
            .iter()
            .filter_map(|id| page.index_of(*id).map(|index| (index, *id)))
            .collect();
        if members.len() < 2 {
            return Err(EditorError::InvalidOperation(
                "grouping needs at least two items".to_string(),
            ));
        }
        members.sort_unstable();
        let group = Item::Group(Group::new(members.into_iter().map(|(_, id)| id).collect()));
        let id = group.id();
        let page_index = self.current_page;
        self.stack
            .run_macro("Group", &mut self.document, &mut self.scene, |stack, document, scene| {
                let command = Command::add_item(document, page_index, group)?;
                stack.execute(command, document, scene)
            })?;
        self.set_selection([id]);
        self.changed();
        Ok(id)
    }

    /// Dissolve the selected groups, selecting their former children.
    pub fn ungroup_selection(&mut self) -> EditorResult<()> {
        self.settle()?;
        let groups: Vec<Group> = self
            .selection
            .ids()
            .iter()
            .filter_map(|id| self.document.item(*id).and_then(Item::as_group).cloned())
            .collect();
        if groups.is_empty() {
            return Err(EditorError::InvalidOperation("no group selected".to_string()));
        }
        self.stack
            .run_macro("Ungroup", &mut self.document, &mut self.scene, |stack, document, scene| {
                let mut edit = Edit::new(stack, document, scene);
                for group in &groups {
                    // A nested group hands its children to its parent.
                    let (page, _) = edit.document.find_item(group.id).ok_or(EditorError::ItemNotFound(group.id))?;
                    for parent in edit.document.page(page)?.groups_referencing(group.id) {
                        edit.update(parent, |item| {
                            if let Some(parent) = item.as_group_mut() {
                                parent.child_ids = parent
                                    .child_ids
                                    .iter()
                                    .flat_map(|id| {
                                        if *id == group.id { group.child_ids.clone() } else { vec![*id] }
                                    })
                                    .collect();
                            }
                        })?;
                    }
                    let command = Command::remove_item(edit.document, group.id)?;
                    edit.execute(command)?;
                }
                Ok(())
            })?;
        let children: Vec<ItemId> = groups.iter().flat_map(|g| g.child_ids.iter().copied()).collect();
        self.set_selection(children);
        self.changed();
        Ok(())
    }

    /// Align the selected items to the bounds of the whole selection.
    pub fn align(&mut self, alignment: Alignment) -> EditorResult<()> {
        self.settle()?;
        let page = self.document.page(self.current_page)?;
        let Some(reference) = self.selection.bounds(page) else {
            return Ok(());
        };
        let moves: Vec<(ItemId, Vec2)> = self
            .selection
            .ids()
            .iter()
            .filter_map(|id| page.item(*id))
            .map(|item| (item.id(), alignment.offset(item.bounds(), reference)))
            .filter(|(_, delta)| delta.hypot() > f64::EPSILON)
            .collect();
        if moves.is_empty() {
            return Ok(());
        }
        self.stack
            .run_macro("Align", &mut self.document, &mut self.scene, |stack, document, scene| {
                let mut edit = Edit::new(stack, document, scene);
                for (id, delta) in moves {
                    edit.update_with_descendants(id, |item| item.translate(delta))?;
                }
                Ok(())
            })?;
        self.changed();
        Ok(())
    }

    // ---- clipboard ----

    /// Copy the selection (with group descendants). Returns the number of records copied.
    pub fn copy(&mut self) -> EditorResult<usize> {
        let page = self.document.page(self.current_page)?;
        let ids = page.with_descendants(self.selection.ids());
        // Keep page z-order so pasted copies stack the same way.
        let records: Vec<Item> = page
            .items()
            .iter()
            .filter(|item| ids.contains(&item.id()))
            .cloned()
            .collect();
        if records.is_empty() {
            return Ok(0);
        }
        self.clipboard = Some(Clipboard {
            payload: serialize_items(&records)?,
            pastes: 0,
        });
        Ok(records.len())
    }

    pub fn cut(&mut self) -> EditorResult<usize> {
        let copied = self.copy()?;
        let ids = self.selection.ids().to_vec();
        self.delete_items_labeled("Cut", &ids)?;
        Ok(copied)
    }

    pub fn can_paste(&self) -> bool {
        self.clipboard.is_some()
    }

    /// Paste fresh copies onto the current page, offset from the originals.
    pub fn paste(&mut self) -> EditorResult<Vec<ItemId>> {
        if self.clipboard.is_none() {
            return Ok(Vec::new());
        }
        self.settle()?;
        let Some(clipboard) = &self.clipboard else {
            return Ok(Vec::new());
        };
        let records = deserialize_items(&clipboard.payload)?;
        let offset = self.settings.paste_offset * (clipboard.pastes + 1) as f64;
        let mut copies = copy_with_fresh_ids(&records);
        for copy in copies.iter_mut() {
            copy.translate(Vec2::new(offset, offset));
        }
        let referenced: Vec<ItemId> = copies.iter().flat_map(|c| c.referenced_ids().to_vec()).collect();
        let top_level: Vec<ItemId> = copies
            .iter()
            .map(Item::id)
            .filter(|id| !referenced.contains(id))
            .collect();
        let page = self.current_page;
        self.stack
            .run_macro("Paste", &mut self.document, &mut self.scene, |stack, document, scene| {
                Edit::new(stack, document, scene).insert_records(page, copies)
            })?;
        if let Some(clipboard) = &mut self.clipboard {
            clipboard.pastes += 1;
        }
        self.set_selection(top_level.iter().copied());
        self.changed();
        Ok(top_level)
    }

    // ---- pages ----

    /// Insert a page (after the current one when `index` is `None`) and switch to it.
    pub fn add_page(&mut self, index: Option<usize>, size: PageSize) -> EditorResult<usize> {
        self.settle()?;
        let index = index.unwrap_or(self.current_page + 1);
        let command = Command::add_page(&self.document, Some(index), size)?;
        self.stack.execute(command, &mut self.document, &mut self.scene)?;
        self.changed();
        self.switch_page(index);
        Ok(index)
    }

    pub fn remove_page(&mut self, index: usize) -> EditorResult<()> {
        self.settle()?;
        let command = Command::remove_page(&self.document, index)?;
        self.stack.execute(command, &mut self.document, &mut self.scene)?;
        let current = if index < self.current_page {
            self.current_page - 1
        } else {
            self.current_page.min(self.document.page_count() - 1)
        };
        self.changed();
        self.switch_page(current);
        Ok(())
    }

    /// Duplicate a page right after itself and switch to the copy.
    pub fn duplicate_page(&mut self, index: usize) -> EditorResult<usize> {
        self.settle()?;
        let command = Command::duplicate_page(&self.document, index)?;
        self.stack.execute(command, &mut self.document, &mut self.scene)?;
        self.changed();
        self.switch_page(index + 1);
        Ok(index + 1)
    }

    pub fn move_page(&mut self, from: usize, to: usize) -> EditorResult<()> {
        self.settle()?;
        let command = Command::move_page(&self.document, from, to)?;
        self.stack.execute(command, &mut self.document, &mut self.scene)?;
        let current = self.current_page;
        let followed = if current == from {
            to
        } else if from < current && to >= current {
            current - 1
        } else if from > current && to <= current {
            current + 1
        } else {
            current
        };
        self.changed();
        self.switch_page(followed);
        Ok(())
    }

    pub fn resize_page(&mut self, index: usize, size: PageSize) -> EditorResult<()> {
        self.settle()?;
        if self.document.page(index)?.size == size {
            return Ok(());
        }
        let command = Command::resize_page(&self.document, index, size)?;
        self.stack.execute(command, &mut self.document, &mut self.scene)?;
        self.changed();
        Ok(())
    }

    pub fn set_unit(&mut self, unit: Unit) -> EditorResult<()> {
        self.settle()?;
        if self.document.unit == unit {
            return Ok(());
        }
        let command = Command::set_unit(&self.document, unit);
        self.stack.execute(command, &mut self.document, &mut self.scene)?;
        self.changed();
        Ok(())
    }

    /// Make another page current. Cancels any gesture and clears the selection.
    pub fn set_current_page(&mut self, index: usize) -> EditorResult<()> {
        self.document.page(index)?;
        if index == self.current_page {
            return Ok(());
        }
        let mut ctx = ToolContext::new(
            &mut self.document,
            &mut self.stack,
            &mut self.scene,
            &self.settings,
            &mut self.selection,
            self.current_page,
        );
        self.tools.cancel(&mut ctx)?;
        self.switch_page(index);
        Ok(())
    }

    // ---- history ----

    pub fn undo(&mut self) -> EditorResult<bool> {
        self.settle()?;
        let undone = self.stack.undo(&mut self.document, &mut self.scene)?;
        if undone {
            self.changed();
        }
        Ok(undone)
    }

    pub fn redo(&mut self) -> EditorResult<bool> {
        self.settle()?;
        let redone = self.stack.redo(&mut self.document, &mut self.scene)?;
        if redone {
            self.changed();
        }
        Ok(redone)
    }

    // ---- session ----

    /// Replace the document with a fresh one.
    pub fn new_document(&mut self, size: PageSize) {
        let mut document = Document::with_page_size(size);
        document.unit = self.settings.unit;
        self.replace_document(document, None);
    }

    /// Load a document from storage. On failure the current document is untouched.
    pub fn open(&mut self, storage: &dyn Storage, id: &str) -> StorageResult<()> {
        let document = storage.load(id)?;
        log::info!("Opened document {id} ({} pages)", document.page_count());
        self.replace_document(document, Some(id.to_string()));
        Ok(())
    }

    /// Save under `id`, stamping the modification time and marking history clean.
    pub fn save(&mut self, storage: &dyn Storage, id: &str) -> StorageResult<()> {
        self.settle()?;
        let mut snapshot = self.document.clone();
        snapshot.touch();
        storage.save(id, &snapshot)?;
        self.document.modified_at = snapshot.modified_at;
        self.stack.mark_clean();
        self.document_id = Some(id.to_string());
        Ok(())
    }

    fn replace_document(&mut self, document: Document, id: Option<String>) {
        self.tools = ToolMachine::new();
        self.stack.clear();
        self.scene = SceneGraph::build(&document);
        self.document = document;
        self.document_id = id;
        self.editing_text = None;
        self.selection.clear();
        self.current_page = 0;
        self.notifier.notify(Notification::DocumentChanged);
        self.notifier.notify(Notification::PageChanged(0));
        self.notifier.notify(Notification::SelectionChanged);
        self.flush();
    }

    // ---- internals ----

    fn transform_selection(&mut self, label: &str, edit: impl Fn(&mut Item, Point)) -> EditorResult<()> {
        self.settle()?;
        let page = self.document.page(self.current_page)?;
        let targets: Vec<(ItemId, Point)> = self
            .selection
            .ids()
            .iter()
            .filter_map(|id| page.item(*id))
            .map(|item| (item.id(), item.bounds().center()))
            .collect();
        if targets.is_empty() {
            return Ok(());
        }
        self.stack
            .run_macro(label, &mut self.document, &mut self.scene, |stack, document, scene| {
                let mut edit_items = Edit::new(stack, document, scene);
                for (id, pivot) in targets {
                    edit_items.update_with_descendants(id, |item| edit(item, pivot))?;
                }
                Ok(())
            })?;
        self.changed();
        Ok(())
    }

    /// Apply `edit` to one record as a labelled step. An edit that changes nothing records nothing.
    fn edit_item(&mut self, label: &str, id: ItemId, edit: impl FnOnce(&mut Item)) -> EditorResult<()> {
        self.settle()?;
        let committed = self
            .stack
            .run_macro(label, &mut self.document, &mut self.scene, |stack, document, scene| {
                Edit::new(stack, document, scene).update(id, edit).map(|_| ())
            })?;
        if committed {
            self.changed();
        }
        Ok(())
    }

    /// Apply `edit` to every selected record (and group descendants) as one step.
    fn edit_selection(&mut self, label: &str, edit: impl Fn(&mut Item)) -> EditorResult<()> {
        self.settle()?;
        let page = self.document.page(self.current_page)?;
        let ids = page.with_descendants(self.selection.ids());
        if ids.is_empty() {
            return Ok(());
        }
        let committed = self
            .stack
            .run_macro(label, &mut self.document, &mut self.scene, |stack, document, scene| {
                let mut edit_items = Edit::new(stack, document, scene);
                for id in ids {
                    if document_item_is_group(edit_items.document, id) {
                        continue;
                    }
                    edit_items.update(id, &edit)?;
                }
                Ok(())
            })?;
        if committed {
            self.changed();
        }
        Ok(())
    }

    /// Queue the notifications that follow a document change and dispatch.
    fn changed(&mut self) {
        self.notifier.notify(Notification::DocumentChanged);
        self.reconcile();
        self.flush();
    }

    /// Keep the current page, selection and text edit pointing at things that exist.
    fn reconcile(&mut self) {
        let last = self.document.page_count().saturating_sub(1);
        if self.current_page > last {
            self.current_page = last;
            self.notifier.notify(Notification::PageChanged(last));
        }
        let Ok(page) = self.document.page(self.current_page) else {
            return;
        };
        if self.selection.retain_existing(page) {
            self.notifier.notify(Notification::SelectionChanged);
        }
        if self.editing_text.is_some_and(|id| !page.contains(id)) {
            self.editing_text = None;
        }
    }

    fn set_selection(&mut self, ids: impl IntoIterator<Item = ItemId>) {
        let before = self.selection.clone();
        self.selection.set(ids);
        if self.selection != before {
            self.notifier.notify(Notification::SelectionChanged);
        }
    }

    fn switch_page(&mut self, index: usize) {
        if index == self.current_page || index >= self.document.page_count() {
            return;
        }
        self.current_page = index;
        self.editing_text = None;
        if !self.selection.is_empty() {
            self.selection.clear();
            self.notifier.notify(Notification::SelectionChanged);
        }
        self.notifier.notify(Notification::PageChanged(index));
        self.flush();
    }

    fn finish(&mut self, selection_before: Selection, tool_before: ToolKind) {
        if self.selection != selection_before {
            self.notifier.notify(Notification::SelectionChanged);
        }
        if self.tools.tool() != tool_before {
            self.notifier.notify(Notification::ToolChanged(self.tools.tool()));
        }
        self.reconcile();
        self.flush();
    }

    /// Deliver queued notifications and run the follow-up commands listeners
    /// returned. Waits while a gesture macro is open.
    fn flush(&mut self) {
        if self.stack.is_macro_open() {
            return;
        }
        for _ in 0..MAX_DISPATCH_ROUNDS {
            let commands = self.notifier.dispatch(&self.document);
            if commands.is_empty() {
                return;
            }
            for command in commands {
                let label = command.label();
                match self.stack.execute(command, &mut self.document, &mut self.scene) {
                    Ok(()) => self.notifier.notify(Notification::DocumentChanged),
                    Err(err) => log::warn!("Follow-up command {label} rejected: {err}"),
                }
            }
            self.reconcile();
        }
        log::warn!("Notifications still pending after {MAX_DISPATCH_ROUNDS} rounds; dropping them");
        self.notifier.clear_pending();
    }
}

fn document_item_is_group(document: &Document, id: ItemId) -> bool {
    document.item(id).is_some_and(Item::is_group)
}

/// Command helpers shared by the multi-step operations, run inside a macro.
struct Edit<'a> {
    stack: &'a mut CommandStack,
    document: &'a mut Document,
    scene: &'a mut SceneGraph,
}

impl<'a> Edit<'a> {
    fn new(stack: &'a mut CommandStack, document: &'a mut Document, scene: &'a mut SceneGraph) -> Self {
        Self { stack, document, scene }
    }

    fn execute(&mut self, command: Command) -> EditorResult<()> {
        self.stack.execute(command, self.document, self.scene)
    }

    /// Update one record. Edits that change nothing record nothing.
    fn update(&mut self, id: ItemId, edit: impl FnOnce(&mut Item)) -> EditorResult<bool> {
        let command = Command::update_item(self.document, id, edit)?;
        if let Command::UpdateItem { before, after, .. } = &command {
            if before == after {
                return Ok(false);
            }
        }
        self.execute(command)?;
        Ok(true)
    }

    /// Update `id` and, for a group, each non-group descendant. Group boxes refresh on their own.
    fn update_with_descendants(&mut self, id: ItemId, edit: impl Fn(&mut Item)) -> EditorResult<()> {
        let (page, _) = self.document.find_item(id).ok_or(EditorError::ItemNotFound(id))?;
        let ids = self.document.page(page)?.with_descendants(&[id]);
        for target in ids {
            if !document_item_is_group(self.document, target) {
                self.update(target, &edit)?;
            }
        }
        Ok(())
    }

    /// Current records of `ids` and their descendants, in page z-order.
    fn records_with_descendants(&self, ids: &[ItemId]) -> EditorResult<Vec<Item>> {
        let mut out = Vec::new();
        for page in self.document.pages() {
            let on_page: Vec<ItemId> = ids.iter().copied().filter(|id| page.contains(*id)).collect();
            if on_page.is_empty() {
                continue;
            }
            let wanted = page.with_descendants(&on_page);
            out.extend(page.items().iter().filter(|item| wanted.contains(&item.id())).cloned());
        }
        if let Some(missing) = ids.iter().find(|id| !out.iter().any(|item| item.id() == **id)) {
            return Err(EditorError::ItemNotFound(*missing));
        }
        Ok(out)
    }

    /// Remove `ids` and their descendants, detaching them from surviving
    /// groups first. Groups emptied by the detach are removed too.
    fn remove_detached(&mut self, ids: &[ItemId]) -> EditorResult<Vec<ItemId>> {
        let mut doomed: Vec<ItemId> = Vec::new();
        for id in ids {
            let (page, _) = self.document.find_item(*id).ok_or(EditorError::ItemNotFound(*id))?;
            for target in self.document.page(page)?.with_descendants(&[*id]) {
                if !doomed.contains(&target) {
                    doomed.push(target);
                }
            }
        }

        let mut i = 0;
        while i < doomed.len() {
            let id = doomed[i];
            i += 1;
            let Some((page, _)) = self.document.find_item(id) else {
                continue;
            };
            for parent in self.document.page(page)?.groups_referencing(id) {
                if doomed.contains(&parent) {
                    continue;
                }
                let gone = doomed.clone();
                self.update(parent, |item| {
                    item.remap_references(|child| (!gone.contains(&child)).then_some(child));
                })?;
                if self.document.item(parent).is_some_and(|p| p.referenced_ids().is_empty()) {
                    doomed.push(parent);
                }
            }
        }

        // Remove each record once no remaining group references it.
        let mut pending = doomed.clone();
        while !pending.is_empty() {
            let next = pending
                .iter()
                .position(|id| {
                    self.document
                        .find_item(*id)
                        .is_none_or(|(page, _)| {
                            self.document
                                .page(page)
                                .is_ok_and(|page| page.groups_referencing(*id).is_empty())
                        })
                })
                .ok_or_else(|| EditorError::InvalidOperation("group references form a cycle".to_string()))?;
            let id = pending.remove(next);
            let command = Command::remove_item(self.document, id)?;
            self.execute(command)?;
        }
        Ok(doomed)
    }

    /// Append records to `page`, each once everything it references is present.
    fn insert_records(&mut self, page: usize, mut records: Vec<Item>) -> EditorResult<()> {
        while !records.is_empty() {
            let target = self.document.page(page)?;
            let ready = records
                .iter()
                .position(|item| item.referenced_ids().iter().all(|id| target.contains(*id)))
                .ok_or_else(|| EditorError::InvalidOperation("records reference each other in a cycle".to_string()))?;
            let item = records.remove(ready);
            let command = Command::add_item(self.document, page, item)?;
            self.execute(command)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Key;
    use crate::items::{Line, Polygon, Rectangle, Text};
    use crate::storage::MemoryStorage;
    use crate::tools::ShapeKind;
    use kurbo::{Point, Size};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn rect(x: f64, y: f64) -> Item {
        Item::Rectangle(Rectangle::new(Point::new(x, y), 100.0, 50.0))
    }

    fn editor_with(items: Vec<Item>) -> (Editor, Vec<ItemId>) {
        let mut editor = Editor::default();
        let ids = items
            .into_iter()
            .map(|item| editor.add_item(item).unwrap())
            .collect();
        (editor, ids)
    }

    fn assert_synced(editor: &Editor) {
        assert!(editor.scene().is_consistent_with(editor.document()));
        editor.document().validate().unwrap();
    }

    #[test]
    fn test_set_fill_is_one_undo_step() {
        let (mut editor, ids) = editor_with(vec![rect(0.0, 0.0), rect(200.0, 0.0)]);
        editor.select(ids.clone());
        editor.set_fill(Some(SerializableColor::red())).unwrap();
        for id in &ids {
            assert_eq!(
                editor.document().item(*id).unwrap().style().fill_color,
                Some(SerializableColor::red())
            );
        }
        assert_eq!(editor.history().undo_label(), Some("Change Fill"));
        assert_synced(&editor);

        editor.undo().unwrap();
        for id in &ids {
            assert_eq!(
                editor.document().item(*id).unwrap().style().fill_color,
                Some(SerializableColor::default_fill())
            );
        }
        assert_synced(&editor);
    }

    #[test]
    fn test_unchanged_edit_records_nothing() {
        let (mut editor, ids) = editor_with(vec![rect(0.0, 0.0)]);
        editor.select(ids);
        let depth = editor.history().undo_count();
        editor.set_fill(Some(SerializableColor::default_fill())).unwrap();
        assert_eq!(editor.history().undo_count(), depth);
    }

    #[test]
    fn test_delete_group_deletes_children() {
        let (mut editor, ids) = editor_with(vec![rect(0.0, 0.0), rect(200.0, 0.0)]);
        editor.select(ids.clone());
        let group = editor.group_selection().unwrap();
        editor.delete_items(&[group]).unwrap();
        assert_eq!(editor.document().item_count(), 0);
        assert!(editor.selection().is_empty());
        assert_synced(&editor);

        editor.undo().unwrap();
        assert_eq!(editor.document().item_count(), 3);
        assert_synced(&editor);
    }

    #[test]
    fn test_delete_child_detaches_from_group() {
        let (mut editor, ids) = editor_with(vec![rect(0.0, 0.0), rect(200.0, 0.0), rect(400.0, 0.0)]);
        editor.select(ids.clone());
        let group = editor.group_selection().unwrap();
        editor.delete_items(&[ids[0]]).unwrap();
        let remaining = editor.document().item(group).unwrap();
        assert_eq!(remaining.referenced_ids(), &[ids[1], ids[2]]);
        assert_eq!(remaining.bounds().x0, 200.0);
        assert_eq!(editor.history().undo_count(), 5);
        assert_synced(&editor);

        // Deleting the rest empties the group, which goes too.
        editor.delete_items(&[ids[1], ids[2]]).unwrap();
        assert_eq!(editor.document().item_count(), 0);
        assert_synced(&editor);
    }

    #[test]
    fn test_move_items_to_page() {
        let (mut editor, ids) = editor_with(vec![rect(0.0, 0.0), rect(200.0, 0.0)]);
        editor.select(ids.clone());
        let group = editor.group_selection().unwrap();
        editor.add_page(None, PageSize::A4).unwrap();
        assert_eq!(editor.current_page(), 1);

        editor.move_items_to_page(&[group], 1).unwrap();
        assert!(editor.document().pages()[0].is_empty());
        assert_eq!(editor.document().pages()[1].len(), 3);
        assert_eq!(editor.history().undo_label(), Some("Move to Page"));
        assert_synced(&editor);

        editor.undo().unwrap();
        assert_eq!(editor.document().pages()[0].len(), 3);
        assert!(editor.document().pages()[1].is_empty());
        assert_synced(&editor);
    }

    #[test]
    fn test_copy_paste_remaps_and_offsets() {
        let (mut editor, ids) = editor_with(vec![rect(0.0, 0.0), rect(200.0, 0.0)]);
        editor.select(ids.clone());
        let group = editor.group_selection().unwrap();
        assert_eq!(editor.copy().unwrap(), 3);

        let pasted = editor.paste().unwrap();
        assert_eq!(pasted.len(), 1);
        assert_ne!(pasted[0], group);
        let copy = editor.document().item(pasted[0]).unwrap();
        assert_eq!(copy.referenced_ids().len(), 2);
        assert!(copy.referenced_ids().iter().all(|id| !ids.contains(id)));
        assert_eq!(copy.bounds().origin(), Point::new(20.0, 20.0));
        assert_eq!(editor.selection().ids(), pasted.as_slice());

        let again = editor.paste().unwrap();
        assert_eq!(editor.document().item(again[0]).unwrap().bounds().origin(), Point::new(40.0, 40.0));
        assert_eq!(editor.document().item_count(), 9);
        assert_synced(&editor);
    }

    #[test]
    fn test_cut_removes_and_keeps_clipboard() {
        let (mut editor, ids) = editor_with(vec![rect(0.0, 0.0)]);
        editor.select(ids.clone());
        assert_eq!(editor.cut().unwrap(), 1);
        assert_eq!(editor.document().item_count(), 0);
        assert_eq!(editor.history().undo_label(), Some("Cut"));
        assert!(editor.can_paste());
        editor.paste().unwrap();
        assert_eq!(editor.document().item_count(), 1);
    }

    #[test]
    fn test_z_order_operations() {
        let (mut editor, ids) = editor_with(vec![rect(0.0, 0.0), rect(10.0, 0.0), rect(20.0, 0.0)]);
        let order = |editor: &Editor| -> Vec<ItemId> {
            editor.document().pages()[0].items().iter().map(Item::id).collect()
        };
        editor.select([ids[0]]);
        editor.bring_to_front().unwrap();
        assert_eq!(order(&editor), vec![ids[1], ids[2], ids[0]]);
        editor.send_backward().unwrap();
        assert_eq!(order(&editor), vec![ids[1], ids[0], ids[2]]);
        editor.send_to_back().unwrap();
        assert_eq!(order(&editor), vec![ids[0], ids[1], ids[2]]);
        editor.bring_forward().unwrap();
        assert_eq!(order(&editor), vec![ids[1], ids[0], ids[2]]);
        assert_synced(&editor);
    }

    #[test]
    fn test_align_left() {
        let (mut editor, ids) = editor_with(vec![rect(50.0, 0.0), rect(10.0, 100.0)]);
        editor.select(ids.clone());
        editor.align(Alignment::Left).unwrap();
        for id in &ids {
            assert_eq!(editor.document().item(*id).unwrap().bounds().x0, 10.0);
        }
        assert_eq!(editor.history().undo_label(), Some("Align"));
        assert_synced(&editor);
    }

    #[test]
    fn test_flip_and_rotate() {
        let line = Item::Line(Line::new(Point::new(0.0, 0.0), Point::new(100.0, 0.0)));
        let (mut editor, ids) = editor_with(vec![rect(0.0, 0.0), line]);
        editor.select([ids[0]]);
        editor.flip_horizontal().unwrap();
        assert!(editor.document().item(ids[0]).unwrap().transform().flip_h);
        editor.rotate(90.0).unwrap();
        assert!((editor.document().item(ids[0]).unwrap().transform().rotation - 90.0).abs() < 1e-9);

        editor.select([ids[1]]);
        editor.flip_vertical().unwrap();
        assert_eq!(
            editor.document().item(ids[1]).unwrap().end_point(),
            Some(Point::new(100.0, 0.0))
        );
        assert_synced(&editor);
    }

    #[test]
    fn test_group_needs_two_items() {
        let (mut editor, ids) = editor_with(vec![rect(0.0, 0.0)]);
        editor.select(ids);
        assert!(matches!(editor.group_selection(), Err(EditorError::InvalidOperation(_))));
        assert!(matches!(editor.ungroup_selection(), Err(EditorError::InvalidOperation(_))));
    }

    #[test]
    fn test_ungroup_selects_children() {
        let (mut editor, ids) = editor_with(vec![rect(0.0, 0.0), rect(200.0, 0.0)]);
        editor.select(ids.clone());
        editor.group_selection().unwrap();
        editor.ungroup_selection().unwrap();
        assert_eq!(editor.selection().ids(), ids.as_slice());
        assert_eq!(editor.document().item_count(), 2);
        assert_synced(&editor);
    }

    #[test]
    fn test_page_operations_track_current_page() {
        let mut editor = Editor::default();
        editor.add_page(None, PageSize::LETTER).unwrap();
        editor.add_page(None, PageSize::A4).unwrap();
        assert_eq!(editor.current_page(), 2);
        editor.move_page(2, 0).unwrap();
        assert_eq!(editor.current_page(), 0);
        assert_eq!(editor.document().pages()[0].size, PageSize::A4);
        editor.remove_page(0).unwrap();
        assert_eq!(editor.current_page(), 0);
        assert_eq!(editor.document().page_count(), 2);
        assert!(matches!(editor.set_current_page(5), Err(EditorError::InvalidIndex { .. })));
        editor.resize_page(1, PageSize::LEGAL).unwrap();
        assert_eq!(editor.document().pages()[1].size, PageSize::LEGAL);
        assert_synced(&editor);
    }

    #[test]
    fn test_remove_last_page_fails_cleanly() {
        let mut editor = Editor::default();
        let depth = editor.history().undo_count();
        assert!(matches!(editor.remove_page(0), Err(EditorError::InvalidOperation(_))));
        assert_eq!(editor.history().undo_count(), depth);
        assert_eq!(editor.document().page_count(), 1);
    }

    #[test]
    fn test_set_unit() {
        let mut editor = Editor::default();
        editor.set_unit(Unit::Centimeters).unwrap();
        assert_eq!(editor.document().unit, Unit::Centimeters);
        editor.undo().unwrap();
        assert_eq!(editor.document().unit, Unit::default());
    }

    #[test]
    fn test_save_marks_clean_and_open_failure_keeps_document() {
        let storage = MemoryStorage::new();
        let (mut editor, _) = editor_with(vec![rect(0.0, 0.0)]);
        assert!(editor.is_dirty());
        let stamped = editor.document().modified_at;
        editor.save(&storage, "doc").unwrap();
        assert!(!editor.is_dirty());
        assert!(editor.document().modified_at >= stamped);
        assert_eq!(editor.document_id(), Some("doc"));

        let before = editor.document().clone();
        assert!(editor.open(&storage, "missing").is_err());
        assert_eq!(*editor.document(), before);

        storage
            .insert_raw("broken", r#"{"format_version":1,"pages":[{"items":[{"Star":{}}]}]}"#)
            .unwrap();
        assert!(editor.open(&storage, "broken").is_err());
        assert_eq!(*editor.document(), before);

        editor.new_document(PageSize::A4);
        assert_eq!(editor.document().item_count(), 0);
        editor.open(&storage, "doc").unwrap();
        assert_eq!(editor.document().item_count(), 1);
        assert!(!editor.history().can_undo());
        assert_synced(&editor);
    }

    #[test]
    fn test_listener_follow_up_is_deferred() {
        let (mut editor, ids) = editor_with(vec![rect(0.0, 0.0)]);
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        editor.subscribe(Box::new(move |n, doc| {
            if *n != Notification::SelectionChanged {
                return None;
            }
            *counter.borrow_mut() += 1;
            (doc.unit != Unit::Feet).then(|| Command::set_unit(doc, Unit::Feet))
        }));
        editor.select(ids);
        assert_eq!(*calls.borrow(), 1);
        assert_eq!(editor.document().unit, Unit::Feet);
        assert_eq!(editor.history().undo_label(), Some("Change Unit"));
    }

    #[test]
    fn test_tool_flow_through_editor() {
        let mut editor = Editor::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        editor.subscribe(Box::new(move |n, _| {
            sink.borrow_mut().push(*n);
            None
        }));
        editor.set_tool(ToolKind::Shape(ShapeKind::Rectangle)).unwrap();
        editor.handle_input(InputEvent::press(Point::new(0.0, 0.0))).unwrap();
        editor.handle_input(InputEvent::moved(Point::new(50.0, 50.0))).unwrap();
        let response = editor.handle_input(InputEvent::release(Point::new(60.0, 40.0))).unwrap();
        let ToolResponse::Created(id) = response else {
            panic!("expected a rectangle");
        };
        assert_eq!(editor.document().item(id).unwrap().transform().size, Size::new(60.0, 40.0));
        assert_eq!(editor.tool(), ToolKind::Select);
        assert!(seen.borrow().contains(&Notification::DocumentChanged));
        assert!(seen.borrow().contains(&Notification::ToolChanged(ToolKind::Select)));

        editor.handle_input(InputEvent::key(Key::Delete)).unwrap();
        assert_eq!(editor.document().item_count(), 0);
        assert_synced(&editor);
    }

    #[test]
    fn test_edit_text_request() {
        let text = Item::Text(Text::new(Point::ZERO, "Old".to_string()));
        let (mut editor, ids) = editor_with(vec![text]);
        editor
            .handle_input(InputEvent::DoubleActivate { position: Point::new(5.0, 5.0) })
            .unwrap();
        assert_eq!(editor.editing_text(), Some(ids[0]));
        editor.commit_text_edit("New").unwrap();
        assert_eq!(
            editor.document().item(ids[0]).and_then(Item::as_text).map(|t| t.content.as_str()),
            Some("New")
        );
        assert!(editor.commit_text_edit("Again").is_err());
    }

    #[test]
    fn test_font_changes_reach_grouped_text() {
        let text = Item::Text(Text::new(Point::new(0.0, 100.0), "Sale".to_string()));
        let (mut editor, ids) = editor_with(vec![rect(0.0, 0.0), text]);
        editor.select(ids.clone());
        let group = editor.group_selection().unwrap();
        editor.select([group]);
        let depth = editor.history().undo_count();

        editor
            .set_text_format(&TextFormat {
                font_family: Some("Georgia".to_string()),
                font_size: Some(24.0),
                italic: Some(true),
                color: Some(SerializableColor::red()),
                ..TextFormat::default()
            })
            .unwrap();
        editor.set_bold(true).unwrap();
        editor.set_text_alignment(TextAlign::Right).unwrap();
        assert_eq!(editor.history().undo_count(), depth + 3);
        assert_eq!(editor.history().undo_label(), Some("Change Font"));

        let formatted = editor.document().item(ids[1]).and_then(Item::as_text).unwrap();
        assert_eq!(formatted.font_family, "Georgia");
        assert_eq!(formatted.font_size, 24.0);
        assert!(formatted.bold && formatted.italic && !formatted.underline);
        assert_eq!(formatted.alignment, TextAlign::Right);
        assert_eq!(formatted.text_color, SerializableColor::red());
        assert_synced(&editor);

        // Same value again is not a new step.
        editor.set_bold(true).unwrap();
        assert_eq!(editor.history().undo_count(), depth + 3);

        for _ in 0..3 {
            editor.undo().unwrap();
        }
        let restored = editor.document().item(ids[1]).and_then(Item::as_text).unwrap();
        assert_eq!(restored.font_family, Text::DEFAULT_FONT_FAMILY);
        assert!(!restored.bold);
        assert_synced(&editor);
    }

    #[test]
    fn test_lock_visibility_and_name_are_undoable() {
        let (mut editor, ids) = editor_with(vec![rect(0.0, 0.0)]);
        let id = ids[0];

        editor.set_locked(id, true).unwrap();
        assert_eq!(editor.history().undo_label(), Some("Lock Item"));
        editor.handle_input(InputEvent::press(Point::new(10.0, 10.0))).unwrap();
        editor.handle_input(InputEvent::moved(Point::new(60.0, 60.0))).unwrap();
        editor.handle_input(InputEvent::release(Point::new(60.0, 60.0))).unwrap();
        assert_eq!(editor.document().item(id).unwrap().transform().position, Point::ZERO);

        editor.rename_item(id, "  Banner ").unwrap();
        editor.set_visible(id, false).unwrap();
        assert_eq!(editor.history().undo_label(), Some("Hide Item"));
        let meta = editor.document().item(id).unwrap().meta().clone();
        assert!(meta.locked && !meta.visible);
        assert_eq!(meta.name, "Banner");
        assert!(editor.document().pages()[0].item_at(Point::new(10.0, 10.0), 0.0).is_none());
        assert_synced(&editor);

        for _ in 0..3 {
            editor.undo().unwrap();
        }
        assert_eq!(editor.document().item(id).unwrap().meta(), &crate::items::ItemMeta::default());
        assert!(matches!(
            editor.set_locked(crate::items::new_item_id(), true),
            Err(EditorError::ItemNotFound(_))
        ));
        assert_synced(&editor);
    }

    #[test]
    fn test_move_vertex_is_one_step() {
        let polygon = Polygon::from_page_points(&[
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(50.0, 80.0),
        ])
        .unwrap();
        let (mut editor, ids) = editor_with(vec![Item::Polygon(polygon), rect(300.0, 0.0)]);
        let before = editor.document().item(ids[0]).unwrap().clone();

        editor.move_vertex(ids[0], 1, Point::new(120.0, -10.0)).unwrap();
        let edited = editor.document().item(ids[0]).unwrap();
        assert_eq!(edited.vertices().unwrap()[1], Point::new(120.0, -10.0));
        assert_eq!(edited.transform().position, Point::new(0.0, -10.0));
        assert_eq!(editor.history().undo_label(), Some("Edit Vertex"));
        assert_synced(&editor);

        let depth = editor.history().undo_count();
        assert!(matches!(
            editor.move_vertex(ids[1], 0, Point::ZERO),
            Err(EditorError::InvalidOperation(_))
        ));
        assert!(editor.move_vertex(ids[0], 7, Point::ZERO).is_err());
        assert_eq!(editor.history().undo_count(), depth);

        editor.undo().unwrap();
        assert_eq!(editor.document().item(ids[0]).unwrap(), &before);
        assert_synced(&editor);
    }

    #[test]
    fn test_selection_follows_page_removal() {
        let (mut editor, _) = editor_with(vec![rect(0.0, 0.0)]);
        editor.add_page(None, PageSize::A4).unwrap();
        let on_second = editor.add_item(rect(10.0, 10.0)).unwrap();
        editor.select_all();
        assert_eq!(editor.selection().ids(), &[on_second]);

        let last = editor.document().page_count() - 1;
        editor.remove_page(last).unwrap();
        assert_eq!(editor.current_page(), 0);
        assert!(editor.selection().is_empty());
        editor.select_all();
        assert_eq!(editor.selection().len(), 1);
        editor.select([on_second]);
        assert_eq!(editor.selection().len(), 0);
    }

    #[test]
    fn test_operation_during_gesture_cancels_it() {
        let (mut editor, ids) = editor_with(vec![rect(0.0, 0.0)]);
        editor.handle_input(InputEvent::press(Point::new(10.0, 10.0))).unwrap();
        editor.handle_input(InputEvent::moved(Point::new(90.0, 90.0))).unwrap();
        assert!(editor.history().is_macro_open());
        editor.set_opacity(0.5).unwrap();
        assert!(!editor.history().is_macro_open());
        let item = editor.document().item(ids[0]).unwrap();
        assert_eq!(item.transform().position, Point::new(0.0, 0.0));
        assert!((item.style().opacity - 0.5).abs() < f64::EPSILON);
        assert_synced(&editor);
    }
}

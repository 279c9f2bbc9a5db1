//! Tool state machine.
//!
//! Tools turn [`InputEvent`]s into command stack operations. They never touch
//! the document directly: everything goes through the narrow [`ToolContext`]
//! the editor hands in for each call. Multi-frame gestures open a macro on
//! press, push preview records into the scene while the pointer moves and
//! commit once on release, so one gesture is one undo step.

mod freehand;
mod image;
mod polygon;
mod select;
mod shape;

use crate::commands::{Command, CommandStack};
use crate::document::Document;
use crate::error::{EditorError, EditorResult};
use crate::input::{InputEvent, Key};
use crate::items::{Image, Item, ItemId};
use crate::scene::{RecordPatch, SceneGraph};
use crate::selection::Selection;
use crate::settings::Settings;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Shape family drawn by dragging a box or segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Rectangle,
    Ellipse,
    Line,
    Arrow,
}

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ToolKind {
    #[default]
    Select,
    Text,
    Shape(ShapeKind),
    Freehand,
    Image,
    Polygon,
}

/// In-progress gesture of the active tool.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ToolState {
    /// Waiting for input.
    #[default]
    Idle,
    /// Select: dragging the selection. `originals` are the committed records
    /// of the dragged items and their group descendants.
    Moving { originals: Vec<Item>, start: Point },
    /// Select: dragging the resize handle of one item.
    Resizing {
        originals: Vec<Item>,
        anchor: Rect,
        keep_aspect: bool,
    },
    /// Select: dragging the rotate handle of one item around `pivot`.
    Rotating {
        originals: Vec<Item>,
        pivot: Point,
        start_angle: f64,
    },
    /// Select: vertex handles are shown on a polygon or freehand stroke.
    EditingVertices { target: ItemId },
    /// Select: dragging vertex `index` of `original`.
    DraggingVertex { original: Item, index: usize },
    /// Select: rubber-band selection on empty space.
    RubberBand { start: Point, current: Point },
    /// Shape and text tools: the record inserted on press, reshaped while dragging.
    Drawing { original: Item, start: Point, current: Point },
    /// Freehand: sampled pointer positions.
    Sketching { points: Vec<Point> },
    /// Polygon: vertices placed so far and the hover position.
    CollectingVertices { points: Vec<Point>, hover: Option<Point> },
}

impl ToolState {
    /// Whether a gesture holds an open macro.
    fn holds_macro(&self) -> bool {
        matches!(
            self,
            ToolState::Moving { .. }
                | ToolState::Resizing { .. }
                | ToolState::Rotating { .. }
                | ToolState::DraggingVertex { .. }
                | ToolState::Drawing { .. }
        )
    }
}

/// Requests a tool hands back to the editor because they are not document edits it owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolRequest {
    /// Delete the current selection.
    DeleteSelection,
    /// Start inline editing of a text item.
    EditText(ItemId),
}

/// What handling one event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolResponse {
    /// Nothing happened.
    Ignored,
    /// Gesture state or scene preview changed; the document did not.
    Updated,
    /// A history entry was recorded.
    Committed,
    /// A new item was committed. The machine has switched back to Select.
    Created(ItemId),
    /// The gesture was abandoned; scene and document are as before it.
    Cancelled,
    Request(ToolRequest),
}

/// Capability handed to tools: the current page, the command stack and the
/// scene, plus read access to the document, settings and selection.
pub struct ToolContext<'a> {
    document: &'a mut Document,
    stack: &'a mut CommandStack,
    scene: &'a mut SceneGraph,
    settings: &'a Settings,
    selection: &'a mut Selection,
    page: usize,
}

impl<'a> ToolContext<'a> {
    pub fn new(
        document: &'a mut Document,
        stack: &'a mut CommandStack,
        scene: &'a mut SceneGraph,
        settings: &'a Settings,
        selection: &'a mut Selection,
        page: usize,
    ) -> Self {
        Self {
            document,
            stack,
            scene,
            settings,
            selection,
            page,
        }
    }

    pub fn current_page(&self) -> usize {
        self.page
    }

    pub fn document(&self) -> &Document {
        &*self.document
    }

    pub fn command_stack(&mut self) -> StackHandle<'_> {
        StackHandle {
            stack: &mut *self.stack,
            document: &mut *self.document,
            scene: &mut *self.scene,
        }
    }

    pub fn scene_for(&mut self, page: usize) -> SceneHandle<'_> {
        SceneHandle {
            scene: &mut *self.scene,
            document: &*self.document,
            page,
        }
    }

    pub fn settings(&self) -> &Settings {
        self.settings
    }

    pub fn selection(&self) -> &Selection {
        &*self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut *self.selection
    }

    /// Snap a page point to the grid when snapping is enabled.
    fn snap(&self, point: Point) -> Point {
        self.settings.snap.snap(point)
    }
}

/// Command stack access for tools.
pub struct StackHandle<'a> {
    stack: &'a mut CommandStack,
    document: &'a mut Document,
    scene: &'a mut SceneGraph,
}

impl StackHandle<'_> {
    pub fn execute(&mut self, command: Command) -> EditorResult<()> {
        self.stack.execute(command, self.document, self.scene)
    }

    pub fn begin_macro(&mut self, label: impl Into<String>) -> EditorResult<()> {
        self.stack.begin_macro(label)
    }

    pub fn end_macro(&mut self) -> EditorResult<bool> {
        self.stack.end_macro()
    }

    pub fn cancel_macro(&mut self) -> EditorResult<()> {
        self.stack.cancel_macro(self.document, self.scene)
    }

    pub fn is_macro_open(&self) -> bool {
        self.stack.is_macro_open()
    }
}

/// Scene access for one page.
pub struct SceneHandle<'a> {
    scene: &'a mut SceneGraph,
    document: &'a Document,
    page: usize,
}

impl SceneHandle<'_> {
    /// Show a preview record without touching the document.
    pub fn push_preview(&mut self, item: &Item) -> EditorResult<()> {
        self.scene.push_preview(self.page, item)
    }

    /// Drop any preview of `id` and show its committed record again.
    pub fn revert(&mut self, id: ItemId) -> EditorResult<()> {
        self.scene.revert(self.document, self.page, id)
    }

    pub fn pull(&self, id: ItemId) -> EditorResult<RecordPatch> {
        self.scene.pull(self.page, id)
    }
}

/// Owns the active tool and its gesture state.
#[derive(Debug, Clone, Default)]
pub struct ToolMachine {
    tool: ToolKind,
    state: ToolState,
    /// Decoded image waiting to be placed by the image tool.
    staged_image: Option<Image>,
}

impl ToolMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn state(&self) -> &ToolState {
        &self.state
    }

    /// Whether a gesture is in progress.
    pub fn is_busy(&self) -> bool {
        self.state != ToolState::Idle
    }

    /// Hand over a decoded image for the image tool to place on the next press.
    pub fn stage_image(&mut self, image: Image) {
        self.staged_image = Some(image);
    }

    pub fn staged_image(&self) -> Option<&Image> {
        self.staged_image.as_ref()
    }

    /// Switch tools. A polygon with enough vertices is committed; any other
    /// gesture in progress is cancelled.
    pub fn set_tool(&mut self, tool: ToolKind, ctx: &mut ToolContext<'_>) -> EditorResult<ToolResponse> {
        let response = match &self.state {
            ToolState::CollectingVertices { .. } => polygon::finish(&mut self.state, ctx)?,
            ToolState::Idle => ToolResponse::Ignored,
            _ => self.cancel(ctx)?,
        };
        if let ToolResponse::Created(id) = response {
            ctx.selection_mut().set([id]);
        }
        log::debug!("tool: {:?} -> {:?}", self.tool, tool);
        self.tool = tool;
        self.state = ToolState::Idle;
        Ok(response)
    }

    /// Abandon the current gesture, reverting any preview.
    pub fn cancel(&mut self, ctx: &mut ToolContext<'_>) -> EditorResult<ToolResponse> {
        let state = std::mem::take(&mut self.state);
        if state == ToolState::Idle {
            return Ok(ToolResponse::Ignored);
        }
        if state.holds_macro() {
            ctx.command_stack().cancel_macro()?;
        }
        let page = ctx.current_page();
        match &state {
            ToolState::Moving { originals, .. }
            | ToolState::Resizing { originals, .. }
            | ToolState::Rotating { originals, .. } => revert_all(ctx, page, originals)?,
            ToolState::DraggingVertex { original, .. } => {
                revert_all(ctx, page, std::slice::from_ref(original))?
            }
            _ => {}
        }
        Ok(ToolResponse::Cancelled)
    }

    /// Feed one input event to the active tool.
    pub fn handle(&mut self, event: InputEvent, ctx: &mut ToolContext<'_>) -> EditorResult<ToolResponse> {
        if let InputEvent::Key { key: Key::Escape, .. } = event {
            if self.state != ToolState::Idle {
                return self.cancel(ctx);
            }
        }
        let response = match self.tool {
            ToolKind::Select => select::handle(&mut self.state, event, ctx),
            ToolKind::Shape(kind) => shape::handle(&mut self.state, event, ctx, shape::Target::Shape(kind)),
            ToolKind::Text => shape::handle(&mut self.state, event, ctx, shape::Target::Text),
            ToolKind::Freehand => freehand::handle(&mut self.state, event, ctx),
            ToolKind::Polygon => polygon::handle(&mut self.state, event, ctx),
            ToolKind::Image => image::handle(&mut self.staged_image, event, ctx),
        };
        let response = match response {
            Ok(response) => response,
            Err(err) => {
                // A failed step must not leave a macro dangling.
                if self.state.holds_macro() {
                    self.cancel(ctx)?;
                }
                self.state = ToolState::Idle;
                return Err(err);
            }
        };
        if let ToolResponse::Created(id) = response {
            self.tool = ToolKind::Select;
            self.state = ToolState::Idle;
            ctx.selection_mut().set([id]);
        }
        Ok(response)
    }

    /// Ghost record for gestures that have nothing in the scene yet.
    pub fn preview(&self, settings: &Settings) -> Option<Item> {
        match &self.state {
            ToolState::Sketching { points } => freehand::preview(points, settings),
            ToolState::CollectingVertices { points, hover } => polygon::preview(points, *hover, settings),
            _ => None,
        }
    }

    /// Item showing vertex handles, if any.
    pub fn vertex_target(&self) -> Option<ItemId> {
        match &self.state {
            ToolState::EditingVertices { target } => Some(*target),
            ToolState::DraggingVertex { original, .. } => Some(original.id()),
            _ => None,
        }
    }

    /// Rubber-band rectangle, while one is being dragged.
    pub fn rubber_band(&self) -> Option<Rect> {
        match self.state {
            ToolState::RubberBand { start, current } => Some(Rect::from_points(start, current)),
            _ => None,
        }
    }
}

/// Re-push committed records for every original, discarding previews.
fn revert_all(ctx: &mut ToolContext<'_>, page: usize, originals: &[Item]) -> EditorResult<()> {
    let mut scene = ctx.scene_for(page);
    for item in originals {
        match scene.revert(item.id()) {
            // Gone after an undo inside the macro; nothing to show.
            Ok(()) | Err(EditorError::ItemNotFound(_)) => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

/// Pull each preview back into a record and execute one update per changed
/// non-group record. Group boxes follow from their children.
fn commit_previews(ctx: &mut ToolContext<'_>, page: usize, originals: &[Item]) -> EditorResult<()> {
    for before in originals.iter().filter(|item| !item.is_group()) {
        let after = ctx.scene_for(page).pull(before.id())?.apply_to(before);
        if after != *before {
            let command = Command::replace_item(ctx.document(), before.clone(), after)?;
            ctx.command_stack().execute(command)?;
        }
    }
    revert_all(ctx, page, originals)
}


#[cfg(test)]
mod tests {
    use super::test_support::Harness;
    use super::*;
    use crate::items::Rectangle;

    #[test]
    fn test_default_tool_is_select() {
        let machine = ToolMachine::new();
        assert_eq!(machine.tool(), ToolKind::Select);
        assert!(!machine.is_busy());
    }

    #[test]
    fn test_tool_switch_cancels_drag() {
        let mut h = Harness::with_item(Item::Rectangle(Rectangle::new(Point::ZERO, 100.0, 100.0)));
        let before = h.document.clone();
        h.send(InputEvent::press(Point::new(50.0, 50.0)));
        h.send(InputEvent::moved(Point::new(80.0, 90.0)));
        assert_eq!(h.set_tool(ToolKind::Freehand), ToolResponse::Cancelled);
        assert_eq!(h.machine.tool(), ToolKind::Freehand);
        assert_eq!(h.document, before);
        assert_eq!(h.stack.undo_count(), 0);
        h.assert_consistent();
    }

    #[test]
    fn test_escape_when_idle_falls_through_to_tool() {
        let mut h = Harness::with_item(Item::Rectangle(Rectangle::new(Point::ZERO, 100.0, 100.0)));
        h.drag(Point::new(50.0, 50.0), Point::new(50.0, 50.0));
        assert_eq!(h.selection.len(), 1);
        h.send(InputEvent::key(Key::Escape));
        assert!(h.selection.is_empty());
    }
}

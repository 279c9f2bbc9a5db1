//! Synchronization layer: a live, renderable view derived from the document.
//!
//! Each page has a [`Scene`] whose nodes follow the page's item order. The
//! command stack reports what it changed as [`Change`]s and
//! [`SceneGraph::apply`] pushes the affected records. During a gesture tools
//! push preview records straight into the scene; on commit they [`pull`] the
//! node back into a record patch.

mod node;

pub use node::{pull, push, RecordPatch, SceneNode};

use crate::document::{Document, Page};
use crate::error::{EditorError, EditorResult};
use crate::items::{Item, ItemId};
use crate::units::PageSize;

/// What a command changed, in terms of the document after the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    ItemInserted { page: usize, index: usize },
    ItemRemoved { page: usize, index: usize },
    ItemUpdated { page: usize, id: ItemId },
    ItemMoved { page: usize, from: usize, to: usize },
    PageInserted(usize),
    PageRemoved(usize),
    PageMoved { from: usize, to: usize },
    PageResized(usize),
    UnitChanged,
}

/// Notification for renderers: which parts of the scene to redraw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneEvent {
    NodePushed { page: usize, id: ItemId },
    NodeRemoved { page: usize, id: ItemId },
    PageInvalidated(usize),
}

/// Live view of one page.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub size: PageSize,
    nodes: Vec<SceneNode>,
}

impl Scene {
    /// Push every record of a page.
    pub fn build(page: &Page) -> Self {
        Self {
            size: page.size,
            nodes: page.items().iter().map(push).collect(),
        }
    }

    /// Nodes in paint order.
    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn node(&self, id: ItemId) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    fn position(&self, id: ItemId) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }
}

/// Scenes for every page of a document, in page order.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    scenes: Vec<Scene>,
    events: Vec<SceneEvent>,
}

impl SceneGraph {
    /// Build the full scene graph for a document.
    pub fn build(document: &Document) -> Self {
        Self {
            scenes: document.pages().iter().map(Scene::build).collect(),
            events: Vec::new(),
        }
    }

    /// Discard everything and rebuild from `document`.
    pub fn rebuild(&mut self, document: &Document) {
        self.scenes = document.pages().iter().map(Scene::build).collect();
        self.events
            .extend((0..self.scenes.len()).map(SceneEvent::PageInvalidated));
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn scene(&self, page: usize) -> Option<&Scene> {
        self.scenes.get(page)
    }

    /// Propagate document changes to the affected nodes.
    pub fn apply(&mut self, document: &Document, changes: &[Change]) -> EditorResult<()> {
        for change in changes {
            self.apply_one(document, *change)?;
        }
        Ok(())
    }

    fn apply_one(&mut self, document: &Document, change: Change) -> EditorResult<()> {
        match change {
            Change::ItemInserted { page, index } => {
                let item = item_at(document, page, index)?;
                let scene = self.scene_mut(page)?;
                let index = index.min(scene.nodes.len());
                scene.nodes.insert(index, push(item));
                self.events.push(SceneEvent::NodePushed { page, id: item.id() });
            }
            Change::ItemRemoved { page, index } => {
                let scene = self.scene_mut(page)?;
                if index < scene.nodes.len() {
                    let node = scene.nodes.remove(index);
                    self.events.push(SceneEvent::NodeRemoved { page, id: node.id });
                }
            }
            Change::ItemUpdated { page, id } => {
                let record = document.page(page)?;
                let item = record.item(id).ok_or(EditorError::ItemNotFound(id))?;
                let scene = self.scene_mut(page)?;
                let position = scene.position(id).ok_or(EditorError::ItemNotFound(id))?;
                scene.nodes[position] = push(item);
                self.events.push(SceneEvent::NodePushed { page, id });
            }
            Change::ItemMoved { page, from, to } => {
                let scene = self.scene_mut(page)?;
                let len = scene.nodes.len();
                if from >= len || to >= len {
                    return Err(EditorError::item_index(from.max(to), len));
                }
                let node = scene.nodes.remove(from);
                scene.nodes.insert(to, node);
                self.events.push(SceneEvent::PageInvalidated(page));
            }
            Change::PageInserted(index) => {
                let scene = Scene::build(document.page(index)?);
                let index = index.min(self.scenes.len());
                self.scenes.insert(index, scene);
                self.events.push(SceneEvent::PageInvalidated(index));
            }
            Change::PageRemoved(index) => {
                if index < self.scenes.len() {
                    self.scenes.remove(index);
                }
            }
            Change::PageMoved { from, to } => {
                let len = self.scenes.len();
                if from >= len || to >= len {
                    return Err(EditorError::page_index(from.max(to), len));
                }
                let scene = self.scenes.remove(from);
                self.scenes.insert(to, scene);
            }
            Change::PageResized(index) => {
                let size = document.page(index)?.size;
                self.scene_mut(index)?.size = size;
                self.events.push(SceneEvent::PageInvalidated(index));
            }
            Change::UnitChanged => {}
        }
        Ok(())
    }

    /// Update a node from a preview record without touching the document.
    ///
    /// Used for intermediate gesture frames.
    pub fn push_preview(&mut self, page: usize, item: &Item) -> EditorResult<()> {
        let id = item.id();
        let scene = self.scene_mut(page)?;
        let position = scene.position(id).ok_or(EditorError::ItemNotFound(id))?;
        scene.nodes[position] = push(item);
        self.events.push(SceneEvent::NodePushed { page, id });
        Ok(())
    }

    /// Re-push a node from its committed record, discarding any preview.
    pub fn revert(&mut self, document: &Document, page: usize, id: ItemId) -> EditorResult<()> {
        self.apply_one(document, Change::ItemUpdated { page, id })
    }

    /// Capture a node's geometry for commit.
    pub fn pull(&self, page: usize, id: ItemId) -> EditorResult<RecordPatch> {
        let scene = self
            .scenes
            .get(page)
            .ok_or_else(|| EditorError::page_index(page, self.scenes.len()))?;
        scene
            .node(id)
            .map(pull)
            .ok_or(EditorError::ItemNotFound(id))
    }

    /// Take pending renderer notifications.
    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }

    /// Whether every node equals a fresh push of its record, in the same order.
    pub fn is_consistent_with(&self, document: &Document) -> bool {
        self.scenes.len() == document.page_count()
            && self
                .scenes
                .iter()
                .zip(document.pages())
                .all(|(scene, page)| *scene == Scene::build(page))
    }

    fn scene_mut(&mut self, page: usize) -> EditorResult<&mut Scene> {
        let len = self.scenes.len();
        self.scenes
            .get_mut(page)
            .ok_or_else(|| EditorError::page_index(page, len))
    }
}

fn item_at(document: &Document, page: usize, index: usize) -> EditorResult<&Item> {
    let record = document.page(page)?;
    record
        .get(index)
        .ok_or_else(|| EditorError::item_index(index, record.len()))
}

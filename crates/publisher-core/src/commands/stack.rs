//! Undo/redo history with macro grouping.

use super::Command;
use crate::document::Document;
use crate::error::{EditorError, EditorResult};
use crate::scene::SceneGraph;

/// Default maximum number of undo entries.
pub const DEFAULT_HISTORY_LIMIT: usize = 200;

/// One undo step: a single command or a committed macro.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub label: String,
    commands: Vec<Command>,
}

impl HistoryEntry {
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }
}

#[derive(Debug)]
struct OpenMacro {
    label: String,
    commands: Vec<Command>,
}

/// Linear undo/redo history.
///
/// Every mutation goes through [`CommandStack::execute`], which applies the
/// command to the document, pushes the change into the scene graph and
/// records it. A failed call leaves document, scene and history untouched.
#[derive(Debug)]
pub struct CommandStack {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    open: Option<OpenMacro>,
    limit: usize,
    /// Undo depth at which the document was last saved.
    clean_depth: Option<usize>,
}

impl Default for CommandStack {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandStack {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            open: None,
            limit: limit.max(1),
            clean_depth: Some(0),
        }
    }

    /// Apply a command and record it (or buffer it inside the open macro).
    ///
    /// Group boxes on the touched page are refreshed afterwards, and the
    /// refresh is recorded in the same entry so undo restores them exactly.
    pub fn execute(
        &mut self,
        command: Command,
        document: &mut Document,
        scene: &mut SceneGraph,
    ) -> EditorResult<()> {
        let label = command.label();
        let mut commands = vec![command];
        apply_all(&commands, document, scene)?;
        let refresh = match commands[0].group_refresh(document) {
            Ok(refresh) => refresh,
            Err(err) => {
                revert(&commands, document, scene);
                return Err(err);
            }
        };
        if let Err(err) = apply_all(&refresh, document, scene) {
            revert(&commands, document, scene);
            return Err(err);
        }
        commands.extend(refresh);
        log::debug!("execute: {label}");

        self.discard_redo();
        match &mut self.open {
            Some(open) => open.commands.extend(commands),
            None => self.push_entry(HistoryEntry { label, commands }),
        }
        Ok(())
    }

    /// Revert the most recent entry.
    ///
    /// Returns `Ok(false)` when there is nothing to undo. While a macro is
    /// open this is refused with [`EditorError::InvalidOperation`]; end or
    /// cancel the macro first.
    pub fn undo(&mut self, document: &mut Document, scene: &mut SceneGraph) -> EditorResult<bool> {
        self.ensure_no_macro("undo")?;
        let Some(entry) = self.undo_stack.pop() else {
            return Ok(false);
        };
        let inverses: Vec<Command> = entry.commands.iter().rev().map(Command::inverse).collect();
        if let Err(err) = apply_all(&inverses, document, scene) {
            self.undo_stack.push(entry);
            return Err(err);
        }
        log::debug!("undo: {}", entry.label);
        self.redo_stack.push(entry);
        Ok(true)
    }

    /// Re-apply the most recently undone entry.
    ///
    /// Returns `Ok(false)` when there is nothing to redo, and
    /// [`EditorError::InvalidOperation`] while a macro is open.
    pub fn redo(&mut self, document: &mut Document, scene: &mut SceneGraph) -> EditorResult<bool> {
        self.ensure_no_macro("redo")?;
        let Some(entry) = self.redo_stack.pop() else {
            return Ok(false);
        };
        if let Err(err) = apply_all(&entry.commands, document, scene) {
            self.redo_stack.push(entry);
            return Err(err);
        }
        log::debug!("redo: {}", entry.label);
        self.undo_stack.push(entry);
        Ok(true)
    }

    /// Start buffering commands into one undo entry.
    pub fn begin_macro(&mut self, label: impl Into<String>) -> EditorResult<()> {
        if let Some(open) = &self.open {
            return Err(EditorError::MacroAlreadyOpen(open.label.clone()));
        }
        let label = label.into();
        log::debug!("begin macro: {label}");
        self.open = Some(OpenMacro {
            label,
            commands: Vec::new(),
        });
        Ok(())
    }

    /// Commit the open macro. Returns `false` if it was empty and so added no entry.
    pub fn end_macro(&mut self) -> EditorResult<bool> {
        let open = self.open.take().ok_or(EditorError::NoMacroOpen)?;
        log::debug!("end macro: {} ({} commands)", open.label, open.commands.len());
        if open.commands.is_empty() {
            return Ok(false);
        }
        self.push_entry(HistoryEntry {
            label: open.label,
            commands: open.commands,
        });
        Ok(true)
    }

    /// Drop the open macro, reverting the commands it already applied.
    pub fn cancel_macro(
        &mut self,
        document: &mut Document,
        scene: &mut SceneGraph,
    ) -> EditorResult<()> {
        let open = self.open.take().ok_or(EditorError::NoMacroOpen)?;
        let inverses: Vec<Command> = open.commands.iter().rev().map(Command::inverse).collect();
        log::debug!("cancel macro: {} ({} commands)", open.label, open.commands.len());
        if let Err(err) = apply_all(&inverses, document, scene) {
            self.open = Some(open);
            return Err(err);
        }
        Ok(())
    }

    /// Run `body` inside a macro; the macro is cancelled if `body` fails.
    pub fn run_macro<F>(
        &mut self,
        label: impl Into<String>,
        document: &mut Document,
        scene: &mut SceneGraph,
        body: F,
    ) -> EditorResult<bool>
    where
        F: FnOnce(&mut Self, &mut Document, &mut SceneGraph) -> EditorResult<()>,
    {
        self.begin_macro(label)?;
        match body(self, document, scene) {
            Ok(()) => self.end_macro(),
            Err(err) => {
                self.cancel_macro(document, scene)?;
                Err(err)
            }
        }
    }

    pub fn is_macro_open(&self) -> bool {
        self.open.is_some()
    }

    /// Label of the open macro, if any.
    pub fn open_macro_label(&self) -> Option<&str> {
        self.open.as_ref().map(|open| open.label.as_str())
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty() && self.open.is_none()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty() && self.open.is_none()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.last().map(|entry| entry.label.as_str())
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.redo_stack.last().map(|entry| entry.label.as_str())
    }

    /// Undo entries, oldest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.undo_stack
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Change the history limit, evicting the oldest entries if needed.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.max(1);
        self.evict();
    }

    /// Forget all history. Any open macro is dropped without reverting.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.open = None;
        self.clean_depth = Some(0);
    }

    /// Remember the current state as saved.
    pub fn mark_clean(&mut self) {
        self.clean_depth = Some(self.undo_stack.len());
    }

    /// Whether the document differs from the last saved state.
    pub fn is_dirty(&self) -> bool {
        let buffered = self.open.as_ref().is_some_and(|open| !open.commands.is_empty());
        buffered || self.clean_depth != Some(self.undo_stack.len())
    }

    fn ensure_no_macro(&self, action: &str) -> EditorResult<()> {
        match &self.open {
            Some(open) => Err(EditorError::InvalidOperation(format!(
                "cannot {action} while macro '{}' is open",
                open.label
            ))),
            None => Ok(()),
        }
    }

    fn discard_redo(&mut self) {
        if self.redo_stack.is_empty() {
            return;
        }
        self.redo_stack.clear();
        // The saved state lived on the discarded branch.
        if self.clean_depth.is_some_and(|depth| depth > self.undo_stack.len()) {
            self.clean_depth = None;
        }
    }

    fn push_entry(&mut self, entry: HistoryEntry) {
        self.undo_stack.push(entry);
        self.evict();
    }

    fn evict(&mut self) {
        while self.undo_stack.len() > self.limit {
            self.undo_stack.remove(0);
            self.clean_depth = match self.clean_depth {
                Some(depth) if depth > 0 => Some(depth - 1),
                _ => None,
            };
        }
    }
}

/// Apply commands in order. If one fails, the ones already applied are reverted.
fn apply_all(commands: &[Command], document: &mut Document, scene: &mut SceneGraph) -> EditorResult<()> {
    for (done, command) in commands.iter().enumerate() {
        match command.apply(document) {
            Ok(changes) => sync_scene(scene, document, &changes),
            Err(err) => {
                revert(&commands[..done], document, scene);
                return Err(err);
            }
        }
    }
    Ok(())
}

/// Undo already-applied commands, newest first.
fn revert(applied: &[Command], document: &mut Document, scene: &mut SceneGraph) {
    for command in applied.iter().rev() {
        if let Ok(changes) = command.inverse().apply(document) {
            sync_scene(scene, document, &changes);
        }
    }
}

fn sync_scene(scene: &mut SceneGraph, document: &Document, changes: &[crate::scene::Change]) {
    if let Err(err) = scene.apply(document, changes) {
        log::error!("Scene out of sync ({err}), rebuilding");
        scene.rebuild(document);
    }
}

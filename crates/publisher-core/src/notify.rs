//! Editor notifications and listener dispatch.
//!
//! Operations queue [`Notification`]s; the editor dispatches them once the
//! operation has finished. Listeners see the settled document and may answer
//! with follow-up commands. Those are collected while dispatch runs and
//! handed back afterwards, so a listener can never re-enter the command that
//! triggered it.

use crate::commands::Command;
use crate::document::Document;
use crate::tools::ToolKind;
use std::collections::VecDeque;

/// Something observers may want to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    SelectionChanged,
    DocumentChanged,
    /// The current page index changed.
    PageChanged(usize),
    ToolChanged(ToolKind),
}

/// Handle returned by [`Notifier::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Listener callback. Returns a command to run after dispatch, if any.
pub type Listener = Box<dyn FnMut(&Notification, &Document) -> Option<Command>>;

/// Listener registry with a pending queue and a re-entrancy flag.
#[derive(Default)]
pub struct Notifier {
    listeners: Vec<(ListenerId, Listener)>,
    queue: VecDeque<Notification>,
    deferred: Vec<Command>,
    dispatching: bool,
    next_id: u64,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("listeners", &self.listeners.len())
            .field("queue", &self.queue)
            .field("deferred", &self.deferred.len())
            .field("dispatching", &self.dispatching)
            .finish()
    }
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Queue a notification. Duplicates of one already pending are dropped.
    pub fn notify(&mut self, notification: Notification) {
        if !self.queue.contains(&notification) {
            self.queue.push_back(notification);
        }
    }

    pub fn pending(&self) -> impl Iterator<Item = &Notification> {
        self.queue.iter()
    }

    pub fn is_dispatching(&self) -> bool {
        self.dispatching
    }

    /// Deliver every queued notification and return the commands listeners
    /// asked for. Does nothing while a dispatch is already running.
    pub fn dispatch(&mut self, document: &Document) -> Vec<Command> {
        if self.dispatching {
            return Vec::new();
        }
        self.dispatching = true;
        while let Some(notification) = self.queue.pop_front() {
            for (_, listener) in self.listeners.iter_mut() {
                if let Some(command) = listener(&notification, document) {
                    log::debug!("deferred {} from {:?} listener", command.label(), notification);
                    self.deferred.push(command);
                }
            }
        }
        self.dispatching = false;
        std::mem::take(&mut self.deferred)
    }

    /// Drop everything pending without delivering it.
    pub fn clear_pending(&mut self) {
        self.queue.clear();
        self.deferred.clear();
    }
}

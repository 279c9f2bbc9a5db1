//! Publisher Core Library
//!
//! Platform-agnostic document model, undo history and tool state machine for
//! the Publisher page editor. Rendering and windowing live outside this crate;
//! they consume [`scene::SceneGraph`] events and feed [`input::InputEvent`]s.

pub mod commands;
pub mod document;
pub mod editor;
pub mod error;
pub mod input;
pub mod items;
pub mod notify;
pub mod scene;
pub mod selection;
pub mod serializer;
pub mod settings;
pub mod storage;
pub mod tools;
pub mod units;

pub use commands::{Command, CommandStack};
pub use document::{Document, Page, FORMAT_VERSION};
pub use editor::{Alignment, Editor, ZOrder};
pub use error::{EditorError, EditorResult};
pub use input::{InputEvent, InputState, Key, Modifiers};
pub use items::{Item, ItemId, ItemKind, SerializableColor};
pub use notify::{Notification, Notifier};
pub use scene::{SceneEvent, SceneGraph};
pub use selection::Selection;
pub use settings::Settings;
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError, StorageResult};
pub use tools::{ShapeKind, ToolKind, ToolMachine, ToolResponse};
pub use units::{PageSize, Unit};

//! Error taxonomy shared by the document model, serializer and command stack.

use crate::items::ItemId;
use thiserror::Error;

/// Errors returned by model, serializer and command operations.
///
/// Every failing operation leaves the document and the command history
/// exactly as they were before the call.
#[derive(Debug, Error)]
pub enum EditorError {
    /// Page or item addressing out of range.
    #[error("{what} index {index} out of range (len {len})")]
    InvalidIndex {
        what: &'static str,
        index: usize,
        len: usize,
    },
    /// Structurally disallowed action, e.g. removing the last page.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    /// A group references an id that does not resolve on its page.
    #[error("Group {group} references missing item {missing}")]
    DanglingReference { group: ItemId, missing: ItemId },
    /// A group contains itself, directly or through nested groups.
    #[error("Group {0} contains itself")]
    ReferenceCycle(ItemId),
    /// An item carries a variant tag this version does not know.
    #[error("Unknown item variant: {0}")]
    UnknownVariant(String),
    /// `begin_macro` was called while another macro was open.
    #[error("Macro already open: {0}")]
    MacroAlreadyOpen(String),
    /// `end_macro`/`cancel_macro` was called with no macro open.
    #[error("No macro is open")]
    NoMacroOpen,
    /// No item with this id exists where it was looked up.
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),
    /// The text is not a well-formed document.
    #[error("Format error: {0}")]
    Format(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for model and command operations.
pub type EditorResult<T> = Result<T, EditorError>;

impl EditorError {
    pub(crate) fn page_index(index: usize, len: usize) -> Self {
        Self::InvalidIndex {
            what: "page",
            index,
            len,
        }
    }

    pub(crate) fn item_index(index: usize, len: usize) -> Self {
        Self::InvalidIndex {
            what: "item",
            index,
            len,
        }
    }

    /// Whether this error means the loaded text was structurally corrupt.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::DanglingReference { .. }
                | Self::ReferenceCycle(_)
                | Self::UnknownVariant(_)
                | Self::Format(_)
                | Self::Json(_)
        )
    }
}

//! Conversation model
//!
//! Two independently appended lists: display items for rendering and
//! wire-context items for resending upstream.

pub mod item;
mod store;
pub mod wire;

pub use item::{
    Annotation, ApprovalRequestItem, ContentKind, ContentPart, FileRef, Item, MessageItem, Role,
    ToolCallItem, ToolCatalogItem, ToolDescriptor, ToolKind, ToolStatus,
};
pub use store::{Change, ConversationStore};
pub use wire::WireItem;

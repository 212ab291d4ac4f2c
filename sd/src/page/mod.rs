//! Per-page speed synchronization
//!
//! Each open page runs a synchronizer task that owns the page's desired
//! speed, keeps the document's media elements at it, and answers speed
//! requests. Pages converge on the shared store's committed value without
//! ever talking to each other directly.

pub mod config;
pub mod document;
pub mod handle;
pub mod messages;
pub mod synchronizer;

pub use config::PageConfig;
pub use document::{DocumentUpdate, DomNode, MediaKind, PageDocument};
pub use handle::PageHandle;
pub use messages::{PageSnapshot, TargetError, TargetResponse};
pub use synchronizer::spawn;

/// Identifier of one page.
pub type PageId = String;

//! speedsync - debounced playback speed control synchronized across pages
//!
//! Three cooperating pieces keep every page's playback speed in step:
//!
//! - **Page synchronizers** ([`page`]): one task per page, owning that
//!   page's desired speed, applying it to the document's media elements,
//!   and serving GET_SPEED / SET_SPEED requests.
//! - **Coordinator** ([`coordinator`]): owns the page registry and turns
//!   external triggers into debounced read-compute-set round trips against
//!   the active page.
//! - **Shared store** (speedstore): the committed speed on disk, with
//!   change notifications every synchronizer follows.
//!
//! Any page's speed change is committed once and adopted everywhere; two
//! rapid triggers net a single step because the second finds the first's
//! round trip still pending and is dropped.

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod page;
pub mod protocol;
pub mod repl;
pub mod speed;

pub use config::Config;
pub use coordinator::{Coordinator, CoordinatorHandle};
pub use page::{PageHandle, PageId};
pub use speed::{SpeedValue, TriggerKind};

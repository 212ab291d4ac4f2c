//! Mailbox types for the page synchronizer

use thiserror::Error;
use tokio::sync::oneshot;

use super::PageId;
use super::document::{DocumentUpdate, MediaElement};
use crate::protocol::{SetAck, SpeedReply};
use crate::speed::SpeedValue;

/// Errors crossing a page's channel boundary.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TargetError {
    /// The page's mailbox or reply channel is gone, usually because the
    /// page closed or navigated away mid-request.
    #[error("Page unreachable")]
    Unreachable,
}

/// Response type for page operations.
pub type TargetResponse<T> = Result<T, TargetError>;

/// Commands sent to a page synchronizer task.
#[derive(Debug)]
pub enum PageCommand {
    /// Serve a GET_SPEED request
    GetSpeed { reply: oneshot::Sender<SpeedReply> },

    /// Serve a SET_SPEED request. `value` carries the raw wire payload;
    /// `None` means missing or non-numeric and applies the default.
    SetSpeed {
        value: Option<f64>,
        reply: oneshot::Sender<SetAck>,
    },

    /// The host changed the document
    Mutate { update: DocumentUpdate },

    /// Internal: a settle timer elapsed. Stale generations are ignored.
    SettleElapsed { generation: u64 },

    /// Point-in-time view of the page for inspection
    Snapshot { reply: oneshot::Sender<PageSnapshot> },

    /// Stop the synchronizer
    Shutdown,
}

/// Inspection view of one page.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub page_id: PageId,
    pub desired_speed: SpeedValue,
    pub elements: Vec<MediaElement>,
}

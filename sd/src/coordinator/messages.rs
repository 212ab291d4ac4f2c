//! Message types for the coordinator

use tokio::sync::oneshot;

use crate::page::PageId;
use crate::page::handle::PageHandle;
use crate::speed::{SpeedValue, TriggerKind};

/// Commands sent to the coordinator task.
#[derive(Debug)]
pub enum CoordCommand {
    /// Register a page synchronizer so triggers can resolve to it
    Register { handle: PageHandle },

    /// Remove a page (closed or navigated away). Releases any pending
    /// round trip against it.
    Unregister { page_id: PageId },

    /// Change which page triggers resolve against. `None` means no page
    /// has focus and triggers are dropped.
    SetActive { page_id: Option<PageId> },

    /// An external trigger fired
    Trigger { kind: TriggerKind },

    /// Badge feed from a page (SPEED_UPDATED notice)
    SpeedUpdated { page_id: PageId, value: SpeedValue },

    /// Internal: a round trip finished
    RoundTripDone {
        page_id: PageId,
        trip_id: String,
        outcome: RoundTripOutcome,
    },

    /// Internal: a round trip's timeout elapsed
    RoundTripTimeout { page_id: PageId, trip_id: String },

    /// Get current status and metrics
    GetStatus { reply: oneshot::Sender<CoordinatorStatus> },

    /// Shutdown the coordinator
    Shutdown,
}

/// How a round trip ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RoundTripOutcome {
    /// SET_SPEED acked with this value
    Applied { value: SpeedValue },
    /// The target never answered GET_SPEED
    TargetUnreachable,
    /// GET_SPEED worked but SET_SPEED failed
    SetFailed,
}

/// Point-in-time coordinator state for inspection.
#[derive(Debug, Clone)]
pub struct CoordinatorStatus {
    /// Page triggers currently resolve against
    pub active_page: Option<PageId>,
    /// Registered page ids
    pub pages: Vec<PageId>,
    /// Pages with a round trip in flight
    pub pending: Vec<PageId>,
    /// Last speed any page announced
    pub badge: Option<SpeedValue>,
    pub metrics: CoordinatorMetrics,
}

/// Coordinator metrics for observability.
#[derive(Debug, Clone, Default)]
pub struct CoordinatorMetrics {
    pub registered_pages: usize,
    pub pending_round_trips: usize,
    pub triggers_received: u64,
    pub triggers_dropped_pending: u64,
    pub triggers_dropped_no_target: u64,
    pub round_trips_applied: u64,
    pub round_trips_failed: u64,
    pub round_trip_timeouts: u64,
    pub commit_failures: u64,
    pub updates_received: u64,
}

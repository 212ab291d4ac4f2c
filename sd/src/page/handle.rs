//! Clonable handle to a page synchronizer

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::PageId;
use super::document::DocumentUpdate;
use super::messages::{PageCommand, PageSnapshot, TargetError, TargetResponse};
use crate::protocol::SetAck;
use crate::speed::SpeedValue;

/// Handle for sending requests to one page synchronizer.
///
/// Cloning is cheap; every clone talks to the same task. All methods except
/// [`PageHandle::id`] cross the page's channel and fail with
/// [`TargetError::Unreachable`] once the page is gone. Dropping the last
/// clone stops the task, same as [`PageHandle::shutdown`].
#[derive(Debug, Clone)]
pub struct PageHandle {
    id: PageId,
    tx: mpsc::Sender<PageCommand>,
}

impl PageHandle {
    pub(crate) fn new(id: PageId, tx: mpsc::Sender<PageCommand>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> &PageId {
        &self.id
    }

    /// Current desired speed (GET_SPEED).
    pub async fn get_speed(&self) -> TargetResponse<SpeedValue> {
        debug!(page_id = %self.id, "get_speed: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PageCommand::GetSpeed { reply: reply_tx })
            .await
            .map_err(|_| TargetError::Unreachable)?;
        let reply = reply_rx.await.map_err(|_| TargetError::Unreachable)?;
        Ok(reply.value)
    }

    /// Set the desired speed (SET_SPEED with a numeric payload).
    pub async fn set_speed(&self, value: f64) -> TargetResponse<SetAck> {
        self.set_payload(Some(value)).await
    }

    /// Set the desired speed from a raw wire payload. `None` stands for a
    /// missing or non-numeric value and applies the default.
    pub async fn set_payload(&self, value: Option<f64>) -> TargetResponse<SetAck> {
        debug!(page_id = %self.id, ?value, "set_payload: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PageCommand::SetSpeed { value, reply: reply_tx })
            .await
            .map_err(|_| TargetError::Unreachable)?;
        reply_rx.await.map_err(|_| TargetError::Unreachable)
    }

    /// Feed a document change into the page's growth watch.
    pub async fn mutate(&self, update: DocumentUpdate) -> TargetResponse<()> {
        self.tx
            .send(PageCommand::Mutate { update })
            .await
            .map_err(|_| TargetError::Unreachable)
    }

    /// Point-in-time view of the page.
    pub async fn snapshot(&self) -> TargetResponse<PageSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PageCommand::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| TargetError::Unreachable)?;
        reply_rx.await.map_err(|_| TargetError::Unreachable)
    }

    /// Stop the synchronizer. Requests sent afterwards fail as unreachable.
    pub async fn shutdown(&self) -> TargetResponse<()> {
        debug!(page_id = %self.id, "shutdown: called");
        self.tx
            .send(PageCommand::Shutdown)
            .await
            .map_err(|_| TargetError::Unreachable)
    }
}

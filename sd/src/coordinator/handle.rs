//! Clonable handle for talking to the coordinator

use eyre::Result;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::messages::{CoordCommand, CoordinatorStatus};
use crate::page::PageId;
use crate::page::handle::PageHandle;
use crate::speed::TriggerKind;

/// Handle for sending commands to a running coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<CoordCommand>,
}

impl CoordinatorHandle {
    pub fn new(tx: mpsc::Sender<CoordCommand>) -> Self {
        Self { tx }
    }

    /// Register a page so triggers can resolve against it.
    pub async fn register(&self, handle: PageHandle) -> Result<()> {
        debug!(page_id = %handle.id(), "register: called");
        self.tx
            .send(CoordCommand::Register { handle })
            .await
            .map_err(|_| eyre::eyre!("Coordinator channel closed"))?;
        Ok(())
    }

    /// Remove a page and release any round trip pending against it.
    pub async fn unregister(&self, page_id: &str) -> Result<()> {
        debug!(page_id = %page_id, "unregister: called");
        self.tx
            .send(CoordCommand::Unregister { page_id: page_id.to_string() })
            .await
            .map_err(|_| eyre::eyre!("Coordinator channel closed"))?;
        Ok(())
    }

    /// Point triggers at a page, or at nothing.
    pub async fn set_active(&self, page_id: Option<PageId>) -> Result<()> {
        debug!(page_id = ?page_id, "set_active: called");
        self.tx
            .send(CoordCommand::SetActive { page_id })
            .await
            .map_err(|_| eyre::eyre!("Coordinator channel closed"))?;
        Ok(())
    }

    /// Fire a named trigger against the active page.
    pub async fn trigger(&self, kind: TriggerKind) -> Result<()> {
        debug!(trigger = %kind, "trigger: called");
        self.tx
            .send(CoordCommand::Trigger { kind })
            .await
            .map_err(|_| eyre::eyre!("Coordinator channel closed"))?;
        Ok(())
    }

    /// Current status and metrics.
    pub async fn status(&self) -> Result<CoordinatorStatus> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(CoordCommand::GetStatus { reply: reply_tx })
            .await
            .map_err(|_| eyre::eyre!("Coordinator channel closed"))?;
        reply_rx.await.map_err(|_| eyre::eyre!("Coordinator channel closed"))
    }

    /// Sink for page speed-update notices.
    pub fn notice_sink(&self) -> mpsc::Sender<CoordCommand> {
        self.tx.clone()
    }

    /// Request shutdown.
    pub async fn shutdown(&self) -> Result<()> {
        debug!("shutdown: called");
        self.tx
            .send(CoordCommand::Shutdown)
            .await
            .map_err(|_| eyre::eyre!("Coordinator channel closed"))?;
        Ok(())
    }
}

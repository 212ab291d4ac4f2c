//! Page synchronizer task
//!
//! One synchronizer runs per page. It owns the page's desired speed,
//! applies it to the document's media elements, serves GET_SPEED and
//! SET_SPEED requests over its mailbox, and follows commits to the shared
//! store made by other pages. Speed state lives entirely inside the task;
//! the rest of the system talks to it through [`PageHandle`].

use speedstore::{SpeedChange, SpeedStore};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use super::PageId;
use super::config::PageConfig;
use super::document::PageDocument;
use super::handle::PageHandle;
use super::messages::{PageCommand, PageSnapshot};
use crate::coordinator::messages::CoordCommand;
use crate::protocol::{SetAck, SpeedReply};
use crate::speed::SpeedValue;

/// Spawn a synchronizer for one page document and return its handle.
///
/// The store subscription is taken before the first read so a commit
/// landing in between is observed rather than lost. `notices` is the
/// coordinator's mailbox for fire-and-forget speed updates; pages run fine
/// without one.
pub fn spawn(
    id: PageId,
    document: PageDocument,
    store: SpeedStore,
    notices: Option<mpsc::Sender<CoordCommand>>,
    config: PageConfig,
) -> PageHandle {
    let (tx, rx) = mpsc::channel(config.channel_buffer);
    let changes = store.subscribe();

    let actor = PageActor {
        id: id.clone(),
        config,
        document,
        store,
        desired: SpeedValue::DEFAULT,
        settle_generation: 0,
        notices,
        self_tx: tx.downgrade(),
    };

    tokio::spawn(actor_loop(actor, rx, changes));

    PageHandle::new(id, tx)
}

struct PageActor {
    id: PageId,
    config: PageConfig,
    document: PageDocument,
    store: SpeedStore,
    desired: SpeedValue,
    /// Bumped when a settle timer is armed. An elapsed timer carrying an
    /// older generation is stale and ignored.
    settle_generation: u64,
    notices: Option<mpsc::Sender<CoordCommand>>,
    /// Self-sender for settle timers. Weak, so the mailbox closes and the
    /// actor stops once the last external handle is dropped.
    self_tx: mpsc::WeakSender<PageCommand>,
}

async fn actor_loop(
    mut actor: PageActor,
    mut rx: mpsc::Receiver<PageCommand>,
    mut changes: broadcast::Receiver<SpeedChange>,
) {
    actor.init();

    let mut changes_open = true;
    loop {
        tokio::select! {
            command = rx.recv() => {
                match command {
                    Some(PageCommand::Shutdown) | None => break,
                    Some(command) => actor.handle(command),
                }
            }
            change = changes.recv(), if changes_open => {
                match change {
                    Ok(change) => actor.adopt_committed(change),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(page_id = %actor.id, missed, "Store subscription lagged, re-reading");
                        actor.resync_from_store();
                    }
                    Err(broadcast::error::RecvError::Closed) => changes_open = false,
                }
            }
        }
    }

    info!(page_id = %actor.id, "Page synchronizer stopped");
}

impl PageActor {
    /// Adopt the committed speed (or the default when nothing is committed
    /// yet) and bring existing media up to it.
    fn init(&mut self) {
        self.desired = match self.store.read() {
            Ok(Some(speed)) => speed,
            Ok(None) => SpeedValue::DEFAULT,
            Err(err) => {
                warn!(page_id = %self.id, error = %err, "Could not read committed speed, using default");
                SpeedValue::DEFAULT
            }
        };

        info!(page_id = %self.id, speed = %self.desired, "Page synchronizer started");
        self.apply_all("init");
    }

    fn handle(&mut self, command: PageCommand) {
        match command {
            PageCommand::GetSpeed { reply } => {
                debug!(page_id = %self.id, speed = %self.desired, "GET_SPEED");
                let _ = reply.send(SpeedReply { value: self.desired });
            }

            PageCommand::SetSpeed { value, reply } => {
                let speed = value.map(SpeedValue::from_f64).unwrap_or_default();
                debug!(page_id = %self.id, requested = ?value, speed = %speed, "SET_SPEED");

                let changed = speed != self.desired;
                self.desired = speed;
                self.apply_all("set");

                // Memory and document stay authoritative even when the
                // commit fails; the speed must not flicker back.
                if changed && let Err(err) = self.store.write(speed) {
                    warn!(page_id = %self.id, error = %err, "Commit to shared store failed");
                }

                let _ = reply.send(SetAck { ok: true, value: speed });
            }

            PageCommand::Mutate { update } => {
                let record = self.document.apply_update(update);
                if record.introduces_playable() {
                    self.arm_settle_timer();
                }
            }

            PageCommand::SettleElapsed { generation } => {
                if generation == self.settle_generation {
                    self.apply_all("settle");
                } else {
                    debug!(page_id = %self.id, generation, "Stale settle timer ignored");
                }
            }

            PageCommand::Snapshot { reply } => {
                let _ = reply.send(PageSnapshot {
                    page_id: self.id.clone(),
                    desired_speed: self.desired,
                    elements: self.document.elements().to_vec(),
                });
            }

            // Handled by the loop before dispatch
            PageCommand::Shutdown => {}
        }
    }

    /// Another writer committed a speed. Adopt it and re-apply; adoption
    /// never writes back to the store, so there is no notification loop.
    fn adopt_committed(&mut self, change: SpeedChange) {
        debug!(page_id = %self.id, old = ?change.old, new = %change.new, "Adopting committed speed");
        self.desired = change.new;
        self.apply_all("store-change");
    }

    fn resync_from_store(&mut self) {
        match self.store.read() {
            Ok(Some(speed)) => {
                self.desired = speed;
                self.apply_all("resync");
            }
            Ok(None) => {}
            Err(err) => warn!(page_id = %self.id, error = %err, "Resync read failed"),
        }
    }

    fn apply_all(&mut self, reason: &str) {
        let applied = self.document.apply_rate(self.desired.get());
        debug!(page_id = %self.id, speed = %self.desired, applied, reason, "Applied speed to media elements");

        if let Some(tx) = &self.notices {
            let _ = tx.try_send(CoordCommand::SpeedUpdated {
                page_id: self.id.clone(),
                value: self.desired,
            });
        }
    }

    /// Media arrived. Wait out the settle window before applying, so player
    /// scaffolding that resets the rate during setup does not win. A new
    /// arrival inside the window restarts it.
    fn arm_settle_timer(&mut self) {
        // A failed upgrade means the page is already shutting down.
        let Some(tx) = self.self_tx.upgrade() else {
            return;
        };

        self.settle_generation += 1;
        let generation = self.settle_generation;
        let delay = self.config.settle_delay();

        debug!(page_id = %self.id, generation, "Media element arrived, settle timer armed");

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(PageCommand::SettleElapsed { generation }).await;
        });
    }
}

//! Coordinator task implementation
//!
//! The coordinator owns the page registry and turns external triggers into
//! round trips against the active page: read the page's speed, compute the
//! step, set the result. While a round trip is in flight its target accepts
//! no further triggers; the entry is released on completion, on timeout, or
//! when the page unregisters.

use std::collections::HashMap;
use std::time::Instant;

use speedstore::SpeedStore;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::CoordinatorConfig;
use super::handle::CoordinatorHandle;
use super::messages::{CoordCommand, CoordinatorMetrics, CoordinatorStatus, RoundTripOutcome};
use crate::page::PageId;
use crate::page::handle::PageHandle;
use crate::speed::{SpeedValue, TriggerKind};

/// One in-flight round trip. At most one exists per page; a trigger
/// arriving while it exists is dropped, which is what keeps two
/// back-to-back triggers from both reading the same stale speed.
struct DebounceEntry {
    trip_id: String,
    kind: TriggerKind,
    started: Instant,
    /// Timeout timer, aborted when the entry is released early
    timer: JoinHandle<()>,
}

/// The coordinator task. Create with [`Coordinator::new`], hand out
/// [`CoordinatorHandle`]s, then consume it with [`Coordinator::run`].
pub struct Coordinator {
    config: CoordinatorConfig,
    tx: mpsc::Sender<CoordCommand>,
    rx: mpsc::Receiver<CoordCommand>,
    store: SpeedStore,
}

impl Coordinator {
    /// Create a coordinator that commits acked speeds to the given store.
    pub fn new(config: CoordinatorConfig, store: SpeedStore) -> Self {
        let (tx, rx) = mpsc::channel(config.channel_buffer);
        Self { config, tx, rx, store }
    }

    /// Raw command sender, also used as the notice sink for pages.
    pub fn sender(&self) -> mpsc::Sender<CoordCommand> {
        self.tx.clone()
    }

    /// Create a clonable handle.
    pub fn handle(&self) -> CoordinatorHandle {
        CoordinatorHandle::new(self.tx.clone())
    }

    /// Run the coordinator until shutdown is requested.
    pub async fn run(mut self) {
        let coord_tx = self.tx.clone();
        let round_trip_timeout = self.config.round_trip_timeout();

        let mut registry: HashMap<PageId, PageHandle> = HashMap::new();
        let mut debounce: HashMap<PageId, DebounceEntry> = HashMap::new();
        let mut active_page: Option<PageId> = None;
        let mut badge: Option<SpeedValue> = None;
        let mut metrics = CoordinatorMetrics::default();

        info!("Coordinator started");

        while let Some(command) = self.rx.recv().await {
            match command {
                CoordCommand::Register { handle } => {
                    debug!(page_id = %handle.id(), "Registering page");
                    registry.insert(handle.id().clone(), handle);
                    metrics.registered_pages = registry.len();
                }

                CoordCommand::Unregister { page_id } => {
                    debug!(page_id = %page_id, "Unregistering page");
                    registry.remove(&page_id);
                    if let Some(entry) = debounce.remove(&page_id) {
                        // The target is gone for good; its round trip can
                        // never land.
                        entry.timer.abort();
                    }
                    if active_page.as_ref() == Some(&page_id) {
                        active_page = None;
                    }
                    metrics.registered_pages = registry.len();
                    metrics.pending_round_trips = debounce.len();
                }

                CoordCommand::SetActive { page_id } => {
                    debug!(page_id = ?page_id, "Active page changed");
                    active_page = page_id;
                }

                CoordCommand::Trigger { kind } => {
                    metrics.triggers_received += 1;

                    let Some(page_id) = active_page.clone() else {
                        debug!(trigger = %kind, "Trigger with no active page dropped");
                        metrics.triggers_dropped_no_target += 1;
                        continue;
                    };

                    if debounce.contains_key(&page_id) {
                        debug!(page_id = %page_id, trigger = %kind, "Trigger dropped, round trip pending");
                        metrics.triggers_dropped_pending += 1;
                        continue;
                    }

                    let Some(handle) = registry.get(&page_id) else {
                        debug!(page_id = %page_id, trigger = %kind, "Trigger for unregistered page dropped");
                        metrics.triggers_dropped_no_target += 1;
                        continue;
                    };

                    let trip_id = Uuid::now_v7().to_string();
                    debug!(page_id = %page_id, trip_id = %trip_id, trigger = %kind, "Starting round trip");

                    let timer = {
                        let tx = coord_tx.clone();
                        let page_id = page_id.clone();
                        let trip_id = trip_id.clone();
                        tokio::spawn(async move {
                            tokio::time::sleep(round_trip_timeout).await;
                            let _ = tx.send(CoordCommand::RoundTripTimeout { page_id, trip_id }).await;
                        })
                    };

                    {
                        let tx = coord_tx.clone();
                        let handle = handle.clone();
                        let page_id = page_id.clone();
                        let trip_id = trip_id.clone();
                        tokio::spawn(async move {
                            let outcome = round_trip(&handle, kind).await;
                            let _ = tx.send(CoordCommand::RoundTripDone { page_id, trip_id, outcome }).await;
                        });
                    }

                    debounce.insert(
                        page_id,
                        DebounceEntry {
                            trip_id,
                            kind,
                            started: Instant::now(),
                            timer,
                        },
                    );
                    metrics.pending_round_trips = debounce.len();
                }

                CoordCommand::RoundTripDone { page_id, trip_id, outcome } => {
                    let is_current = debounce
                        .get(&page_id)
                        .is_some_and(|entry| entry.trip_id == trip_id);
                    if !is_current {
                        debug!(page_id = %page_id, trip_id = %trip_id, "Stale round trip completion ignored");
                        continue;
                    }
                    let Some(entry) = debounce.remove(&page_id) else {
                        continue;
                    };
                    entry.timer.abort();
                    metrics.pending_round_trips = debounce.len();

                    let elapsed_ms = entry.started.elapsed().as_millis() as u64;
                    match outcome {
                        RoundTripOutcome::Applied { value } => {
                            info!(
                                page_id = %page_id,
                                trigger = %entry.kind,
                                speed = %value,
                                elapsed_ms,
                                "Round trip applied"
                            );
                            metrics.round_trips_applied += 1;
                            badge = Some(value);

                            // The page already committed on SET; writing the
                            // acked value again carries the same number, so
                            // the last-writer-wins race is a no-op.
                            if let Err(err) = self.store.write(value) {
                                warn!(error = %err, "Coordinator commit failed");
                                metrics.commit_failures += 1;
                            }
                        }
                        RoundTripOutcome::TargetUnreachable => {
                            debug!(page_id = %page_id, elapsed_ms, "Round trip target unreachable");
                            metrics.round_trips_failed += 1;
                        }
                        RoundTripOutcome::SetFailed => {
                            warn!(page_id = %page_id, elapsed_ms, "Round trip SET failed after GET");
                            metrics.round_trips_failed += 1;
                        }
                    }
                }

                CoordCommand::RoundTripTimeout { page_id, trip_id } => {
                    let is_current = debounce
                        .get(&page_id)
                        .is_some_and(|entry| entry.trip_id == trip_id);
                    if is_current && let Some(entry) = debounce.remove(&page_id) {
                        // The in-flight request is not cancelled; if it ever
                        // completes, its trip id no longer matches.
                        warn!(page_id = %page_id, trigger = %entry.kind, "Round trip timed out, debounce released");
                        metrics.round_trip_timeouts += 1;
                        metrics.pending_round_trips = debounce.len();
                    }
                }

                CoordCommand::SpeedUpdated { page_id, value } => {
                    debug!(page_id = %page_id, speed = %value, "Speed update notice");
                    metrics.updates_received += 1;
                    badge = Some(value);
                }

                CoordCommand::GetStatus { reply } => {
                    let _ = reply.send(CoordinatorStatus {
                        active_page: active_page.clone(),
                        pages: registry.keys().cloned().collect(),
                        pending: debounce.keys().cloned().collect(),
                        badge,
                        metrics: metrics.clone(),
                    });
                }

                CoordCommand::Shutdown => {
                    info!("Coordinator shutting down");
                    for entry in debounce.values() {
                        entry.timer.abort();
                    }
                    break;
                }
            }
        }

        info!("Coordinator stopped");
    }
}

/// One GET, compute, SET exchange against a page.
async fn round_trip(handle: &PageHandle, kind: TriggerKind) -> RoundTripOutcome {
    let current = match handle.get_speed().await {
        Ok(current) => current,
        Err(_) => return RoundTripOutcome::TargetUnreachable,
    };

    let next = kind.next_speed(current);
    match handle.set_speed(next.get()).await {
        Ok(ack) => RoundTripOutcome::Applied { value: ack.value },
        Err(_) => RoundTripOutcome::SetFailed,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;
    use tokio::time::sleep;

    use super::*;
    use crate::page::messages::PageCommand;
    use crate::protocol::{SetAck, SpeedReply};

    /// Page stub that answers GET/SET from a local speed variable. The
    /// first GET can be delayed to hold a round trip open.
    fn stub_page(id: &str, speed: f64, first_get_delay: Duration) -> PageHandle {
        let (tx, mut rx) = mpsc::channel(16);
        let handle = PageHandle::new(id.to_string(), tx);

        tokio::spawn(async move {
            let mut current = SpeedValue::from_f64(speed);
            let mut first = true;
            while let Some(command) = rx.recv().await {
                match command {
                    PageCommand::GetSpeed { reply } => {
                        if first {
                            first = false;
                            sleep(first_get_delay).await;
                        }
                        let _ = reply.send(SpeedReply { value: current });
                    }
                    PageCommand::SetSpeed { value, reply } => {
                        current = value.map(SpeedValue::from_f64).unwrap_or_default();
                        let _ = reply.send(SetAck { ok: true, value: current });
                    }
                    _ => {}
                }
            }
        });

        handle
    }

    fn start_coordinator(temp: &TempDir, timeout_ms: u64) -> (SpeedStore, mpsc::Sender<CoordCommand>, CoordinatorHandle) {
        let store = SpeedStore::open(temp.path()).unwrap();
        let config = CoordinatorConfig {
            round_trip_timeout_ms: timeout_ms,
            ..Default::default()
        };
        let coordinator = Coordinator::new(config, store.clone());
        let sender = coordinator.sender();
        let handle = coordinator.handle();
        tokio::spawn(coordinator.run());
        (store, sender, handle)
    }

    #[tokio::test]
    async fn test_trigger_steps_active_page() {
        let temp = TempDir::new().unwrap();
        let (store, sender, coord) = start_coordinator(&temp, 2000);

        let page = stub_page("page-1", 1.0, Duration::ZERO);
        sender.send(CoordCommand::Register { handle: page }).await.unwrap();
        sender
            .send(CoordCommand::SetActive { page_id: Some("page-1".to_string()) })
            .await
            .unwrap();

        sender.send(CoordCommand::Trigger { kind: TriggerKind::IncreaseSpeed }).await.unwrap();
        sleep(Duration::from_millis(100)).await;

        let status = coord.status().await.unwrap();
        assert_eq!(status.metrics.round_trips_applied, 1);
        assert!(status.pending.is_empty());
        assert_eq!(status.badge.unwrap().get(), 1.25);
        assert_eq!(store.read().unwrap().unwrap().get(), 1.25);
    }

    #[tokio::test]
    async fn test_second_trigger_during_round_trip_dropped() {
        let temp = TempDir::new().unwrap();
        let (store, sender, coord) = start_coordinator(&temp, 2000);

        let page = stub_page("page-1", 1.0, Duration::ZERO);
        sender.send(CoordCommand::Register { handle: page }).await.unwrap();
        sender
            .send(CoordCommand::SetActive { page_id: Some("page-1".to_string()) })
            .await
            .unwrap();

        // Both triggers are queued before the first completion can arrive,
        // so the second always finds the round trip pending.
        sender.send(CoordCommand::Trigger { kind: TriggerKind::IncreaseSpeed }).await.unwrap();
        sender.send(CoordCommand::Trigger { kind: TriggerKind::IncreaseSpeed }).await.unwrap();
        sleep(Duration::from_millis(100)).await;

        let status = coord.status().await.unwrap();
        assert_eq!(status.metrics.triggers_received, 2);
        assert_eq!(status.metrics.triggers_dropped_pending, 1);
        assert_eq!(status.metrics.round_trips_applied, 1);
        assert_eq!(store.read().unwrap().unwrap().get(), 1.25);
    }

    #[tokio::test]
    async fn test_trigger_without_active_page_dropped() {
        let temp = TempDir::new().unwrap();
        let (store, sender, coord) = start_coordinator(&temp, 2000);

        sender.send(CoordCommand::Trigger { kind: TriggerKind::IncreaseSpeed }).await.unwrap();
        sleep(Duration::from_millis(50)).await;

        let status = coord.status().await.unwrap();
        assert_eq!(status.metrics.triggers_dropped_no_target, 1);
        assert!(status.pending.is_empty());
        assert!(store.read().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_trigger_for_unregistered_active_page_dropped() {
        let temp = TempDir::new().unwrap();
        let (_store, sender, coord) = start_coordinator(&temp, 2000);

        sender
            .send(CoordCommand::SetActive { page_id: Some("ghost".to_string()) })
            .await
            .unwrap();
        sender.send(CoordCommand::Trigger { kind: TriggerKind::IncreaseSpeed }).await.unwrap();
        sleep(Duration::from_millis(50)).await;

        let status = coord.status().await.unwrap();
        assert_eq!(status.metrics.triggers_dropped_no_target, 1);
    }

    #[tokio::test]
    async fn test_unreachable_target_releases_debounce() {
        let temp = TempDir::new().unwrap();
        let (store, sender, coord) = start_coordinator(&temp, 2000);

        // A handle whose task is gone: the mailbox is created and dropped.
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let page = PageHandle::new("page-1".to_string(), tx);

        sender.send(CoordCommand::Register { handle: page }).await.unwrap();
        sender
            .send(CoordCommand::SetActive { page_id: Some("page-1".to_string()) })
            .await
            .unwrap();
        sender.send(CoordCommand::Trigger { kind: TriggerKind::IncreaseSpeed }).await.unwrap();
        sleep(Duration::from_millis(50)).await;

        let status = coord.status().await.unwrap();
        assert!(status.pending.is_empty());
        assert_eq!(status.metrics.round_trips_failed, 1);
        assert!(store.read().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_timeout_releases_and_ignores_late_completion() {
        let temp = TempDir::new().unwrap();
        let (store, sender, coord) = start_coordinator(&temp, 80);

        let page = stub_page("page-1", 1.0, Duration::from_millis(300));
        sender.send(CoordCommand::Register { handle: page }).await.unwrap();
        sender
            .send(CoordCommand::SetActive { page_id: Some("page-1".to_string()) })
            .await
            .unwrap();

        sender.send(CoordCommand::Trigger { kind: TriggerKind::IncreaseSpeed }).await.unwrap();
        sleep(Duration::from_millis(150)).await;

        let status = coord.status().await.unwrap();
        assert_eq!(status.metrics.round_trip_timeouts, 1);
        assert!(status.pending.is_empty());

        // The stuck GET answers around 300ms; by then the entry is gone and
        // the completion must not count or commit.
        sleep(Duration::from_millis(250)).await;
        let status = coord.status().await.unwrap();
        assert_eq!(status.metrics.round_trips_applied, 0);
        assert!(store.read().unwrap().is_none());

        // The target stays usable: the next trigger proceeds, reading
        // whatever the late SET left behind.
        sender.send(CoordCommand::Trigger { kind: TriggerKind::IncreaseSpeed }).await.unwrap();
        sleep(Duration::from_millis(100)).await;
        let status = coord.status().await.unwrap();
        assert_eq!(status.metrics.round_trips_applied, 1);
        assert_eq!(store.read().unwrap().unwrap().get(), 1.5);
    }

    #[tokio::test]
    async fn test_unregister_clears_pending_and_active() {
        let temp = TempDir::new().unwrap();
        let (store, sender, coord) = start_coordinator(&temp, 2000);

        let page = stub_page("page-1", 1.0, Duration::from_millis(200));
        sender.send(CoordCommand::Register { handle: page }).await.unwrap();
        sender
            .send(CoordCommand::SetActive { page_id: Some("page-1".to_string()) })
            .await
            .unwrap();
        sender.send(CoordCommand::Trigger { kind: TriggerKind::IncreaseSpeed }).await.unwrap();
        sleep(Duration::from_millis(50)).await;

        sender.send(CoordCommand::Unregister { page_id: "page-1".to_string() }).await.unwrap();
        sleep(Duration::from_millis(20)).await;

        let status = coord.status().await.unwrap();
        assert!(status.pages.is_empty());
        assert!(status.pending.is_empty());
        assert_eq!(status.active_page, None);

        // The released round trip may still complete against the stub; it
        // must be ignored as stale.
        sleep(Duration::from_millis(250)).await;
        let status = coord.status().await.unwrap();
        assert_eq!(status.metrics.round_trips_applied, 0);
        assert!(store.read().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_speed_updated_feeds_badge() {
        let temp = TempDir::new().unwrap();
        let (_store, sender, coord) = start_coordinator(&temp, 2000);

        sender
            .send(CoordCommand::SpeedUpdated {
                page_id: "page-1".to_string(),
                value: SpeedValue::from_f64(1.5),
            })
            .await
            .unwrap();
        sleep(Duration::from_millis(20)).await;

        let status = coord.status().await.unwrap();
        assert_eq!(status.badge.unwrap().get(), 1.5);
        assert_eq!(status.metrics.updates_received, 1);
    }

    #[tokio::test]
    async fn test_reset_trigger_returns_to_default() {
        let temp = TempDir::new().unwrap();
        let (store, sender, coord) = start_coordinator(&temp, 2000);

        let page = stub_page("page-1", 2.37, Duration::ZERO);
        sender.send(CoordCommand::Register { handle: page }).await.unwrap();
        sender
            .send(CoordCommand::SetActive { page_id: Some("page-1".to_string()) })
            .await
            .unwrap();

        sender.send(CoordCommand::Trigger { kind: TriggerKind::ResetSpeed }).await.unwrap();
        sleep(Duration::from_millis(100)).await;

        assert_eq!(store.read().unwrap().unwrap(), SpeedValue::DEFAULT);
        let status = coord.status().await.unwrap();
        assert_eq!(status.badge.unwrap(), SpeedValue::DEFAULT);
    }

    #[tokio::test]
    async fn test_shutdown_stops_task() {
        let temp = TempDir::new().unwrap();
        let (_store, sender, coord) = start_coordinator(&temp, 2000);

        sender.send(CoordCommand::Shutdown).await.unwrap();
        sleep(Duration::from_millis(20)).await;

        assert!(coord.status().await.is_err());
    }
}

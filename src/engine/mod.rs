mod calendar;
mod conflict;
mod error;
mod month;
mod mutations;
mod pricing;
mod queries;
mod status;

pub use calendar::{
    AnnotatedReservation, CalendarCell, ColorAssignment, DayPosition, MonthGrid, ProjectOptions,
    month_grid, project,
};
pub use conflict::{Candidate, Rejection, check_no_conflict, validate};
pub use error::EngineError;
pub use month::{MonthSummary, MonthWindow, ParseMonthError, summarize};
pub use mutations::{Booking, BookingRequest};
pub use pricing::{Invoice, price, price_with_tax};
pub use status::{
    Bucket, Dashboard, DashboardEntry, Label, Status, bucket, classify, dashboard_order,
    is_active_partition, partition,
};

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{RwLock, mpsc, oneshot};

use crate::clock::Clock;
use crate::config::Policy;
use crate::model::*;
use crate::notify::NotifyHub;
use crate::wal::Wal;

pub type SharedResourceState = Arc<RwLock<ResourceState>>;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL. Appends that arrive together share one
/// fsync: take the first, drain whatever else is already queued, flush once,
/// then acknowledge everyone.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        let WalCommand::Append { event, response } = cmd else {
            handle_non_append(&mut wal, cmd);
            continue;
        };

        let mut batch = vec![(event, response)];
        let mut deferred = None;
        loop {
            match rx.try_recv() {
                Ok(WalCommand::Append { event, response }) => batch.push((event, response)),
                Ok(other) => {
                    // Flush what we have before touching the file another way.
                    deferred = Some(other);
                    break;
                }
                Err(_) => break,
            }
        }

        metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
        let flush_start = std::time::Instant::now();
        let result = flush_batch(&mut wal, &batch);
        metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
            .record(flush_start.elapsed().as_secs_f64());
        respond_batch(batch, &result);

        if let Some(cmd) = deferred {
            handle_non_append(&mut wal, cmd);
        }
    }
}

fn flush_batch(wal: &mut Wal, batch: &[(Event, oneshot::Sender<io::Result<()>>)]) -> io::Result<()> {
    let append_result = batch
        .iter()
        .try_for_each(|(event, _)| wal.append_buffered(event));
    // Flush even after a failed append so half-buffered bytes don't end up in
    // the next batch. Every caller in this batch is told it failed.
    let flush_result = wal.flush_sync();
    append_result.and(flush_result)
}

fn respond_batch(batch: Vec<(Event, oneshot::Sender<io::Result<()>>)>, result: &io::Result<()>) {
    for (_, tx) in batch {
        let r = match result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!("appends are batched by the writer loop"),
    }
}

/// The booking workflow and its reservation store.
///
/// Each resource's reservations sit behind their own `RwLock`. A booking holds
/// the write lock across validate → log → apply, so two concurrent requests
/// for the same car can't both pass validation.
pub struct Engine {
    pub(super) state: DashMap<ResourceId, SharedResourceState>,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    pub notify: Arc<NotifyHub>,
    /// Reverse lookup: reservation id → resource id.
    pub(super) reservation_to_resource: DashMap<ReservationId, ResourceId>,
    pub(super) policy: Policy,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) compact_threshold: u64,
}

/// Apply an event to a resource's state (caller holds the lock).
fn apply_to_resource(
    rs: &mut ResourceState,
    event: &Event,
    index: &DashMap<ReservationId, ResourceId>,
) {
    match event {
        Event::ReservationCommitted { reservation } => {
            index.insert(reservation.id, reservation.resource_id);
            rs.insert(reservation.clone());
        }
        Event::StateChanged { id, state, .. } => {
            if rs.set_state(id, *state).is_none() {
                tracing::warn!("state change for unknown reservation {id} on resource {}", rs.id);
            }
        }
    }
}

impl Engine {
    /// Replay the WAL at `wal_path` and start its writer task. Must be called
    /// inside a Tokio runtime.
    pub fn new(
        wal_path: PathBuf,
        notify: Arc<NotifyHub>,
        policy: Policy,
        clock: Arc<dyn Clock>,
        compact_threshold: u64,
    ) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            state: DashMap::new(),
            wal_tx,
            notify,
            reservation_to_resource: DashMap::new(),
            policy,
            clock,
            compact_threshold,
        };

        // Nobody else holds these Arcs yet, so try_write always succeeds.
        // blocking_write would panic when called from async context.
        for event in &events {
            let rs = engine.resource_or_insert(event.resource_id());
            let mut guard = rs.try_write().map_err(io::Error::other)?;
            apply_to_resource(&mut guard, event, &engine.reservation_to_resource);
        }
        tracing::info!(
            "replayed {} events from {}: {} resources, {} reservations",
            events.len(),
            wal_path.display(),
            engine.state.len(),
            engine.reservation_to_resource.len()
        );

        Ok(engine)
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Today according to the injected clock.
    pub fn today(&self) -> Day {
        self.clock.today()
    }

    /// Send an event to the background writer and wait for its fsync.
    async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub(super) async fn wal_appends_since_compact(&self) -> Result<u64, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))
    }

    pub(super) async fn wal_compact(&self, events: Vec<Event>) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact {
                events,
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub fn get_resource(&self, id: &ResourceId) -> Option<SharedResourceState> {
        self.state.get(id).map(|e| e.value().clone())
    }

    /// Resources come from an external catalog; the first reservation for an
    /// unseen id creates its entry here.
    pub(super) fn resource_or_insert(&self, id: ResourceId) -> SharedResourceState {
        self.state
            .entry(id)
            .or_insert_with(|| Arc::new(RwLock::new(ResourceState::new(id))))
            .value()
            .clone()
    }

    pub fn get_resource_for_reservation(&self, id: &ReservationId) -> Option<ResourceId> {
        self.reservation_to_resource.get(id).map(|e| *e.value())
    }

    /// WAL-append, apply, notify.
    pub(super) async fn persist_and_apply(
        &self,
        rs: &mut ResourceState,
        event: &Event,
    ) -> Result<(), EngineError> {
        self.wal_append(event).await?;
        apply_to_resource(rs, event, &self.reservation_to_resource);
        self.notify.send(event);
        Ok(())
    }

    /// Find a reservation's resource and take its write lock.
    pub(super) async fn resolve_reservation_write(
        &self,
        id: &ReservationId,
    ) -> Result<tokio::sync::OwnedRwLockWriteGuard<ResourceState>, EngineError> {
        let resource_id = self
            .get_resource_for_reservation(id)
            .ok_or(EngineError::NotFound(*id))?;
        let rs = self
            .get_resource(&resource_id)
            .ok_or(EngineError::NotFound(resource_id))?;
        Ok(rs.write_owned().await)
    }
}

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::conflict::{Candidate, validate};
use super::pricing::{Invoice, price_with_tax};
use super::{Engine, EngineError};

/// A customer's request to reserve a car.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub resource_id: ResourceId,
    pub owner_id: OwnerId,
    pub candidate: Candidate,
    /// From the resource catalog at booking time.
    pub daily_rate: f64,
}

/// A committed reservation and the invoice it was priced with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Booking {
    pub reservation: Reservation,
    pub invoice: Invoice,
}

impl Engine {
    /// Validate against the resource's current reservations and commit on
    /// success. A validator refusal comes back as `EngineError::Rejected`.
    pub async fn book(&self, request: BookingRequest) -> Result<Booking, EngineError> {
        if request.owner_id.len() > MAX_OWNER_ID_LEN {
            return Err(EngineError::LimitExceeded("owner id too long"));
        }

        let rs = self.resource_or_insert(request.resource_id);
        let mut guard = rs.write().await;
        if guard.reservations.len() >= MAX_RESERVATIONS_PER_RESOURCE {
            return Err(EngineError::LimitExceeded("too many reservations on resource"));
        }

        let today = self.clock.today();
        let range = match validate(&request.candidate, &guard.reservations, &self.policy, today) {
            Ok(range) => range,
            Err(rejection) => {
                observability::record_booking(Err(&rejection));
                tracing::info!(
                    "booking for resource {} rejected: {}",
                    request.resource_id,
                    rejection.tag()
                );
                return Err(EngineError::Rejected(rejection));
            }
        };

        let invoice = price_with_tax(&range, request.daily_rate, self.policy.tax_rate);
        // Strictly increasing per resource: calendar colors are assigned in
        // creation order, so two bookings in the same millisecond must still
        // have a definite order.
        let created_at = guard
            .reservations
            .iter()
            .map(|r| r.created_at + 1)
            .fold(self.clock.now_ms(), Ms::max);
        let reservation = Reservation::new(
            Ulid::new(),
            request.resource_id,
            request.owner_id,
            range,
            invoice.chargeable(),
            created_at,
        );
        let event = Event::ReservationCommitted {
            reservation: reservation.clone(),
        };
        self.persist_and_apply(&mut guard, &event).await?;
        drop(guard);

        observability::record_booking(Ok(()));
        tracing::info!(
            "booked {} on resource {} for {} ({} days, total {:.2})",
            reservation.id,
            reservation.resource_id,
            reservation.range,
            invoice.days,
            reservation.price
        );
        self.maybe_compact().await;
        Ok(Booking {
            reservation,
            invoice,
        })
    }

    /// Move an active reservation to `Cancelled` or `Completed`.
    ///
    /// Only active reservations change state. Reactivating would skip
    /// conflict validation, so `Active` is never a valid target.
    pub async fn set_state(
        &self,
        id: ReservationId,
        state: StoredState,
    ) -> Result<Reservation, EngineError> {
        let mut guard = self.resolve_reservation_write(&id).await?;
        let current = guard.get(&id).ok_or(EngineError::NotFound(id))?.state;
        if current != StoredState::Active || state == StoredState::Active {
            return Err(EngineError::InvalidTransition {
                id,
                from: current,
                to: state,
            });
        }

        let event = Event::StateChanged {
            id,
            resource_id: guard.id,
            state,
        };
        self.persist_and_apply(&mut guard, &event).await?;
        let updated = guard.get(&id).cloned().ok_or(EngineError::NotFound(id))?;
        drop(guard);

        observability::record_state_change(state);
        tracing::info!("reservation {id} is now {state}");
        self.maybe_compact().await;
        Ok(updated)
    }

    pub async fn cancel(&self, id: ReservationId) -> Result<Reservation, EngineError> {
        self.set_state(id, StoredState::Cancelled).await
    }

    pub async fn complete(&self, id: ReservationId) -> Result<Reservation, EngineError> {
        self.set_state(id, StoredState::Completed).await
    }

    /// Rewrite the WAL as one commit per reservation carrying its current
    /// state. Returns the number of events written.
    pub async fn compact(&self) -> Result<usize, EngineError> {
        let mut events = Vec::with_capacity(self.reservation_to_resource.len());
        // Read locks on every resource so the snapshot is consistent.
        let resources: Vec<_> = self.state.iter().map(|e| e.value().clone()).collect();
        let mut guards = Vec::with_capacity(resources.len());
        for rs in &resources {
            guards.push(rs.read().await);
        }
        for guard in &guards {
            events.extend(guard.reservations.iter().map(|r| Event::ReservationCommitted {
                reservation: r.clone(),
            }));
        }
        let count = events.len();
        self.wal_compact(events).await?;
        drop(guards);

        self.notify.prune();
        tracing::info!("compacted WAL to {count} events");
        Ok(count)
    }

    /// Runs after a write is already durable, so a failure here is logged
    /// and the write still succeeds. The next write retries.
    async fn maybe_compact(&self) {
        if self.compact_threshold == 0 {
            return;
        }
        match self.wal_appends_since_compact().await {
            Ok(n) if n < self.compact_threshold => {}
            Ok(_) => {
                if let Err(e) = self.compact().await {
                    tracing::warn!("WAL compaction failed: {e}");
                }
            }
            Err(e) => tracing::warn!("skipping WAL compaction: {e}"),
        }
    }
}

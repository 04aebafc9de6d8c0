use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds. Only used for creation timestamps.
pub type Ms = i64;

/// A whole calendar day. No time of day, no time zone.
pub type Day = NaiveDate;

pub type ReservationId = Ulid;
pub type ResourceId = Ulid;
/// Opaque reference to the requesting user; never interpreted.
pub type OwnerId = String;

/// Closed interval `[start, end]` of whole days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Day,
    pub end: Day,
}

impl DateRange {
    /// Panics if `start > end`: a backwards range would corrupt every
    /// calculation downstream.
    pub fn new(start: Day, end: Day) -> Self {
        assert!(start <= end, "DateRange start {start} is after end {end}");
        Self { start, end }
    }

    /// Checked constructor for untrusted input.
    pub fn try_new(start: Day, end: Day) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn single(day: Day) -> Self {
        Self { start: day, end: day }
    }

    pub fn contains(&self, day: Day) -> bool {
        self.start <= day && day <= self.end
    }

    /// Returns true if `self` fully contains `other`.
    pub fn contains_range(&self, other: &DateRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// True iff the two ranges share at least one day.
    ///
    /// This is the only overlap test in the crate; conflict checks, day
    /// projection and month clipping all go through it.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        other.contains(self.start) || other.contains(self.end) || self.contains_range(other)
    }

    /// Number of billable days: `end - start`, but never less than one.
    pub fn length_in_days(&self) -> i64 {
        (self.end - self.start).num_days().max(1)
    }

    /// Intersection with `[window_start, window_end]`, or `None` if the two
    /// don't overlap (or the window itself is backwards).
    pub fn clip(&self, window_start: Day, window_end: Day) -> Option<DateRange> {
        let window = DateRange::try_new(window_start, window_end)?;
        if !self.overlaps(&window) {
            return None;
        }
        Some(DateRange::new(
            self.start.max(window.start),
            self.end.min(window.end),
        ))
    }

    /// Every day of the range, in order.
    pub fn days(&self) -> impl Iterator<Item = Day> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

/// `day + n`, saturating at `Day::MAX`.
pub fn add_days(day: Day, n: u64) -> Day {
    day.checked_add_days(Days::new(n)).unwrap_or(Day::MAX)
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// State flag written by the booking workflow. Time-derived status
/// (upcoming/current/past) is computed separately and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoredState {
    Active,
    Cancelled,
    Completed,
}

impl StoredState {
    pub fn as_str(self) -> &'static str {
        match self {
            StoredState::Active => "active",
            StoredState::Cancelled => "cancelled",
            StoredState::Completed => "completed",
        }
    }
}

impl std::fmt::Display for StoredState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub resource_id: ResourceId,
    pub owner_id: OwnerId,
    pub range: DateRange,
    pub state: StoredState,
    /// Total charged at creation. Not recomputed if the rate changes later.
    pub price: f64,
    pub created_at: Ms,
}

impl Reservation {
    pub fn new(
        id: ReservationId,
        resource_id: ResourceId,
        owner_id: OwnerId,
        range: DateRange,
        price: f64,
        created_at: Ms,
    ) -> Self {
        debug_assert!(
            price.is_finite() && price >= 0.0,
            "Reservation price must be finite and non-negative"
        );
        Self {
            id,
            resource_id,
            owner_id,
            range,
            state: StoredState::Active,
            price,
            created_at,
        }
    }

    /// Copy of this reservation with a different stored state.
    pub fn with_state(&self, state: StoredState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == StoredState::Active
    }

    pub fn is_cancelled(&self) -> bool {
        self.state == StoredState::Cancelled
    }
}

/// Every reservation ever committed against one resource, in commit order.
#[derive(Debug, Clone)]
pub struct ResourceState {
    pub id: ResourceId,
    pub reservations: Vec<Reservation>,
}

impl ResourceState {
    pub fn new(id: ResourceId) -> Self {
        Self {
            id,
            reservations: Vec::new(),
        }
    }

    pub fn get(&self, id: &ReservationId) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.id == *id)
    }

    pub fn insert(&mut self, reservation: Reservation) {
        self.reservations.push(reservation);
    }

    /// Swap in a copy of the reservation with `state`. Returns the new value.
    pub fn set_state(&mut self, id: &ReservationId, state: StoredState) -> Option<Reservation> {
        let slot = self.reservations.iter_mut().find(|r| r.id == *id)?;
        *slot = slot.with_state(state);
        Some(slot.clone())
    }
}

/// The event types. This is the WAL record format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    ReservationCommitted {
        reservation: Reservation,
    },
    StateChanged {
        id: ReservationId,
        resource_id: ResourceId,
        state: StoredState,
    },
}

impl Event {
    pub fn resource_id(&self) -> ResourceId {
        match self {
            Event::ReservationCommitted { reservation } => reservation.resource_id,
            Event::StateChanged { resource_id, .. } => *resource_id,
        }
    }
}

/// Shorthand for `NaiveDate::from_ymd_opt(..).unwrap()` in tests.
#[cfg(test)]
pub(crate) fn d(y: i32, m: u32, day: u32) -> Day {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(a: (u32, u32), b: (u32, u32)) -> DateRange {
        DateRange::new(d(2024, a.0, a.1), d(2024, b.0, b.1))
    }

    #[test]
    fn range_basics() {
        let range = r((6, 1), (6, 5));
        assert!(range.contains(d(2024, 6, 1)));
        assert!(range.contains(d(2024, 6, 5))); // closed
        assert!(!range.contains(d(2024, 6, 6)));
        assert_eq!(range.days().count(), 5);
    }

    #[test]
    #[should_panic(expected = "is after end")]
    fn backwards_range_panics() {
        DateRange::new(d(2024, 6, 5), d(2024, 6, 1));
    }

    #[test]
    fn try_new_rejects_backwards() {
        assert!(DateRange::try_new(d(2024, 6, 5), d(2024, 6, 1)).is_none());
        assert!(DateRange::try_new(d(2024, 6, 1), d(2024, 6, 1)).is_some());
    }

    #[test]
    fn overlap_cases() {
        let a = r((6, 1), (6, 5));
        assert!(a.overlaps(&r((6, 3), (6, 10)))); // partial, right
        assert!(a.overlaps(&r((5, 20), (6, 1)))); // touches first day
        assert!(a.overlaps(&r((6, 5), (6, 5)))); // touches last day
        assert!(a.overlaps(&r((5, 1), (7, 1)))); // fully inside other
        assert!(a.overlaps(&r((6, 2), (6, 3)))); // contains other
        assert!(!a.overlaps(&r((6, 6), (6, 8)))); // adjacent
        assert!(!a.overlaps(&r((5, 1), (5, 31))));
    }

    #[test]
    fn overlap_is_symmetric() {
        let ranges = [
            r((6, 1), (6, 5)),
            r((6, 3), (6, 10)),
            r((6, 6), (6, 8)),
            r((5, 1), (7, 1)),
            r((6, 5), (6, 5)),
            r((1, 1), (1, 1)),
        ];
        for a in &ranges {
            assert!(a.overlaps(a), "{a} must overlap itself");
            for b in &ranges {
                assert_eq!(a.overlaps(b), b.overlaps(a), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn length_floor() {
        assert_eq!(r((6, 1), (6, 1)).length_in_days(), 1);
        assert_eq!(r((6, 1), (6, 2)).length_in_days(), 1);
        assert_eq!(r((6, 1), (6, 5)).length_in_days(), 4);
        assert_eq!(r((2, 27), (3, 1)).length_in_days(), 3); // 2024 is a leap year
    }

    #[test]
    fn clip_to_window() {
        let range = r((5, 28), (6, 3));
        let clipped = range.clip(d(2024, 6, 1), d(2024, 6, 30)).unwrap();
        assert_eq!(clipped, r((6, 1), (6, 3)));

        let inside = r((6, 10), (6, 12));
        assert_eq!(inside.clip(d(2024, 6, 1), d(2024, 6, 30)), Some(inside));

        assert!(range.clip(d(2024, 7, 1), d(2024, 7, 31)).is_none());
        assert!(range.clip(d(2024, 6, 30), d(2024, 6, 1)).is_none());
    }

    #[test]
    fn with_state_leaves_original_untouched() {
        let original = Reservation::new(
            Ulid::new(),
            Ulid::new(),
            "alice".into(),
            r((6, 1), (6, 2)),
            100.0,
            1,
        );
        let cancelled = original.with_state(StoredState::Cancelled);
        assert_eq!(original.state, StoredState::Active);
        assert_eq!(cancelled.state, StoredState::Cancelled);
        assert_eq!(cancelled.id, original.id);
    }

    #[test]
    fn resource_state_updates_in_place() {
        let mut rs = ResourceState::new(Ulid::new());
        let a = Reservation::new(Ulid::new(), rs.id, "a".into(), r((6, 1), (6, 5)), 1.0, 1);
        let b = Reservation::new(Ulid::new(), rs.id, "b".into(), r((6, 10), (6, 12)), 1.0, 2);
        rs.insert(a.clone());
        rs.insert(b.clone());

        let cancelled = rs.set_state(&a.id, StoredState::Cancelled).unwrap();
        assert_eq!(cancelled.state, StoredState::Cancelled);
        assert_eq!(rs.get(&a.id).unwrap().state, StoredState::Cancelled);
        assert_eq!(rs.get(&b.id).unwrap().state, StoredState::Active);
        // commit order is kept
        assert_eq!(rs.reservations[0].id, a.id);
        assert!(rs.set_state(&Ulid::new(), StoredState::Cancelled).is_none());
    }

    #[test]
    fn event_serialization_roundtrip() {
        let event = Event::ReservationCommitted {
            reservation: Reservation::new(
                Ulid::new(),
                Ulid::new(),
                "bob".into(),
                r((6, 1), (6, 5)),
                460.0,
                1_717_000_000_000,
            ),
        };
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: Event = bincode::deserialize(&bytes).unwrap();
        assert_eq!(event, decoded);
    }
}

use std::cmp::Ordering;

use serde::Serialize;

use crate::model::*;

/// Where a reservation sits relative to today. Pure clock arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Upcoming,
    Current,
    Past,
}

/// What the user sees: the bucket, overridden by the stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Upcoming,
    Current,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Status {
    pub bucket: Bucket,
    pub label: Label,
}

pub fn bucket(range: &DateRange, today: Day) -> Bucket {
    if today < range.start {
        Bucket::Upcoming
    } else if today <= range.end {
        Bucket::Current
    } else {
        Bucket::Past
    }
}

pub fn classify(reservation: &Reservation, today: Day) -> Status {
    let bucket = bucket(&reservation.range, today);
    let label = match (reservation.state, bucket) {
        (StoredState::Cancelled, _) => Label::Cancelled,
        (StoredState::Completed, _) | (_, Bucket::Past) => Label::Completed,
        (StoredState::Active, Bucket::Upcoming) => Label::Upcoming,
        (StoredState::Active, Bucket::Current) => Label::Current,
    };
    Status { bucket, label }
}

/// Dashboard split: still-running active reservations vs. everything else.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dashboard<'a> {
    pub active: Vec<DashboardEntry<'a>>,
    pub archived: Vec<DashboardEntry<'a>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardEntry<'a> {
    pub reservation: &'a Reservation,
    pub status: Status,
}

pub fn is_active_partition(reservation: &Reservation, today: Day) -> bool {
    reservation.is_active() && reservation.range.end >= today
}

/// Most recent start first, then most recently created, then id. Callers
/// rely on this order.
pub fn dashboard_order(a: &Reservation, b: &Reservation) -> Ordering {
    b.range
        .start
        .cmp(&a.range.start)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| b.id.cmp(&a.id))
}

pub fn partition(reservations: &[Reservation], today: Day) -> Dashboard<'_> {
    let (mut active, mut archived): (Vec<&Reservation>, Vec<&Reservation>) = reservations
        .iter()
        .partition(|r| is_active_partition(r, today));
    active.sort_by(|a, b| dashboard_order(a, b));
    archived.sort_by(|a, b| dashboard_order(a, b));

    Dashboard {
        active: active.into_iter().map(|r| entry(r, today)).collect(),
        archived: archived.into_iter().map(|r| entry(r, today)).collect(),
    }
}

fn entry(reservation: &Reservation, today: Day) -> DashboardEntry<'_> {
    DashboardEntry {
        reservation,
        status: classify(reservation, today),
    }
}

#[cfg(test)]
mod tests {
    use ulid::Ulid;

    use super::*;

    fn res(start: Day, end: Day, state: StoredState, created_at: Ms) -> Reservation {
        Reservation::new(
            Ulid::new(),
            Ulid::new(),
            "owner".into(),
            DateRange::new(start, end),
            10.0,
            created_at,
        )
        .with_state(state)
    }

    #[test]
    fn buckets_follow_the_clock() {
        let range = DateRange::new(d(2024, 6, 1), d(2024, 6, 3));
        assert_eq!(bucket(&range, d(2024, 5, 31)), Bucket::Upcoming);
        assert_eq!(bucket(&range, d(2024, 6, 1)), Bucket::Current);
        assert_eq!(bucket(&range, d(2024, 6, 3)), Bucket::Current);
        assert_eq!(bucket(&range, d(2024, 6, 4)), Bucket::Past);
    }

    #[test]
    fn labels_combine_state_and_bucket() {
        let today = d(2024, 6, 2);
        let upcoming = res(d(2024, 6, 10), d(2024, 6, 12), StoredState::Active, 0);
        let current = res(d(2024, 6, 1), d(2024, 6, 3), StoredState::Active, 0);
        let past = res(d(2024, 5, 1), d(2024, 5, 3), StoredState::Active, 0);
        let completed_early = res(d(2024, 6, 1), d(2024, 6, 3), StoredState::Completed, 0);
        let cancelled_past = res(d(2024, 5, 1), d(2024, 5, 3), StoredState::Cancelled, 0);

        assert_eq!(classify(&upcoming, today).label, Label::Upcoming);
        assert_eq!(classify(&current, today).label, Label::Current);
        assert_eq!(classify(&past, today).label, Label::Completed);
        assert_eq!(
            classify(&completed_early, today),
            Status {
                bucket: Bucket::Current,
                label: Label::Completed
            }
        );
        assert_eq!(
            classify(&cancelled_past, today),
            Status {
                bucket: Bucket::Past,
                label: Label::Cancelled
            }
        );
    }

    #[test]
    fn dashboard_partition() {
        let today = d(2024, 6, 10);
        let a = res(d(2024, 6, 8), d(2024, 6, 11), StoredState::Active, 1);
        let b = res(d(2024, 6, 5), d(2024, 6, 9), StoredState::Active, 2);
        let c = res(d(2024, 6, 9), d(2024, 6, 11), StoredState::Cancelled, 3);
        let all = vec![a.clone(), b.clone(), c.clone()];

        let dashboard = partition(&all, today);
        let ids = |entries: &[DashboardEntry<'_>]| entries.iter().map(|e| e.reservation.id).collect::<Vec<_>>();
        assert_eq!(ids(&dashboard.active), vec![a.id]);
        // C starts later than B, so it comes first.
        assert_eq!(ids(&dashboard.archived), vec![c.id, b.id]);
    }

    #[test]
    fn reservation_ending_today_is_still_active() {
        let today = d(2024, 6, 10);
        let r = res(d(2024, 6, 8), today, StoredState::Active, 0);
        assert!(is_active_partition(&r, today));
    }

    #[test]
    fn ties_break_by_created_at_descending() {
        let today = d(2024, 6, 1);
        let older = res(d(2024, 7, 1), d(2024, 7, 2), StoredState::Active, 100);
        let newer = res(d(2024, 7, 1), d(2024, 7, 3), StoredState::Active, 200);
        let earlier_start = res(d(2024, 6, 20), d(2024, 6, 21), StoredState::Active, 300);
        let all = vec![older.clone(), earlier_start.clone(), newer.clone()];

        let dashboard = partition(&all, today);
        let ids: Vec<_> = dashboard.active.iter().map(|e| e.reservation.id).collect();
        assert_eq!(ids, vec![newer.id, older.id, earlier_start.id]);
        assert!(dashboard.archived.is_empty());
    }
}

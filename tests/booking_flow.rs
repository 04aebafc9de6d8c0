use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use ulid::Ulid;

use rentcal::clock::FixedClock;
use rentcal::config::Policy;
use rentcal::engine::{
    BookingRequest, Candidate, DayPosition, Engine, Label, MonthWindow, ProjectOptions, Rejection,
    month_grid, partition, project, summarize,
};
use rentcal::limits::DEFAULT_PALETTE;
use rentcal::model::{Day, StoredState};
use rentcal::notify::NotifyHub;

fn day(y: i32, m: u32, d: u32) -> Day {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn data_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("rentcal_int_test_{}", Ulid::new()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn engine_at(wal: PathBuf, today: Day, policy: Policy) -> Engine {
    Engine::new(
        wal,
        Arc::new(NotifyHub::new()),
        policy,
        Arc::new(FixedClock::at_day(today)),
        0,
    )
    .unwrap()
}

fn booking(car: Ulid, owner: &str, start: Day, end: Day, rate: f64) -> BookingRequest {
    BookingRequest {
        resource_id: car,
        owner_id: owner.into(),
        candidate: Candidate::new(start, end),
        daily_rate: rate,
    }
}

#[tokio::test]
async fn month_of_bookings_for_one_car() {
    let dir = data_dir();
    let wal = dir.join("reservations.wal");
    let car = Ulid::new();
    let engine = engine_at(wal.clone(), day(2024, 5, 25), Policy::default());

    let long = engine
        .book(booking(car, "alice", day(2024, 5, 30), day(2024, 6, 4), 50.0))
        .await
        .unwrap();
    let single = engine
        .book(booking(car, "bob", day(2024, 6, 10), day(2024, 6, 10), 50.0))
        .await
        .unwrap();
    let dropped = engine
        .book(booking(car, "carol", day(2024, 6, 12), day(2024, 6, 14), 50.0))
        .await
        .unwrap();
    engine.cancel(dropped.reservation.id).await.unwrap();

    // Bob wants Alice's last day: refused.
    let err = engine
        .book(booking(car, "bob", day(2024, 6, 4), day(2024, 6, 6), 50.0))
        .await
        .unwrap_err();
    assert_eq!(
        err.rejection(),
        Some(&Rejection::Conflict {
            with: long.reservation.id
        })
    );

    let snapshot = engine.list_for_resource(car).await;
    let june = MonthWindow::new(2024, 6).unwrap();

    let legend = summarize(june, &snapshot, ProjectOptions::default());
    assert_eq!(legend.len(), 2);
    assert_eq!(legend[0].visible_start, day(2024, 6, 1));
    assert_eq!(legend[0].visible_end, day(2024, 6, 4));
    assert_eq!(legend[0].total_days, 5);
    assert_eq!(legend[1].reservation.id, single.reservation.id);

    let grid = month_grid(june, &snapshot, DEFAULT_PALETTE, ProjectOptions::default());
    let positions: Vec<_> = grid.cells[..4]
        .iter()
        .map(|c| c.entries[0].position)
        .collect();
    assert_eq!(
        positions,
        vec![
            DayPosition::Middle,
            DayPosition::Middle,
            DayPosition::Middle,
            DayPosition::Last
        ]
    );
    assert_eq!(grid.cells[9].entries[0].position, DayPosition::Single);
    // Cancelled reservation is hidden on the grid but keeps its color slot.
    assert!(grid.cells[12].entries.is_empty());
    let with_cancelled = project(
        day(2024, 6, 13),
        &snapshot,
        DEFAULT_PALETTE,
        ProjectOptions {
            include_cancelled: true,
        },
    );
    assert_eq!(with_cancelled[0].color, DEFAULT_PALETTE[2]);

    // Same data after a restart renders identically.
    drop(engine);
    let reopened = engine_at(wal, day(2024, 5, 25), Policy::default());
    let replayed = reopened.list_for_resource(car).await;
    assert_eq!(replayed, snapshot);
    let again = month_grid(june, &replayed, DEFAULT_PALETTE, ProjectOptions::default());
    assert_eq!(again, grid);

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn dashboard_split_over_time() {
    let dir = data_dir();
    let wal = dir.join("reservations.wal");
    let car = Ulid::new();
    {
        let engine = engine_at(wal.clone(), day(2024, 6, 1), Policy::default());
        engine
            .book(booking(car, "alice", day(2024, 6, 2), day(2024, 6, 3), 30.0))
            .await
            .unwrap();
        engine
            .book(booking(car, "alice", day(2024, 6, 20), day(2024, 6, 22), 30.0))
            .await
            .unwrap();
    }

    // Ten days later the first trip is over.
    let engine = engine_at(wal, day(2024, 6, 11), Policy::default());
    let mine = engine.list_for_owner("alice").await;
    let dashboard = partition(&mine, engine.today());
    assert_eq!(dashboard.active.len(), 1);
    assert_eq!(dashboard.active[0].status.label, Label::Upcoming);
    assert_eq!(dashboard.archived.len(), 1);
    assert_eq!(dashboard.archived[0].status.label, Label::Completed);
    assert_eq!(dashboard.archived[0].reservation.state, StoredState::Active);

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn custom_policy_limits() {
    let dir = data_dir();
    let policy = Policy {
        max_horizon_days: 7,
        max_duration_days: 2,
        tax_rate: 0.0,
    };
    let engine = engine_at(dir.join("reservations.wal"), day(2024, 6, 1), policy);
    let car = Ulid::new();

    let tag = |r: &Result<_, rentcal::engine::EngineError>| {
        r.as_ref().err().and_then(|e| e.rejection()).map(|r| r.tag())
    };
    let far = engine
        .book(booking(car, "a", day(2024, 6, 9), day(2024, 6, 9), 10.0))
        .await;
    assert_eq!(tag(&far), Some("too_far_future"));
    let long = engine
        .book(booking(car, "a", day(2024, 6, 2), day(2024, 6, 5), 10.0))
        .await;
    assert_eq!(tag(&long), Some("too_long"));

    let ok = engine
        .book(booking(car, "a", day(2024, 6, 8), day(2024, 6, 10), 10.0))
        .await
        .unwrap();
    assert_eq!(ok.invoice.tax, 0.0);
    assert_eq!(ok.reservation.price, 20.0);

    let _ = std::fs::remove_dir_all(dir);
}

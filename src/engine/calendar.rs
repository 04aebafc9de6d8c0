use std::collections::HashMap;

use chrono::Datelike;
use serde::Serialize;

use crate::model::*;

use super::month::MonthWindow;

/// A reservation's visual role on one calendar day, used to draw continuous
/// multi-day bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPosition {
    First,
    Middle,
    Last,
    Single,
}

impl DayPosition {
    /// `day` must lie inside `range`.
    pub fn of(range: &DateRange, day: Day) -> Self {
        debug_assert!(range.contains(day), "{day} is outside {range}");
        if range.start == range.end {
            DayPosition::Single
        } else if day == range.start {
            DayPosition::First
        } else if day == range.end {
            DayPosition::Last
        } else {
            DayPosition::Middle
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectOptions {
    pub include_cancelled: bool,
}

impl ProjectOptions {
    pub(crate) fn admits(&self, reservation: &Reservation) -> bool {
        self.include_cancelled || !reservation.is_cancelled()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedReservation<'a> {
    pub reservation: &'a Reservation,
    pub position: DayPosition,
    pub color: &'a str,
}

/// Stable color per reservation: `palette[index % palette.len()]`, where
/// `index` is the reservation's rank by `(created_at, id)` among everything
/// the resource has. The input order doesn't matter, so re-rendering the same
/// data always yields the same colors. Two reservations share a color once
/// the palette runs out.
#[derive(Debug, Clone)]
pub struct ColorAssignment<'p> {
    palette: &'p [&'p str],
    index: HashMap<ReservationId, usize>,
}

impl<'p> ColorAssignment<'p> {
    /// Panics on an empty palette.
    pub fn new(reservations: &[Reservation], palette: &'p [&'p str]) -> Self {
        assert!(!palette.is_empty(), "calendar palette must not be empty");
        let mut ordered: Vec<&Reservation> = reservations.iter().collect();
        ordered.sort_by_key(|r| (r.created_at, r.id));
        let index = ordered
            .into_iter()
            .enumerate()
            .map(|(i, r)| (r.id, i))
            .collect();
        Self { palette, index }
    }

    /// Enumeration index of a reservation; unknown ids sort after all others.
    pub fn index_of(&self, id: &ReservationId) -> usize {
        self.index.get(id).copied().unwrap_or(self.index.len())
    }

    pub fn color_of(&self, id: &ReservationId) -> &'p str {
        self.palette[self.index_of(id) % self.palette.len()]
    }
}

/// Every reservation touching `day`, annotated for rendering, in input order.
pub fn project<'a>(
    day: Day,
    reservations: &'a [Reservation],
    palette: &'a [&'a str],
    options: ProjectOptions,
) -> Vec<AnnotatedReservation<'a>> {
    let colors = ColorAssignment::new(reservations, palette);
    project_with(day, reservations.iter(), &colors, options)
}

fn project_with<'a>(
    day: Day,
    reservations: impl Iterator<Item = &'a Reservation>,
    colors: &ColorAssignment<'a>,
    options: ProjectOptions,
) -> Vec<AnnotatedReservation<'a>> {
    let probe = DateRange::single(day);
    reservations
        .filter(|r| options.admits(r) && r.range.overlaps(&probe))
        .map(|reservation| AnnotatedReservation {
            reservation,
            position: DayPosition::of(&reservation.range, day),
            color: colors.color_of(&reservation.id),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarCell<'a> {
    pub day: Day,
    pub entries: Vec<AnnotatedReservation<'a>>,
}

/// A month laid out for a Sunday-first grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthGrid<'a> {
    pub month: MonthWindow,
    /// Empty cells before the 1st.
    pub leading_blanks: u32,
    pub cells: Vec<CalendarCell<'a>>,
}

pub fn month_grid<'a>(
    month: MonthWindow,
    reservations: &'a [Reservation],
    palette: &'a [&'a str],
    options: ProjectOptions,
) -> MonthGrid<'a> {
    let colors = ColorAssignment::new(reservations, palette);
    let window = month.range();
    let visible: Vec<&Reservation> = reservations
        .iter()
        .filter(|r| r.range.overlaps(&window))
        .collect();

    let cells = window
        .days()
        .map(|day| CalendarCell {
            day,
            entries: project_with(day, visible.iter().copied(), &colors, options),
        })
        .collect();

    MonthGrid {
        month,
        leading_blanks: window.start.weekday().num_days_from_sunday(),
        cells,
    }
}

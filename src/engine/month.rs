use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::model::*;

use super::calendar::ProjectOptions;

/// A calendar month, `[first day, last day]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonthWindow {
    pub year: i32,
    pub month: u32,
}

impl MonthWindow {
    /// `None` unless `month` is 1..=12 and the year is representable.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn containing(day: Day) -> Self {
        Self {
            year: day.year(),
            month: day.month(),
        }
    }

    pub fn first_day(&self) -> Day {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(Day::MIN)
    }

    pub fn last_day(&self) -> Day {
        self.first_day()
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(Day::MAX)
    }

    pub fn range(&self) -> DateRange {
        DateRange::new(self.first_day(), self.last_day())
    }

    pub fn next(&self) -> Option<Self> {
        let day = self.first_day().checked_add_months(Months::new(1))?;
        Some(Self::containing(day))
    }

    pub fn prev(&self) -> Option<Self> {
        let day = self.first_day().checked_sub_months(Months::new(1))?;
        Some(Self::containing(day))
    }
}

impl std::fmt::Display for MonthWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMonthError(pub String);

impl std::fmt::Display for ParseMonthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "expected YYYY-MM, got {:?}", self.0)
    }
}

impl std::error::Error for ParseMonthError {}

impl std::str::FromStr for MonthWindow {
    type Err = ParseMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseMonthError(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(err)?;
        let year = year.parse().map_err(|_| err())?;
        let month = month.parse().map_err(|_| err())?;
        MonthWindow::new(year, month).ok_or_else(err)
    }
}

/// One legend row: the part of a reservation visible this month, plus its
/// full length so a legend can say "5 days" when only 2 are on screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthSummary<'a> {
    pub reservation: &'a Reservation,
    pub visible_start: Day,
    pub visible_end: Day,
    pub total_days: i64,
}

/// Reservations overlapping `month`, clipped to it, in input order.
pub fn summarize(
    month: MonthWindow,
    reservations: &[Reservation],
    options: ProjectOptions,
) -> Vec<MonthSummary<'_>> {
    let (first, last) = (month.first_day(), month.last_day());
    reservations
        .iter()
        .filter(|r| options.admits(r))
        .filter_map(|reservation| {
            let visible = reservation.range.clip(first, last)?;
            Some(MonthSummary {
                reservation,
                visible_start: visible.start,
                visible_end: visible.end,
                total_days: reservation.range.length_in_days(),
            })
        })
        .collect()
}

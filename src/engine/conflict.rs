use serde::{Deserialize, Serialize};

use crate::config::Policy;
use crate::model::*;

/// Raw booking input. Either end may be missing when it comes straight from a
/// form, so this is not a `DateRange` yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Candidate {
    pub start: Option<Day>,
    pub end: Option<Day>,
}

impl Candidate {
    pub fn new(start: Day, end: Day) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }
}

impl From<DateRange> for Candidate {
    fn from(range: DateRange) -> Self {
        Self::new(range.start, range.end)
    }
}

/// Why a booking was refused. Returned as data, never raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    InvalidRange,
    InPast,
    TooFarFuture { max_horizon_days: u32 },
    TooLong { days: i64, max_duration_days: u32 },
    Conflict { with: ReservationId },
}

impl Rejection {
    pub fn tag(&self) -> &'static str {
        match self {
            Rejection::InvalidRange => "invalid_range",
            Rejection::InPast => "in_past",
            Rejection::TooFarFuture { .. } => "too_far_future",
            Rejection::TooLong { .. } => "too_long",
            Rejection::Conflict { .. } => "conflict",
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::InvalidRange => write!(f, "start date missing or after end date"),
            Rejection::InPast => write!(f, "start date is in the past"),
            Rejection::TooFarFuture { max_horizon_days } => {
                write!(f, "start date is more than {max_horizon_days} days ahead")
            }
            Rejection::TooLong {
                days,
                max_duration_days,
            } => write!(f, "{days} days exceeds the {max_duration_days}-day maximum"),
            Rejection::Conflict { with } => write!(f, "dates overlap reservation {with}"),
        }
    }
}

impl std::error::Error for Rejection {}

/// Decide whether `candidate` may be booked against `existing`.
///
/// Checks run in a fixed order and the first failure wins. Only `Active`
/// reservations block. On success the candidate's validated range is
/// returned.
pub fn validate(
    candidate: &Candidate,
    existing: &[Reservation],
    policy: &Policy,
    today: Day,
) -> Result<DateRange, Rejection> {
    let range = match (candidate.start, candidate.end) {
        (Some(start), Some(end)) => DateRange::try_new(start, end).ok_or(Rejection::InvalidRange)?,
        _ => return Err(Rejection::InvalidRange),
    };

    if range.start < today {
        return Err(Rejection::InPast);
    }

    let horizon = add_days(today, u64::from(policy.max_horizon_days));
    if range.start > horizon {
        return Err(Rejection::TooFarFuture {
            max_horizon_days: policy.max_horizon_days,
        });
    }

    let days = range.length_in_days();
    if days > i64::from(policy.max_duration_days) {
        return Err(Rejection::TooLong {
            days,
            max_duration_days: policy.max_duration_days,
        });
    }

    check_no_conflict(&range, existing)?;
    Ok(range)
}

/// The overlap step on its own: first active reservation sharing a day wins.
pub fn check_no_conflict(range: &DateRange, existing: &[Reservation]) -> Result<(), Rejection> {
    match existing
        .iter()
        .find(|r| r.is_active() && range.overlaps(&r.range))
    {
        Some(blocking) => Err(Rejection::Conflict { with: blocking.id }),
        None => Ok(()),
    }
}

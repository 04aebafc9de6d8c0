use serde::Serialize;

use crate::config::TAX_RATE;
use crate::model::DateRange;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Invoice {
    pub days: i64,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
}

impl Invoice {
    /// The amount stored on a reservation: `total`, never below zero.
    pub fn chargeable(&self) -> f64 {
        self.total.max(0.0)
    }
}

/// Price at the standard 15% tax.
pub fn price(range: &DateRange, daily_rate: f64) -> Invoice {
    price_with_tax(range, daily_rate, TAX_RATE)
}

/// `days × rate`, plus tax.
///
/// A rate that is negative or not finite is treated as a flat one-time
/// charge: subtotal, tax and total all equal the rate. A non-finite rate
/// can't be shown on an invoice, so it charges `0.0`. The result never
/// contains NaN.
pub fn price_with_tax(range: &DateRange, daily_rate: f64, tax_rate: f64) -> Invoice {
    let days = range.length_in_days();
    if !daily_rate.is_finite() || daily_rate < 0.0 {
        let flat = if daily_rate.is_finite() { daily_rate } else { 0.0 };
        return Invoice {
            days,
            subtotal: flat,
            tax: flat,
            total: flat,
        };
    }

    let tax_rate = if tax_rate.is_finite() && tax_rate >= 0.0 {
        tax_rate
    } else {
        TAX_RATE
    };
    let subtotal = days as f64 * daily_rate;
    let tax = subtotal * tax_rate;
    Invoice {
        days,
        subtotal,
        tax,
        total: subtotal + tax,
    }
}

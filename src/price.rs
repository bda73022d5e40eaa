//! Scene pricing.
//!
//! All prices are in US cents. A bundle has a base price; each licence (and,
//! for tasking, each priority and cloud level) adds a percentage of the base
//! price plus a flat amount. Totals are rounded up to the next whole dollar.

/// A percentage plus a flat surcharge applied on top of a bundle price.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Loading {
    /// Percent of the bundle price, e.g. `50.0` for half again.
    pub percent: f64,
    /// Flat amount in US cents.
    pub amount: i64,
}

impl Loading {
    pub fn new(percent: f64, amount: i64) -> Self {
        Self { percent, amount }
    }
}

impl From<(f64, i64)> for Loading {
    fn from((percent, amount): (f64, i64)) -> Self {
        Self::new(percent, amount)
    }
}

/// Calculates the price in US cents of a bundle with the given loadings.
///
/// Archive orders pass a single licence loading. Tasking orders pass the
/// licence, priority and cloud loadings.
///
/// ```
/// use arlula::{Loading, calculate_price};
///
/// assert_eq!(calculate_price(100, &[Loading::new(75.0, 124)]), 300);
/// ```
pub fn calculate_price(bundle_price: i64, loadings: &[Loading]) -> i64 {
    let percent: f64 = loadings.iter().map(|l| l.percent).sum();
    let amount: i64 = loadings.iter().map(|l| l.amount).sum();

    // Work in hundredths of a cent so whole-number percentages stay exact.
    let scaled = bundle_price as f64 * (100.0 + percent) + (amount * 100) as f64;
    (scaled / 10_000.0).ceil() as i64 * 100
}

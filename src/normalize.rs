//! Unit normalizer: amount + period to a monthly figure

const WEEKS_PER_MONTH: f64 = 4.33;
const MONTHS_PER_YEAR: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Week,
    Month,
    Year,
}

impl Period {
    /// Case-insensitive. Unrecognized keywords yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "week" | "weekly" => Some(Period::Week),
            "month" | "monthly" => Some(Period::Month),
            "year" | "yearly" | "annual" | "annually" => Some(Period::Year),
            _ => None,
        }
    }

    fn to_monthly(self, amount: f64) -> f64 {
        match self {
            Period::Week => amount * WEEKS_PER_MONTH,
            Period::Month => amount,
            Period::Year => amount / MONTHS_PER_YEAR,
        }
    }
}

/// Convert `amount` per `period` into a rounded monthly amount.
///
/// An absent or unrecognized period is treated as monthly. Returns `None`
/// only when `amount` is absent or NaN.
pub fn normalize(amount: Option<f64>, period: Option<&str>) -> Option<f64> {
    let amount = amount.filter(|a| !a.is_nan())?;
    let monthly = match period.and_then(Period::parse) {
        Some(p) => p.to_monthly(amount),
        None => amount,
    };
    Some(monthly.round())
}

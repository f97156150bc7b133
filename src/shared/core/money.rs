// Currency rounding.
//
// Rounding policy
// - Two decimals, half-up, applied after every addition that crosses an entity boundary.
// - The small nudge absorbs binary representation error (123.455 is stored as 123.45499..).

const NUDGE: f64 = 1e-9;

pub fn round_currency(value: f64) -> f64 {
    ((value * 100.0) + 0.5 + NUDGE).floor() / 100.0
}

/// Adds `amount` to `total` and rounds the result.
pub fn add_currency(total: f64, amount: f64) -> f64 {
    round_currency(total + round_currency(amount))
}

/// Signed percent change from `previous` to `current`; `0.0` when there is
/// no positive baseline.
pub fn percentage_change(current: f64, previous: f64) -> f64 {
    if previous > 0.0 {
        (current - previous) / previous * 100.0
    } else {
        0.0
    }
}

/// One-sided: only increases strictly above `threshold` count.
///
/// Compare the unrounded change; rounding happens only for storage.
pub fn is_anomaly(percentage_change: f64, threshold: f64) -> bool {
    percentage_change > threshold
}

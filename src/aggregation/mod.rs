pub mod completeness;
pub mod daily;
pub mod direction;
pub mod hourly;

/// Rounds to one decimal place.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Mean over values that were actually reported. Missing fields are stored as `0.0`,
/// so zeros are skipped; returns `0.0` when nothing was reported.
pub(crate) fn mean_of_reported(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .filter(|v| *v != 0.0)
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// How wind directions are averaged.
///
/// Bearings wrap at 360°, so an arithmetic mean of 350° and 10° gives 180°, pointing
/// the wrong way entirely. `Circular` averages unit vectors instead and is the default.
/// `Arithmetic` reproduces the plain mean for comparison with older series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectionMean {
    #[default]
    Circular,
    Arithmetic,
}

impl DirectionMean {
    /// Averages the given bearings and rounds to a whole degree in 0..360.
    /// Returns `None` for an empty input, or for vectors that cancel out exactly
    /// (e.g. 90° and 270°) under the circular mean.
    pub fn average(&self, degrees: &[f64]) -> Option<i32> {
        if degrees.is_empty() {
            return None;
        }
        let mean = match self {
            DirectionMean::Arithmetic => degrees.iter().sum::<f64>() / degrees.len() as f64,
            DirectionMean::Circular => {
                let (sin_sum, cos_sum) = degrees.iter().fold((0.0, 0.0), |(s, c), d| {
                    let radians = d.to_radians();
                    (s + radians.sin(), c + radians.cos())
                });
                if sin_sum.abs() < 1e-9 && cos_sum.abs() < 1e-9 {
                    return None;
                }
                sin_sum.atan2(cos_sum).to_degrees()
            }
        };
        Some((mean.round() as i32).rem_euclid(360))
    }
}

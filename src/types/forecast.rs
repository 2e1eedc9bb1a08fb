//! Defines the forecast records persisted by [`crate::ForecastStore`].

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One predicted hour of a generated forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyPrediction {
    /// Local hour of day, 0 to 23.
    pub hour: u32,
    pub wind_speed_kt: f64,
    pub gust_speed_kt: f64,
    #[serde(default)]
    pub direction: Option<i32>,
}

/// Predictions keyed by relative day index, `0` being the day the source forecast was issued.
pub type DayPredictions = BTreeMap<u32, Vec<HourlyPrediction>>;

/// Settings the forecast generator ran with. Stored for provenance only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationParameters {
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub prompt_version: Option<String>,
}

/// A generated forecast ready to be stored.
///
/// Only `issued_at` and `source_text` define the record's identity, see
/// [`crate::forecast_fingerprint`]. Regenerating predictions from the same inputs
/// therefore maps onto the already stored row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewForecast {
    /// Issuance time of the source forecast bulletin.
    pub issued_at: DateTime<FixedOffset>,
    /// When the predictions were generated.
    pub generated_at: DateTime<Utc>,
    /// Full text of the source forecast bulletin.
    pub source_text: String,
    pub parameters: GenerationParameters,
    pub predictions: DayPredictions,
    /// Free-text provenance notes.
    pub notes: Option<String>,
}

/// A forecast as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredForecast {
    pub id: i64,
    pub fingerprint: String,
    pub issued_at: DateTime<FixedOffset>,
    pub generated_at: DateTime<Utc>,
    pub source_text: String,
    pub parameters: GenerationParameters,
    pub predictions: DayPredictions,
    pub notes: Option<String>,
}

impl StoredForecast {
    /// Predictions for the given relative day, if the generator produced any.
    pub fn predictions_for_day(&self, day_index: u32) -> &[HourlyPrediction] {
        self.predictions
            .get(&day_index)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

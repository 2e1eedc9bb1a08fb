use crate::aggregation::round1;
use crate::types::day_data::DayData;
use crate::types::forecast::StoredForecast;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Predicted against observed values for one local hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourComparison {
    pub hour: u32,
    pub predicted_speed_kt: f64,
    pub observed_speed_kt: f64,
    pub speed_error_kt: f64,
    pub predicted_gust_kt: f64,
    pub observed_gust_kt: f64,
    pub gust_error_kt: f64,
}

/// How one day of a stored forecast compared with what the buoy measured.
///
/// Errors are absolute, in knots. The aggregate metrics cover only hours present in
/// both the prediction and the observation and are `None` when there are none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastVerification {
    pub forecast_id: i64,
    pub fingerprint: String,
    pub day_index: u32,
    pub date: NaiveDate,
    pub hours: Vec<HourComparison>,
    pub speed_mae: Option<f64>,
    pub speed_rmse: Option<f64>,
    pub gust_mae: Option<f64>,
    pub gust_rmse: Option<f64>,
}

/// Compares the predictions for `day_index` with the observed hourly points of a day,
/// pairing them by local hour.
pub fn verify_forecast(
    forecast: &StoredForecast,
    day_index: u32,
    observed: &DayData,
) -> ForecastVerification {
    let mut hours: Vec<HourComparison> = forecast
        .predictions_for_day(day_index)
        .iter()
        .filter_map(|predicted| {
            let actual = observed.points.iter().find(|p| p.hour == predicted.hour)?;
            Some(HourComparison {
                hour: predicted.hour,
                predicted_speed_kt: predicted.wind_speed_kt,
                observed_speed_kt: actual.wind_speed_kt,
                speed_error_kt: round1((predicted.wind_speed_kt - actual.wind_speed_kt).abs()),
                predicted_gust_kt: predicted.gust_speed_kt,
                observed_gust_kt: actual.gust_speed_kt,
                gust_error_kt: round1((predicted.gust_speed_kt - actual.gust_speed_kt).abs()),
            })
        })
        .collect();
    hours.sort_by_key(|h| h.hour);
    hours.dedup_by_key(|h| h.hour);

    let speed_errors: Vec<f64> = hours.iter().map(|h| h.speed_error_kt).collect();
    let gust_errors: Vec<f64> = hours.iter().map(|h| h.gust_error_kt).collect();

    ForecastVerification {
        forecast_id: forecast.id,
        fingerprint: forecast.fingerprint.clone(),
        day_index,
        date: observed.date,
        speed_mae: mae(&speed_errors),
        speed_rmse: rmse(&speed_errors),
        gust_mae: mae(&gust_errors),
        gust_rmse: rmse(&gust_errors),
        hours,
    }
}

fn mae(errors: &[f64]) -> Option<f64> {
    if errors.is_empty() {
        return None;
    }
    Some(round1(errors.iter().sum::<f64>() / errors.len() as f64))
}

fn rmse(errors: &[f64]) -> Option<f64> {
    if errors.is_empty() {
        return None;
    }
    let mean_square = errors.iter().map(|e| e * e).sum::<f64>() / errors.len() as f64;
    Some(round1(mean_square.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::daily::group_by_day;
    use crate::aggregation::daily::tests::point;
    use crate::aggregation::direction::DirectionMean;
    use crate::types::forecast::{DayPredictions, GenerationParameters, HourlyPrediction};
    use chrono::{DateTime, Utc};

    fn stored(predictions: DayPredictions) -> StoredForecast {
        StoredForecast {
            id: 7,
            fingerprint: String::from("abc"),
            issued_at: DateTime::parse_from_rfc3339("2024-06-01T03:15:00-07:00").unwrap(),
            generated_at: Utc::now(),
            source_text: String::from("W winds 10 kt"),
            parameters: GenerationParameters::default(),
            predictions,
            notes: None,
        }
    }

    fn predicted(hour: u32, speed: f64, gust: f64) -> HourlyPrediction {
        HourlyPrediction {
            hour,
            wind_speed_kt: speed,
            gust_speed_kt: gust,
            direction: None,
        }
    }

    fn observed_day() -> DayData {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let points = vec![
            point(date, 11, 10.0, 15.0, 270),
            point(date, 12, 12.0, 16.0, 270),
            point(date, 14, 14.0, 20.0, 270),
        ];
        group_by_day(&points, DirectionMean::Circular).remove(0)
    }

    #[test]
    fn test_metrics_cover_matched_hours_only() {
        let mut predictions = DayPredictions::new();
        predictions.insert(
            0,
            vec![
                predicted(12, 9.0, 20.0),  // speed off by 3, gust by 4
                predicted(13, 30.0, 40.0), // not observed
                predicted(11, 11.0, 15.0), // speed off by 1, gust exact
            ],
        );
        let verification = verify_forecast(&stored(predictions), 0, &observed_day());

        let hours: Vec<u32> = verification.hours.iter().map(|h| h.hour).collect();
        assert_eq!(hours, vec![11, 12]);
        assert_eq!(verification.hours[1].speed_error_kt, 3.0);
        assert_eq!(verification.hours[1].gust_error_kt, 4.0);
        assert_eq!(verification.speed_mae, Some(2.0));
        assert_eq!(verification.gust_mae, Some(2.0));
        // sqrt((9 + 1) / 2) and sqrt((16 + 0) / 2)
        assert_eq!(verification.speed_rmse, Some(2.2));
        assert_eq!(verification.gust_rmse, Some(2.8));
        assert_eq!(verification.forecast_id, 7);
    }

    #[test]
    fn test_no_overlap_gives_no_metrics() {
        let mut predictions = DayPredictions::new();
        predictions.insert(1, vec![predicted(12, 9.0, 20.0)]);
        let forecast = stored(predictions);

        let verification = verify_forecast(&forecast, 0, &observed_day());
        assert!(verification.hours.is_empty());
        assert_eq!(verification.speed_mae, None);
        assert_eq!(verification.gust_rmse, None);

        let verification = verify_forecast(&forecast, 1, &observed_day());
        assert_eq!(verification.hours.len(), 1);
    }
}

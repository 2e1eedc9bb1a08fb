//! Defines the `CompassPoint` enum used to label averaged wind directions.

use serde::{Deserialize, Serialize};
use std::fmt;

const SECTOR_DEGREES: f64 = 22.5;

/// One of the 16 points of the compass rose.
///
/// Each point covers a 22.5° sector centred on its bearing, so `North` spans
/// 348.75° to 11.25°. Serializes as its short label (`"NNE"`, `"SW"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompassPoint {
    #[serde(rename = "N")]
    North,
    #[serde(rename = "NNE")]
    NorthNorthEast,
    #[serde(rename = "NE")]
    NorthEast,
    #[serde(rename = "ENE")]
    EastNorthEast,
    #[serde(rename = "E")]
    East,
    #[serde(rename = "ESE")]
    EastSouthEast,
    #[serde(rename = "SE")]
    SouthEast,
    #[serde(rename = "SSE")]
    SouthSouthEast,
    #[serde(rename = "S")]
    South,
    #[serde(rename = "SSW")]
    SouthSouthWest,
    #[serde(rename = "SW")]
    SouthWest,
    #[serde(rename = "WSW")]
    WestSouthWest,
    #[serde(rename = "W")]
    West,
    #[serde(rename = "WNW")]
    WestNorthWest,
    #[serde(rename = "NW")]
    NorthWest,
    #[serde(rename = "NNW")]
    NorthNorthWest,
}

impl CompassPoint {
    const ALL: [CompassPoint; 16] = [
        CompassPoint::North,
        CompassPoint::NorthNorthEast,
        CompassPoint::NorthEast,
        CompassPoint::EastNorthEast,
        CompassPoint::East,
        CompassPoint::EastSouthEast,
        CompassPoint::SouthEast,
        CompassPoint::SouthSouthEast,
        CompassPoint::South,
        CompassPoint::SouthSouthWest,
        CompassPoint::SouthWest,
        CompassPoint::WestSouthWest,
        CompassPoint::West,
        CompassPoint::WestNorthWest,
        CompassPoint::NorthWest,
        CompassPoint::NorthNorthWest,
    ];

    /// Maps a bearing in degrees to its compass point. Any finite value is accepted
    /// and wrapped into 0..360 first.
    ///
    /// # Examples
    ///
    /// ```
    /// use buoy_wind::CompassPoint;
    ///
    /// assert_eq!(CompassPoint::from_degrees(185.0), CompassPoint::South);
    /// assert_eq!(CompassPoint::from_degrees(350.0), CompassPoint::North);
    /// assert_eq!(CompassPoint::from_degrees(22.5), CompassPoint::NorthNorthEast);
    /// ```
    pub fn from_degrees(degrees: f64) -> Self {
        let wrapped = degrees.rem_euclid(360.0);
        let sector = ((wrapped + SECTOR_DEGREES / 2.0) / SECTOR_DEGREES).floor() as usize % 16;
        Self::ALL[sector]
    }

    /// The short label, e.g. `"WSW"`.
    pub fn label(&self) -> &'static str {
        match self {
            CompassPoint::North => "N",
            CompassPoint::NorthNorthEast => "NNE",
            CompassPoint::NorthEast => "NE",
            CompassPoint::EastNorthEast => "ENE",
            CompassPoint::East => "E",
            CompassPoint::EastSouthEast => "ESE",
            CompassPoint::SouthEast => "SE",
            CompassPoint::SouthSouthEast => "SSE",
            CompassPoint::South => "S",
            CompassPoint::SouthSouthWest => "SSW",
            CompassPoint::SouthWest => "SW",
            CompassPoint::WestSouthWest => "WSW",
            CompassPoint::West => "W",
            CompassPoint::WestNorthWest => "WNW",
            CompassPoint::NorthWest => "NW",
            CompassPoint::NorthNorthWest => "NNW",
        }
    }
}

impl fmt::Display for CompassPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

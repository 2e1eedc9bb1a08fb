pub mod compass;
pub mod day_data;
pub mod forecast;
pub mod measurement;
pub mod wind_data_point;

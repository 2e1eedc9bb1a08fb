pub mod wind_frame;

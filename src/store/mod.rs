pub mod error;
pub mod forecast_store;
pub mod verification;

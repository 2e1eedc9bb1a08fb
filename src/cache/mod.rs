pub mod error;
pub mod key;
pub mod request_cache;

pub mod beacon_client;
pub mod constants;
pub mod error;
pub mod metrics;
pub mod types;
pub mod utils;

pub mod chart;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod port;
pub mod sampler;
pub mod source;

#[cfg(feature = "serial")]
pub mod serial;

pub use dht_logger_model as model;

pub mod config;
pub mod lifecycle;
pub mod serve;
pub mod service;
pub mod streaming;
pub mod telemetry;

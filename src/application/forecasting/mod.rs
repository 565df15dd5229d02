pub mod service;

pub use service::{ForecastRequest, ForecastService, TrainingReport};

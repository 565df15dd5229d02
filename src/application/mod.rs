// Indicator rows and training targets
pub mod features;

// Scalers, regressors, ensemble
pub mod ml;

// Headline polarity aggregation
pub mod sentiment;

// Request orchestration
pub mod forecasting;

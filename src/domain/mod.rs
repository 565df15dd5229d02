// Forecast request/response types and lifecycle
pub mod forecasting;

// Raw market data
pub mod market;

// Feature layout shared by training and inference
pub mod ml;

// Port interfaces
pub mod ports;

// Headline sentiment vocabulary
pub mod sentiment;

// Domain-specific error types
pub mod errors;

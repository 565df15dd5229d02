pub mod market_data;
pub mod news;
pub mod observability;
pub mod persistence;

pub use market_data::CsvHistoryProvider;
pub use news::{JsonHeadlineProvider, SentimentAnalyzer};
pub use observability::ForecastMetrics;
pub use persistence::{FileModelStore, InMemoryModelStore};

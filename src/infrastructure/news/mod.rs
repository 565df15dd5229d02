pub mod headline_file;
pub mod sentiment_analyzer;

pub use headline_file::JsonHeadlineProvider;
pub use sentiment_analyzer::SentimentAnalyzer;

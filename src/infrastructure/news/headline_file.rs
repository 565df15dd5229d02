use crate::domain::errors::ForecastError;
use crate::domain::ports::HeadlineProvider;
use crate::domain::sentiment::Headline;
use std::cmp::Reverse;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Headlines from a JSON array of `{title, summary, published}` objects.
/// The same file serves every symbol.
pub struct JsonHeadlineProvider {
    path: PathBuf,
}

impl JsonHeadlineProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Newest first; undated headlines keep their file order after dated ones.
pub fn most_recent(mut headlines: Vec<Headline>, limit: usize) -> Vec<Headline> {
    headlines.sort_by_key(|h| Reverse(h.published));
    headlines.truncate(limit);
    headlines
}

impl HeadlineProvider for JsonHeadlineProvider {
    fn fetch_headlines(&self, symbol: &str, limit: usize) -> Result<Vec<Headline>, ForecastError> {
        let upstream = |reason: String| ForecastError::UpstreamDataUnavailable {
            symbol: symbol.to_string(),
            reason,
        };

        let content = fs::read_to_string(&self.path)
            .map_err(|e| upstream(format!("{}: {}", self.path.display(), e)))?;
        let headlines: Vec<Headline> = serde_json::from_str(&content)
            .map_err(|e| upstream(format!("{}: {}", self.path.display(), e)))?;

        debug!(symbol, count = headlines.len(), "Read headlines from {:?}", self.path);
        Ok(most_recent(headlines, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_most_recent_ordering() {
        let at = |d| Some(Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap());
        let headline = |title: &str, published| Headline {
            title: title.to_string(),
            summary: String::new(),
            published,
        };

        let picked = most_recent(
            vec![
                headline("old", at(1)),
                headline("undated", None),
                headline("new", at(5)),
                headline("mid", at(3)),
            ],
            3,
        );
        let titles: Vec<&str> = picked.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_reads_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("news.json");
        fs::write(
            &path,
            r#"[{"title": "Shares rally", "published": "2024-03-01T10:00:00Z"},
                {"title": "Guidance cut", "summary": "Outlook lowered", "published": null}]"#,
        )
        .unwrap();

        let headlines = JsonHeadlineProvider::new(&path).fetch_headlines("AAPL", 10).unwrap();
        assert_eq!(headlines.len(), 2);
        assert_eq!(headlines[0].title, "Shares rally");
        assert_eq!(headlines[1].summary, "Outlook lowered");

        let missing = JsonHeadlineProvider::new(dir.path().join("absent.json"));
        assert!(matches!(
            missing.fetch_headlines("AAPL", 10),
            Err(ForecastError::UpstreamDataUnavailable { .. })
        ));
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One news article with the symbols it mentions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub url: String,
    pub symbols: Vec<String>,
    pub title: String,
    #[serde(default)]
    pub paragraphs: Vec<String>,
    pub published_at: DateTime<Utc>,
}

impl NewsItem {
    pub fn mentions(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s.eq_ignore_ascii_case(symbol))
    }

    /// The first paragraph, `None` when the article has none
    pub fn lead_paragraph(&self) -> Option<&str> {
        self.paragraphs.first().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(paragraphs: Vec<&str>) -> NewsItem {
        NewsItem {
            url: "https://example.com/a".into(),
            symbols: vec!["AAPL".into(), "MSFT".into()],
            title: "Apple beats estimates".into(),
            paragraphs: paragraphs.into_iter().map(String::from).collect(),
            published_at: Utc::now(),
        }
    }

    #[test]
    fn test_mentions_is_case_insensitive() {
        let news = item(vec![]);
        assert!(news.mentions("aapl"));
        assert!(!news.mentions("TSLA"));
    }

    #[test]
    fn test_lead_paragraph_is_first() {
        assert_eq!(item(vec!["a", "b"]).lead_paragraph(), Some("a"));
        assert_eq!(item(vec![]).lead_paragraph(), None);
    }
}

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::sources::NewsSource;
use crate::domain::NewsItem;
use crate::error::Result;

/// Most recent `limit` articles mentioning `symbol` published up to `at`.
///
/// The lookback starts at `limit / 5` days (at least one) and doubles while
/// fewer than `limit` articles come back, stopping once it would exceed
/// `max_lookback`. Returns whatever was found by then, newest first.
pub async fn latest_news(
    source: &dyn NewsSource,
    symbol: &str,
    at: DateTime<Utc>,
    limit: usize,
    max_lookback: Duration,
) -> Result<Vec<NewsItem>> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let symbols = [symbol.to_string()];
    let mut lookback = Duration::days((limit / 5).max(1) as i64).min(max_lookback);

    loop {
        let mut items: Vec<NewsItem> = source
            .news(&symbols, at - lookback, at, limit)
            .await?
            .into_iter()
            .filter(|n| n.mentions(symbol) && n.published_at <= at)
            .collect();

        if items.len() >= limit || lookback >= max_lookback {
            items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
            items.truncate(limit);
            return Ok(items);
        }

        debug!(
            symbol,
            found = items.len(),
            wanted = limit,
            lookback_days = lookback.num_days(),
            "not enough news, doubling lookback"
        );
        lookback = (lookback * 2).min(max_lookback);
    }
}

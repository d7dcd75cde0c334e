//! Point and window queries built on top of the raw range query.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::sources::PriceSource;
use crate::domain::{Bar, Interval};
use crate::error::{Result, SentiError};

/// Bar whose timestamp is nearest to `at`.
///
/// Searches `[at - w, at + w]` with `w = max(3 * interval, 1 day)`.
pub async fn closest_bar(
    source: &dyn PriceSource,
    symbol: &str,
    at: DateTime<Utc>,
    interval: Interval,
) -> Result<Bar> {
    let half = (interval.duration() * 3).max(Duration::days(1));
    let bars = source.bars(symbol, at - half, at + half, interval).await?;

    bars.into_iter()
        .min_by_key(|b| (b.timestamp - at).num_seconds().abs())
        .ok_or_else(|| SentiError::NoData {
            symbol: symbol.to_string(),
            at,
            searched_days: half.num_days(),
        })
}

/// The last `n` bars ending at `at`, oldest first.
///
/// Starts from `interval.lookback(n)` and doubles the window until the
/// provider returns more than `n` bars, at most `max_doublings` times.
pub async fn last_bars(
    source: &dyn PriceSource,
    symbol: &str,
    at: DateTime<Utc>,
    n: usize,
    interval: Interval,
    max_doublings: u32,
) -> Result<Vec<Bar>> {
    let mut lookback = interval.lookback(n);
    let mut attempt = 0;

    loop {
        let bars = source.bars(symbol, at - lookback, at, interval).await?;
        let exhausted = attempt >= max_doublings;

        if bars.len() > n || (exhausted && bars.len() >= n) {
            let skip = bars.len() - n;
            return Ok(bars.into_iter().skip(skip).collect());
        }
        if exhausted {
            return Err(SentiError::NoData {
                symbol: symbol.to_string(),
                at,
                searched_days: lookback.num_days(),
            });
        }

        debug!(
            symbol,
            found = bars.len(),
            wanted = n,
            lookback_days = lookback.num_days(),
            "price window too short, doubling lookback"
        );
        lookback = lookback * 2;
        attempt += 1;
    }
}

/// Whether any bar exists in `[at - half_window, at + half_window]`
pub async fn has_data_around(
    source: &dyn PriceSource,
    symbol: &str,
    at: DateTime<Utc>,
    half_window: Duration,
    interval: Interval,
) -> Result<bool> {
    let bars = source
        .bars(symbol, at - half_window, at + half_window, interval)
        .await?;
    Ok(!bars.is_empty())
}

/// Closes in `[at - span, at]`, oldest first
pub async fn window_closes(
    source: &dyn PriceSource,
    symbol: &str,
    at: DateTime<Utc>,
    span: Duration,
    interval: Interval,
) -> Result<Vec<f64>> {
    let bars = source.bars(symbol, at - span, at, interval).await?;
    Ok(bars.into_iter().map(|b| b.close).collect())
}

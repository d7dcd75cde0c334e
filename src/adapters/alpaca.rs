//! Alpaca REST adapter for historical bars, asset metadata and news.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::data::{NewsSource, PriceSource};
use crate::domain::{Bar, Interval, IntervalUnit, NewsItem};
use crate::error::{Result, SentiError};

pub const DEFAULT_DATA_URL: &str = "https://data.alpaca.markets";
pub const DEFAULT_TRADING_URL: &str = "https://paper-api.alpaca.markets";

const PROVIDER: &str = "alpaca";
const BARS_PAGE_LIMIT: usize = 10_000;
const NEWS_PAGE_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
struct BarsPage {
    #[serde(default)]
    bars: Option<Vec<AlpacaBar>>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlpacaBar {
    t: DateTime<Utc>,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
    #[serde(default)]
    n: Option<u64>,
    #[serde(default)]
    vw: Option<f64>,
}

impl From<AlpacaBar> for Bar {
    fn from(b: AlpacaBar) -> Self {
        Bar {
            timestamp: b.t,
            open: b.o,
            high: b.h,
            low: b.l,
            close: b.c,
            volume: b.v,
            trade_count: b.n,
            vwap: b.vw,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Asset {
    #[serde(default)]
    exchange: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsPage {
    #[serde(default)]
    news: Vec<AlpacaNews>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlpacaNews {
    headline: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    symbols: Vec<String>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    summary: String,
    created_at: DateTime<Utc>,
}

impl From<AlpacaNews> for NewsItem {
    fn from(n: AlpacaNews) -> Self {
        let mut paragraphs = split_paragraphs(&n.content);
        if paragraphs.is_empty() && !n.summary.trim().is_empty() {
            paragraphs.push(n.summary.trim().to_string());
        }
        NewsItem {
            url: n.url.unwrap_or_default(),
            symbols: n.symbols,
            title: n.headline,
            paragraphs,
            published_at: n.created_at,
        }
    }
}

/// Alpaca timeframe string for an interval.
///
/// Multi-day intervals are expressed in hours because the bars endpoint only
/// accepts `1Day`.
pub fn timeframe(interval: Interval) -> String {
    let n = interval.amount;
    match interval.unit {
        IntervalUnit::Minute => format!("{}Min", n),
        IntervalUnit::Hour => format!("{}Hour", n),
        IntervalUnit::Day if n == 1 => "1Day".to_string(),
        IntervalUnit::Day => format!("{}Hour", 24 * n),
        IntervalUnit::Week => format!("{}Week", n),
        IntervalUnit::Month => format!("{}Month", n),
    }
}

/// Split article HTML into plain-text paragraphs on `</p>`
pub fn split_paragraphs(html: &str) -> Vec<String> {
    html.split("</p>")
        .map(strip_tags)
        .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|p| !p.is_empty())
        .collect()
}

fn strip_tags(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for c in fragment.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&amp;", "&")
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Market-data and news client
#[derive(Clone)]
pub struct AlpacaClient {
    http: Client,
    data_url: String,
    trading_url: String,
}

impl AlpacaClient {
    pub fn new(
        key_id: &str,
        secret_key: &str,
        data_url: Option<&str>,
        trading_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apca-api-key-id",
            HeaderValue::from_str(key_id)
                .map_err(|e| SentiError::Configuration(format!("invalid Alpaca key id: {}", e)))?,
        );
        headers.insert(
            "apca-api-secret-key",
            HeaderValue::from_str(secret_key).map_err(|e| {
                SentiError::Configuration(format!("invalid Alpaca secret key: {}", e))
            })?,
        );

        let http = Client::builder()
            .user_agent("sentitrade/0.1")
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| SentiError::provider(PROVIDER, format!("failed to build client: {}", e)))?;

        Ok(Self {
            http,
            data_url: data_url
                .unwrap_or(DEFAULT_DATA_URL)
                .trim_end_matches('/')
                .to_string(),
            trading_url: trading_url
                .unwrap_or(DEFAULT_TRADING_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    /// Credentials from `APCA_API_KEY_ID` / `APCA_API_SECRET_KEY`
    pub fn from_env(data_url: Option<&str>, trading_url: Option<&str>) -> Result<Self> {
        let key_id = std::env::var("APCA_API_KEY_ID")
            .map_err(|_| SentiError::Configuration("APCA_API_KEY_ID is required".into()))?;
        let secret = std::env::var("APCA_API_SECRET_KEY")
            .map_err(|_| SentiError::Configuration("APCA_API_SECRET_KEY is required".into()))?;
        Self::new(
            &key_id,
            &secret,
            data_url,
            trading_url,
            Duration::from_secs(30),
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        let resp = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| SentiError::provider(PROVIDER, format!("GET {} failed: {}", url, e)))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| SentiError::provider(PROVIDER, format!("reading {} failed: {}", url, e)))?;

        if !status.is_success() {
            return Err(SentiError::provider(
                PROVIDER,
                format!("GET {} returned {}: {}", url, status, text),
            ));
        }

        serde_json::from_str(&text)
            .map_err(|e| SentiError::provider(PROVIDER, format!("invalid JSON from {}: {}", url, e)))
    }
}

#[async_trait]
impl PriceSource for AlpacaClient {
    async fn bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Interval,
    ) -> Result<Vec<Bar>> {
        let url = format!("{}/v2/stocks/{}/bars", self.data_url, symbol);
        let mut bars: Vec<Bar> = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("timeframe", timeframe(interval)),
                ("start", rfc3339(start)),
                ("end", rfc3339(end)),
                ("limit", BARS_PAGE_LIMIT.to_string()),
                ("adjustment", "raw".to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("page_token", token.clone()));
            }

            let page: BarsPage = self.get_json(&url, &query).await?;
            bars.extend(page.bars.unwrap_or_default().into_iter().map(Bar::from));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(symbol, count = bars.len(), %start, %end, "fetched bars");
        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }

    async fn exchange(&self, symbol: &str) -> Result<Option<String>> {
        let url = format!("{}/v2/assets/{}", self.trading_url, symbol);
        let asset: Asset = self.get_json(&url, &[]).await?;
        Ok(asset.exchange)
    }
}

#[async_trait]
impl NewsSource for AlpacaClient {
    async fn news(
        &self,
        symbols: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<NewsItem>> {
        let url = format!("{}/v1beta1/news", self.data_url);
        let mut items: Vec<NewsItem> = Vec::new();
        let mut page_token: Option<String> = None;

        while items.len() < limit {
            let page_limit = (limit - items.len()).min(NEWS_PAGE_LIMIT);
            let mut query = vec![
                ("symbols", symbols.join(",")),
                ("start", rfc3339(start)),
                ("end", rfc3339(end)),
                ("limit", page_limit.to_string()),
                ("sort", "desc".to_string()),
                ("include_content", "true".to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("page_token", token.clone()));
            }

            let page: NewsPage = self.get_json(&url, &query).await?;
            if page.news.is_empty() {
                break;
            }
            items.extend(page.news.into_iter().map(NewsItem::from));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        if items.iter().any(|n| n.paragraphs.is_empty()) {
            warn!(
                symbols = %symbols.join(","),
                "some articles came back without content"
            );
        }
        items.truncate(limit);
        Ok(items)
    }
}

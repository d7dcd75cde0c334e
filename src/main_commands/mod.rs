use burn::backend::{Autodiff, NdArray};
use burn::optim::{AdamConfig, Optimizer};
use sentitrade::adapters::AlpacaClient;
use sentitrade::config::{AppConfig, DataProvider};
use sentitrade::data::{
    FixtureNewsSource, FixturePriceSource, HashingTokenizer, NewsSource, PriceSource, Tokenizer,
};
use sentitrade::error::Result;
use sentitrade::rl::{DqnAgent, TradingEnvironment, TradingQNetwork};
use std::sync::Arc;
use tracing::{info, info_span};

pub(crate) mod eval;
pub(crate) mod inspect;
pub(crate) mod train;

pub(crate) type Backend = Autodiff<NdArray<f32>>;

pub(crate) struct Sources {
    pub prices: Arc<dyn PriceSource>,
    pub news: Arc<dyn NewsSource>,
    pub tokenizer: Arc<dyn Tokenizer>,
}

pub(crate) fn build_sources(config: &AppConfig) -> Result<Sources> {
    let tokenizer: Arc<dyn Tokenizer> = Arc::new(HashingTokenizer::new(config.data.vocab_size));

    let (prices, news): (Arc<dyn PriceSource>, Arc<dyn NewsSource>) = match config.data.provider {
        DataProvider::Alpaca => {
            let alpaca = &config.alpaca;
            let client = match (&alpaca.key_id, &alpaca.secret_key) {
                (Some(key_id), Some(secret)) => AlpacaClient::new(
                    key_id,
                    secret,
                    alpaca.data_url.as_deref(),
                    alpaca.trading_url.as_deref(),
                    alpaca.timeout(),
                )?,
                _ => AlpacaClient::from_env(
                    alpaca.data_url.as_deref(),
                    alpaca.trading_url.as_deref(),
                )?,
            };
            let client = Arc::new(client);
            (client.clone(), client)
        }
        DataProvider::Fixture => {
            let prices = match &config.data.price_fixture {
                Some(path) => FixturePriceSource::from_json_file(path)?,
                None => FixturePriceSource::new(),
            };
            let news = match &config.data.news_fixture {
                Some(path) => FixtureNewsSource::from_json_file(path)?,
                None => FixtureNewsSource::empty(),
            };
            (Arc::new(prices), Arc::new(news))
        }
    };

    info!(provider = ?config.data.provider, vocab_size = config.data.vocab_size, "data sources ready");
    Ok(Sources {
        prices,
        news,
        tokenizer,
    })
}

pub(crate) async fn build_environment(config: &AppConfig) -> Result<TradingEnvironment> {
    let sources = build_sources(config)?;
    let span = info_span!("env", symbol = %config.environment.symbol);
    let env = TradingEnvironment::new(
        config.environment.clone(),
        sources.prices,
        sources.news,
        sources.tokenizer,
    )
    .await?
    .with_span(span);
    Ok(env)
}

pub(crate) fn build_agent(
    config: &AppConfig,
) -> Result<DqnAgent<Backend, impl Optimizer<TradingQNetwork<Backend>, Backend>>> {
    let device = Default::default();
    let network = config.network_config().init::<Backend>(&device)?;
    let optimizer = AdamConfig::new().init::<Backend, TradingQNetwork<Backend>>();
    Ok(DqnAgent::new(network, optimizer, config.agent.clone(), device))
}

//! Data access: provider traits, price/news queries and tokenization.

pub mod fixtures;
pub mod news;
pub mod prices;
pub mod sources;
pub mod tokenizer;

pub use fixtures::{session_bars, FixtureNewsSource, FixturePriceSource};
pub use news::latest_news;
pub use prices::{closest_bar, has_data_around, last_bars, window_closes};
pub use sources::{NewsSource, PriceSource, Tokenizer};
pub use tokenizer::{pad_sequence, HashingTokenizer};

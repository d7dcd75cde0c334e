//! Observation Bundle
//!
//! Fixed-shape observation handed from the environment to the networks.

use serde::{Deserialize, Serialize};

use crate::domain::BAR_FIELDS;
use crate::error::{Result, SentiError};

pub const SYMBOL_TOKENS: usize = 5;
pub const TITLE_TOKENS: usize = 100;
pub const PARAGRAPH_TOKENS: usize = 512;
pub const PRICE_WINDOW: usize = 50;
pub const PRICE_FIELDS: usize = BAR_FIELDS;

/// One observation: tokenized symbol and news plus the recent price window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationBundle {
    /// `SYMBOL_TOKENS` ids
    pub symbol: Vec<u32>,
    /// `news_limit` rows of `TITLE_TOKENS` ids
    pub titles: Vec<Vec<u32>>,
    /// `news_limit` rows of `PARAGRAPH_TOKENS` ids
    pub paragraphs: Vec<Vec<u32>>,
    /// `PRICE_WINDOW` bars, oldest first
    pub prices: Vec<[f32; PRICE_FIELDS]>,
}

impl ObservationBundle {
    /// All-pad bundle, mainly for shape checks and warm-up passes
    pub fn zeros(news_limit: usize) -> Self {
        Self {
            symbol: vec![0; SYMBOL_TOKENS],
            titles: vec![vec![0; TITLE_TOKENS]; news_limit],
            paragraphs: vec![vec![0; PARAGRAPH_TOKENS]; news_limit],
            prices: vec![[0.0; PRICE_FIELDS]; PRICE_WINDOW],
        }
    }

    pub fn news_rows(&self) -> usize {
        self.titles.len()
    }

    /// Latest close in the price window
    pub fn last_close(&self) -> Option<f32> {
        self.prices.last().map(|row| row[3])
    }
}

/// Declared shape of the observations an environment produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationSpec {
    pub news_limit: usize,
    pub vocab_size: usize,
}

impl ObservationSpec {
    pub fn new(news_limit: usize, vocab_size: usize) -> Self {
        Self {
            news_limit,
            vocab_size,
        }
    }

    pub fn symbol_shape(&self) -> [usize; 1] {
        [SYMBOL_TOKENS]
    }

    pub fn titles_shape(&self) -> [usize; 2] {
        [self.news_limit, TITLE_TOKENS]
    }

    pub fn paragraphs_shape(&self) -> [usize; 2] {
        [self.news_limit, PARAGRAPH_TOKENS]
    }

    pub fn prices_shape(&self) -> [usize; 2] {
        [PRICE_WINDOW, PRICE_FIELDS]
    }

    /// Check every component against the declared shape and vocabulary
    pub fn validate(&self, bundle: &ObservationBundle) -> Result<()> {
        self.check_tokens("symbol", std::slice::from_ref(&bundle.symbol), 1, SYMBOL_TOKENS)?;
        self.check_tokens("titles", &bundle.titles, self.news_limit, TITLE_TOKENS)?;
        self.check_tokens(
            "paragraphs",
            &bundle.paragraphs,
            self.news_limit,
            PARAGRAPH_TOKENS,
        )?;

        if bundle.prices.len() != PRICE_WINDOW {
            return Err(SentiError::shape(
                "prices",
                format!("({}, {})", PRICE_WINDOW, PRICE_FIELDS),
                format!("({}, {})", bundle.prices.len(), PRICE_FIELDS),
            ));
        }
        if bundle.prices.iter().flatten().any(|v| !v.is_finite()) {
            return Err(SentiError::shape("prices", "finite values", "NaN or infinity"));
        }
        Ok(())
    }

    fn check_tokens(
        &self,
        component: &str,
        rows: &[Vec<u32>],
        expected_rows: usize,
        width: usize,
    ) -> Result<()> {
        if rows.len() != expected_rows {
            return Err(SentiError::shape(
                component,
                format!("({}, {})", expected_rows, width),
                format!("({}, _)", rows.len()),
            ));
        }
        for row in rows {
            if row.len() != width {
                return Err(SentiError::shape(
                    component,
                    format!("({}, {})", expected_rows, width),
                    format!("row of {}", row.len()),
                ));
            }
            if let Some(id) = row.iter().find(|&&id| id as usize >= self.vocab_size) {
                return Err(SentiError::shape(
                    component,
                    format!("ids < {}", self.vocab_size),
                    format!("id {}", id),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_bundle_matches_spec() {
        let spec = ObservationSpec::new(3, 100);
        let bundle = ObservationBundle::zeros(3);
        assert!(spec.validate(&bundle).is_ok());
        assert_eq!(spec.titles_shape(), [3, TITLE_TOKENS]);
        assert_eq!(spec.prices_shape(), [50, 7]);
    }

    #[test]
    fn test_rejects_wrong_row_count() {
        let spec = ObservationSpec::new(3, 100);
        let mut bundle = ObservationBundle::zeros(3);
        bundle.titles.pop();
        let err = spec.validate(&bundle).unwrap_err();
        assert!(matches!(err, SentiError::Shape { ref component, .. } if component == "titles"));
    }

    #[test]
    fn test_rejects_out_of_vocab_ids() {
        let spec = ObservationSpec::new(1, 10);
        let mut bundle = ObservationBundle::zeros(1);
        bundle.paragraphs[0][511] = 10;
        assert!(spec.validate(&bundle).is_err());
    }

    #[test]
    fn test_rejects_short_price_window() {
        let spec = ObservationSpec::new(1, 10);
        let mut bundle = ObservationBundle::zeros(1);
        bundle.prices.truncate(49);
        assert!(spec.validate(&bundle).is_err());
        let mut bundle = ObservationBundle::zeros(1);
        bundle.prices[0][0] = f32::NAN;
        assert!(spec.validate(&bundle).is_err());
    }
}

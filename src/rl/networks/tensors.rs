//! Conversions between observation bundles and tensors.

use burn::prelude::*;
use burn::tensor::TensorData;

use crate::error::{Result, SentiError};
use crate::rl::core::{ObservationBundle, PARAGRAPH_TOKENS, PRICE_FIELDS, PRICE_WINDOW, TITLE_TOKENS};

/// A batch of observations as network inputs
#[derive(Debug, Clone)]
pub struct ObservationBatch<B: Backend> {
    /// `[batch, articles, TITLE_TOKENS]`
    pub titles: Tensor<B, 3, Int>,
    /// `[batch, articles, PARAGRAPH_TOKENS]`
    pub paragraphs: Tensor<B, 3, Int>,
    /// `[batch, PRICE_WINDOW, PRICE_FIELDS]`
    pub prices: Tensor<B, 3>,
}

impl<B: Backend> ObservationBatch<B> {
    /// Stack bundles that share the same number of news rows
    pub fn from_bundles<'a, I>(bundles: I, device: &B::Device) -> Result<Self>
    where
        I: IntoIterator<Item = &'a ObservationBundle>,
    {
        let bundles: Vec<&ObservationBundle> = bundles.into_iter().collect();
        let first = bundles
            .first()
            .ok_or_else(|| SentiError::shape("batch", "at least one observation", "none"))?;
        let articles = first.news_rows();
        if articles == 0 {
            return Err(SentiError::shape("batch", "at least one news row", "0"));
        }

        let batch = bundles.len();
        let mut titles = Vec::with_capacity(batch * articles * TITLE_TOKENS);
        let mut paragraphs = Vec::with_capacity(batch * articles * PARAGRAPH_TOKENS);
        let mut prices = Vec::with_capacity(batch * PRICE_WINDOW * PRICE_FIELDS);

        for bundle in &bundles {
            if bundle.news_rows() != articles
                || bundle.paragraphs.len() != articles
                || bundle.prices.len() != PRICE_WINDOW
            {
                return Err(SentiError::shape(
                    "batch",
                    format!("{} news rows and {} bars", articles, PRICE_WINDOW),
                    format!(
                        "{} news rows and {} bars",
                        bundle.news_rows(),
                        bundle.prices.len()
                    ),
                ));
            }
            push_rows(&mut titles, &bundle.titles, TITLE_TOKENS, "titles")?;
            push_rows(&mut paragraphs, &bundle.paragraphs, PARAGRAPH_TOKENS, "paragraphs")?;
            prices.extend(bundle.prices.iter().flatten().copied());
        }

        Ok(Self {
            titles: Tensor::from_data(
                TensorData::new(titles, [batch, articles, TITLE_TOKENS]),
                device,
            ),
            paragraphs: Tensor::from_data(
                TensorData::new(paragraphs, [batch, articles, PARAGRAPH_TOKENS]),
                device,
            ),
            prices: Tensor::from_data(
                TensorData::new(prices, [batch, PRICE_WINDOW, PRICE_FIELDS]),
                device,
            ),
        })
    }

    pub fn batch_size(&self) -> usize {
        self.prices.dims()[0]
    }

    pub fn articles(&self) -> usize {
        self.titles.dims()[1]
    }
}

fn push_rows(out: &mut Vec<i64>, rows: &[Vec<u32>], width: usize, component: &str) -> Result<()> {
    for row in rows {
        if row.len() != width {
            return Err(SentiError::shape(component, width, row.len()));
        }
        out.extend(row.iter().map(|&id| i64::from(id)));
    }
    Ok(())
}

/// Index of the largest score in each row
pub fn argmax_rows<B: Backend>(scores: Tensor<B, 2>) -> Result<Vec<usize>> {
    let indices = scores
        .argmax(1)
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|e| SentiError::Model(format!("reading argmax: {:?}", e)))?;
    Ok(indices.into_iter().map(|i| i.max(0) as usize).collect())
}

/// Flatten a float tensor into host memory
pub fn to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| SentiError::Model(format!("reading tensor: {:?}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_batch_shapes() {
        let device = Default::default();
        let bundles = vec![ObservationBundle::zeros(3), ObservationBundle::zeros(3)];
        let batch = ObservationBatch::<TestBackend>::from_bundles(&bundles, &device).unwrap();
        assert_eq!(batch.titles.dims(), [2, 3, TITLE_TOKENS]);
        assert_eq!(batch.paragraphs.dims(), [2, 3, PARAGRAPH_TOKENS]);
        assert_eq!(batch.prices.dims(), [2, PRICE_WINDOW, PRICE_FIELDS]);
        assert_eq!(batch.batch_size(), 2);
        assert_eq!(batch.articles(), 3);
    }

    #[test]
    fn test_batch_rejects_mixed_news_rows() {
        let device = Default::default();
        let bundles = vec![ObservationBundle::zeros(3), ObservationBundle::zeros(2)];
        assert!(ObservationBatch::<TestBackend>::from_bundles(&bundles, &device).is_err());
        let empty: Vec<ObservationBundle> = Vec::new();
        assert!(ObservationBatch::<TestBackend>::from_bundles(&empty, &device).is_err());
    }

    #[test]
    fn test_argmax_rows() {
        let device = Default::default();
        let scores = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![0.1f32, 0.9, 0.7, 0.2], [2, 2]),
            &device,
        );
        assert_eq!(argmax_rows(scores).unwrap(), vec![1, 0]);
    }
}

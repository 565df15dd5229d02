use super::scaler::HorizonScalers;
use crate::config::{PriceClamp, TargetEncoding};
use crate::domain::forecasting::Forecast;

/// Mean of the available scaled predictions.
///
/// With no sequence prediction the tree vector is returned untouched.
pub fn combine_scaled(tree: [f64; 2], sequence: Option<[f64; 2]>) -> [f64; 2] {
    match sequence {
        Some(seq) => [(tree[0] + seq[0]) / 2.0, (tree[1] + seq[1]) / 2.0],
        None => tree,
    }
}

/// Turns scaled model outputs into price-unit forecasts.
#[derive(Debug, Clone, Copy)]
pub struct EnsembleCombiner<'a> {
    scalers: &'a HorizonScalers,
    encoding: TargetEncoding,
    clamp: PriceClamp,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnsembleOutput {
    /// Averaged vector in target-scaler space.
    pub scaled: [f64; 2],
    pub forecast: Forecast,
}

impl<'a> EnsembleCombiner<'a> {
    pub fn new(scalers: &'a HorizonScalers, encoding: TargetEncoding, clamp: PriceClamp) -> Self {
        Self {
            scalers,
            encoding,
            clamp,
        }
    }

    /// Averages, inverse-scales and re-anchors the predictions.
    /// `latest_close` anchors relative targets and is ignored for absolute ones.
    pub fn combine(
        &self,
        tree: [f64; 2],
        sequence: Option<[f64; 2]>,
        latest_close: f64,
    ) -> EnsembleOutput {
        let scaled = combine_scaled(tree, sequence);
        let unscaled = self.scalers.inverse_transform(scaled);

        let prices = unscaled.map(|value| {
            let price = match self.encoding {
                TargetEncoding::Relative => latest_close + value,
                TargetEncoding::Absolute => value,
            };
            self.clamp.apply(price)
        });

        EnsembleOutput {
            scaled,
            forecast: Forecast::from(prices),
        }
    }
}

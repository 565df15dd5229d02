use statrs::statistics::{Data, Distribution};

/// Simple daily returns over consecutive closes.
pub fn daily_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

/// One-sigma next-session price move: the sample std-dev of the last `window`
/// daily returns, scaled by the latest close.
///
/// Returns `None` when fewer than two returns are available.
pub fn expected_move(closes: &[f64], window: usize) -> Option<f64> {
    let latest = *closes.last()?;
    let returns = daily_returns(closes);
    if returns.len() < 2 {
        return None;
    }

    let recent = returns[returns.len().saturating_sub(window)..].to_vec();
    let std_dev = Data::new(recent).std_dev()?;
    Some(std_dev * latest)
}

use chrono::{Duration, NaiveDate};
use pricecast::application::features::FeatureTable;
use pricecast::application::ml::MinMaxScaler;
use pricecast::domain::errors::ForecastError;
use pricecast::domain::market::PriceBar;
use pricecast::domain::ml::FeatureLayout;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn series(closes: impl IntoIterator<Item = Decimal>) -> Vec<PriceBar> {
    let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
    closes
        .into_iter()
        .enumerate()
        .map(|(i, close)| PriceBar::flat(start + Duration::days(i as i64), close))
        .collect()
}

#[test]
fn test_linear_series_indicator_values() {
    // close = 100, 101, ..., 399
    let bars = series((0..300).map(|i| dec!(100) + Decimal::from(i)));
    let table = FeatureTable::build(&bars).unwrap();

    assert_eq!(table.len(), 101);
    let latest = table.latest();
    assert_eq!(latest.close, 399.0);
    assert!((latest.sma_20 - 389.5).abs() < 1e-9, "sma20 {}", latest.sma_20);
    assert!((latest.sma_50 - 374.5).abs() < 1e-9, "sma50 {}", latest.sma_50);
    assert!((latest.sma_200 - 299.5).abs() < 1e-9, "sma200 {}", latest.sma_200);
    assert_eq!(latest.rsi, 100.0);
    assert!((latest.bb_middle - latest.sma_20).abs() < 1e-9);
    assert!(latest.bb_upper > latest.bb_middle && latest.bb_middle > latest.bb_lower);
}

#[test]
fn test_monotonic_series_has_no_undefined_rows() {
    // Increments that grow, so the series is strictly increasing but not linear
    let bars = series((0..320).map(|i| dec!(50) + Decimal::from(i * i) / dec!(100) + Decimal::from(i)));
    let table = FeatureTable::build(&bars).unwrap();

    assert_eq!(table.len(), 320 - 199);
    assert_eq!(table.dates()[0], bars[199].date);

    let layout = FeatureLayout::default();
    for row in table.matrix(&layout) {
        assert!(row.iter().all(|v| v.is_finite()));
    }
    for row in table.rows() {
        assert!(row.rsi > 99.0, "rsi {}", row.rsi);
        assert!(row.rsi <= 100.0);
    }
}

#[test]
fn test_rsi_stays_bounded_on_mixed_series() {
    let bars = series((0..300).map(|i| {
        let swing = if i % 7 < 3 { dec!(3.5) } else { dec!(-2) };
        dec!(200) + swing * Decimal::from(i % 11)
    }));
    let table = FeatureTable::build(&bars).unwrap();
    for row in table.rows() {
        assert!((0.0..=100.0).contains(&row.rsi), "rsi {}", row.rsi);
    }
}

#[test]
fn test_fewer_than_warmup_bars_is_insufficient_history() {
    let bars = series((0..199).map(|i| dec!(10) + Decimal::from(i)));
    assert!(matches!(
        FeatureTable::build(&bars),
        Err(ForecastError::InsufficientHistory { bars: 199, .. })
    ));
}

#[test]
fn test_scaler_roundtrip_over_feature_matrix() {
    let bars = series((0..280).map(|i| dec!(75) + Decimal::from(i % 37) - Decimal::from(i % 13)));
    let table = FeatureTable::build(&bars).unwrap();
    let matrix = table.matrix(&FeatureLayout::default());
    let scaler = MinMaxScaler::fit(&matrix).unwrap();

    for row in &matrix {
        let back = scaler.inverse_transform(&scaler.transform(row));
        for (a, b) in row.iter().zip(&back) {
            assert!((a - b).abs() < 1e-9, "{} vs {}", a, b);
        }
    }
}

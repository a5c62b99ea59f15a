//! Forecast accuracy over the ledger.

use serde::Serialize;

/// Forecast pair and outcome for one ledger row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub naive: f64,
    pub adjusted: f64,
    pub actual: f64,
}

/// Mean absolute percentage errors, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyReport {
    /// Rows that contributed (rows with a zero actual are skipped)
    pub rows: usize,
    pub naive_mape: f64,
    pub adjusted_mape: f64,
    /// `naive_mape - adjusted_mape`, in percentage points
    pub improvement: f64,
}

/// Compare naive and adjusted forecasts against actuals.
///
/// Returns `None` when no row has a non-zero actual.
pub fn mape(observations: &[Observation]) -> Option<AccuracyReport> {
    let usable: Vec<&Observation> = observations
        .iter()
        .filter(|o| o.actual != 0.0 && o.actual.is_finite())
        .collect();
    if usable.is_empty() {
        return None;
    }

    let n = usable.len() as f64;
    let pct = |forecast: f64, actual: f64| (actual - forecast).abs() / actual.abs();
    let naive = usable.iter().map(|o| pct(o.naive, o.actual)).sum::<f64>() / n * 100.0;
    let adjusted = usable.iter().map(|o| pct(o.adjusted, o.actual)).sum::<f64>() / n * 100.0;

    Some(AccuracyReport {
        rows: usable.len(),
        naive_mape: naive,
        adjusted_mape: adjusted,
        improvement: naive - adjusted,
    })
}

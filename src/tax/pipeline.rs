//! Runs one period's trades through valuation, matching and aggregation

use super::fifo::{match_deals, Deals, MatchError, OpenLots};
use super::policy::TaxPolicy;
use super::report::{fee_total, ticker_balances, Balance, DividendPolicy, Report, ReportError};
use crate::fx::{FxRateTable, RateSettings};
use crate::trade::{sort_trades, Trade};
use crate::valuation::{annotate, ValuationError};
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error(transparent)]
    Valuation(#[from] ValuationError),
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Everything produced for a period
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub deals: Deals,
    /// Lots still open at the end of the period, the seed for the next one
    pub open_lots: OpenLots,
    pub balances: BTreeMap<String, Balance>,
    pub report: Report,
}

/// Value, match and aggregate `trades`.
///
/// `seed` holds lots left open by the previous period; they are expected to carry
/// their valuation already.
pub fn evaluate(
    mut trades: Vec<Trade>,
    seed: OpenLots,
    rates: &FxRateTable,
    settings: &RateSettings,
    policy: &TaxPolicy,
    dividends: &dyn DividendPolicy,
) -> Result<Evaluation, EvaluationError> {
    sort_trades(&mut trades);
    let valued: Vec<Trade> = annotate(trades, rates, settings.max_lookback_days)?
        .into_iter()
        .filter(|t| !t.trade_type.is_cash())
        .collect();
    log::info!("{} trades valued", valued.len());

    let fees = fee_total(&valued)?;
    let dividends = dividends.dividends(&valued, policy)?;
    let matched = match_deals(valued, seed)?;
    log::info!(
        "{} deals closed, {} tickers still open",
        matched.deals.values().map(Vec::len).sum::<usize>(),
        matched.open_lots.len()
    );

    let balances = ticker_balances(&matched.deals)?;
    let report = Report::from_deals(&matched.deals, dividends, fees, policy)?;
    Ok(Evaluation {
        deals: matched.deals,
        open_lots: matched.open_lots,
        balances,
        report,
    })
}

//! Attach exchange rates and reporting-currency amounts to trades

use crate::fx::{FxRateTable, RateError};
use crate::trade::{Trade, Valuation};
use chrono::NaiveDate;

#[derive(Debug, thiserror::Error)]
pub enum ValuationError {
    #[error(transparent)]
    Rate(#[from] RateError),
    #[error("trade already valued: {ticker} on {date}")]
    AlreadyValued { ticker: String, date: NaiveDate },
}

/// Value each trade at the rate resolved for its date.
///
/// Trades must already be sorted; their order is kept as given.
pub fn annotate(
    trades: Vec<Trade>,
    rates: &FxRateTable,
    max_lookback_days: u32,
) -> Result<Vec<Trade>, ValuationError> {
    debug_assert!(trades.windows(2).all(|w| w[0].datetime <= w[1].datetime));

    trades
        .into_iter()
        .map(|mut trade| {
            if trade.valuation.is_some() {
                let date = trade.date();
                return Err(ValuationError::AlreadyValued {
                    ticker: trade.ticker,
                    date,
                });
            }
            let fx_rate = rates.resolve(trade.date(), max_lookback_days)?;
            trade.valuation = Some(Valuation {
                fx_rate,
                amount_pln: trade.amount * fx_rate,
            });
            Ok(trade)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::RatePoint;
    use crate::trade::{parse_datetime, TradeType};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn rates(points: &[(&str, Decimal)]) -> FxRateTable {
        points
            .iter()
            .map(|(d, mid)| RatePoint {
                effective_date: NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap(),
                mid: *mid,
            })
            .collect()
    }

    fn trade(date: &str, trade_type: TradeType, amount: Decimal) -> Trade {
        Trade::new(
            "AAPL",
            trade_type,
            parse_datetime(date).unwrap(),
            dec!(1),
            amount,
        )
    }

    #[test]
    fn values_trades_at_previous_day_rate() {
        let table = rates(&[("2021-01-04", dec!(3.75)), ("2021-01-05", dec!(3.80))]);
        let trades = vec![
            trade("2021-01-05", TradeType::Buy, dec!(100)),
            trade("2021-01-06", TradeType::Sell, dec!(110)),
        ];

        let valued = annotate(trades, &table, 30).unwrap();
        assert_eq!(
            valued[0].valuation,
            Some(Valuation {
                fx_rate: dec!(3.75),
                amount_pln: dec!(375)
            })
        );
        assert_eq!(valued[1].amount_pln(), Some(dec!(418)));
    }

    #[test]
    fn keeps_input_order_for_equal_dates() {
        let table = rates(&[("2021-01-04", dec!(4))]);
        let trades = vec![
            trade("2021-01-05", TradeType::Sell, dec!(1)),
            trade("2021-01-05", TradeType::Buy, dec!(2)),
        ];
        let valued = annotate(trades, &table, 30).unwrap();
        assert_eq!(valued[0].trade_type, TradeType::Sell);
        assert_eq!(valued[1].trade_type, TradeType::Buy);
    }

    #[test]
    fn refuses_to_value_twice() {
        let table = rates(&[("2021-01-04", dec!(4))]);
        let valued = annotate(vec![trade("2021-01-05", TradeType::Buy, dec!(1))], &table, 30).unwrap();
        match annotate(valued, &table, 30).unwrap_err() {
            ValuationError::AlreadyValued { ticker, date } => {
                assert_eq!(ticker, "AAPL");
                assert_eq!(date, NaiveDate::from_ymd_opt(2021, 1, 5).unwrap());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_rate_is_an_error() {
        let table = rates(&[("2021-01-04", dec!(4))]);
        let err = annotate(vec![trade("2021-01-04", TradeType::Buy, dec!(1))], &table, 30).unwrap_err();
        assert!(matches!(
            err,
            ValuationError::Rate(RateError::RateNotFound { .. })
        ));
    }
}

pub mod etoro;
pub mod revolut;

use crate::tax::{DividendPolicy, DividendSummary, NetOfWithholding, ReportError, TaxPolicy};
use crate::trade::{self, Trade, TradeError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::de::DeserializeOwned;
use std::io::Read;
use std::str::FromStr;

/// Withholding taken from US dividends under the PL-US treaty
pub const US_DIVIDEND_WITHHOLDING: Decimal = dec!(0.15);

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("row {row}: {source}")]
    InvalidRecord { row: usize, source: TradeError },
}

/// Where a trade statement comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Broker {
    /// Revolut trading account statement
    Revolut,
    /// eToro closed positions export
    Etoro,
    /// ticker,type,date,quantity,unit_price,amount CSV or {"trades": [...]} JSON
    #[default]
    Normalized,
}

impl Broker {
    /// Read a CSV statement and map it onto sorted trades
    pub fn read_csv<R: Read>(self, reader: R) -> anyhow::Result<Vec<Trade>> {
        let trades = match self {
            Broker::Revolut => csv_to_trades::<revolut::Record, _>(reader)?,
            Broker::Etoro => csv_to_trades::<etoro::Record, _>(reader)?,
            Broker::Normalized => trade::read_trades_csv(reader)?,
        };
        log::info!("Read {} trades from {:?} statement", trades.len(), self);
        Ok(trades)
    }

    fn withholding(self) -> Decimal {
        match self {
            Broker::Revolut => US_DIVIDEND_WITHHOLDING,
            Broker::Etoro | Broker::Normalized => Decimal::ZERO,
        }
    }
}

impl DividendPolicy for Broker {
    fn dividends(
        &self,
        trades: &[Trade],
        policy: &TaxPolicy,
    ) -> Result<DividendSummary, ReportError> {
        NetOfWithholding {
            rate: self.withholding(),
        }
        .dividends(trades, policy)
    }
}

/// A statement row that maps onto zero or more trades
pub trait IntoTrades {
    fn into_trades(self) -> Result<Vec<Trade>, TradeError>;
}

fn csv_to_trades<Record, R>(reader: R) -> Result<Vec<Trade>, BrokerError>
where
    Record: DeserializeOwned + IntoTrades,
    R: Read,
{
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut trades = Vec::new();
    for (i, record) in rdr.deserialize::<Record>().enumerate() {
        let mapped = record?
            .into_trades()
            .map_err(|source| BrokerError::InvalidRecord { row: i + 1, source })?;
        trades.extend(mapped);
    }
    log::debug!("Mapped {} csv records", trades.len());
    trade::sort_trades(&mut trades);
    Ok(trades)
}

/// How a broker writes the fractional part of a number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecimalMark {
    /// `$1,234.56`: commas only group thousands
    Point,
    /// `123,45`: the comma is the decimal separator
    Comma,
}

/// Parse a broker formatted number such as `$1,234.56`, `-$0.10` or `123,45`
pub fn parse_amount(column: &str, value: &str, mark: DecimalMark) -> Result<Decimal, TradeError> {
    let digits: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    let normalized = match mark {
        DecimalMark::Point => digits.replace(',', ""),
        DecimalMark::Comma => digits.replace(',', "."),
    };
    Decimal::from_str(&normalized).map_err(|_| TradeError::InvalidNumber {
        column: column.to_string(),
        value: value.to_string(),
    })
}

/// As [`parse_amount`], with blank cells read as `None`
pub fn parse_optional_amount(
    column: &str,
    value: &str,
    mark: DecimalMark,
) -> Result<Option<Decimal>, TradeError> {
    if value.trim().is_empty() {
        Ok(None)
    } else {
        parse_amount(column, value, mark).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commas_group_thousands_with_decimal_point() {
        let parse = |v| parse_amount("x", v, DecimalMark::Point).unwrap();
        assert_eq!(parse("$1,234.56"), dec!(1234.56));
        assert_eq!(parse("$2,000"), dec!(2000));
        assert_eq!(parse("$1,234,567"), dec!(1234567));
        assert_eq!(parse("-$0.10"), dec!(-0.10));
        assert_eq!(parse("USD 12.5"), dec!(12.5));
        assert_eq!(parse("7"), dec!(7));
    }

    #[test]
    fn comma_is_the_decimal_separator_with_decimal_comma() {
        let parse = |v| parse_amount("x", v, DecimalMark::Comma).unwrap();
        assert_eq!(parse("123,45"), dec!(123.45));
        assert_eq!(parse("700,00"), dec!(700));
        assert_eq!(parse("150.00"), dec!(150));
        assert!(parse_amount("x", "1.234,56", DecimalMark::Comma).is_err());
    }

    #[test]
    fn rejects_garbage_amounts() {
        assert_eq!(
            parse_amount("Total Amount", "n/a", DecimalMark::Point),
            Err(TradeError::InvalidNumber {
                column: "Total Amount".to_string(),
                value: "n/a".to_string()
            })
        );
        assert_eq!(
            parse_optional_amount("Quantity", "  ", DecimalMark::Point).unwrap(),
            None
        );
    }

    #[test]
    fn only_revolut_grosses_up_dividends() {
        assert_eq!(Broker::Revolut.withholding(), dec!(0.15));
        assert_eq!(Broker::Etoro.withholding(), Decimal::ZERO);
        assert_eq!(Broker::Normalized.withholding(), Decimal::ZERO);
    }
}

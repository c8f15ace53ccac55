//! eToro closed positions export
//!
//! Each closed position becomes the BUY that opened it and the SELL that closed it.

use super::{parse_amount, DecimalMark, IntoTrades};
use crate::tax::round_money;
use crate::trade::{normalize_ticker, Trade, TradeError, TradeType};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Deserialize;

const DATE_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

#[derive(Debug, Clone, Deserialize)]
pub struct Record {
    #[serde(rename = "Action")]
    action: String,
    #[serde(rename = "Units")]
    units: String,
    #[serde(rename = "Open Rate")]
    open_rate: String,
    #[serde(rename = "Close Rate")]
    close_rate: String,
    #[serde(rename = "Open Date")]
    open_date: String,
    #[serde(rename = "Close Date")]
    close_date: String,
}

fn parse_date(value: &str) -> Result<NaiveDateTime, TradeError> {
    NaiveDateTime::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| TradeError::InvalidDatetime(value.to_string()))
}

impl IntoTrades for Record {
    fn into_trades(self) -> Result<Vec<Trade>, TradeError> {
        let Some(ticker) = self.action.trim().strip_prefix("Buy ") else {
            log::warn!(
                "Skipping eToro position '{}' opened {}: only long positions are supported",
                self.action,
                self.open_date
            );
            return Ok(Vec::new());
        };
        let ticker = normalize_ticker(ticker);
        let units = parse_amount("Units", &self.units, DecimalMark::Comma)?;
        let open_rate = parse_amount("Open Rate", &self.open_rate, DecimalMark::Comma)?;
        let close_rate = parse_amount("Close Rate", &self.close_rate, DecimalMark::Comma)?;
        let opened = parse_date(&self.open_date)?;
        let closed = parse_date(&self.close_date)?;

        let leg = |trade_type: TradeType, datetime: NaiveDateTime, rate: Decimal| {
            Trade::new(
                ticker.clone(),
                trade_type,
                datetime,
                units,
                round_money(units * rate),
            )
            .with_unit_price(rate)
        };
        Ok(vec![
            leg(TradeType::Buy, opened, open_rate),
            leg(TradeType::Sell, closed, close_rate),
        ])
    }
}

//! Revolut trading account statement
//!
//! Date,Ticker,Type,Quantity,Price per share,Total Amount,Currency,FX Rate
//! 2021-01-05T14:30:12.123Z,AAPL,BUY - MARKET,10,$130.00,"$1,300.00",USD,3.73

use super::{parse_amount, parse_optional_amount, DecimalMark, IntoTrades};
use crate::trade::{normalize_ticker, parse_datetime, Trade, TradeError, TradeType};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Record {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Ticker", default)]
    ticker: String,
    #[serde(rename = "Type")]
    record_type: String,
    #[serde(rename = "Quantity", default)]
    quantity: String,
    #[serde(rename = "Price per share", default)]
    price_per_share: String,
    #[serde(rename = "Total Amount")]
    total_amount: String,
}

fn trade_type(record_type: &str) -> Option<TradeType> {
    let record_type = record_type.trim().to_uppercase();
    // order kind suffix: "BUY - MARKET", "SELL - LIMIT", ...
    let kind = record_type.split(" - ").next().unwrap_or_default();
    match kind {
        "BUY" => Some(TradeType::Buy),
        "SELL" => Some(TradeType::Sell),
        "CUSTODY FEE" => Some(TradeType::Fee),
        "DIVIDEND" => Some(TradeType::Dividend),
        "CASH TOP-UP" => Some(TradeType::CashIn),
        "CASH WITHDRAWAL" => Some(TradeType::CashOut),
        "STOCK SPLIT" => Some(TradeType::StockSplit),
        _ => None,
    }
}

impl IntoTrades for Record {
    fn into_trades(self) -> Result<Vec<Trade>, TradeError> {
        let Some(trade_type) = trade_type(&self.record_type) else {
            log::warn!(
                "Skipping Revolut row of unknown type '{}' on {}",
                self.record_type,
                self.date
            );
            return Ok(Vec::new());
        };

        let datetime = parse_datetime(&self.date)?;
        let quantity = parse_optional_amount("Quantity", &self.quantity, DecimalMark::Point)?.unwrap_or_default();
        if quantity < Decimal::ZERO && trade_type != TradeType::StockSplit {
            return Err(TradeError::NegativeQuantity {
                ticker: self.ticker,
                date: datetime.date(),
                quantity,
            });
        }
        let amount = parse_amount("Total Amount", &self.total_amount, DecimalMark::Point)?;

        let mut trade = Trade::new(
            normalize_ticker(&self.ticker),
            trade_type,
            datetime,
            quantity,
            amount,
        );
        if let Some(price) = parse_optional_amount(
            "Price per share",
            &self.price_per_share,
            DecimalMark::Point,
        )? {
            trade = trade.with_unit_price(price);
        }
        Ok(vec![trade])
    }
}

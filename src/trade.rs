use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::io::Read;
use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TradeError {
    #[error("invalid datetime: {0}")]
    InvalidDatetime(String),
    #[error("unknown trade type: {0}")]
    UnknownType(String),
    #[error("invalid number '{value}' in column {column}")]
    InvalidNumber { column: String, value: String },
    #[error("negative quantity {quantity} for {ticker} on {date}")]
    NegativeQuantity {
        ticker: String,
        date: NaiveDate,
        quantity: Decimal,
    },
}

/// Kind of ledger entry, after broker-specific names have been mapped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeType {
    Buy,
    Sell,
    Dividend,
    Fee,
    StockSplit,
    CashIn,
    CashOut,
}

impl TradeType {
    /// Entries that change the open quantity of an instrument
    pub fn is_position(self) -> bool {
        matches!(self, TradeType::Buy | TradeType::Sell | TradeType::StockSplit)
    }

    pub fn is_cash(self) -> bool {
        matches!(self, TradeType::CashIn | TradeType::CashOut)
    }

    pub fn display(self) -> &'static str {
        match self {
            TradeType::Buy => "BUY",
            TradeType::Sell => "SELL",
            TradeType::Dividend => "DIVIDEND",
            TradeType::Fee => "FEE",
            TradeType::StockSplit => "STOCK_SPLIT",
            TradeType::CashIn => "CASH_IN",
            TradeType::CashOut => "CASH_OUT",
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl FromStr for TradeType {
    type Err = TradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "BUY" => Ok(TradeType::Buy),
            "SELL" => Ok(TradeType::Sell),
            "DIVIDEND" => Ok(TradeType::Dividend),
            "FEE" => Ok(TradeType::Fee),
            "STOCK_SPLIT" => Ok(TradeType::StockSplit),
            "CASH_IN" => Ok(TradeType::CashIn),
            "CASH_OUT" => Ok(TradeType::CashOut),
            _ => Err(TradeError::UnknownType(s.to_string())),
        }
    }
}

/// Exchange rate and reporting-currency amount attached to a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Valuation {
    #[schemars(with = "f64")]
    pub fx_rate: Decimal,
    #[schemars(with = "f64")]
    pub amount_pln: Decimal,
}

/// Input root for trade JSON
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TradeInput {
    pub trades: Vec<Trade>,
}

/// A single ledger entry in the source currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Trade {
    /// Instrument identifier (e.g. "AAPL")
    pub ticker: String,
    #[serde(rename = "type")]
    pub trade_type: TradeType,
    /// When the trade happened (YYYY-MM-DD or YYYY-MM-DDThh:mm:ss)
    #[serde(rename = "date", deserialize_with = "deserialize_datetime")]
    #[schemars(with = "String")]
    pub datetime: NaiveDateTime,
    #[schemars(with = "f64")]
    pub quantity: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<f64>")]
    pub unit_price: Option<Decimal>,
    /// Total amount in the source currency
    #[schemars(with = "f64")]
    pub amount: Decimal,
    /// Filled once by the valuation step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valuation: Option<Valuation>,
}

impl Trade {
    pub fn new(
        ticker: impl Into<String>,
        trade_type: TradeType,
        datetime: NaiveDateTime,
        quantity: Decimal,
        amount: Decimal,
    ) -> Self {
        Trade {
            ticker: ticker.into(),
            trade_type,
            datetime,
            quantity,
            unit_price: None,
            amount,
            valuation: None,
        }
    }

    pub fn with_unit_price(mut self, unit_price: Decimal) -> Self {
        self.unit_price = Some(unit_price);
        self
    }

    /// Day used for rate lookups and reporting
    pub fn date(&self) -> NaiveDate {
        self.datetime.date()
    }

    pub fn amount_pln(&self) -> Option<Decimal> {
        self.valuation.map(|v| v.amount_pln)
    }

    /// Split this lot into a part holding `quantity` units and the remainder.
    ///
    /// Source and reporting amounts are scaled by the quantity ratio; the remainder is
    /// computed by subtraction so both parts always add back up to the original.
    pub fn split_off(&self, quantity: Decimal) -> (Trade, Trade) {
        let ratio = if self.quantity.is_zero() {
            Decimal::ZERO
        } else {
            quantity / self.quantity
        };

        let mut completed = self.clone();
        completed.quantity = quantity;
        completed.amount = self.amount * ratio;
        completed.valuation = self.valuation.map(|v| Valuation {
            fx_rate: v.fx_rate,
            amount_pln: v.amount_pln * ratio,
        });

        let mut leftover = self.clone();
        leftover.quantity = self.quantity - quantity;
        leftover.amount = self.amount - completed.amount;
        leftover.valuation = self
            .valuation
            .zip(completed.valuation)
            .map(|(whole, part)| Valuation {
                fx_rate: whole.fx_rate,
                amount_pln: whole.amount_pln - part.amount_pln,
            });

        (completed, leftover)
    }
}

/// CSV record for the normalized trade ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub ticker: String,
    #[serde(rename = "type")]
    pub trade_type: String,
    pub date: String,
    pub quantity: Decimal,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    pub amount: Decimal,
}

impl TryFrom<TradeRecord> for Trade {
    type Error = TradeError;

    fn try_from(record: TradeRecord) -> Result<Self, Self::Error> {
        let datetime = parse_datetime(&record.date)?;
        let trade_type = record.trade_type.parse()?;
        if record.quantity < Decimal::ZERO {
            return Err(TradeError::NegativeQuantity {
                ticker: record.ticker,
                date: datetime.date(),
                quantity: record.quantity,
            });
        }
        Ok(Trade {
            ticker: normalize_ticker(&record.ticker),
            trade_type,
            datetime,
            quantity: record.quantity,
            unit_price: record.unit_price,
            amount: record.amount,
            valuation: None,
        })
    }
}

/// Read the normalized trade ledger from CSV
pub fn read_trades_csv<R: Read>(reader: R) -> anyhow::Result<Vec<Trade>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut trades = Vec::new();
    for record in rdr.deserialize::<TradeRecord>() {
        trades.push(Trade::try_from(record?)?);
    }
    sort_trades(&mut trades);
    Ok(trades)
}

/// Read the normalized trade ledger from JSON
pub fn read_trades_json<R: Read>(reader: R) -> anyhow::Result<Vec<Trade>> {
    let input: TradeInput = serde_json::from_reader(reader)?;
    let mut trades = input.trades;
    for trade in trades.iter_mut() {
        trade.ticker = normalize_ticker(&trade.ticker);
    }
    sort_trades(&mut trades);
    Ok(trades)
}

/// Sort ascending by datetime. The sort is stable, so entries sharing a timestamp keep
/// their input order.
pub fn sort_trades(trades: &mut [Trade]) {
    trades.sort_by_key(|t| t.datetime);
}

pub fn normalize_ticker(s: &str) -> String {
    s.trim().to_uppercase()
}

pub fn parse_datetime(s: &str) -> Result<NaiveDateTime, TradeError> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(dt);
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(chrono::NaiveTime::MIN));
    }
    Err(TradeError::InvalidDatetime(s.to_string()))
}

fn deserialize_datetime<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    parse_datetime(&s).map_err(|err| serde::de::Error::custom(err.to_string()))
}

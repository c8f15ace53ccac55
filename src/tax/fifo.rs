use crate::trade::{Trade, TradeType};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::io::Read;

/// Decimal places used when comparing quantities
pub const QUANTITY_DP: u32 = 8;

/// Unmatched BUY fragments per ticker, oldest first
pub type OpenLots = BTreeMap<String, Vec<Trade>>;

/// Completed deals per ticker, in closing order
pub type Deals = BTreeMap<String, Vec<Deal>>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MatchError {
    #[error(
        "SELL with no corresponding BUY: {date} {ticker} sells {quantity} but only {open} open \
         (missing earlier trades or open lots from the previous year?)"
    )]
    InsufficientOpenQuantity {
        ticker: String,
        date: NaiveDate,
        quantity: Decimal,
        open: Decimal,
    },
}

/// A realized round trip: the opening lots followed by the trade that closed them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Deal {
    trades: Vec<Trade>,
}

impl Deal {
    fn new(trades: Vec<Trade>) -> Self {
        Deal { trades }
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// BUY fragments consumed by this deal
    pub fn opening(&self) -> impl Iterator<Item = &Trade> {
        self.trades
            .iter()
            .filter(|t| t.trade_type == TradeType::Buy)
    }

    /// The closing side of the deal
    pub fn closing(&self) -> impl Iterator<Item = &Trade> {
        self.trades
            .iter()
            .filter(|t| t.trade_type != TradeType::Buy)
    }
}

/// FIFO queue of open lots for one instrument
#[derive(Debug, Clone)]
pub struct Position {
    ticker: String,
    queue: VecDeque<Trade>,
    open_quantity: Decimal,
    deals: Vec<Deal>,
}

impl Position {
    pub fn new(ticker: String) -> Self {
        Position {
            ticker,
            queue: VecDeque::new(),
            open_quantity: Decimal::ZERO,
            deals: Vec::new(),
        }
    }

    /// Put lots carried over from a previous period ahead of everything queued,
    /// keeping their order so the oldest closes first.
    pub fn seed(&mut self, lots: Vec<Trade>) {
        for lot in lots.into_iter().rev() {
            self.open_quantity += lot.quantity;
            self.queue.push_front(lot);
        }
        log::debug!(
            "{} seeded: open={} lots={}",
            self.ticker,
            self.open_quantity,
            self.queue.len()
        );
    }

    pub fn apply(&mut self, trade: Trade) -> Result<(), MatchError> {
        match trade.trade_type {
            TradeType::Buy => {
                self.open_quantity += trade.quantity;
                log::debug!(
                    "{} BUY {} on {}: open={}",
                    self.ticker,
                    trade.quantity,
                    trade.date(),
                    self.open_quantity
                );
                self.queue.push_back(trade);
                Ok(())
            }
            // The split ratio is already applied upstream, the row carries the new shares
            TradeType::StockSplit => {
                self.open_quantity += trade.quantity;
                log::debug!(
                    "{} SPLIT +{} on {}: open={}",
                    self.ticker,
                    trade.quantity,
                    trade.date(),
                    self.open_quantity
                );
                Ok(())
            }
            TradeType::Sell => self.sell(trade),
            other => {
                log::trace!("{} ignoring {} on {}", self.ticker, other, trade.date());
                Ok(())
            }
        }
    }

    fn sell(&mut self, trade: Trade) -> Result<(), MatchError> {
        let quantity = round_quantity(trade.quantity);
        let open = round_quantity(self.open_quantity);
        if quantity > open {
            return Err(MatchError::InsufficientOpenQuantity {
                ticker: self.ticker.clone(),
                date: trade.date(),
                quantity: trade.quantity,
                open: self.open_quantity,
            });
        }

        let mut deal = Vec::new();
        if quantity == open {
            deal.extend(self.queue.drain(..));
            self.open_quantity = Decimal::ZERO;
        } else {
            let mut matched = Decimal::ZERO;
            while round_quantity(matched) < quantity {
                let Some(lot) = self.queue.pop_front() else {
                    log::warn!(
                        "{} open lots exhausted after {} of {} on {} (split shares have no lot)",
                        self.ticker,
                        matched,
                        trade.quantity,
                        trade.date()
                    );
                    break;
                };
                matched += lot.quantity;
                deal.push(lot);
            }

            let overshoot = round_quantity(matched - trade.quantity);
            if overshoot > Decimal::ZERO {
                if let Some(last) = deal.pop() {
                    let (completed, leftover) = last.split_off(last.quantity - overshoot);
                    log::debug!(
                        "{} split lot from {}: {} closed, {} left open",
                        self.ticker,
                        last.date(),
                        completed.quantity,
                        leftover.quantity
                    );
                    deal.push(completed);
                    self.queue.push_front(leftover);
                }
            }
            self.open_quantity -= trade.quantity;
        }

        log::debug!(
            "{} SELL {} on {}: deal of {} lots, open={}",
            self.ticker,
            trade.quantity,
            trade.date(),
            deal.len(),
            self.open_quantity
        );
        deal.push(trade);
        self.deals.push(Deal::new(deal));
        Ok(())
    }

    /// Shares held but not backed by any queued lot, e.g. split shares left after the
    /// queue ran dry. They are not carried into the open lots.
    pub fn untracked_quantity(&self) -> Decimal {
        let queued: Decimal = self.queue.iter().map(|lot| lot.quantity).sum();
        round_quantity(self.open_quantity - queued)
    }

    pub fn into_parts(self) -> (Vec<Deal>, Vec<Trade>) {
        (self.deals, self.queue.into_iter().collect())
    }
}

/// Result of matching a period's trades
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchResult {
    pub deals: Deals,
    pub open_lots: OpenLots,
}

/// Match closing trades against open lots first-in-first-out, per ticker.
///
/// `trades` must be in chronological order. Lots in `seed` (the previous period's
/// leftovers) close before any lot bought in this period. Tickers with no deals or no
/// remaining lots are left out of the respective map.
pub fn match_deals<I>(trades: I, seed: OpenLots) -> Result<MatchResult, MatchError>
where
    I: IntoIterator<Item = Trade>,
{
    let mut positions: BTreeMap<String, Position> = BTreeMap::new();
    for (ticker, lots) in seed {
        positions
            .entry(ticker.clone())
            .or_insert_with(|| Position::new(ticker))
            .seed(lots);
    }

    for trade in trades {
        if !trade.trade_type.is_position() {
            continue;
        }
        positions
            .entry(trade.ticker.clone())
            .or_insert_with(|| Position::new(trade.ticker.clone()))
            .apply(trade)?;
    }

    let mut result = MatchResult::default();
    for (ticker, position) in positions {
        let untracked = position.untracked_quantity();
        if !untracked.is_zero() {
            log::warn!(
                "{} holds {} shares with no open lot, they will not carry into the next period",
                ticker,
                untracked
            );
        }
        let (deals, lots) = position.into_parts();
        if !deals.is_empty() {
            result.deals.insert(ticker.clone(), deals);
        }
        if !lots.is_empty() {
            result.open_lots.insert(ticker, lots);
        }
    }
    Ok(result)
}

/// Read open lots written by a previous run
pub fn read_open_lots<R: Read>(reader: R) -> anyhow::Result<OpenLots> {
    let lots: OpenLots = serde_json::from_reader(reader)?;
    Ok(lots
        .into_iter()
        .map(|(ticker, lots)| (crate::trade::normalize_ticker(&ticker), lots))
        .collect())
}

fn round_quantity(quantity: Decimal) -> Decimal {
    quantity.round_dp(QUANTITY_DP)
}

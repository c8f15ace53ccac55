use super::fifo::{Deal, Deals};
use super::policy::{round_money, TaxPolicy};
use crate::trade::{Trade, TradeType};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::ops::{Add, AddAssign};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("{trade_type} {ticker} on {date} has no exchange rate applied")]
    UnvaluedTrade {
        ticker: String,
        trade_type: TradeType,
        date: NaiveDate,
    },
}

fn amount_pln(trade: &Trade) -> Result<Decimal, ReportError> {
    trade.amount_pln().ok_or_else(|| ReportError::UnvaluedTrade {
        ticker: trade.ticker.clone(),
        trade_type: trade.trade_type,
        date: trade.date(),
    })
}

/// Cost and proceeds of one or more deals, in the reporting currency
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub expense: Decimal,
    pub income: Decimal,
}

impl Balance {
    pub fn of_deal(deal: &Deal) -> Result<Self, ReportError> {
        deal.trades()
            .iter()
            .try_fold(Balance::default(), |mut balance, trade| {
                let amount = amount_pln(trade)?;
                if trade.trade_type == TradeType::Buy {
                    balance.expense += amount;
                } else {
                    balance.income += amount;
                }
                Ok(balance)
            })
    }

    pub fn profit(&self) -> Decimal {
        self.income - self.expense
    }
}

impl Add for Balance {
    type Output = Balance;

    fn add(self, rhs: Balance) -> Balance {
        Balance {
            expense: self.expense + rhs.expense,
            income: self.income + rhs.income,
        }
    }
}

impl AddAssign for Balance {
    fn add_assign(&mut self, rhs: Balance) {
        *self = *self + rhs;
    }
}

/// Per-ticker balance of all deals closed in the period
pub fn ticker_balances(deals: &Deals) -> Result<BTreeMap<String, Balance>, ReportError> {
    deals
        .iter()
        .map(|(ticker, deals)| -> Result<_, ReportError> {
            let balance = deals
                .iter()
                .map(Balance::of_deal)
                .try_fold(Balance::default(), |acc, b| b.map(|b| acc + b))?;
            Ok((ticker.clone(), balance))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeSummary {
    pub expense: Decimal,
    pub income: Decimal,
    pub profit: Decimal,
    pub tax: Decimal,
}

impl TradeSummary {
    pub fn new(balance: Balance, policy: &TaxPolicy) -> Self {
        let expense = round_money(balance.expense);
        let income = round_money(balance.income);
        let profit = income - expense;
        TradeSummary {
            expense,
            income,
            profit,
            tax: policy.tax_on(profit),
        }
    }

    pub fn from_deals(deals: &Deals, policy: &TaxPolicy) -> Result<Self, ReportError> {
        let balance = ticker_balances(deals)?
            .into_values()
            .fold(Balance::default(), Add::add);
        Ok(TradeSummary::new(balance, policy))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DividendSummary {
    /// Gross dividend income
    pub income: Decimal,
    /// Tax due on the gross income
    pub tax_overall: Decimal,
    /// Tax already withheld at source
    pub tax_paid: Decimal,
    /// Tax left to pay
    pub tax: Decimal,
}

impl DividendSummary {
    /// Gross up dividends received net of a flat withholding rate
    pub fn from_net(net: Decimal, withholding_rate: Decimal, policy: &TaxPolicy) -> Self {
        let income = round_money(net / (Decimal::ONE - withholding_rate));
        let tax_overall = round_money(income * policy.rate);
        let tax_paid = round_money(income - net);
        DividendSummary {
            income,
            tax_overall,
            tax_paid,
            tax: round_money(tax_overall - tax_paid),
        }
    }
}

/// How a broker reports dividends
pub trait DividendPolicy {
    fn dividends(&self, trades: &[Trade], policy: &TaxPolicy)
        -> Result<DividendSummary, ReportError>;
}

/// Dividends booked net of a flat withholding tax taken at source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetOfWithholding {
    pub rate: Decimal,
}

impl DividendPolicy for NetOfWithholding {
    fn dividends(
        &self,
        trades: &[Trade],
        policy: &TaxPolicy,
    ) -> Result<DividendSummary, ReportError> {
        let net = trades
            .iter()
            .filter(|t| t.trade_type == TradeType::Dividend)
            .map(amount_pln)
            .sum::<Result<Decimal, _>>()?;
        if net.is_zero() {
            return Ok(DividendSummary::default());
        }
        Ok(DividendSummary::from_net(net, self.rate, policy))
    }
}

/// Absolute total of fees charged in the period
pub fn fee_total(trades: &[Trade]) -> Result<Decimal, ReportError> {
    let fees = trades
        .iter()
        .filter(|t| t.trade_type == TradeType::Fee)
        .map(amount_pln)
        .sum::<Result<Decimal, _>>()?;
    Ok(round_money(fees).abs())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalSummary {
    pub expense: Decimal,
    pub income: Decimal,
    pub profit: Decimal,
    pub tax: Decimal,
}

/// PIT-38 figures for one period
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub fees: Decimal,
    pub dividends: DividendSummary,
    pub trades: TradeSummary,
    pub total: TotalSummary,
}

impl Report {
    pub fn new(
        trades: TradeSummary,
        dividends: DividendSummary,
        fees: Decimal,
        policy: &TaxPolicy,
    ) -> Self {
        let total = TotalSummary {
            expense: trades.expense + fees,
            income: trades.income,
            profit: trades.profit + dividends.income - dividends.tax_paid,
            tax: policy.floor(dividends.tax + trades.tax),
        };
        Report {
            fees,
            dividends,
            trades,
            total,
        }
    }

    pub fn from_deals(
        deals: &Deals,
        dividends: DividendSummary,
        fees: Decimal,
        policy: &TaxPolicy,
    ) -> Result<Self, ReportError> {
        let trades = TradeSummary::from_deals(deals, policy)?;
        Ok(Report::new(trades, dividends, fees, policy))
    }

    /// Merge with a report for another account in the same period.
    ///
    /// Tax is recomputed on the summed figures, so a loss in one report offsets gains
    /// in the other.
    pub fn combine(&self, other: &Report, policy: &TaxPolicy) -> Report {
        let trades = TradeSummary::new(
            Balance {
                expense: self.trades.expense + other.trades.expense,
                income: self.trades.income + other.trades.income,
            },
            policy,
        );
        let dividends = DividendSummary {
            income: self.dividends.income + other.dividends.income,
            tax_overall: self.dividends.tax_overall + other.dividends.tax_overall,
            tax_paid: self.dividends.tax_paid + other.dividends.tax_paid,
            tax: self.dividends.tax + other.dividends.tax,
        };
        Report::new(trades, dividends, self.fees + other.fees, policy)
    }
}

pub fn read_report<R: Read>(reader: R) -> anyhow::Result<Report> {
    let report = serde_json::from_reader(reader)?;
    Ok(report)
}

//! Table rendering shared by the commands

use crate::tax::{Balance, Deals, OpenLots, Report};
use crate::trade::Trade;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Debug, Clone, Tabled)]
struct ReportRow {
    #[tabled(rename = "Section")]
    section: &'static str,
    #[tabled(rename = "Expense")]
    expense: String,
    #[tabled(rename = "Income")]
    income: String,
    #[tabled(rename = "Profit")]
    profit: String,
    #[tabled(rename = "Tax")]
    tax: String,
}

#[derive(Debug, Clone, Tabled)]
struct BalanceRow {
    #[tabled(rename = "Ticker")]
    ticker: String,
    #[tabled(rename = "Expense")]
    expense: String,
    #[tabled(rename = "Income")]
    income: String,
    #[tabled(rename = "Profit")]
    profit: String,
}

#[derive(Debug, Clone, Tabled)]
struct TradeRow {
    #[tabled(rename = "#")]
    deal: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Ticker")]
    ticker: String,
    #[tabled(rename = "Type")]
    trade_type: String,
    #[tabled(rename = "Quantity")]
    quantity: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Rate")]
    fx_rate: String,
    #[tabled(rename = "Amount (PLN)")]
    amount_pln: String,
}

#[derive(Debug, Clone, Tabled)]
struct PositionRow {
    #[tabled(rename = "Ticker")]
    ticker: String,
    #[tabled(rename = "Lots")]
    lots: usize,
    #[tabled(rename = "Quantity")]
    quantity: String,
    #[tabled(rename = "Cost (PLN)")]
    cost_pln: String,
    #[tabled(rename = "Oldest")]
    oldest: String,
}

fn render<T: Tabled>(rows: Vec<T>) -> String {
    Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string()
}

pub fn print_report(report: &Report) {
    let rows = vec![
        ReportRow {
            section: "Trades",
            expense: format_pln(report.trades.expense),
            income: format_pln(report.trades.income),
            profit: format_pln(report.trades.profit),
            tax: format_pln(report.trades.tax),
        },
        ReportRow {
            section: "Total",
            expense: format_pln(report.total.expense),
            income: format_pln(report.total.income),
            profit: format_pln(report.total.profit),
            tax: format_pln(report.total.tax),
        },
    ];

    println!();
    println!("PIT-38 SUMMARY");
    println!();
    println!("{}", render(rows));
    println!();
    println!("Fees:                    {:>14}", format_pln(report.fees));
    println!("Dividends (gross):       {:>14}", format_pln(report.dividends.income));
    println!("Dividend tax due:        {:>14}", format_pln(report.dividends.tax_overall));
    println!("Dividend tax withheld:   {:>14}", format_pln(report.dividends.tax_paid));
    println!("Dividend tax to pay:     {:>14}", format_pln(report.dividends.tax));
    println!();
    println!("TAX TO PAY:              {:>14}", format_pln(report.total.tax));
}

pub fn print_balances(balances: &BTreeMap<String, Balance>) {
    if balances.is_empty() {
        println!("No deals closed");
        return;
    }
    let rows: Vec<BalanceRow> = balances
        .iter()
        .map(|(ticker, balance)| BalanceRow {
            ticker: ticker.clone(),
            expense: format_pln(balance.expense),
            income: format_pln(balance.income),
            profit: format_pln(balance.profit()),
        })
        .collect();

    println!();
    println!("CLOSED DEALS BY TICKER");
    println!();
    println!("{}", render(rows));
}

pub fn print_deals(deals: &Deals) {
    let rows: Vec<TradeRow> = deals
        .values()
        .flat_map(|deals| deals.iter().enumerate())
        .flat_map(|(i, deal)| {
            deal.opening()
                .chain(deal.closing())
                .map(move |trade| trade_row(format!("{}", i + 1), trade))
        })
        .collect();
    if rows.is_empty() {
        return;
    }

    println!();
    println!("DEALS");
    println!();
    println!("{}", render(rows));
}

pub fn print_open_lots(open_lots: &OpenLots) {
    if open_lots.is_empty() {
        println!("No open positions");
        return;
    }
    let rows: Vec<PositionRow> = open_lots
        .iter()
        .map(|(ticker, lots)| PositionRow {
            ticker: ticker.clone(),
            lots: lots.len(),
            quantity: format_quantity(lots.iter().map(|t| t.quantity).sum()),
            cost_pln: lots
                .iter()
                .map(Trade::amount_pln)
                .sum::<Option<Decimal>>()
                .map_or_else(|| "-".to_string(), format_pln),
            oldest: lots
                .first()
                .map_or_else(String::new, |t| t.date().to_string()),
        })
        .collect();

    println!();
    println!("OPEN POSITIONS");
    println!();
    println!("{}", render(rows));
}

fn trade_row(deal: String, trade: &Trade) -> TradeRow {
    TradeRow {
        deal,
        date: trade.date().to_string(),
        ticker: trade.ticker.clone(),
        trade_type: trade.trade_type.to_string(),
        quantity: format_quantity(trade.quantity),
        amount: format!("{:.2}", trade.amount),
        fx_rate: trade
            .valuation
            .map_or_else(|| "-".to_string(), |v| v.fx_rate.to_string()),
        amount_pln: trade
            .amount_pln()
            .map_or_else(|| "-".to_string(), format_pln),
    }
}

fn format_pln(amount: Decimal) -> String {
    format!("{:.2} zł", amount)
}

fn format_quantity(qty: Decimal) -> String {
    let s = format!("{:.8}", qty);
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn quantities_drop_trailing_zeros() {
        assert_eq!(format_quantity(dec!(3.50000000)), "3.5");
        assert_eq!(format_quantity(dec!(10)), "10");
        assert_eq!(format_quantity(dec!(0.12345678)), "0.12345678");
    }

    #[test]
    fn money_has_two_places() {
        assert_eq!(format_pln(dec!(38)), "38.00 zł");
        assert_eq!(format_pln(dec!(-1.5)), "-1.50 zł");
    }
}

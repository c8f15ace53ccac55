//! Validate command - check a statement can be matched before fetching any rates

use super::{display, read_open_lots, read_trades};
use crate::brokers::Broker;
use crate::tax::{match_deals, MatchError, OpenLots};
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ValidateCommand {
    /// Broker the statement was exported from
    #[arg(short, long, value_enum, default_value_t = Broker::Normalized)]
    broker: Broker,

    /// Trade statement. Reads from stdin with "-".
    #[arg(short, long, default_value = "-")]
    trades: PathBuf,

    /// Open lots left over from the previous year
    #[arg(short, long)]
    leftover: Option<PathBuf>,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct OpenPosition {
    ticker: String,
    lots: usize,
    quantity: Decimal,
}

/// JSON output structure
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidationOutput {
    valid: bool,
    trade_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    open_positions: Vec<OpenPosition>,
}

impl ValidateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let trades = read_trades(&self.trades, self.broker)?;
        let seed = read_open_lots(self.leftover.as_deref())?;
        let trade_count = trades.len();

        let (open_lots, error) = match match_deals(trades, seed) {
            Ok(matched) => (matched.open_lots, None),
            Err(err) => (OpenLots::new(), Some(err)),
        };

        if self.json {
            self.print_json(trade_count, &open_lots, error.as_ref())?;
        } else {
            self.print_text(trade_count, &open_lots, error.as_ref());
        }

        if error.is_some() {
            std::process::exit(1);
        }
        Ok(())
    }

    fn print_text(&self, trade_count: usize, open_lots: &OpenLots, error: Option<&MatchError>) {
        println!();
        println!("VALIDATION RESULTS ({} trades)", trade_count);
        println!();

        match error {
            Some(err) => println!("\u{26A0} {}", err),
            None => {
                println!("\u{2713} Every SELL is covered by open lots.");
                display::print_open_lots(open_lots);
            }
        }
    }

    fn print_json(
        &self,
        trade_count: usize,
        open_lots: &OpenLots,
        error: Option<&MatchError>,
    ) -> anyhow::Result<()> {
        let output = ValidationOutput {
            valid: error.is_none(),
            trade_count,
            error: error.map(ToString::to_string),
            open_positions: open_lots
                .iter()
                .map(|(ticker, lots)| OpenPosition {
                    ticker: ticker.clone(),
                    lots: lots.len(),
                    quantity: lots.iter().map(|t| t.quantity).sum(),
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}

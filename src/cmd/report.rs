//! Report command - the full PIT-38 calculation for one broker statement

use super::{display, read_open_lots, read_rates, read_trades, write_json, RateArgs, TaxArgs};
use crate::brokers::Broker;
use crate::fx::FxRateTable;
use crate::tax::{evaluate, TaxPolicy};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ReportCommand {
    /// Broker the statement was exported from
    #[arg(short, long, value_enum, default_value_t = Broker::Normalized)]
    broker: Broker,

    /// Trade statement (CSV, or JSON for the normalized format). Reads from stdin with "-".
    #[arg(short, long, default_value = "-")]
    trades: PathBuf,

    /// Open lots left over from the previous year (open_trades.json of that run)
    #[arg(short, long)]
    leftover: Option<PathBuf>,

    /// Use a saved rate table (fx_rates.json) instead of querying NBP
    #[arg(long)]
    rates: Option<PathBuf>,

    /// Directory to write fx_rates.json, deals.json, open_trades.json and result.json to
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output the report as JSON instead of formatted tables
    #[arg(long)]
    json: bool,

    /// Print every matched deal
    #[arg(long)]
    show_deals: bool,

    #[command(flatten)]
    rate: RateArgs,

    #[command(flatten)]
    tax: TaxArgs,
}

impl ReportCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let trades = read_trades(&self.trades, self.broker)?;
        let seed = read_open_lots(self.leftover.as_deref())?;
        let settings = self.rate.settings();
        let policy = TaxPolicy::from(&self.tax);

        let rates = match &self.rates {
            Some(path) => read_rates(path)?,
            None => FxRateTable::fetch_for_trades(&self.rate.source(), &trades, &settings)?,
        };
        log::info!("{} exchange rates available", rates.len());

        let evaluation = evaluate(trades, seed, &rates, &settings, &policy, &self.broker)?;

        if let Some(dir) = &self.output {
            write_json(dir, "fx_rates.json", &rates)?;
            write_json(dir, "deals.json", &evaluation.deals)?;
            write_json(dir, "open_trades.json", &evaluation.open_lots)?;
            write_json(dir, "result.json", &evaluation.report)?;
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&evaluation.report)?);
            return Ok(());
        }

        display::print_balances(&evaluation.balances);
        if self.show_deals {
            display::print_deals(&evaluation.deals);
        }
        display::print_open_lots(&evaluation.open_lots);
        display::print_report(&evaluation.report);
        Ok(())
    }
}

//! Rates command - fetch an NBP rate table for a date range

use super::RateArgs;
use crate::fx::FxRateTable;
use chrono::NaiveDate;
use clap::Args;

#[derive(Args, Debug)]
pub struct RatesCommand {
    /// First day of the range (YYYY-MM-DD)
    #[arg(long)]
    from: NaiveDate,

    /// Last day of the range, inclusive (YYYY-MM-DD)
    #[arg(long)]
    to: NaiveDate,

    #[command(flatten)]
    rate: RateArgs,
}

impl RatesCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        if self.from > self.to {
            anyhow::bail!("--from {} is after --to {}", self.from, self.to);
        }
        let settings = self.rate.settings();
        let rates = FxRateTable::fetch(
            &self.rate.source(),
            self.from,
            self.to,
            settings.max_window_days,
        )?;
        log::info!(
            "{} {} rates between {:?} and {:?}",
            rates.len(),
            settings.currency,
            rates.first_date(),
            rates.last_date()
        );
        println!("{}", serde_json::to_string_pretty(&rates)?);
        Ok(())
    }
}

pub mod combine;
pub mod display;
pub mod rates;
pub mod report;
pub mod schema;
pub mod validate;

use crate::brokers::Broker;
use crate::fx::{self, nbp, FxRateTable, NbpRateSource, RateError, RateSettings};
use crate::tax::{self, OpenLots, TaxPolicy, DEFAULT_TAX_RATE};
use crate::trade::{self, Trade};
use anyhow::Context;
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read};
use std::path::Path;

/// Read a broker statement from `path` (or stdin with "-").
///
/// A missing file is read as an empty statement.
pub fn read_trades(path: &Path, broker: Broker) -> anyhow::Result<Vec<Trade>> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let reader: Box<dyn Read> = if path.as_os_str() == "-" {
        Box::new(read_stdin()?)
    } else if !path.exists() {
        log::warn!("{} not found, no trades read", path.display());
        return Ok(Vec::new());
    } else {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        Box::new(BufReader::new(file))
    };

    let trades = if is_json && broker == Broker::Normalized {
        trade::read_trades_json(reader)
    } else {
        broker.read_csv(reader)
    };
    trades.with_context(|| format!("reading trades from {}", path.display()))
}

fn read_stdin() -> anyhow::Result<io::Cursor<Vec<u8>>> {
    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin.lock());
    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;

    if buffer.is_empty() {
        anyhow::bail!("No input received. Provide a file or pipe data to stdin.");
    }
    Ok(io::Cursor::new(buffer))
}

/// Read lots left open by a previous run, if a leftover file was given
pub fn read_open_lots(path: Option<&Path>) -> anyhow::Result<OpenLots> {
    let Some(path) = path else {
        return Ok(OpenLots::new());
    };
    if !path.exists() {
        log::warn!("{} not found, starting without open lots", path.display());
        return Ok(OpenLots::new());
    }
    let file = File::open(path)?;
    let lots = tax::read_open_lots(BufReader::new(file))
        .with_context(|| format!("reading open lots from {}", path.display()))?;
    log::info!(
        "{} open lots carried over from {}",
        lots.values().map(Vec::len).sum::<usize>(),
        path.display()
    );
    Ok(lots)
}

/// Read a rate table saved by an earlier run. An empty table is a failed fetch.
pub fn read_rates(path: &Path) -> anyhow::Result<FxRateTable> {
    let file =
        File::open(path).with_context(|| format!("opening rate table {}", path.display()))?;
    let rates = fx::read_rate_table(BufReader::new(file))
        .with_context(|| format!("reading rate table {}", path.display()))?;
    if rates.is_empty() {
        let reason = format!("rate table {} is empty", path.display());
        return Err(RateError::RateFetchFailed(reason).into());
    }
    Ok(rates)
}

/// Write `value` as pretty JSON to `dir/name`
pub fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> anyhow::Result<()> {
    fs::create_dir_all(dir)?;
    let path = dir.join(name);
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

#[derive(Args, Debug, Clone)]
pub struct RateArgs {
    /// Currency the trades are quoted in
    #[arg(long, default_value = "USD")]
    currency: String,

    /// Base URL of the NBP table A rates endpoint
    #[arg(long, default_value = nbp::DEFAULT_BASE_URL)]
    nbp_url: String,

    /// Days to search back from a trade date for a published rate
    #[arg(long, default_value_t = 30)]
    max_lookback_days: u32,
}

impl RateArgs {
    pub fn settings(&self) -> RateSettings {
        RateSettings {
            currency: self.currency.clone(),
            max_lookback_days: self.max_lookback_days,
            ..RateSettings::default()
        }
    }

    pub fn source(&self) -> NbpRateSource {
        NbpRateSource::new(&self.nbp_url, &self.currency)
    }
}

#[derive(Args, Debug, Clone)]
pub struct TaxArgs {
    /// Tax rate applied to profit and dividends
    #[arg(long, default_value_t = DEFAULT_TAX_RATE)]
    tax_rate: Decimal,

    /// Report a negative tax for a net loss instead of zero
    #[arg(long)]
    allow_negative_tax: bool,
}

impl From<&TaxArgs> for TaxPolicy {
    fn from(args: &TaxArgs) -> Self {
        TaxPolicy {
            rate: args.tax_rate,
            floor_losses: !args.allow_negative_tax,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_inputs_read_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.csv");
        assert!(read_trades(&missing, Broker::Normalized).unwrap().is_empty());
        assert!(read_open_lots(Some(&missing)).unwrap().is_empty());
        assert!(read_open_lots(None).unwrap().is_empty());
    }

    #[test]
    fn normalized_json_is_detected_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.JSON");
        let mut file = File::create(&path).unwrap();
        write!(
            file,
            r#"{{"trades": [{{"ticker": "AAPL", "type": "BUY", "date": "2021-01-05", "quantity": 1, "amount": 10}}]}}"#
        )
        .unwrap();

        let trades = read_trades(&path, Broker::Normalized).unwrap();
        assert_eq!(trades.len(), 1);
    }

    #[test]
    fn saved_rate_table_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fx_rates.json");
        fs::write(&path, r#"{"2021-01-04": "3.7584", "2021-01-05": "3.7332"}"#).unwrap();
        let rates = read_rates(&path).unwrap();
        assert_eq!(rates.len(), 2);
    }

    #[test]
    fn empty_saved_rate_table_is_a_failed_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fx_rates.json");
        fs::write(&path, "{}").unwrap();
        let err = read_rates(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RateError>(),
            Some(RateError::RateFetchFailed(_))
        ));
    }

    #[test]
    fn write_json_creates_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        write_json(&out, "value.json", &vec![1, 2]).unwrap();
        let written = fs::read_to_string(out.join("value.json")).unwrap();
        assert_eq!(serde_json::from_str::<Vec<i32>>(&written).unwrap(), vec![1, 2]);
    }
}

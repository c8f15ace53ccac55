//! Combine command - merge reports from several accounts for one year

use super::{display, TaxArgs};
use crate::tax::{read_report, Report, TaxPolicy};
use anyhow::Context;
use clap::Args;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct CombineCommand {
    /// result.json files written by `report --output`
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Output as JSON instead of formatted tables
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    tax: TaxArgs,
}

impl CombineCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let policy = TaxPolicy::from(&self.tax);
        // starting from an empty report recomputes tax under `policy` even for one file
        let mut report = Report::default();
        for path in &self.files {
            let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            let next = read_report(BufReader::new(file))
                .with_context(|| format!("reading report {}", path.display()))?;
            report = report.combine(&next, &policy);
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("Combined {} reports", self.files.len());
            display::print_report(&report);
        }
        Ok(())
    }
}

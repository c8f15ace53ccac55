mod brokers;
mod cmd;
mod fx;
mod tax;
mod trade;
mod valuation;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "pitc",
    version,
    author = "Andrew Jones <ascjones@gmail.com>",
    about = "Calculate Polish PIT-38 tax on capital gains and dividends"
)]
struct Opts {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Value, match and report a year of trades
    Report(cmd::report::ReportCommand),
    /// Check every SELL is covered by open lots, without fetching rates
    Validate(cmd::validate::ValidateCommand),
    /// Fetch NBP exchange rates for a date range
    Rates(cmd::rates::RatesCommand),
    /// Merge result.json reports from several brokers
    Combine(cmd::combine::CombineCommand),
    /// Print the normalized input format
    Schema(cmd::schema::SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let opts = Opts::parse();
    match opts.command {
        Command::Report(report) => report.exec(),
        Command::Validate(validate) => validate.exec(),
        Command::Rates(rates) => rates.exec(),
        Command::Combine(combine) => combine.exec(),
        Command::Schema(schema) => schema.exec(),
    }
}

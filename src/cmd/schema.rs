//! Schema command - print the normalized input format

use crate::trade::TradeInput;
use clap::Args;
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Output format: json-schema, csv-header or csv-fields
    #[arg(value_enum, default_value = "json-schema")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema for the normalized trade list
    JsonSchema,
    /// CSV header row with column names
    CsvHeader,
    /// CSV column descriptions
    CsvFields,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::JsonSchema => self.print_json_schema(),
            SchemaFormat::CsvHeader => self.print_csv_header(),
            SchemaFormat::CsvFields => self.print_csv_fields(),
        }
    }

    fn print_json_schema(&self) -> anyhow::Result<()> {
        let schema = schema_for!(TradeInput);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        Ok(())
    }

    fn print_csv_header(&self) -> anyhow::Result<()> {
        println!("{}", CSV_COLUMNS.join(","));
        Ok(())
    }

    fn print_csv_fields(&self) -> anyhow::Result<()> {
        println!("CSV Input Format");
        println!("================");
        println!();
        for (name, required, description) in CSV_FIELD_DESCRIPTIONS {
            let req = if *required { "required" } else { "optional" };
            println!("{:12} ({:8})  {}", name, req, description);
        }
        println!();
        println!("Amounts are in the statement currency; PLN values use the NBP mid rate");
        println!("published on the last business day before the trade.");
        Ok(())
    }
}

const CSV_COLUMNS: &[&str] = &["ticker", "type", "date", "quantity", "unit_price", "amount"];

const CSV_FIELD_DESCRIPTIONS: &[(&str, bool, &str)] = &[
    ("ticker", true, "Instrument identifier (e.g., AAPL)"),
    (
        "type",
        true,
        "BUY, SELL, DIVIDEND, FEE, STOCK_SPLIT, CASH_IN, CASH_OUT",
    ),
    (
        "date",
        true,
        "Trade date (YYYY-MM-DD or YYYY-MM-DDThh:mm:ss)",
    ),
    (
        "quantity",
        true,
        "Units traded; for STOCK_SPLIT the shares added by the split",
    ),
    ("unit_price", false, "Price per unit"),
    (
        "amount",
        true,
        "Total amount in the statement currency (fees negative)",
    ),
];

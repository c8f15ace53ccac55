//! E2E tests running the pitc binary against offline rate tables

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use std::str::FromStr;

fn pitc(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pitc"))
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn json_stdout(output: &Output) -> Value {
    assert!(output.status.success(), "Command failed: {:?}", output);
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        other => Decimal::from_str(&other.to_string()).unwrap(),
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

/// Flat 4.0 rate on every day of the given years
fn write_rates(path: &Path, years: &[i32]) {
    let mut rates = serde_json::Map::new();
    for year in years {
        let mut day = chrono::NaiveDate::from_ymd_opt(*year, 1, 1).unwrap();
        while chrono::Datelike::year(&day) == *year {
            rates.insert(day.to_string(), Value::String("4.0".to_string()));
            day = day.succ_opt().unwrap();
        }
    }
    fs::write(path, serde_json::to_string(&rates).unwrap()).unwrap();
}

#[test]
fn report_buy_and_sell_at_flat_rate() {
    let output = pitc(&[
        "report",
        "--trades",
        "tests/data/trades.csv",
        "--rates",
        "tests/data/rates.json",
        "--json",
    ]);
    let report = json_stdout(&output);

    assert_eq!(decimal(&report["trades"]["expense"]), dec!(400));
    assert_eq!(decimal(&report["trades"]["income"]), dec!(600));
    assert_eq!(decimal(&report["trades"]["profit"]), dec!(200));
    assert_eq!(decimal(&report["trades"]["tax"]), dec!(38));
    assert_eq!(decimal(&report["total"]["tax"]), dec!(38));
    assert_eq!(decimal(&report["fees"]), Decimal::ZERO);
}

#[test]
fn report_prints_tables() {
    let output = pitc(&[
        "report",
        "--trades",
        "tests/data/trades.csv",
        "--rates",
        "tests/data/rates.json",
        "--show-deals",
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("PIT-38 SUMMARY"));
    assert!(stdout.contains("DEALS"));
    assert!(stdout.contains("AAPL"));
    assert!(stdout.contains("38.00 zł"));
    assert!(stdout.contains("No open positions"));
}

#[test]
fn revolut_statement_with_fees_and_dividends() {
    let output = pitc(&[
        "report",
        "--broker",
        "revolut",
        "--trades",
        "tests/data/revolut.csv",
        "--rates",
        "tests/data/rates.json",
        "--json",
    ]);
    let report = json_stdout(&output);

    assert_eq!(decimal(&report["fees"]), dec!(4));
    assert_eq!(decimal(&report["dividends"]["income"]), dec!(40));
    assert_eq!(decimal(&report["dividends"]["taxOverall"]), dec!(7.6));
    assert_eq!(decimal(&report["dividends"]["taxPaid"]), dec!(6));
    assert_eq!(decimal(&report["dividends"]["tax"]), dec!(1.6));
    assert_eq!(decimal(&report["total"]["expense"]), dec!(404));
    assert_eq!(decimal(&report["total"]["income"]), dec!(600));
    assert_eq!(decimal(&report["total"]["profit"]), dec!(234));
    assert_eq!(decimal(&report["total"]["tax"]), dec!(39.6));
}

#[test]
fn leftover_lots_carry_into_next_year() {
    let dir = tempfile::tempdir().unwrap();
    let rates = dir.path().join("rates.json");
    write_rates(&rates, &[2020, 2021, 2022]);

    let first_trades = dir.path().join("2021.csv");
    fs::write(
        &first_trades,
        "ticker,type,date,quantity,unit_price,amount\n\
         AAPL,BUY,2021-01-05,10,10,100\n\
         AAPL,BUY,2021-06-01,10,20,200\n\
         AAPL,SELL,2021-09-01,4,30,120\n",
    )
    .unwrap();
    let first_out = dir.path().join("out-2021");
    let output = pitc(&[
        "report",
        "--trades",
        first_trades.to_str().unwrap(),
        "--rates",
        rates.to_str().unwrap(),
        "--output",
        first_out.to_str().unwrap(),
        "--json",
    ]);
    let first = json_stdout(&output);
    assert_eq!(decimal(&first["trades"]["expense"]), dec!(160));
    for name in ["fx_rates.json", "deals.json", "open_trades.json", "result.json"] {
        assert!(first_out.join(name).exists(), "{} not written", name);
    }
    assert_eq!(read_json(&first_out.join("result.json")), first);
    let open = read_json(&first_out.join("open_trades.json"));
    assert_eq!(open["AAPL"].as_array().unwrap().len(), 2);

    let second_trades = dir.path().join("2022.csv");
    fs::write(
        &second_trades,
        "ticker,type,date,quantity,unit_price,amount\n\
         AAPL,SELL,2022-02-01,8,25,200\n",
    )
    .unwrap();
    let output = pitc(&[
        "report",
        "--trades",
        second_trades.to_str().unwrap(),
        "--leftover",
        first_out.join("open_trades.json").to_str().unwrap(),
        "--rates",
        rates.to_str().unwrap(),
        "--json",
    ]);
    let second = json_stdout(&output);

    // 6 units left from the January lot at 10, then 2 from the June lot at 20
    assert_eq!(decimal(&second["trades"]["expense"]), dec!(400));
    assert_eq!(decimal(&second["trades"]["income"]), dec!(800));
    assert_eq!(decimal(&second["trades"]["profit"]), dec!(400));
}

#[test]
fn missing_trades_file_gives_empty_report() {
    let output = pitc(&["report", "--trades", "tests/data/no-such-file.csv", "--json"]);
    let report = json_stdout(&output);
    assert_eq!(decimal(&report["total"]["tax"]), Decimal::ZERO);
    assert_eq!(decimal(&report["trades"]["income"]), Decimal::ZERO);
}

#[test]
fn report_rejects_empty_saved_rates() {
    let dir = tempfile::tempdir().unwrap();
    let rates = dir.path().join("fx_rates.json");
    fs::write(&rates, "{}").unwrap();
    let output = pitc(&[
        "report",
        "--trades",
        "tests/data/trades.csv",
        "--rates",
        rates.to_str().unwrap(),
    ]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("rate fetch failed"), "{}", stderr);
}

#[test]
fn report_fails_on_over_close() {
    let output = pitc(&[
        "report",
        "--trades",
        "tests/data/overclose.csv",
        "--rates",
        "tests/data/rates.json",
    ]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("SELL with no corresponding BUY"), "{}", stderr);
    assert!(stderr.contains("TSLA"));
}

#[test]
fn validate_flags_over_close() {
    let output = pitc(&["validate", "--trades", "tests/data/overclose.csv", "--json"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(1));
    let result: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(result["valid"], Value::Bool(false));
    assert!(result["error"].as_str().unwrap().contains("TSLA"));
}

#[test]
fn validate_lists_open_positions() {
    let dir = tempfile::tempdir().unwrap();
    let trades = dir.path().join("trades.csv");
    fs::write(
        &trades,
        "ticker,type,date,quantity,unit_price,amount\n\
         AAPL,BUY,2021-01-05,10,10,100\n\
         AAPL,SELL,2021-03-01,4,15,60\n",
    )
    .unwrap();

    let output = pitc(&["validate", "--trades", trades.to_str().unwrap(), "--json"]);
    let result = json_stdout(&output);
    assert_eq!(result["valid"], Value::Bool(true));
    assert_eq!(result["tradeCount"], 2);
    assert_eq!(result["openPositions"][0]["ticker"], "AAPL");
    assert_eq!(decimal(&result["openPositions"][0]["quantity"]), dec!(6));
}

#[test]
fn combine_offsets_across_reports() {
    let dir = tempfile::tempdir().unwrap();
    let gain = dir.path().join("gain.json");
    let loss = dir.path().join("loss.json");
    fs::write(
        &gain,
        r#"{"fees": "0", "dividends": {"income": "0", "taxOverall": "0", "taxPaid": "0", "tax": "0"},
            "trades": {"expense": "400", "income": "600", "profit": "200", "tax": "38"},
            "total": {"expense": "400", "income": "600", "profit": "200", "tax": "38"}}"#,
    )
    .unwrap();
    fs::write(
        &loss,
        r#"{"fees": "0", "dividends": {"income": "0", "taxOverall": "0", "taxPaid": "0", "tax": "0"},
            "trades": {"expense": "300", "income": "200", "profit": "-100", "tax": "0"},
            "total": {"expense": "300", "income": "200", "profit": "-100", "tax": "0"}}"#,
    )
    .unwrap();

    let output = pitc(&[
        "combine",
        gain.to_str().unwrap(),
        loss.to_str().unwrap(),
        "--json",
    ]);
    let report = json_stdout(&output);
    assert_eq!(decimal(&report["trades"]["profit"]), dec!(100));
    assert_eq!(decimal(&report["total"]["tax"]), dec!(19));
}

#[test]
fn schema_prints_csv_header() {
    let output = pitc(&["schema", "csv-header"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_eq!(stdout.trim(), "ticker,type,date,quantity,unit_price,amount");
}

#[test]
fn schema_prints_json_schema() {
    let output = pitc(&["schema"]);
    let schema = json_stdout(&output);
    assert!(schema["properties"].get("trades").is_some());
}

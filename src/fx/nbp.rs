use super::{RateError, RatePoint, RateSource};
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.nbp.pl/api/exchangerates/rates/A";

/// Response body for a table A rate range query
#[derive(Debug, Deserialize)]
struct RatesResponse {
    code: String,
    rates: Vec<RatePoint>,
}

/// National Bank of Poland table A mid rates for one currency
pub struct NbpRateSource {
    agent: ureq::Agent,
    base_url: String,
    currency: String,
}

impl NbpRateSource {
    pub fn new(base_url: &str, currency: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .build();
        NbpRateSource {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            currency: currency.trim().to_uppercase(),
        }
    }

    fn rates_url(&self, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}/{}/{}/{}/",
            self.base_url,
            self.currency,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        )
    }
}

impl RateSource for NbpRateSource {
    fn fetch(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<RatePoint>, RateError> {
        let url = self.rates_url(start, end);
        log::debug!("GET {}", url);
        let response = match self
            .agent
            .get(&url)
            .query("format", "json")
            .set("Accept", "application/json")
            .call()
        {
            Ok(response) => response,
            // NBP answers 404 when nothing was published in the range
            Err(ureq::Error::Status(404, _)) => {
                log::warn!("No {} rates published for {} to {}", self.currency, start, end);
                return Ok(Vec::new());
            }
            Err(err) => return Err(RateError::RateFetchFailed(format!("{url}: {err}"))),
        };
        parse_response(response.into_reader(), &self.currency)
            .map_err(|err| RateError::RateFetchFailed(format!("{url}: {err}")))
    }
}

fn parse_response<R: std::io::Read>(reader: R, currency: &str) -> anyhow::Result<Vec<RatePoint>> {
    let body: RatesResponse = serde_json::from_reader(reader)?;
    if !body.code.eq_ignore_ascii_case(currency) {
        anyhow::bail!("expected {} rates, got {}", currency, body.code);
    }
    Ok(body.rates)
}

pub mod fifo;
pub mod pipeline;
pub mod policy;
pub mod report;

pub use fifo::{match_deals, read_open_lots, Deals, MatchError, OpenLots};
pub use pipeline::evaluate;
pub use policy::{round_money, TaxPolicy, DEFAULT_TAX_RATE};
pub use report::{
    read_report, Balance, DividendPolicy, DividendSummary, NetOfWithholding, Report, ReportError,
};

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Flat PIT-38 rate on capital gains and dividends
pub const DEFAULT_TAX_RATE: Decimal = dec!(0.19);

/// How profit is turned into tax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxPolicy {
    pub rate: Decimal,
    /// Clamp negative tax (from a net loss) to zero
    pub floor_losses: bool,
}

impl Default for TaxPolicy {
    fn default() -> Self {
        TaxPolicy {
            rate: DEFAULT_TAX_RATE,
            floor_losses: true,
        }
    }
}

impl TaxPolicy {
    /// Tax due on `profit`, rounded to grosze
    pub fn tax_on(&self, profit: Decimal) -> Decimal {
        self.floor(round_money(profit * self.rate))
    }

    pub fn floor(&self, tax: Decimal) -> Decimal {
        if self.floor_losses {
            tax.max(Decimal::ZERO)
        } else {
            tax
        }
    }
}

/// Round to 2 decimal places, halves away from zero
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

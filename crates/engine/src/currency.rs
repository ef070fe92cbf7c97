use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Currency a user can display amounts in.
///
/// Ledger sums are always stored in the **base** currency (`RUB`), as an
/// `i64` number of minor units (kopecks). Other currencies are only used at
/// the input/output boundary through a rate resolved at call time.
///
/// ## Rates
///
/// A rate is the number of base minor units one major unit of the currency is
/// worth. The base currency has the identity rate `100` (one rouble is 100
/// kopecks), so `12.50 RUB` ⇄ `1250`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Rub,
    Usd,
    Cny,
    Eur,
}

impl Currency {
    /// Currency every ledger amount is persisted in.
    pub const BASE: Currency = Currency::Rub;

    /// Currencies read from the upstream feed on every refresh.
    pub const TRACKED: [Currency; 3] = [Currency::Usd, Currency::Cny, Currency::Eur];

    /// Every selectable display currency, in keyboard order.
    pub const ALL: [Currency; 4] = [Currency::Usd, Currency::Cny, Currency::Eur, Currency::Rub];

    /// Rate of the base currency against itself.
    pub const IDENTITY_RATE: i64 = 100;

    /// Canonical currency code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Currency::Rub => "RUB",
            Currency::Usd => "USD",
            Currency::Cny => "CNY",
            Currency::Eur => "EUR",
        }
    }

    #[must_use]
    pub const fn is_base(self) -> bool {
        matches!(self, Currency::Rub)
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "RUB" => Ok(Currency::Rub),
            "USD" => Ok(Currency::Usd),
            "CNY" => Ok(Currency::Cny),
            "EUR" => Ok(Currency::Eur),
            other => Err(EngineError::InvalidInput(format!(
                "unsupported currency: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_codes_case_insensitively() {
        assert_eq!(Currency::try_from("usd").unwrap(), Currency::Usd);
        assert_eq!(Currency::try_from(" EUR ").unwrap(), Currency::Eur);
        assert!(Currency::try_from("GBP").is_err());
    }

    #[test]
    fn base_is_not_tracked() {
        assert!(Currency::BASE.is_base());
        assert!(!Currency::TRACKED.contains(&Currency::BASE));
        assert!(Currency::ALL.contains(&Currency::BASE));
    }
}

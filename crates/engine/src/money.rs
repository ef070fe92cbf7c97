use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Currency, EngineError, ResultEngine};

/// Signed money amount represented as **integer minor units**.
///
/// Ledger amounts are base-currency minor units. The same type carries
/// display-currency hundredths at the input/output boundary; use
/// [`Money::from_display`] and [`Money::to_display`] to move between the two
/// with a resolved rate.
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::new(12_34);
/// assert_eq!(amount.minor(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// ```
///
/// Parsing from user input (accepts `.` or `,` as decimal separator; rejects >
/// 2 decimals):
///
/// ```rust
/// use engine::Money;
///
/// assert_eq!("10".parse::<Money>().unwrap().minor(), 1000);
/// assert_eq!("10,5".parse::<Money>().unwrap().minor(), 1050);
/// assert!("12.345".parse::<Money>().is_err());
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a new amount from integer minor units.
    #[must_use]
    pub const fn new(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Adds every amount, failing with [`EngineError::Overflow`] instead of
    /// wrapping.
    pub fn checked_sum<I>(amounts: I, context: &'static str) -> ResultEngine<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts.into_iter().try_fold(Money::ZERO, |acc, amount| {
            acc.checked_add(amount)
                .ok_or(EngineError::Overflow(context))
        })
    }

    /// Converts a display amount (hundredths of a display unit) into base
    /// minor units: `display * rate`, truncating toward zero.
    pub fn from_display(display: Money, rate: i64) -> ResultEngine<Money> {
        ensure_rate(rate)?;
        display
            .0
            .checked_mul(rate)
            .map(|scaled| Money(scaled / 100))
            .ok_or_else(|| EngineError::InvalidInput("amount too large".to_string()))
    }

    /// Converts base minor units into display hundredths: `base / rate`,
    /// truncating toward zero.
    pub fn to_display(self, rate: i64) -> ResultEngine<Money> {
        ensure_rate(rate)?;
        self.0
            .checked_mul(100)
            .map(|scaled| Money(scaled / rate))
            .ok_or_else(|| EngineError::InvalidInput("amount too large".to_string()))
    }

    /// Formats the amount followed by the currency code, e.g. `12.50 USD`.
    #[must_use]
    pub fn format(self, currency: Currency) -> String {
        format!("{self} {currency}")
    }
}

fn ensure_rate(rate: i64) -> ResultEngine<()> {
    if rate <= 0 {
        return Err(EngineError::InvalidInput(format!(
            "rate must be positive, got {rate}"
        )));
    }
    Ok(())
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses a decimal string into minor units.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading `+`/`-`.
    ///
    /// Validation rules:
    /// - max 2 fractional digits (rejects `12.345`)
    /// - rejects empty/invalid strings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let empty = || EngineError::InvalidInput("empty amount".to_string());
        let invalid = || EngineError::InvalidInput(format!("invalid amount: {s}"));
        let overflow = || EngineError::InvalidInput("amount too large".to_string());

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(empty());
        }

        let (negative, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
            (true, stripped)
        } else if let Some(stripped) = trimmed.strip_prefix('+') {
            (false, stripped)
        } else {
            (false, trimmed)
        };

        if rest.is_empty() {
            return Err(empty());
        }

        let rest = rest.replace(',', ".");
        let mut parts = rest.split('.');
        let whole_str = parts.next().ok_or_else(invalid)?;
        let frac_str = parts.next();

        if parts.next().is_some() {
            return Err(invalid());
        }

        if whole_str.is_empty() || !whole_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole: i64 = whole_str.parse().map_err(|_| overflow())?;

        let frac: i64 = match frac_str {
            None | Some("") => 0,
            Some(frac) => {
                if !frac.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid());
                }
                match frac.len() {
                    1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
                    2 => frac.parse::<i64>().map_err(|_| invalid())?,
                    _ => {
                        return Err(EngineError::InvalidInput("too many decimals".to_string()));
                    }
                }
            }
        };

        let total = whole
            .checked_mul(100)
            .and_then(|v| v.checked_add(frac))
            .ok_or_else(overflow)?;

        Ok(Money(if negative { -total } else { total }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_two_decimals() {
        assert_eq!(Money::new(0).to_string(), "0.00");
        assert_eq!(Money::new(7).to_string(), "0.07");
        assert_eq!(Money::new(1050).to_string(), "10.50");
        assert_eq!(Money::new(-1050).to_string(), "-10.50");
        assert_eq!(Money::new(1250).format(Currency::Usd), "12.50 USD");
    }

    #[test]
    fn checked_sum_reports_overflow() {
        let amounts = [Money::new(1), Money::new(2), Money::new(3)];
        assert_eq!(Money::checked_sum(amounts, "adding"), Ok(Money::new(6)));
        assert_eq!(Money::checked_sum(Vec::new(), "adding"), Ok(Money::ZERO));

        let huge = Money::new(i64::MAX / 2 + 1);
        assert_eq!(
            Money::checked_sum([huge, huge], "adding"),
            Err(EngineError::Overflow("adding"))
        );
    }

    #[test]
    fn parse_accepts_dot_or_comma() {
        assert_eq!("10".parse::<Money>().unwrap().minor(), 1000);
        assert_eq!("10.5".parse::<Money>().unwrap().minor(), 1050);
        assert_eq!("10,50".parse::<Money>().unwrap().minor(), 1050);
        assert_eq!("-0.01".parse::<Money>().unwrap().minor(), -1);
        assert_eq!("  2.30 ".parse::<Money>().unwrap().minor(), 230);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("12.345".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
        assert!("1.2.3".parse::<Money>().is_err());
        assert!("".parse::<Money>().is_err());
    }

    #[test]
    fn conversion_truncates_toward_zero() {
        // 12.50 at the identity rate.
        assert_eq!(Money::from_display(Money::new(1250), 100).unwrap(), Money::new(1250));
        // 1.00 USD at 92.50 RUB.
        assert_eq!(Money::from_display(Money::new(100), 9250).unwrap(), Money::new(9250));
        // 0.01 at 0.99 => 0.0099 RUB, truncated.
        assert_eq!(Money::from_display(Money::new(1), 99).unwrap(), Money::ZERO);
        assert_eq!(Money::new(9250).to_display(9250).unwrap(), Money::new(100));
        assert_eq!(Money::new(1000).to_display(3000).unwrap(), Money::new(33));
    }

    #[test]
    fn conversion_rejects_non_positive_rate() {
        assert!(Money::new(100).to_display(0).is_err());
        assert!(Money::from_display(Money::new(100), -5).is_err());
    }
}

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use engine::Money;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub(crate) enum ParseError {
    #[error("invalid amount")]
    InvalidAmount,
    #[error("amount must not be negative")]
    NegativeAmount,
    #[error("invalid date, expected YYYY-MM-DD")]
    InvalidDate,
    #[error("expected two numbers: month and limit")]
    LimitShape,
    #[error("month must be between 1 and 12")]
    MonthOutOfRange,
    #[error("empty text")]
    Empty,
}

/// Non-negative decimal with at most two fraction digits, in display minor units.
pub(crate) fn parse_sum(text: &str) -> Result<Money, ParseError> {
    let amount: Money = text.trim().parse().map_err(|_| ParseError::InvalidAmount)?;
    if amount.is_negative() {
        return Err(ParseError::NegativeAmount);
    }
    Ok(amount)
}

pub(crate) fn parse_category(text: &str) -> Result<String, ParseError> {
    let category = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if category.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(category)
}

/// `YYYY-MM-DD`, taken as midnight UTC.
pub(crate) fn parse_date(text: &str) -> Result<DateTime<Utc>, ParseError> {
    let date =
        NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").map_err(|_| ParseError::InvalidDate)?;
    Ok(date.and_time(NaiveTime::MIN).and_utc())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct LimitAnswer {
    pub month: u32,
    /// Whole units of the display currency.
    pub amount: i64,
}

/// `<month> <amount>`, both integers, month in 1..=12.
pub(crate) fn parse_limit(text: &str) -> Result<LimitAnswer, ParseError> {
    let parts: Vec<&str> = text.split_whitespace().collect();
    let [month, amount] = parts.as_slice() else {
        return Err(ParseError::LimitShape);
    };

    let month: u32 = month.parse().map_err(|_| ParseError::LimitShape)?;
    let amount: i64 = amount.parse().map_err(|_| ParseError::LimitShape)?;
    if !(1..=12).contains(&month) {
        return Err(ParseError::MonthOutOfRange);
    }
    if amount < 0 {
        return Err(ParseError::NegativeAmount);
    }

    Ok(LimitAnswer { month, amount })
}

use engine::{Currency, EngineError, Expense, LimitCheck, Report};
use teloxide::utils::command::BotCommands;

use crate::commands::Command;

const GREETING: &str = "Hi! I keep track of your expenses.";

pub(crate) const FALLBACK_TEXT: &str = "I don't know this command.";
pub(crate) const REPORT_PROMPT: &str = "Report for the last:";
pub(crate) const CURRENCY_PROMPT: &str = "Choose a currency";
pub(crate) const LIMIT_PROMPT: &str =
    "Send two numbers separated by a space: the month number (1 to 12) and the new limit for that month";
pub(crate) const LIMIT_ERROR: &str = "Could not update the limit. Check the numbers you sent";
pub(crate) const SAVED_TEXT: &str = "Saved";
pub(crate) const CANCELLED_TEXT: &str = "Cancelled";

pub(crate) const SUM_ALERT: &str = "Enter the sum";
pub(crate) const CATEGORY_ALERT: &str = "Enter the category";
pub(crate) const DATE_ALERT: &str = "Enter the date as YYYY-MM-DD";

pub(crate) fn render_start() -> String {
    format!("{GREETING}\n\n{}", Command::descriptions())
}

/// Expense card shown above the edit keyboard. `rate` converts the stored
/// base amount into `currency`.
pub(crate) fn render_expense(
    expense: &Expense,
    currency: Currency,
    rate: i64,
) -> Result<String, EngineError> {
    Ok(format!(
        "Currency: {currency}\n\nSum: {}\nCategory: {}\nDate: {}",
        expense.sum.to_display(rate)?,
        expense.category,
        expense.date.format("%Y-%m-%d"),
    ))
}

pub(crate) fn render_report(
    report: &Report,
    currency: Currency,
    rate: i64,
) -> Result<String, EngineError> {
    let mut text = format!(
        "Report from {} to {}\n",
        report.range.start.format("%Y-%m-%d"),
        report.range.end.format("%Y-%m-%d"),
    );

    if report.is_empty() {
        text.push_str("\nNo expenses in this period.");
        return Ok(text);
    }

    text.push('\n');
    for (category, sum) in &report.totals {
        text.push_str(&format!("{category}: {}\n", sum.to_display(rate)?));
    }
    text.push_str(&format!(
        "\nTotal: {}",
        report.total()?.to_display(rate)?.format(currency)
    ));
    Ok(text)
}

pub(crate) fn render_current_currency(currency: Currency) -> String {
    format!("Current currency: {currency}")
}

pub(crate) fn render_limit_set(month: u32, amount: i64, currency: Currency) -> String {
    format!("Limit for month {month} set to {amount} {currency}")
}

pub(crate) fn render_limit_warning(check: &LimitCheck) -> String {
    format!(
        "Warning: the spending limit for {:02}/{} is exhausted!",
        check.month, check.year
    )
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};
    use engine::{Currency, Money, ReportRange};

    use super::*;

    fn expense(sum: i64) -> Expense {
        let date = Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap();
        let mut expense = Expense::placeholder(1, 10, date);
        expense.sum = Money::new(sum);
        expense
    }

    #[test]
    fn greeting_lists_the_commands() {
        let text = render_start();
        assert!(text.starts_with(GREETING));
        assert!(text.contains("/set_limit"), "{text}");
    }

    #[test]
    fn expense_card_in_base_currency() {
        let text = render_expense(&expense(1250), Currency::Rub, 100).unwrap();
        assert_eq!(
            text,
            "Currency: RUB\n\nSum: 12.50\nCategory: New category\nDate: 2026-10-19"
        );
    }

    #[test]
    fn expense_card_converts_with_rate() {
        let text = render_expense(&expense(115_625), Currency::Usd, 9250).unwrap();
        assert!(text.contains("Sum: 12.50"), "{text}");
        assert!(text.starts_with("Currency: USD"));
    }

    #[test]
    fn report_lists_categories_and_total() {
        let start = Utc.with_ymd_and_hms(2026, 10, 12, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 10, 19, 23, 59, 59).unwrap();
        let report = Report {
            range: ReportRange::new(start, end).unwrap(),
            totals: BTreeMap::from([
                ("Food".to_string(), Money::new(1500)),
                ("Taxi".to_string(), Money::new(700)),
            ]),
        };

        let text = render_report(&report, Currency::Rub, 100).unwrap();
        assert_eq!(
            text,
            "Report from 2026-10-12 to 2026-10-19\n\nFood: 15.00\nTaxi: 7.00\n\nTotal: 22.00 RUB"
        );
    }

    #[test]
    fn empty_report_says_so() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();
        let report = Report {
            range: ReportRange::new(now, now).unwrap(),
            totals: BTreeMap::new(),
        };
        let text = render_report(&report, Currency::Eur, 10010).unwrap();
        assert!(text.ends_with("No expenses in this period."));
    }
}

//! Callback data carried by the inline keyboard buttons.

use engine::{Currency, ReportPeriod};

pub const CHANGE_EXPENSE_SUM: &str = "ChangeExpenseSum";
pub const CHANGE_EXPENSE_CATEGORY: &str = "ChangeExpenseCategory";
pub const CHANGE_EXPENSE_DATE: &str = "ChangeExpenseDate";
pub const CHANGE_EXPENSE_DONE: &str = "ChangeExpenseDone";
pub const CHANGE_EXPENSE_CANCEL: &str = "ChangeExpenseCancel";

pub const GET_WEEK_REPORT: &str = "GetWeekReport";
pub const GET_MONTH_REPORT: &str = "GetMonthReport";
pub const GET_YEAR_REPORT: &str = "GetYearReport";

/// A tapped button, decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    EditSum,
    EditCategory,
    EditDate,
    Done,
    Cancel,
    Report(ReportPeriod),
    SelectCurrency(Currency),
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        let action = match data {
            CHANGE_EXPENSE_SUM => Self::EditSum,
            CHANGE_EXPENSE_CATEGORY => Self::EditCategory,
            CHANGE_EXPENSE_DATE => Self::EditDate,
            CHANGE_EXPENSE_DONE => Self::Done,
            CHANGE_EXPENSE_CANCEL => Self::Cancel,
            GET_WEEK_REPORT => Self::Report(ReportPeriod::Week),
            GET_MONTH_REPORT => Self::Report(ReportPeriod::Month),
            GET_YEAR_REPORT => Self::Report(ReportPeriod::Year),
            // Currency buttons carry the bare code.
            code => Self::SelectCurrency(Currency::try_from(code).ok()?),
        };
        Some(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_every_button() {
        assert_eq!(
            CallbackAction::parse(CHANGE_EXPENSE_SUM),
            Some(CallbackAction::EditSum)
        );
        assert_eq!(
            CallbackAction::parse(GET_YEAR_REPORT),
            Some(CallbackAction::Report(ReportPeriod::Year))
        );
        for currency in Currency::ALL {
            assert_eq!(
                CallbackAction::parse(currency.code()),
                Some(CallbackAction::SelectCurrency(currency))
            );
        }
    }

    #[test]
    fn unknown_data_is_none() {
        assert_eq!(CallbackAction::parse("GBP"), None);
        assert_eq!(CallbackAction::parse(""), None);
        assert_eq!(CallbackAction::parse("changeexpensesum"), None);
    }
}

//! Users table: interaction state and display currency.
//!
//! A row is created lazily by the first state or currency write. A missing
//! row (or a missing state) reads as [`InteractionState::Idle`].

use sea_orm::entity::prelude::*;

use crate::{EngineError, ExpenseId, ResultEngine};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tg_user_id: i64,
    pub state: String,
    pub expense_id: Option<i32>,
    pub currency: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// What the next free-text message from a user answers.
///
/// Each editing variant is bound to the expense the edit keyboard belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InteractionState {
    #[default]
    Idle,
    EditingSum(ExpenseId),
    EditingCategory(ExpenseId),
    EditingDate(ExpenseId),
    EditingLimit,
}

impl InteractionState {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::EditingSum(_) => "editing_sum",
            Self::EditingCategory(_) => "editing_category",
            Self::EditingDate(_) => "editing_date",
            Self::EditingLimit => "editing_limit",
        }
    }

    /// Expense the pending edit is bound to.
    pub fn expense_id(self) -> Option<ExpenseId> {
        match self {
            Self::EditingSum(id) | Self::EditingCategory(id) | Self::EditingDate(id) => Some(id),
            Self::Idle | Self::EditingLimit => None,
        }
    }

    pub(crate) fn from_parts(state: &str, expense_id: Option<ExpenseId>) -> ResultEngine<Self> {
        let bound = |label: &str| {
            expense_id.ok_or_else(|| {
                EngineError::InvalidState(format!("{label} without an expense id"))
            })
        };
        match state {
            "" | "idle" => Ok(Self::Idle),
            "editing_sum" => Ok(Self::EditingSum(bound(state)?)),
            "editing_category" => Ok(Self::EditingCategory(bound(state)?)),
            "editing_date" => Ok(Self::EditingDate(bound(state)?)),
            "editing_limit" => Ok(Self::EditingLimit),
            other => Err(EngineError::InvalidState(format!(
                "unknown interaction state: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_round_trips_through_columns() {
        for state in [
            InteractionState::Idle,
            InteractionState::EditingSum(7),
            InteractionState::EditingCategory(8),
            InteractionState::EditingDate(9),
            InteractionState::EditingLimit,
        ] {
            let parsed = InteractionState::from_parts(state.as_str(), state.expense_id()).unwrap();
            assert_eq!(parsed, state);
        }
    }

    #[test]
    fn editing_without_expense_is_rejected() {
        assert!(InteractionState::from_parts("editing_sum", None).is_err());
        assert!(InteractionState::from_parts("flying", Some(1)).is_err());
    }
}

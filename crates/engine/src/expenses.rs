//! Expense records.
//!
//! An expense does not exist until its first field is written. It is then
//! created with placeholder defaults and every edit overwrites a single
//! column.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{ExpenseId, Money, UserId};

/// Category shown until the user writes one.
pub const DEFAULT_CATEGORY: &str = "New category";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub user_id: UserId,
    /// Always base-currency minor units.
    pub sum: Money,
    pub category: String,
    pub date: DateTime<Utc>,
}

impl Expense {
    /// Placeholder expense: zero sum, default category, dated `now`.
    pub fn placeholder(user_id: UserId, id: ExpenseId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            sum: Money::ZERO,
            category: DEFAULT_CATEGORY.to_string(),
            date: now,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub expense_id: i32,
    pub amount_minor: i64,
    pub category: String,
    pub occurred_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            user_id: ActiveValue::Set(expense.user_id),
            expense_id: ActiveValue::Set(expense.id),
            amount_minor: ActiveValue::Set(expense.sum.minor()),
            category: ActiveValue::Set(expense.category.clone()),
            occurred_at: ActiveValue::Set(expense.date),
        }
    }
}

impl From<Model> for Expense {
    fn from(model: Model) -> Self {
        Self {
            id: model.expense_id,
            user_id: model.user_id,
            sum: Money::new(model.amount_minor),
            category: model.category,
            date: model.occurred_at,
        }
    }
}

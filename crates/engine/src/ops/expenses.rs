use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sea_orm::{ActiveValue, QueryFilter, sea_query::OnConflict, prelude::*};

use crate::{EngineError, Expense, ExpenseId, Money, ResultEngine, UserId, expenses};

use super::Engine;

impl Engine {
    /// Returns the expense, or `None` if nothing was written for it yet.
    pub async fn expense(
        &self,
        user_id: UserId,
        expense_id: ExpenseId,
    ) -> ResultEngine<Option<Expense>> {
        let model = expenses::Entity::find_by_id((user_id, expense_id))
            .one(&self.database)
            .await?;
        Ok(model.map(Expense::from))
    }

    /// Get-or-create with placeholder defaults, then return the stored row.
    ///
    /// Idempotent: an existing expense is returned untouched.
    pub async fn ensure_expense(
        &self,
        user_id: UserId,
        expense_id: ExpenseId,
        now: DateTime<Utc>,
    ) -> ResultEngine<Expense> {
        if let Some(expense) = self.expense(user_id, expense_id).await? {
            return Ok(expense);
        }

        let placeholder = Expense::placeholder(user_id, expense_id, now);
        expenses::Entity::insert(expenses::ActiveModel::from(&placeholder))
            .on_conflict(
                OnConflict::columns([expenses::Column::UserId, expenses::Column::ExpenseId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.database)
            .await?;

        self.expense(user_id, expense_id).await?.ok_or_else(|| {
            EngineError::InvalidState(format!("expense {expense_id} vanished after insert"))
        })
    }

    /// Overwrites the sum (base minor units).
    pub async fn write_sum(
        &self,
        user_id: UserId,
        expense_id: ExpenseId,
        sum: Money,
    ) -> ResultEngine<()> {
        let model = expenses::ActiveModel {
            user_id: ActiveValue::Set(user_id),
            expense_id: ActiveValue::Set(expense_id),
            amount_minor: ActiveValue::Set(sum.minor()),
            ..Default::default()
        };
        model.update(&self.database).await?;
        Ok(())
    }

    /// Overwrites the category.
    pub async fn write_category(
        &self,
        user_id: UserId,
        expense_id: ExpenseId,
        category: &str,
    ) -> ResultEngine<()> {
        let model = expenses::ActiveModel {
            user_id: ActiveValue::Set(user_id),
            expense_id: ActiveValue::Set(expense_id),
            category: ActiveValue::Set(category.to_string()),
            ..Default::default()
        };
        model.update(&self.database).await?;
        Ok(())
    }

    /// Overwrites the date.
    pub async fn write_date(
        &self,
        user_id: UserId,
        expense_id: ExpenseId,
        date: DateTime<Utc>,
    ) -> ResultEngine<()> {
        let model = expenses::ActiveModel {
            user_id: ActiveValue::Set(user_id),
            expense_id: ActiveValue::Set(expense_id),
            occurred_at: ActiveValue::Set(date),
            ..Default::default()
        };
        model.update(&self.database).await?;
        Ok(())
    }

    /// Removes the expense. Deleting a missing expense is a no-op.
    pub async fn delete_expense(&self, user_id: UserId, expense_id: ExpenseId) -> ResultEngine<()> {
        expenses::Entity::delete_by_id((user_id, expense_id))
            .exec(&self.database)
            .await?;
        Ok(())
    }

    /// Sum of the expenses dated in the given calendar month.
    pub async fn month_total(&self, user_id: UserId, month: u32, year: i32) -> ResultEngine<Money> {
        let (start, end) = month_bounds(month, year)?;
        let models = expenses::Entity::find()
            .filter(expenses::Column::UserId.eq(user_id))
            .filter(expenses::Column::OccurredAt.gte(start))
            .filter(expenses::Column::OccurredAt.lt(end))
            .all(&self.database)
            .await?;

        Money::checked_sum(
            models.iter().map(|m| Money::new(m.amount_minor)),
            "totalling the month",
        )
    }

    /// Per-category sums of the expenses dated inside `[start, end]`.
    pub async fn category_totals(
        &self,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ResultEngine<BTreeMap<String, Money>> {
        let models = expenses::Entity::find()
            .filter(expenses::Column::UserId.eq(user_id))
            .filter(expenses::Column::OccurredAt.between(start, end))
            .all(&self.database)
            .await?;

        let mut totals: BTreeMap<String, Money> = BTreeMap::new();
        for model in models {
            let total = totals.entry(model.category).or_default();
            *total = total
                .checked_add(Money::new(model.amount_minor))
                .ok_or(EngineError::Overflow("totalling a category"))?;
        }
        Ok(totals)
    }
}

/// Half-open `[first day, first day of next month)` bounds at midnight UTC.
fn month_bounds(month: u32, year: i32) -> ResultEngine<(DateTime<Utc>, DateTime<Utc>)> {
    let invalid = || EngineError::InvalidInput(format!("invalid month {month}/{year}"));
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let next = NaiveDate::from_ymd_opt(next_year, next_month, 1).ok_or_else(invalid)?;

    Ok((
        first.and_time(NaiveTime::MIN).and_utc(),
        next.and_time(NaiveTime::MIN).and_utc(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_bounds_roll_over_the_year() {
        let (start, end) = month_bounds(12, 2026).unwrap();
        assert_eq!(start.to_rfc3339(), "2026-12-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2027-01-01T00:00:00+00:00");
    }

    #[test]
    fn month_bounds_reject_out_of_range_month() {
        assert!(month_bounds(13, 2026).is_err());
        assert!(month_bounds(0, 2026).is_err());
    }
}

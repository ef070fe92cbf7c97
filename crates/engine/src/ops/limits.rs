use chrono::{DateTime, Datelike, Utc};
use sea_orm::{ActiveValue, sea_query::OnConflict, prelude::*};

use crate::{EngineError, LimitCheck, Money, ResultEngine, UserId, limits};

use super::Engine;

fn month_key(month: u32) -> ResultEngine<i32> {
    if (1..=12).contains(&month) {
        Ok(month as i32)
    } else {
        Err(EngineError::InvalidInput(format!(
            "month must be in 1..=12, got {month}"
        )))
    }
}

impl Engine {
    /// Stored ceiling for the month number, if any.
    pub async fn monthly_limit(&self, user_id: UserId, month: u32) -> ResultEngine<Option<Money>> {
        let model = limits::Entity::find_by_id((user_id, month_key(month)?))
            .one(&self.database)
            .await?;
        Ok(model.map(|m| Money::new(m.ceiling_minor)))
    }

    /// Sets (or replaces) the ceiling for the month number.
    pub async fn set_monthly_limit(
        &self,
        user_id: UserId,
        month: u32,
        ceiling: Money,
    ) -> ResultEngine<()> {
        if ceiling.is_negative() {
            return Err(EngineError::InvalidInput(
                "monthly limit must not be negative".to_string(),
            ));
        }
        let model = limits::ActiveModel {
            user_id: ActiveValue::Set(user_id),
            month: ActiveValue::Set(month_key(month)?),
            ceiling_minor: ActiveValue::Set(ceiling.minor()),
        };
        limits::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([limits::Column::UserId, limits::Column::Month])
                    .update_column(limits::Column::CeilingMinor)
                    .to_owned(),
            )
            .exec_without_returning(&self.database)
            .await?;
        Ok(())
    }

    /// Compares the month-to-date total of the expense's month with its ceiling.
    ///
    /// A month without a ceiling gets the default one stored first.
    pub async fn check_monthly_limit(
        &self,
        user_id: UserId,
        expense_date: DateTime<Utc>,
    ) -> ResultEngine<LimitCheck> {
        let month = expense_date.month();
        let year = expense_date.year();

        let ceiling = match self.monthly_limit(user_id, month).await? {
            Some(ceiling) => ceiling,
            None => {
                self.set_monthly_limit(user_id, month, self.default_limit)
                    .await?;
                self.default_limit
            }
        };
        let total = self.month_total(user_id, month, year).await?;

        let check = LimitCheck {
            month,
            year,
            ceiling,
            total,
        };
        if check.exceeded() {
            tracing::info!(user_id, month, year, %total, %ceiling, "monthly limit reached");
        }
        Ok(check)
    }
}

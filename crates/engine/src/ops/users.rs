use sea_orm::{ActiveValue, sea_query::OnConflict, prelude::*};

use crate::{Currency, InteractionState, ResultEngine, UserId, users};

use super::Engine;

impl Engine {
    /// Current interaction state; a user never seen before is idle.
    pub async fn interaction_state(&self, user_id: UserId) -> ResultEngine<InteractionState> {
        let Some(model) = users::Entity::find_by_id(user_id)
            .one(&self.database)
            .await?
        else {
            return Ok(InteractionState::Idle);
        };
        InteractionState::from_parts(&model.state, model.expense_id)
    }

    /// Replaces the interaction state.
    pub async fn set_interaction_state(
        &self,
        user_id: UserId,
        state: InteractionState,
    ) -> ResultEngine<()> {
        let model = users::ActiveModel {
            tg_user_id: ActiveValue::Set(user_id),
            state: ActiveValue::Set(state.as_str().to_string()),
            expense_id: ActiveValue::Set(state.expense_id()),
            currency: ActiveValue::NotSet,
        };
        users::Entity::insert(model)
            .on_conflict(
                OnConflict::column(users::Column::TgUserId)
                    .update_columns([users::Column::State, users::Column::ExpenseId])
                    .to_owned(),
            )
            .exec_without_returning(&self.database)
            .await?;
        tracing::debug!(user_id, state = state.as_str(), "interaction state set");
        Ok(())
    }

    /// Display currency of the user. The first read stores the base currency.
    pub async fn display_currency(&self, user_id: UserId) -> ResultEngine<Currency> {
        let stored = users::Entity::find_by_id(user_id)
            .one(&self.database)
            .await?
            .and_then(|model| model.currency);

        match stored {
            Some(code) => Currency::try_from(code.as_str()),
            None => {
                self.set_display_currency(user_id, Currency::BASE).await?;
                Ok(Currency::BASE)
            }
        }
    }

    /// Replaces the display currency.
    pub async fn set_display_currency(
        &self,
        user_id: UserId,
        currency: Currency,
    ) -> ResultEngine<()> {
        let model = users::ActiveModel {
            tg_user_id: ActiveValue::Set(user_id),
            state: ActiveValue::Set(InteractionState::Idle.as_str().to_string()),
            expense_id: ActiveValue::Set(None),
            currency: ActiveValue::Set(Some(currency.code().to_string())),
        };
        users::Entity::insert(model)
            .on_conflict(
                OnConflict::column(users::Column::TgUserId)
                    .update_column(users::Column::Currency)
                    .to_owned(),
            )
            .exec_without_returning(&self.database)
            .await?;
        Ok(())
    }
}

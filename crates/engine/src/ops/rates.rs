use chrono::NaiveDate;
use sea_orm::{sea_query::OnConflict, prelude::*};

use crate::{Currency, CurrencyRate, ResultEngine, rates};

use super::Engine;

impl Engine {
    /// Stored rate of `currency` for `date`, if any.
    pub async fn rate(
        &self,
        currency: Currency,
        date: NaiveDate,
    ) -> ResultEngine<Option<CurrencyRate>> {
        rates::Entity::find_by_id((currency.code().to_string(), date))
            .one(&self.database)
            .await?
            .map(CurrencyRate::try_from)
            .transpose()
    }

    /// Inserts the rate or overwrites the one stored for the same day.
    pub async fn upsert_rate(&self, rate: &CurrencyRate) -> ResultEngine<()> {
        rates::Entity::insert(rates::ActiveModel::from(rate))
            .on_conflict(
                OnConflict::columns([rates::Column::Code, rates::Column::RateDate])
                    .update_columns([rates::Column::Base, rates::Column::Rate])
                    .to_owned(),
            )
            .exec_without_returning(&self.database)
            .await?;
        Ok(())
    }
}

//! Currency rates, one row per (code, date).

use chrono::NaiveDate;
use sea_orm::{ActiveValue, entity::prelude::*};

use crate::{Currency, EngineError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrencyRate {
    pub currency: Currency,
    pub base: Currency,
    /// Base minor units per one major unit of `currency`.
    pub rate: i64,
    pub date: NaiveDate,
}

impl CurrencyRate {
    /// Identity rate of the base currency for `date`.
    pub fn identity(date: NaiveDate) -> Self {
        Self {
            currency: Currency::BASE,
            base: Currency::BASE,
            rate: Currency::IDENTITY_RATE,
            date,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "currency_rates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub code: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub rate_date: Date,
    pub base: String,
    pub rate: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&CurrencyRate> for ActiveModel {
    fn from(rate: &CurrencyRate) -> Self {
        Self {
            code: ActiveValue::Set(rate.currency.code().to_string()),
            rate_date: ActiveValue::Set(rate.date),
            base: ActiveValue::Set(rate.base.code().to_string()),
            rate: ActiveValue::Set(rate.rate),
        }
    }
}

impl TryFrom<Model> for CurrencyRate {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            currency: Currency::try_from(model.code.as_str())?,
            base: Currency::try_from(model.base.as_str())?,
            rate: model.rate,
            date: model.rate_date,
        })
    }
}

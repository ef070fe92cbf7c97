//! Monthly spending ceilings, one row per (user, month number).

use sea_orm::entity::prelude::*;

use crate::Money;

/// Ceiling created the first time a sum is written for a month without one:
/// 10 000 major units.
pub const DEFAULT_MONTHLY_LIMIT: Money = Money::new(1_000_000);

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "monthly_limits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub month: i32,
    pub ceiling_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Outcome of a monthly limit check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LimitCheck {
    pub month: u32,
    pub year: i32,
    pub ceiling: Money,
    pub total: Money,
}

impl LimitCheck {
    /// The month-to-date total reached the ceiling.
    #[must_use]
    pub fn exceeded(&self) -> bool {
        self.total >= self.ceiling
    }
}

pub use sea_orm_migration::prelude::*;

mod m20221101_000001_users;
mod m20221101_000002_expenses;
mod m20221101_000003_currency_rates;
mod m20221101_000004_monthly_limits;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20221101_000001_users::Migration),
            Box::new(m20221101_000002_expenses::Migration),
            Box::new(m20221101_000003_currency_rates::Migration),
            Box::new(m20221101_000004_monthly_limits::Migration),
        ]
    }
}

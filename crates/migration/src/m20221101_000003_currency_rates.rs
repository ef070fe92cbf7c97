use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CurrencyRates::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CurrencyRates::Code).string().not_null())
                    .col(ColumnDef::new(CurrencyRates::RateDate).date().not_null())
                    .col(ColumnDef::new(CurrencyRates::Base).string().not_null())
                    .col(ColumnDef::new(CurrencyRates::Rate).big_integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(CurrencyRates::Code)
                            .col(CurrencyRates::RateDate),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CurrencyRates::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum CurrencyRates {
    Table,
    Code,
    RateDate,
    Base,
    Rate,
}

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MonthlyLimits::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(MonthlyLimits::UserId).big_integer().not_null())
                    .col(ColumnDef::new(MonthlyLimits::Month).integer().not_null())
                    .col(
                        ColumnDef::new(MonthlyLimits::CeilingMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(MonthlyLimits::UserId)
                            .col(MonthlyLimits::Month),
                    )
                    .check(Expr::col(MonthlyLimits::Month).between(1, 12))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MonthlyLimits::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum MonthlyLimits {
    Table,
    UserId,
    Month,
    CeilingMinor,
}

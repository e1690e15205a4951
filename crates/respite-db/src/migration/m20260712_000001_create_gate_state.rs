//! create gate_state table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // single row for the gate's persisted state
        manager
            .create_table(
                Table::create()
                    .table(GateState::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GateState::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GateState::ExpiryTime).timestamp_with_time_zone())
                    .col(ColumnDef::new(GateState::GrantDurationSecs).big_integer())
                    .col(
                        ColumnDef::new(GateState::FreeGrantsUsed)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(GateState::QuotaResetAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(GateState::CooldownUntil).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(GateState::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GateState::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GateState::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum GateState {
    Table,
    Id,
    ExpiryTime,
    GrantDurationSecs,
    FreeGrantsUsed,
    QuotaResetAt,
    CooldownUntil,
    CreatedAt,
    UpdatedAt,
}

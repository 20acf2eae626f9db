use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BookingDraft::Table)
                    .if_not_exists()
                    .col(string(BookingDraft::Id).primary_key())
                    .col(string(BookingDraft::MovieId))
                    .col(string(BookingDraft::Step))
                    .col(text(BookingDraft::State))
                    .col(big_integer(BookingDraft::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_booking_draft_updated_at")
                    .table(BookingDraft::Table)
                    .col(BookingDraft::UpdatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(BookingDraft::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum BookingDraft {
    Table,
    Id,
    MovieId,
    Step,
    State,
    UpdatedAt,
}

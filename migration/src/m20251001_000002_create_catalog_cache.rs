use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CatalogCache::Table)
                    .if_not_exists()
                    .col(string(CatalogCache::CacheKey).primary_key())
                    .col(text(CatalogCache::Payload))
                    .col(integer(CatalogCache::MovieCount))
                    .col(big_integer(CatalogCache::CachedAt))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(CatalogCache::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum CatalogCache {
    Table,
    CacheKey,
    Payload,
    MovieCount,
    CachedAt,
}

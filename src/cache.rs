use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    sea_query::{Expr, OnConflict},
};

use crate::{
    booking::{BookingDraft, BookingStep},
    entities::{booking_draft, catalog_cache},
    error::AppResult,
    models::Movie,
};

/// Value of the `step` column while a payment for the draft is being confirmed.
const PAYING: &str = "paying";

/// Local SQLite state: booking drafts and a short-lived copy of the movie catalog.
#[derive(Clone)]
pub struct CacheManager {
    db: DatabaseConnection,
    catalog_ttl_seconds: i64,
    draft_ttl_seconds: i64,
}

impl CacheManager {
    pub fn new(db: DatabaseConnection, catalog_ttl_secs: i64, draft_ttl_minutes: i64) -> Self {
        Self { db, catalog_ttl_seconds: catalog_ttl_secs, draft_ttl_seconds: draft_ttl_minutes * 60 }
    }

    pub async fn get_movies(&self, key: &str) -> AppResult<Option<Vec<Movie>>> {
        let row = catalog_cache::Entity::find_by_id(key.to_string()).one(&self.db).await?;
        let Some(row) = row.filter(|r| is_fresh(r.cached_at, self.catalog_ttl_seconds)) else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&row.payload)?))
    }

    pub async fn put_movies(&self, key: &str, movies: &[Movie]) -> AppResult<()> {
        let model = catalog_cache::ActiveModel {
            cache_key: Set(key.to_string()),
            payload: Set(serde_json::to_string(movies)?),
            movie_count: Set(movies.len() as i32),
            cached_at: Set(now_sec()),
        };

        catalog_cache::Entity::insert(model)
            .on_conflict(
                OnConflict::column(catalog_cache::Column::CacheKey)
                    .update_columns([
                        catalog_cache::Column::Payload,
                        catalog_cache::Column::MovieCount,
                        catalog_cache::Column::CachedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;

        Ok(())
    }

    /// Drops every cached listing; the next page view refetches from the backend.
    pub async fn invalidate_movies(&self) -> AppResult<u64> {
        let res = catalog_cache::Entity::delete_many().exec(&self.db).await?;
        Ok(res.rows_affected)
    }

    pub async fn create_draft(&self, draft: &BookingDraft) -> AppResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let model = booking_draft::ActiveModel {
            id: Set(id.clone()),
            movie_id: Set(draft.movie_id.clone()),
            step: Set(draft.step.as_str().to_string()),
            state: Set(serde_json::to_string(draft)?),
            updated_at: Set(now_sec()),
        };
        booking_draft::Entity::insert(model).exec(&self.db).await?;
        Ok(id)
    }

    pub async fn get_draft(&self, id: &str) -> AppResult<Option<BookingDraft>> {
        let row = booking_draft::Entity::find_by_id(id.to_string()).one(&self.db).await?;
        let Some(row) = row.filter(|r| is_fresh(r.updated_at, self.draft_ttl_seconds)) else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&row.state)?))
    }

    pub async fn save_draft(&self, id: &str, draft: &BookingDraft) -> AppResult<()> {
        let model = booking_draft::ActiveModel {
            id: Set(id.to_string()),
            movie_id: Set(draft.movie_id.clone()),
            step: Set(draft.step.as_str().to_string()),
            state: Set(serde_json::to_string(draft)?),
            updated_at: Set(now_sec()),
        };
        booking_draft::Entity::update(model).exec(&self.db).await?;
        Ok(())
    }

    /// Marks a draft that is waiting at the payment step as paying.
    ///
    /// Only one caller wins; the rest get `false`. Saving the draft afterwards releases the claim.
    pub async fn claim_payment(&self, id: &str) -> AppResult<bool> {
        let res = booking_draft::Entity::update_many()
            .col_expr(booking_draft::Column::Step, Expr::value(PAYING))
            .col_expr(booking_draft::Column::UpdatedAt, Expr::value(now_sec()))
            .filter(booking_draft::Column::Id.eq(id))
            .filter(booking_draft::Column::Step.eq(BookingStep::Payment.as_str()))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected == 1)
    }

    pub async fn purge_expired_drafts(&self) -> AppResult<u64> {
        let cutoff = now_sec().saturating_sub(self.draft_ttl_seconds);
        let res = booking_draft::Entity::delete_many()
            .filter(booking_draft::Column::UpdatedAt.lt(cutoff))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected)
    }
}

fn is_fresh(stamp: i64, ttl_seconds: i64) -> bool {
    now_sec().saturating_sub(stamp) <= ttl_seconds
}

fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::{debug, instrument};

use dispatch_domain::entities::{Provider, ProviderStatus};
use dispatch_domain::repositories::ProviderRepository;
use dispatch_errors::{DispatchError, DispatchResult};

const PROVIDER_COLUMNS: &str = "id, user_id, name, lat, lng, status, is_active, premium, \
     avg_rating, total_ratings, jobs_completed, total_requests, accepted_requests, \
     declined_requests, avg_response_time_sec, rank_score, created_at, updated_at";

pub struct PostgresProviderRepository {
    pool: PgPool,
}

impl PostgresProviderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_provider(row: &sqlx::postgres::PgRow) -> DispatchResult<Provider> {
        Ok(Provider {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            lat: row.try_get("lat")?,
            lng: row.try_get("lng")?,
            status: row.try_get("status")?,
            is_active: row.try_get("is_active")?,
            premium: row.try_get("premium")?,
            avg_rating: row.try_get("avg_rating")?,
            total_ratings: row.try_get("total_ratings")?,
            jobs_completed: row.try_get("jobs_completed")?,
            total_requests: row.try_get("total_requests")?,
            accepted_requests: row.try_get("accepted_requests")?,
            declined_requests: row.try_get("declined_requests")?,
            avg_response_time_sec: row.try_get("avg_response_time_sec")?,
            rank_score: row.try_get("rank_score")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// RETURNING 为空说明服务商不存在
    async fn update_returning(
        &self,
        id: i64,
        sql: &str,
    ) -> DispatchResult<Provider> {
        let row = sqlx::query(sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Self::row_to_provider(&row),
            None => Err(DispatchError::provider_not_found(id)),
        }
    }
}

#[async_trait]
impl ProviderRepository for PostgresProviderRepository {
    async fn get_by_id(&self, id: i64) -> DispatchResult<Option<Provider>> {
        let row = sqlx::query(&format!(
            "SELECT {PROVIDER_COLUMNS} FROM providers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_provider).transpose()
    }

    async fn list_ready(&self, limit: i64) -> DispatchResult<Vec<Provider>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PROVIDER_COLUMNS} FROM providers
            WHERE status = 'READY' AND is_active = TRUE
            ORDER BY id
            LIMIT $1
            "#,
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_provider).collect()
    }

    async fn list_all(&self) -> DispatchResult<Vec<Provider>> {
        let rows = sqlx::query(&format!(
            "SELECT {PROVIDER_COLUMNS} FROM providers ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_provider).collect()
    }

    async fn list_ranked(&self, limit: i64) -> DispatchResult<Vec<Provider>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PROVIDER_COLUMNS} FROM providers
            WHERE is_active = TRUE
            ORDER BY rank_score DESC, id
            LIMIT $1
            "#,
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_provider).collect()
    }

    #[instrument(skip(self))]
    async fn update_status(&self, id: i64, status: ProviderStatus) -> DispatchResult<Provider> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE providers SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {PROVIDER_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let provider = Self::row_to_provider(&row)?;
                debug!("服务商 {} 状态更新为 {}", id, provider.status);
                Ok(provider)
            }
            None => Err(DispatchError::provider_not_found(id)),
        }
    }

    #[instrument(skip(self))]
    async fn update_rank_score(&self, id: i64, rank_score: f64) -> DispatchResult<Provider> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE providers SET rank_score = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {PROVIDER_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(rank_score)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_provider(&row),
            None => Err(DispatchError::provider_not_found(id)),
        }
    }

    async fn record_acceptance(&self, id: i64) -> DispatchResult<Provider> {
        self.update_returning(
            id,
            &format!(
                r#"
                UPDATE providers
                SET total_requests = total_requests + 1,
                    accepted_requests = accepted_requests + 1,
                    updated_at = NOW()
                WHERE id = $1
                RETURNING {PROVIDER_COLUMNS}
                "#,
            ),
        )
        .await
    }

    async fn record_completion(&self, id: i64) -> DispatchResult<Provider> {
        self.update_returning(
            id,
            &format!(
                r#"
                UPDATE providers
                SET jobs_completed = jobs_completed + 1,
                    updated_at = NOW()
                WHERE id = $1
                RETURNING {PROVIDER_COLUMNS}
                "#,
            ),
        )
        .await
    }

    /// 加权平均在数据库侧原子更新，避免读改写竞态
    async fn record_rating(&self, id: i64, rating: f64) -> DispatchResult<Provider> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE providers
            SET avg_rating = (avg_rating * total_ratings + $2) / (total_ratings + 1),
                total_ratings = total_ratings + 1,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PROVIDER_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(rating)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_provider(&row),
            None => Err(DispatchError::provider_not_found(id)),
        }
    }
}

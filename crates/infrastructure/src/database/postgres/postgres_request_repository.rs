use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::{debug, instrument};

use dispatch_domain::entities::{NewServiceRequest, RequestStatus, ServiceRequest};
use dispatch_domain::repositories::RequestRepository;
use dispatch_errors::DispatchResult;

const REQUEST_COLUMNS: &str = "id, client_id, provider_id, service_type, description, address, \
     lat, lng, geohash, urgent, status, created_at, updated_at";

pub struct PostgresRequestRepository {
    pool: PgPool,
}

impl PostgresRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_request(row: &sqlx::postgres::PgRow) -> DispatchResult<ServiceRequest> {
        Ok(ServiceRequest {
            id: row.try_get("id")?,
            client_id: row.try_get("client_id")?,
            provider_id: row.try_get("provider_id")?,
            service_type: row.try_get("service_type")?,
            description: row.try_get("description")?,
            address: row.try_get("address")?,
            lat: row.try_get("lat")?,
            lng: row.try_get("lng")?,
            geohash: row.try_get("geohash")?,
            urgent: row.try_get("urgent")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl RequestRepository for PostgresRequestRepository {
    #[instrument(skip(self, request), fields(client_id = %request.client_id))]
    async fn create(&self, request: &NewServiceRequest) -> DispatchResult<ServiceRequest> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO requests (client_id, service_type, description, address, lat, lng, geohash, urgent, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'PUBLISHED')
            RETURNING {REQUEST_COLUMNS}
            "#,
        ))
        .bind(request.client_id)
        .bind(&request.service_type)
        .bind(&request.description)
        .bind(&request.address)
        .bind(request.lat)
        .bind(request.lng)
        .bind(&request.geohash)
        .bind(request.urgent)
        .fetch_one(&self.pool)
        .await?;

        let created = Self::row_to_request(&row)?;
        debug!("服务单创建成功: {}", created.entity_description());
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> DispatchResult<Option<ServiceRequest>> {
        let row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_request).transpose()
    }

    async fn list_by_status(
        &self,
        status: RequestStatus,
        limit: i64,
    ) -> DispatchResult<Vec<ServiceRequest>> {
        let rows = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests WHERE status = $1 ORDER BY id LIMIT $2"
        ))
        .bind(status)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_request).collect()
    }

    /// 单条 UPDATE 的条件谓词保证互斥，不需要显式事务或行锁。
    /// 并发调用时数据库对同一行的写入串行化，第二个调用的谓词不再成立。
    #[instrument(skip(self))]
    async fn try_assign_provider(
        &self,
        request_id: i64,
        provider_id: i64,
    ) -> DispatchResult<Option<ServiceRequest>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE requests
            SET provider_id = $2, status = 'ACCEPTED', updated_at = NOW()
            WHERE id = $1 AND status = 'PUBLISHED' AND provider_id IS NULL
            RETURNING {REQUEST_COLUMNS}
            "#,
        ))
        .bind(request_id)
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_request).transpose()
    }

    #[instrument(skip(self))]
    async fn update_status_from(
        &self,
        request_id: i64,
        from: RequestStatus,
        to: RequestStatus,
    ) -> DispatchResult<Option<ServiceRequest>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE requests
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {REQUEST_COLUMNS}
            "#,
        ))
        .bind(request_id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_request).transpose()
    }
}

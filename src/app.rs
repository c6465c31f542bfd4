use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, sync::broadcast};
use tracing::info;

use dispatch_api::create_app;
use dispatch_config::AppConfig;
use dispatch_infrastructure::{
    create_pool, LoggingContractGenerator, LoggingSettlementLedger, PostgresProviderRepository,
    PostgresRequestRepository,
};

/// 主应用程序: 装配仓储、调度引擎与HTTP服务
pub struct Application {
    config: AppConfig,
    request_repo: Arc<PostgresRequestRepository>,
    provider_repo: Arc<PostgresProviderRepository>,
}

impl Application {
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!("初始化调度匹配系统");

        let pool = create_pool(&config.database)
            .await
            .context("创建数据库连接池失败")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("执行数据库迁移失败")?;

        let request_repo = Arc::new(PostgresRequestRepository::new(pool.clone()));
        let provider_repo = Arc::new(PostgresProviderRepository::new(pool));

        Ok(Self {
            config,
            request_repo,
            provider_repo,
        })
    }

    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let app = create_app(
            self.request_repo.clone(),
            self.provider_repo.clone(),
            Arc::new(LoggingContractGenerator),
            Arc::new(LoggingSettlementLedger),
            self.config.dispatch.clone(),
        );

        let listener = TcpListener::bind(&self.config.api.bind_address)
            .await
            .with_context(|| format!("绑定地址失败: {}", self.config.api.bind_address))?;

        info!("API服务器监听: {}", self.config.api.bind_address);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("API服务器收到关闭信号");
            })
            .await
            .context("API服务器运行失败")?;

        info!("API服务器已停止");
        Ok(())
    }
}

//! 外部协作方端口
//!
//! 合同/发票生成与钱包结算由独立子系统负责，这里只定义调用接口。
//! 这些调用失败不会回滚状态迁移，由调用方记录日志后继续。

use async_trait::async_trait;

use dispatch_errors::DispatchResult;

use crate::entities::ServiceRequest;

/// 合同与发票生成服务
#[async_trait]
pub trait ContractGenerator: Send + Sync {
    /// 接单成功后生成合同
    async fn generate_contract(&self, request: &ServiceRequest) -> DispatchResult<()>;
    /// 服务单完成后生成发票
    async fn generate_invoice(&self, request: &ServiceRequest) -> DispatchResult<()>;
}

/// 钱包结算账本
#[async_trait]
pub trait SettlementLedger: Send + Sync {
    /// 服务单完成后结算服务商收益
    async fn settle_completion(&self, request: &ServiceRequest) -> DispatchResult<()>;
}

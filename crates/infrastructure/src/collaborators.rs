//! 外部协作方适配器
//!
//! 合同、发票与钱包结算由独立子系统处理。当前部署里它们通过
//! 消息通道异步对接，这里的实现只负责记录调用并生成追踪用的
//! 单据编号，真实对接由运维按环境切换。

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use dispatch_domain::entities::ServiceRequest;
use dispatch_domain::ports::{ContractGenerator, SettlementLedger};
use dispatch_errors::DispatchResult;

#[derive(Debug, Default)]
pub struct LoggingContractGenerator;

#[async_trait]
impl ContractGenerator for LoggingContractGenerator {
    async fn generate_contract(&self, request: &ServiceRequest) -> DispatchResult<()> {
        let contract_no = Uuid::new_v4();
        info!(
            "为 {} 生成合同 {} (服务商: {:?})",
            request.entity_description(),
            contract_no,
            request.provider_id
        );
        Ok(())
    }

    async fn generate_invoice(&self, request: &ServiceRequest) -> DispatchResult<()> {
        let invoice_no = Uuid::new_v4();
        info!(
            "为 {} 生成发票 {}",
            request.entity_description(),
            invoice_no
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct LoggingSettlementLedger;

#[async_trait]
impl SettlementLedger for LoggingSettlementLedger {
    async fn settle_completion(&self, request: &ServiceRequest) -> DispatchResult<()> {
        info!(
            "服务单 #{} 完成, 触发服务商 {:?} 的收益结算",
            request.id, request.provider_id
        );
        Ok(())
    }
}

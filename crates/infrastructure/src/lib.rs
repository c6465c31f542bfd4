//! 基础设施层
//!
//! Postgres 仓储实现与外部协作方适配器。

pub mod collaborators;
pub mod database;

pub use collaborators::{LoggingContractGenerator, LoggingSettlementLedger};
pub use database::*;

// ==========================================
// 爆破设计引擎 - API 层
// ==========================================
// 职责: 面向宿主的异步接口, 连接外部数据来源与计算引擎
// ==========================================

pub mod blast_design_api;
pub mod error;
pub mod sources;

// 重导出核心类型
pub use blast_design_api::{BlastDesignApi, BlastDesignReport};
pub use error::{ApiError, ApiResult};
pub use sources::{
    ConnectorSource, InMemoryBlastSource, MaterialSource, PatternSource, SiteDesign,
};

// ==========================================
// 爆破设计引擎 - 配置层
// ==========================================
// 职责: 引擎参数管理, 支持 site → project → global 覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod engine_config;
pub mod engine_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager, ConfigScope};
pub use engine_config::EngineConfig;
pub use engine_config_trait::EngineConfigReader;

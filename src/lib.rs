// ==========================================
// 爆破设计引擎 - 核心库
// ==========================================
// 组成: 装药计算 + 起爆网络 + 起爆时序
// 技术栈: Rust + petgraph + SQLite(配置)
// 系统定位: 纯计算引擎, 输入不可变, 输出不可变
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 计算与校验
pub mod engine;

// 配置层 - 引擎参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 宿主接口
pub mod api;

// 导出层 - CSV / JSON
pub mod exporter;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    ConnectorType, DetonatorType, HoleKey, PowderFactorBasis, ScheduleState, SiteScope,
};

// 领域实体
pub use domain::{
    ChargeResult, Connector, DetonatorAssignment, DrillPoint, ExplosiveMaterial, FiringSchedule,
    HoleCharge, InitiationPlan, PatternSettings, ScheduleEntry, TimingAnalysis,
};

// 引擎
pub use engine::{
    per_meter, CalcError, ChargeCalculator, CycleError, GeometryError, InitiationNetwork,
    NetworkError, ScheduleComputation, ScheduleError, Sequencer, ValidationError,
};

// 配置
pub use config::{ConfigManager, EngineConfig, EngineConfigReader};

// API
pub use api::{ApiError, BlastDesignApi, BlastDesignReport, InMemoryBlastSource, SiteDesign};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "爆破设计计算与起爆排序引擎";

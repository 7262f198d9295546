// ==========================================
// 爆破设计引擎 - 领域模型层
// ==========================================
// 依据: DrillPoints / PatternSettings / BlastConnections /
//       DetonatorInfos / ExplosiveCalculationResult 表结构
// ==========================================
// 职责: 定义领域实体与值类型
// 红线: 不含计算逻辑, 不含存储逻辑
// ==========================================

pub mod charge;
pub mod connector;
pub mod drill_point;
pub mod material;
pub mod schedule;
pub mod types;

// 重导出核心类型
pub use charge::{ChargeResult, HoleCharge};
pub use connector::{Connector, DetonatorAssignment, InitiationPlan};
pub use drill_point::{DrillPoint, PatternSettings, ResolvedHole};
pub use material::ExplosiveMaterial;
pub use schedule::{ArrivalEdge, FiringSchedule, ScheduleEntry, TimingAnalysis};
pub use types::{
    ConnectorType, DetonatorType, HoleKey, PowderFactorBasis, ScheduleState, SiteScope,
};

// ==========================================
// 爆破设计引擎 - 引擎层
// ==========================================
// 组成: 几何校验 → 装药计算 / 起爆网络 → 时序计算 → 校验层
// ==========================================
// 职责: 纯计算, 无 I/O, 输入不可变, 输出为新的不可变值
// 红线: 任一不变量违反即拒绝整个计算
// ==========================================

pub mod charge_calculator;
pub mod error;
pub mod fingerprint;
pub mod geometry;
pub mod network;
pub mod sequencer;
pub mod timing_analysis;
pub mod validation;

// 重导出核心引擎
pub use charge_calculator::{per_meter, ChargeCalculator};
pub use error::{
    CalcError, CalcResult, CycleError, GeometryError, NetworkError, ScheduleError,
    ScheduleResult, ValidationError,
};
pub use network::InitiationNetwork;
pub use sequencer::{ScheduleComputation, Sequencer};
pub use timing_analysis::{analyze as analyze_timing, DEFAULT_WINDOW_MS};

// ==========================================
// 爆破设计引擎 - 引擎参数
// ==========================================
// 职责: 量纲边界 / 单耗口径 / 校验精度 / 时序统计窗口
// 来源: config_kv (ConfigManager) 或直接构造
// ==========================================

use crate::domain::types::PowderFactorBasis;
use serde::{Deserialize, Serialize};

// ==========================================
// EngineConfig - 引擎参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 乳化炸药密度上限 (g/cm³)
    pub max_emulsion_density: f64,
    /// ANFO 密度上限 (g/cm³)
    pub max_anfo_density: f64,
    /// 孔径上限 (m)
    pub max_diameter_m: f64,
    /// 单孔乳化炸药配额上限 (kg)
    pub max_emulsion_per_hole_kg: f64,
    /// 装药柱分段守恒的相对误差
    pub column_epsilon: f64,
    pub powder_factor_basis: PowderFactorBasis,
    /// 时序统计窗口 (ms)
    pub simultaneity_window_ms: u32,
    /// 是否拒绝坐标重合的炮孔
    pub require_unique_coordinates: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_emulsion_density: 10.0,
            max_anfo_density: 5.0,
            max_diameter_m: 1.0,
            max_emulsion_per_hole_kg: 1_000.0,
            column_epsilon: 1e-9,
            powder_factor_basis: PowderFactorBasis::Volume,
            simultaneity_window_ms: 8,
            require_unique_coordinates: true,
        }
    }
}

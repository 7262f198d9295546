// ==========================================
// 爆破设计引擎 - 炸药物料领域模型
// ==========================================
// 依据: ExplosiveCalculationResult 输入字段
// 单位: 密度 g/cm³ (= t/m³), 单孔乳化炸药 kg
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// ExplosiveMaterial - 炸药物料参数
// ==========================================
// 装药策略: 乳化炸药优先（孔底主装药）, 其余空间装填铵油炸药
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplosiveMaterial {
    /// 乳化炸药密度 (g/cm³)
    pub emulsion_density: f64,
    /// 铵油炸药(ANFO)密度 (g/cm³)
    pub anfo_density: f64,
    /// 单孔乳化炸药配额 (kg)
    pub emulsion_per_hole: f64,
}

impl Default for ExplosiveMaterial {
    fn default() -> Self {
        Self {
            emulsion_density: 1.2,
            anfo_density: 0.8,
            emulsion_per_hole: 25.0,
        }
    }
}

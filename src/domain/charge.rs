// ==========================================
// 爆破设计引擎 - 装药计算结果领域模型
// ==========================================
// 依据: ExplosiveCalculationResult 表结构
// 红线: 结果一经生成不可修改; 重算生成新 calculation_id
// ==========================================

use crate::domain::drill_point::PatternSettings;
use crate::domain::material::ExplosiveMaterial;
use crate::domain::types::{PowderFactorBasis, SiteScope};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// HoleCharge - 单孔装药明细
// ==========================================
// 不变量: emulsion_covering_space + remaining_space = chargeable_length
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoleCharge {
    pub hole_id: String,

    // ===== 几何 =====
    pub depth: f64,
    pub stemming: f64,
    pub diameter: f64,
    pub chargeable_length: f64,

    // ===== 装药柱分段 (m) =====
    pub emulsion_covering_space: f64,
    pub remaining_space: f64,
    pub anfo_covering_space: f64,

    // ===== 装药量 (kg) =====
    pub emulsion_kg: f64,
    pub anfo_kg: f64,

    // ===== 破碎岩石方量 (m³) =====
    pub rock_volume_m3: f64,
}

impl HoleCharge {
    pub fn total_kg(&self) -> f64 {
        self.emulsion_kg + self.anfo_kg
    }
}

// ==========================================
// ChargeResult - 一次装药计算的完整结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeResult {
    // ===== 标识 =====
    pub calculation_id: Uuid,
    pub scope: SiteScope,
    pub created_at: DateTime<Utc>,

    // ===== 输入快照 =====
    pub pattern_snapshot: PatternSettings,
    pub material: ExplosiveMaterial,

    // ===== 汇总 =====
    pub total_depth: f64,
    pub average_depth: f64,
    pub number_of_filled_holes: usize,
    pub emulsion_per_meter: f64, // kg/m, 实际孔径按可装药长度加权
    pub anfo_per_meter: f64,     // kg/m, 同上
    pub emulsion_covering_space: f64,
    pub remaining_space: f64,
    pub anfo_covering_space: f64,
    pub total_anfo: f64,
    pub total_emulsion: f64,
    pub total_explosive: f64,
    pub total_volume: f64,
    pub total_rock: f64,
    pub powder_factor: f64,
    pub powder_factor_basis: PowderFactorBasis,

    // ===== 明细与审计 =====
    pub holes: Vec<HoleCharge>,
    /// 参与计算的炮孔 ID（排序后）
    pub point_ids: Vec<String>,
    /// 补齐后几何参数的 SHA-256 指纹
    pub geometry_fingerprint: String,
}

impl ChargeResult {
    /// 按孔号查找单孔装药
    pub fn hole(&self, hole_id: &str) -> Option<&HoleCharge> {
        self.holes.iter().find(|h| h.hole_id == hole_id)
    }

    pub fn powder_factor_unit(&self) -> &'static str {
        self.powder_factor_basis.unit()
    }
}

// ==========================================
// 爆破设计引擎 - 装药计算引擎
// ==========================================
// 依据: ExplosiveCalculationResult 字段口径
// 策略: 乳化炸药优先 (孔底主装药), 剩余空间装填 ANFO
// ==========================================
// 职责: 孔网几何 + 炸药物料 → 单孔/汇总装药量
// 输入: 炮孔列表 + 炸药物料 + 孔网名义参数
// 输出: ChargeResult（不可变, 每次计算新 calculation_id）
// ==========================================
// 红线: 空间不足时只削减 ANFO, 不削减乳化炸药柱
// 红线: 任一炮孔非法即整体拒绝
// ==========================================

use crate::config::EngineConfig;
use crate::domain::charge::{ChargeResult, HoleCharge};
use crate::domain::drill_point::{DrillPoint, PatternSettings, ResolvedHole};
use crate::domain::material::ExplosiveMaterial;
use crate::domain::types::{PowderFactorBasis, SiteScope};
use crate::engine::error::{CalcError, CalcResult, GeometryError};
use crate::engine::{geometry, validation};
use chrono::Utc;
use std::f64::consts::PI;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// 单位长度装药量 (kg/m)
///
/// 单位长度圆柱体积 π·(d/2)² (m³) × 密度 (g/cm³ = t/m³) × 1000
pub fn per_meter(diameter_m: f64, density_g_cm3: f64) -> f64 {
    let radius = diameter_m / 2.0;
    PI * radius * radius * density_g_cm3 * 1000.0
}

/// 可装药长度 = 孔深 - 填塞
pub fn chargeable_length(hole: &ResolvedHole) -> f64 {
    hole.chargeable_length()
}

/// 装药柱分段结果 (m)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnSplit {
    pub emulsion_covering_space: f64,
    pub remaining_space: f64,
}

/// 按乳化炸药优先划分装药柱
///
/// 乳化段长度 = min(单孔配额 / 乳化单位装药量, 可装药长度), 其余为 ANFO
pub fn split_column(chargeable: f64, emulsion_per_hole_kg: f64, emulsion_per_meter: f64) -> ColumnSplit {
    let emulsion_len = if emulsion_per_meter > 0.0 {
        (emulsion_per_hole_kg / emulsion_per_meter).clamp(0.0, chargeable)
    } else {
        0.0
    };
    ColumnSplit {
        emulsion_covering_space: emulsion_len,
        remaining_space: chargeable - emulsion_len,
    }
}

/// 爆区综合单位装药量 (kg/m)
///
/// 孔径一致时即该孔径下的 `per_meter`; 否则按可装药长度加权
pub fn column_loading_rate(holes: &[HoleCharge], density: f64) -> f64 {
    let Some(first) = holes.first() else {
        return 0.0;
    };
    if holes.iter().all(|h| h.diameter == first.diameter) {
        return per_meter(first.diameter, density);
    }
    let length: f64 = holes.iter().map(|h| h.chargeable_length).sum();
    if length <= 0.0 {
        return 0.0;
    }
    let weighted: f64 = holes
        .iter()
        .map(|h| per_meter(h.diameter, density) * h.chargeable_length)
        .sum();
    weighted / length
}

// ==========================================
// ChargeCalculator - 装药计算引擎
// ==========================================
pub struct ChargeCalculator {
    config: EngineConfig,
}

impl Default for ChargeCalculator {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl ChargeCalculator {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 计算装药量（作用域取自第一个炮孔）
    pub fn compute(
        &self,
        points: &[DrillPoint],
        material: &ExplosiveMaterial,
        pattern: &PatternSettings,
    ) -> CalcResult<ChargeResult> {
        let scope = points.first().map(|p| p.scope()).ok_or(CalcError::EmptyPattern)?;
        self.compute_in_scope(scope, points, material, pattern)
    }

    /// 在指定作用域内计算装药量
    ///
    /// 步骤:
    /// 1) 物料/孔径量纲校验
    /// 2) 作用域与孔号唯一性校验
    /// 3) 单孔几何校验 + 补齐默认值 + 可装药长度 > 0
    /// 4) 乳化优先分段, 计算单孔装药量与岩石方量
    /// 5) 汇总 + 单耗
    /// 6) 结果自检
    #[instrument(skip(self, points, material, pattern), fields(
        scope = %scope,
        points_count = points.len()
    ))]
    pub fn compute_in_scope(
        &self,
        scope: SiteScope,
        points: &[DrillPoint],
        material: &ExplosiveMaterial,
        pattern: &PatternSettings,
    ) -> CalcResult<ChargeResult> {
        let result = self.compute_inner(scope, points, material, pattern);
        match &result {
            Ok(r) => info!(
                calculation_id = %r.calculation_id,
                filled_holes = r.number_of_filled_holes,
                total_explosive_kg = r.total_explosive,
                powder_factor = r.powder_factor,
                unit = r.powder_factor_unit(),
                "装药计算完成"
            ),
            Err(e) => warn!(error = %e, "装药计算被拒绝"),
        }
        result
    }

    fn compute_inner(
        &self,
        scope: SiteScope,
        points: &[DrillPoint],
        material: &ExplosiveMaterial,
        pattern: &PatternSettings,
    ) -> CalcResult<ChargeResult> {
        // 1. 量纲校验
        self.check_material_units(material)?;
        geometry::validate_pattern_settings(pattern)?;
        // 名义孔径仅在有炮孔沿用时才需满足上限
        if points.iter().any(|p| p.diameter.is_none()) {
            self.check_diameter("pattern.diameter", pattern.diameter)?;
        }

        if points.is_empty() {
            return Err(CalcError::EmptyPattern);
        }

        // 2. 作用域 + 唯一性
        validation::validate_scope(scope, points)?;
        validation::validate_unique_holes(points)?;

        // 3. 单孔几何
        let mut resolved = Vec::with_capacity(points.len());
        for point in points {
            geometry::validate(point)?;
            let hole = point.resolve(pattern);
            self.check_diameter("diameter", hole.diameter)?;
            if hole.chargeable_length() <= 0.0 {
                return Err(GeometryError::NonPositiveChargeableLength {
                    hole_id: hole.hole_id.clone(),
                    depth: hole.depth,
                    stemming: hole.stemming,
                }
                .into());
            }
            resolved.push(hole);
        }
        if self.config.require_unique_coordinates {
            geometry::ensure_unique_coordinates(points)?;
        }

        // 4. 单孔装药
        let holes: Vec<HoleCharge> = resolved
            .iter()
            .map(|hole| self.charge_hole(hole, material, pattern))
            .collect();

        let number_of_filled_holes = holes.iter().filter(|h| h.chargeable_length > 0.0).count();
        if number_of_filled_holes == 0 {
            return Err(CalcError::EmptyPattern);
        }

        // 5. 汇总
        let total_depth: f64 = holes.iter().map(|h| h.depth).sum();
        let total_emulsion: f64 = holes.iter().map(|h| h.emulsion_kg).sum();
        let total_anfo: f64 = holes.iter().map(|h| h.anfo_kg).sum();
        let total_volume: f64 = holes.iter().map(|h| h.rock_volume_m3).sum();
        let basis = self.config.powder_factor_basis;
        let total_rock = match basis {
            PowderFactorBasis::Volume => total_volume,
            PowderFactorBasis::Mass => total_volume * pattern.rock_density,
        };
        let total_explosive = total_anfo + total_emulsion;

        let mut point_ids: Vec<String> = holes.iter().map(|h| h.hole_id.clone()).collect();
        point_ids.sort();

        let result = ChargeResult {
            calculation_id: Uuid::new_v4(),
            scope,
            created_at: Utc::now(),
            pattern_snapshot: pattern.clone(),
            material: material.clone(),
            total_depth,
            average_depth: total_depth / holes.len() as f64,
            number_of_filled_holes,
            emulsion_per_meter: column_loading_rate(&holes, material.emulsion_density),
            anfo_per_meter: column_loading_rate(&holes, material.anfo_density),
            emulsion_covering_space: holes.iter().map(|h| h.emulsion_covering_space).sum(),
            remaining_space: holes.iter().map(|h| h.remaining_space).sum(),
            anfo_covering_space: holes.iter().map(|h| h.anfo_covering_space).sum(),
            total_anfo,
            total_emulsion,
            total_explosive,
            total_volume,
            total_rock,
            powder_factor: total_explosive / total_rock,
            powder_factor_basis: basis,
            geometry_fingerprint: geometry::geometry_fingerprint(&resolved),
            point_ids,
            holes,
        };

        // 6. 自检
        validation::validate_charge_result(&result, self.config.column_epsilon)?;
        Ok(result)
    }

    /// 单孔装药
    fn charge_hole(
        &self,
        hole: &ResolvedHole,
        material: &ExplosiveMaterial,
        pattern: &PatternSettings,
    ) -> HoleCharge {
        let chargeable = hole.chargeable_length();
        let emulsion_pm = per_meter(hole.diameter, material.emulsion_density);
        let anfo_pm = per_meter(hole.diameter, material.anfo_density);
        let split = split_column(chargeable, material.emulsion_per_hole, emulsion_pm);
        let bench_height = pattern.bench_height.unwrap_or(hole.depth);

        HoleCharge {
            hole_id: hole.hole_id.clone(),
            depth: hole.depth,
            stemming: hole.stemming,
            diameter: hole.diameter,
            chargeable_length: chargeable,
            emulsion_covering_space: split.emulsion_covering_space,
            remaining_space: split.remaining_space,
            anfo_covering_space: split.remaining_space,
            emulsion_kg: split.emulsion_covering_space * emulsion_pm,
            anfo_kg: split.remaining_space * anfo_pm,
            rock_volume_m3: hole.spacing * hole.burden * bench_height,
        }
    }

    // ==========================================
    // 量纲校验
    // ==========================================

    fn check_range(field: &str, value: f64, min: f64, max: f64) -> CalcResult<()> {
        if value.is_finite() && value > min && value <= max {
            Ok(())
        } else {
            Err(CalcError::InconsistentUnits {
                field: field.to_string(),
                value,
                min,
                max,
            })
        }
    }

    fn check_material_units(&self, material: &ExplosiveMaterial) -> CalcResult<()> {
        Self::check_range(
            "emulsion_density",
            material.emulsion_density,
            0.0,
            self.config.max_emulsion_density,
        )?;
        Self::check_range("anfo_density", material.anfo_density, 0.0, self.config.max_anfo_density)?;

        // 单孔配额允许为 0（纯 ANFO 装药）
        let q = material.emulsion_per_hole;
        if !q.is_finite() || q < 0.0 || q > self.config.max_emulsion_per_hole_kg {
            return Err(CalcError::InconsistentUnits {
                field: "emulsion_per_hole".to_string(),
                value: q,
                min: 0.0,
                max: self.config.max_emulsion_per_hole_kg,
            });
        }
        Ok(())
    }

    fn check_diameter(&self, field: &str, diameter: f64) -> CalcResult<()> {
        Self::check_range(field, diameter, 0.0, self.config.max_diameter_m)
    }
}

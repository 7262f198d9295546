// ==========================================
// 爆破设计引擎 - 校验层
// ==========================================
// 职责: 装药计算与起爆时序在交付前的跨模块不变量检查
// 红线: 只读检查, 不修正任何数据
// ==========================================

use crate::domain::charge::ChargeResult;
use crate::domain::drill_point::{DrillPoint, ResolvedHole};
use crate::domain::schedule::FiringSchedule;
use crate::domain::types::SiteScope;
use crate::engine::error::ValidationError;
use crate::engine::geometry;
use crate::engine::network::InitiationNetwork;
use std::collections::{BTreeMap, BTreeSet};

/// 所有炮孔必须属于同一作用域
pub fn validate_scope(scope: SiteScope, points: &[DrillPoint]) -> Result<(), ValidationError> {
    for point in points {
        let actual = point.scope();
        if actual != scope {
            return Err(ValidationError::CrossScopeReference {
                hole_id: point.hole_id.clone(),
                expected: scope,
                actual,
            });
        }
    }
    Ok(())
}

/// 同一作用域内孔号唯一
pub fn validate_unique_holes(points: &[DrillPoint]) -> Result<(), ValidationError> {
    let mut seen = BTreeSet::new();
    for point in points {
        if !seen.insert(point.hole_id.as_str()) {
            return Err(ValidationError::DuplicateHole {
                hole_id: point.hole_id.clone(),
            });
        }
    }
    Ok(())
}

fn within(expected: f64, actual: f64, epsilon: f64) -> bool {
    (expected - actual).abs() <= epsilon * expected.abs().max(1.0)
}

fn check_total(field: &str, expected: f64, actual: f64, epsilon: f64) -> Result<(), ValidationError> {
    if within(expected, actual, epsilon) {
        Ok(())
    } else {
        Err(ValidationError::TotalsMismatch {
            field: field.to_string(),
            expected,
            actual,
        })
    }
}

/// 装药结果自检
///
/// - 乳化段 + 剩余段 = 可装药长度（epsilon 内）
/// - 填塞 + 装药柱 ≤ 孔深
/// - 汇总值与单孔明细一致, total_explosive 严格等于两者之和
pub fn validate_charge_result(result: &ChargeResult, epsilon: f64) -> Result<(), ValidationError> {
    for hole in &result.holes {
        let column = hole.emulsion_covering_space + hole.remaining_space;
        if hole.emulsion_covering_space < 0.0
            || hole.remaining_space < 0.0
            || !within(hole.chargeable_length, column, epsilon)
        {
            return Err(ValidationError::ColumnPartitionMismatch {
                hole_id: hole.hole_id.clone(),
                emulsion: hole.emulsion_covering_space,
                remaining: hole.remaining_space,
                chargeable: hole.chargeable_length,
            });
        }
        if hole.stemming + column > hole.depth + epsilon * hole.depth.max(1.0) {
            return Err(ValidationError::ChargeExceedsDepth {
                hole_id: hole.hole_id.clone(),
                stemming: hole.stemming,
                charge_length: column,
                depth: hole.depth,
            });
        }
    }

    let ids: BTreeSet<&str> = result.holes.iter().map(|h| h.hole_id.as_str()).collect();
    for id in &result.point_ids {
        if !ids.contains(id.as_str()) {
            return Err(ValidationError::MissingHole { hole_id: id.clone() });
        }
    }
    if ids.len() != result.point_ids.len() {
        if let Some(extra) = ids.iter().find(|id| !result.point_ids.iter().any(|p| p == *id)) {
            return Err(ValidationError::MissingHole {
                hole_id: extra.to_string(),
            });
        }
    }

    let sum_emulsion: f64 = result.holes.iter().map(|h| h.emulsion_kg).sum();
    let sum_anfo: f64 = result.holes.iter().map(|h| h.anfo_kg).sum();
    let sum_depth: f64 = result.holes.iter().map(|h| h.depth).sum();
    check_total("total_emulsion", sum_emulsion, result.total_emulsion, epsilon)?;
    check_total("total_anfo", sum_anfo, result.total_anfo, epsilon)?;
    check_total("total_depth", sum_depth, result.total_depth, epsilon)?;

    let expected_total = result.total_anfo + result.total_emulsion;
    if result.total_explosive != expected_total {
        return Err(ValidationError::TotalsMismatch {
            field: "total_explosive".to_string(),
            expected: expected_total,
            actual: result.total_explosive,
        });
    }

    let filled = result.holes.iter().filter(|h| h.chargeable_length > 0.0).count();
    if filled != result.number_of_filled_holes {
        return Err(ValidationError::TotalsMismatch {
            field: "number_of_filled_holes".to_string(),
            expected: filled as f64,
            actual: result.number_of_filled_holes as f64,
        });
    }

    if !result.powder_factor.is_finite() {
        return Err(ValidationError::TotalsMismatch {
            field: "powder_factor".to_string(),
            expected: result.total_explosive,
            actual: result.powder_factor,
        });
    }
    Ok(())
}

/// 起爆时序自检
///
/// - 网络中每个炮孔都有时刻
/// - 起爆点时刻为 0
/// - 任一有效连接满足 time(to) ≤ time(from) + delay
/// - 非起爆点恰好由其 via 入边取得时刻
/// - 起爆时刻 = 到达时刻 + 孔内延时
pub fn validate_schedule(
    network: &InitiationNetwork,
    schedule: &FiringSchedule,
) -> Result<(), ValidationError> {
    if schedule.scope != network.scope() {
        let hole_id = schedule.firing_order.first().cloned().unwrap_or_default();
        return Err(ValidationError::CrossScopeReference {
            hole_id,
            expected: network.scope(),
            actual: schedule.scope,
        });
    }

    for hole in network.holes() {
        if !schedule.entries.contains_key(hole) {
            return Err(ValidationError::MissingHole {
                hole_id: hole.to_string(),
            });
        }
    }
    if schedule.entries.len() != network.hole_count() || schedule.firing_order.len() != network.hole_count() {
        return Err(ValidationError::ScheduleInconsistent {
            hole_id: String::new(),
            reason: format!(
                "时序条目数 {} / 顺序长度 {} 与网络炮孔数 {} 不一致",
                schedule.entries.len(),
                schedule.firing_order.len(),
                network.hole_count()
            ),
        });
    }

    let inconsistent = |hole_id: &str, reason: String| ValidationError::ScheduleInconsistent {
        hole_id: hole_id.to_string(),
        reason,
    };

    for connector in network.active_connectors() {
        let (Some(from), Some(to)) = (
            schedule.time_of(&connector.from),
            schedule.time_of(&connector.to),
        ) else {
            continue;
        };
        if to > from + u64::from(connector.delay_ms) {
            return Err(inconsistent(
                &connector.to,
                format!("经 {} 可在 {} ms 到达, 实际 {} ms", connector.from, from + u64::from(connector.delay_ms), to),
            ));
        }
    }

    let initiation: BTreeSet<&str> = schedule.initiation_points.iter().map(String::as_str).collect();
    for (hole_id, entry) in &schedule.entries {
        if entry.detonation_time_ms != entry.fire_time_ms + u64::from(entry.in_hole_delay_ms) {
            return Err(inconsistent(hole_id, "起爆时刻与孔内延时不符".to_string()));
        }
        if entry.in_hole_delay_ms != network.in_hole_delay(hole_id) {
            return Err(inconsistent(hole_id, "孔内延时与雷管分配不符".to_string()));
        }
        match &entry.via {
            None => {
                if !initiation.contains(hole_id.as_str()) || entry.fire_time_ms != 0 {
                    return Err(inconsistent(hole_id, "非起爆点缺少到达连接".to_string()));
                }
            }
            Some(via) => {
                let edge_exists = network
                    .incoming(hole_id)
                    .iter()
                    .any(|c| c.from == via.from && c.delay_ms == via.delay_ms);
                let tight = schedule
                    .time_of(&via.from)
                    .map(|t| t + u64::from(via.delay_ms) == entry.fire_time_ms)
                    .unwrap_or(false);
                if !edge_exists || !tight {
                    return Err(inconsistent(hole_id, format!("到达连接 {} 不成立", via.from)));
                }
            }
        }
    }

    let mut last = 0u64;
    for hole_id in &schedule.firing_order {
        let time = schedule.time_of(hole_id).unwrap_or(0);
        if time < last {
            return Err(inconsistent(hole_id, "起爆顺序未按到达时刻排列".to_string()));
        }
        last = time;
    }
    Ok(())
}

/// 装药结果与起爆时序必须覆盖同一组炮孔
///
/// 有装药无起爆时刻（或反之）即拒绝, 报告孔号最小的差异孔
pub fn ensure_same_holes(charges: &ChargeResult, schedule: &FiringSchedule) -> Result<(), ValidationError> {
    let charged: BTreeSet<&str> = charges.point_ids.iter().map(String::as_str).collect();
    let scheduled: BTreeSet<&str> = schedule.entries.keys().map(String::as_str).collect();
    match charged.symmetric_difference(&scheduled).min() {
        Some(hole_id) => Err(ValidationError::MissingHole {
            hole_id: hole_id.to_string(),
        }),
        None => Ok(()),
    }
}

/// 已定稿的装药结果所引用的炮孔不得被修改
///
/// 比对当前炮孔（按结果的孔网快照补齐）与结果中的几何指纹
pub fn ensure_points_unchanged(result: &ChargeResult, points: &[DrillPoint]) -> Result<(), ValidationError> {
    let current: BTreeMap<&str, &DrillPoint> = points
        .iter()
        .filter(|p| p.scope() == result.scope)
        .map(|p| (p.hole_id.as_str(), p))
        .collect();

    let mut resolved: Vec<ResolvedHole> = Vec::with_capacity(result.point_ids.len());
    for id in &result.point_ids {
        let point = current
            .get(id.as_str())
            .ok_or_else(|| ValidationError::MissingHole { hole_id: id.clone() })?;
        resolved.push(point.resolve(&result.pattern_snapshot));
    }

    if geometry::geometry_fingerprint(&resolved) != result.geometry_fingerprint {
        return Err(ValidationError::PointsModified {
            calculation_id: result.calculation_id.to_string(),
        });
    }
    Ok(())
}

// ==========================================
// 爆破设计引擎 - 孔网几何模型
// ==========================================
// 职责: 炮孔几何校验 + 孔网辅助计算（孔距/排距估计, 原点平移,
//       推荐填塞/孔径）
// 红线: 纯函数, 无副作用; 修改即整体替换
// ==========================================

use crate::domain::drill_point::{DrillPoint, PatternSettings, ResolvedHole};
use crate::engine::error::GeometryError;
use crate::engine::fingerprint::{calculate_checksum, exact_f64};
use std::collections::BTreeMap;

/// 坐标重合判定精度 (m)
pub const COORDINATE_PRECISION: f64 = 0.01;
/// 孔距估计: 忽略小于此值的坐标差 (m)
pub const GRID_PITCH_MIN_THRESHOLD: f64 = 0.5;
/// 孔距估计: 众数桶的最低支持率
pub const GRID_PITCH_SUPPORT_THRESHOLD: f64 = 0.10;
/// 标准孔径 (m)
pub const STANDARD_DIAMETERS: [f64; 15] = [
    0.089, 0.102, 0.115, 0.127, 0.140, 0.152, 0.165, 0.178, 0.191, 0.203, 0.216, 0.229, 0.254,
    0.279, 0.305,
];

// ==========================================
// 校验
// ==========================================

fn check_positive(hole_id: &str, field: &str, value: f64) -> Result<(), GeometryError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(GeometryError::NonPositive {
            hole_id: hole_id.to_string(),
            field: field.to_string(),
            value,
        })
    }
}

/// 校验单个炮孔
///
/// 规则:
/// 1) 坐标必须为有限值
/// 2) depth 必须为正
/// 3) 已提供的 diameter / spacing / burden / stemming 覆盖值必须为正
pub fn validate(point: &DrillPoint) -> Result<(), GeometryError> {
    if !point.x.is_finite() || !point.y.is_finite() {
        return Err(GeometryError::NonFiniteCoordinate {
            hole_id: point.hole_id.clone(),
            x: point.x,
            y: point.y,
        });
    }

    check_positive(&point.hole_id, "depth", point.depth)?;

    let overrides = [
        ("diameter", point.diameter),
        ("spacing", point.spacing),
        ("burden", point.burden),
        ("stemming", point.stemming),
    ];
    for (field, value) in overrides {
        if let Some(v) = value {
            check_positive(&point.hole_id, field, v)?;
        }
    }

    Ok(())
}

/// 校验孔网名义参数（以 "pattern" 作为 hole_id 报错）
pub fn validate_pattern_settings(pattern: &PatternSettings) -> Result<(), GeometryError> {
    check_positive("pattern", "spacing", pattern.spacing)?;
    check_positive("pattern", "burden", pattern.burden)?;
    check_positive("pattern", "diameter", pattern.diameter)?;
    check_positive("pattern", "stemming", pattern.stemming)?;
    check_positive("pattern", "rock_density", pattern.rock_density)?;
    if let Some(h) = pattern.bench_height {
        check_positive("pattern", "bench_height", h)?;
    }
    Ok(())
}

/// 坐标唯一性校验（两轴均小于 COORDINATE_PRECISION 视为重合）
pub fn ensure_unique_coordinates(points: &[DrillPoint]) -> Result<(), GeometryError> {
    let mut sorted: Vec<&DrillPoint> = points.iter().collect();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x));

    for (i, a) in sorted.iter().enumerate() {
        for b in sorted[i + 1..].iter() {
            if b.x - a.x >= COORDINATE_PRECISION {
                break;
            }
            if (a.y - b.y).abs() < COORDINATE_PRECISION {
                let (first, second) = if a.hole_id <= b.hole_id {
                    (a.hole_id.clone(), b.hole_id.clone())
                } else {
                    (b.hole_id.clone(), a.hole_id.clone())
                };
                return Err(GeometryError::CoincidentPoints { first, second });
            }
        }
    }
    Ok(())
}

// ==========================================
// 孔网辅助计算
// ==========================================

/// 两孔平面距离
pub fn distance(a: &DrillPoint, b: &DrillPoint) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    (dx * dx + dy * dy).sqrt()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn estimate_pitch(coords: impl Iterator<Item = f64>) -> f64 {
    let mut sorted: Vec<f64> = coords.collect();
    if sorted.len() < 2 {
        return 1.0;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut deltas: Vec<f64> = sorted
        .windows(2)
        .map(|w| round_to(w[1] - w[0], 3))
        .filter(|d| *d >= GRID_PITCH_MIN_THRESHOLD)
        .collect();
    if deltas.is_empty() {
        return 1.0;
    }

    // 0.1 m 分桶; 计数相同时取较小的桶
    let mut frequency: BTreeMap<i64, usize> = BTreeMap::new();
    for d in &deltas {
        *frequency.entry((d * 10.0).round() as i64).or_insert(0) += 1;
    }
    let (bucket, count) = frequency
        .iter()
        .fold((0i64, 0usize), |best, (k, v)| if *v > best.1 { (*k, *v) } else { best });

    let support = count as f64 / deltas.len() as f64;
    if support >= GRID_PITCH_SUPPORT_THRESHOLD {
        return bucket as f64 / 10.0;
    }

    deltas.sort_by(|a, b| a.total_cmp(b));
    round_to(deltas[deltas.len() / 2], 1)
}

/// 由炮孔坐标估计 (孔距, 排距)
///
/// x 方向坐标差估计孔距, y 方向估计排距; 数据不足时返回 1.0
pub fn estimate_grid_pitch(points: &[DrillPoint]) -> (f64, f64) {
    let spacing = estimate_pitch(points.iter().map(|p| p.x));
    let burden = estimate_pitch(points.iter().map(|p| p.y));
    (spacing, burden)
}

/// 平移所有炮孔, 使最小 x/y 为 0（保留 0.01 m）
pub fn anchor_to_origin(points: &[DrillPoint]) -> Vec<DrillPoint> {
    if points.is_empty() {
        return Vec::new();
    }
    let min_x = points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let min_y = points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);

    points
        .iter()
        .map(|p| DrillPoint {
            x: round_to(p.x - min_x, 2),
            y: round_to(p.y - min_y, 2),
            ..p.clone()
        })
        .collect()
}

/// 推荐填塞长度
///
/// 取 max(0.25·孔深, 排距), 限制在 [max(1.0, 0.8·排距), min(0.4·孔深, 8.0)]
pub fn optimal_stemming(depth: f64, burden: f64) -> f64 {
    let optimal = (depth * 0.25).max(burden);
    let min_stemming = (burden * 0.8).max(1.0);
    let max_stemming = (depth * 0.4).min(8.0);
    round_to(min_stemming.max(optimal.min(max_stemming)), 1)
}

/// 推荐孔径（吸附到最近的标准孔径）
pub fn optimal_diameter(burden: f64, spacing: f64) -> f64 {
    let by_burden = burden / 35.0;
    let by_area = (burden * spacing).sqrt() / 20.0;
    let calculated = by_burden.max(by_area);

    STANDARD_DIAMETERS
        .iter()
        .copied()
        .min_by(|a, b| (a - calculated).abs().total_cmp(&(b - calculated).abs()))
        .unwrap_or(STANDARD_DIAMETERS[0])
}

/// 补齐后几何参数的指纹（按 hole_id 排序, 位级精确）
pub fn geometry_fingerprint(holes: &[ResolvedHole]) -> String {
    let mut sorted: Vec<&ResolvedHole> = holes.iter().collect();
    sorted.sort_by(|a, b| a.hole_id.cmp(&b.hole_id));

    let mut content = String::new();
    for h in sorted {
        content.push_str(&h.hole_id);
        for v in [h.x, h.y, h.depth, h.diameter, h.spacing, h.burden, h.stemming] {
            content.push('|');
            content.push_str(&exact_f64(v));
        }
        content.push('\n');
    }
    calculate_checksum(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::SiteScope;

    fn point(id: &str, x: f64, y: f64) -> DrillPoint {
        DrillPoint::new(id, SiteScope::new(1, 1), x, y, 10.0)
    }

    #[test]
    fn test_validate_rejects_non_finite_coordinates() {
        let p = point("A", f64::NAN, 0.0);
        assert!(matches!(validate(&p), Err(GeometryError::NonFiniteCoordinate { .. })));

        let p = point("A", 0.0, f64::INFINITY);
        assert!(matches!(validate(&p), Err(GeometryError::NonFiniteCoordinate { .. })));
    }

    #[test]
    fn test_validate_rejects_non_positive_fields() {
        let mut p = point("A", 0.0, 0.0);
        p.depth = 0.0;
        match validate(&p) {
            Err(GeometryError::NonPositive { field, .. }) => assert_eq!(field, "depth"),
            other => panic!("unexpected: {:?}", other),
        }

        let p = point("A", 0.0, 0.0).with_stemming(-1.0);
        match validate(&p) {
            Err(GeometryError::NonPositive { field, value, .. }) => {
                assert_eq!(field, "stemming");
                assert_eq!(value, -1.0);
            }
            other => panic!("unexpected: {:?}", other),
        }

        assert!(validate(&point("A", 0.0, 0.0).with_diameter(0.0)).is_err());
    }

    #[test]
    fn test_validate_accepts_valid_point() {
        let p = point("A", 12.5, -3.0).with_stemming(3.0).with_diameter(0.115);
        assert!(validate(&p).is_ok());
    }

    #[test]
    fn test_validate_pattern_settings() {
        assert!(validate_pattern_settings(&PatternSettings::default()).is_ok());
        let bad = PatternSettings {
            bench_height: Some(0.0),
            ..PatternSettings::default()
        };
        assert!(validate_pattern_settings(&bad).is_err());
    }

    #[test]
    fn test_ensure_unique_coordinates() {
        let pts = vec![point("A", 0.0, 0.0), point("B", 3.0, 0.0), point("C", 0.005, 0.004)];
        assert_eq!(
            ensure_unique_coordinates(&pts),
            Err(GeometryError::CoincidentPoints {
                first: "A".into(),
                second: "C".into()
            })
        );

        let pts = vec![point("A", 0.0, 0.0), point("B", 0.0, 3.0)];
        assert!(ensure_unique_coordinates(&pts).is_ok());
    }

    #[test]
    fn test_distance() {
        assert_eq!(distance(&point("A", 0.0, 0.0), &point("B", 3.0, 4.0)), 5.0);
    }

    #[test]
    fn test_estimate_grid_pitch_regular_grid() {
        let mut pts = Vec::new();
        for row in 0..3 {
            for col in 0..4 {
                pts.push(point(
                    &format!("R{}C{}", row, col),
                    col as f64 * 3.5,
                    row as f64 * 2.8,
                ));
            }
        }
        let (spacing, burden) = estimate_grid_pitch(&pts);
        assert_eq!(spacing, 3.5);
        assert_eq!(burden, 2.8);
    }

    #[test]
    fn test_estimate_grid_pitch_insufficient_data() {
        assert_eq!(estimate_grid_pitch(&[point("A", 1.0, 1.0)]), (1.0, 1.0));
        // 所有坐标差都小于阈值
        let pts = vec![point("A", 0.0, 0.0), point("B", 0.2, 0.1)];
        assert_eq!(estimate_grid_pitch(&pts), (1.0, 1.0));
    }

    #[test]
    fn test_anchor_to_origin() {
        let pts = vec![point("A", 100.256, 50.0), point("B", 103.5, 52.8)];
        let anchored = anchor_to_origin(&pts);
        assert_eq!(anchored[0].x, 0.0);
        assert_eq!(anchored[0].y, 0.0);
        assert_eq!(anchored[1].x, 3.24);
        assert_eq!(anchored[1].y, 2.8);
        assert_eq!(anchored[1].hole_id, "B");
        assert!(anchor_to_origin(&[]).is_empty());
    }

    #[test]
    fn test_optimal_stemming() {
        // 0.25*10 = 2.5 < burden 3.0 → 3.0, 区间 [2.4, 4.0]
        assert_eq!(optimal_stemming(10.0, 3.0), 3.0);
        // 深孔: 0.25*40 = 10 → 上限 8.0
        assert_eq!(optimal_stemming(40.0, 3.0), 8.0);
        // 浅孔: 上限 0.4*2 = 0.8, 下限 max(1.0, 0.8) = 1.0
        assert_eq!(optimal_stemming(2.0, 1.0), 1.0);
    }

    #[test]
    fn test_optimal_diameter_snaps_to_standard_size() {
        // burden 3, spacing 3 → max(0.0857, 0.15) = 0.15 → 0.152
        assert_eq!(optimal_diameter(3.0, 3.0), 0.152);
        assert_eq!(optimal_diameter(0.5, 0.5), 0.089);
        assert_eq!(optimal_diameter(20.0, 20.0), 0.305);
    }

    #[test]
    fn test_geometry_fingerprint_order_independent() {
        let pattern = PatternSettings::default();
        let a = point("A", 0.0, 0.0).resolve(&pattern);
        let b = point("B", 3.0, 0.0).resolve(&pattern);
        let f1 = geometry_fingerprint(&[a.clone(), b.clone()]);
        let f2 = geometry_fingerprint(&[b.clone(), a.clone()]);
        assert_eq!(f1, f2);

        let mut moved = b;
        moved.depth += 0.01;
        assert_ne!(f1, geometry_fingerprint(&[a, moved]));
    }
}

// ==========================================
// 爆破设计引擎 - 炮孔与孔网参数领域模型
// ==========================================
// 依据: DrillPoints / PatternSettings 表结构
// 单位: 长度 m, 直径 m, 岩石密度 t/m³
// ==========================================
// 红线: 值对象, 无就地修改方法; 调用方整体替换
// ==========================================

use crate::domain::types::{HoleKey, SiteScope};
use serde::{Deserialize, Serialize};

// ==========================================
// DrillPoint - 炮孔
// ==========================================
// 主键: (hole_id, project_id, site_id)
// diameter / spacing / burden / stemming 可缺省, 由 PatternSettings 补齐
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillPoint {
    // ===== 主键 =====
    pub hole_id: String,
    pub project_id: i64,
    pub site_id: i64,

    // ===== 平面坐标 =====
    pub x: f64,
    pub y: f64,

    // ===== 几何参数 =====
    pub depth: f64,
    #[serde(default)]
    pub diameter: Option<f64>,
    #[serde(default)]
    pub spacing: Option<f64>,
    #[serde(default)]
    pub burden: Option<f64>,
    #[serde(default)]
    pub stemming: Option<f64>,
}

impl DrillPoint {
    /// 仅含必填字段的炮孔（其余参数取孔网默认值）
    pub fn new(hole_id: impl Into<String>, scope: SiteScope, x: f64, y: f64, depth: f64) -> Self {
        Self {
            hole_id: hole_id.into(),
            project_id: scope.project_id,
            site_id: scope.site_id,
            x,
            y,
            depth,
            diameter: None,
            spacing: None,
            burden: None,
            stemming: None,
        }
    }

    pub fn with_stemming(mut self, stemming: f64) -> Self {
        self.stemming = Some(stemming);
        self
    }

    pub fn with_diameter(mut self, diameter: f64) -> Self {
        self.diameter = Some(diameter);
        self
    }

    pub fn with_spacing_burden(mut self, spacing: f64, burden: f64) -> Self {
        self.spacing = Some(spacing);
        self.burden = Some(burden);
        self
    }

    pub fn scope(&self) -> SiteScope {
        SiteScope::new(self.project_id, self.site_id)
    }

    pub fn key(&self) -> HoleKey {
        HoleKey::new(self.hole_id.clone(), self.scope())
    }

    /// 用孔网默认值补齐缺省参数
    pub fn resolve(&self, pattern: &PatternSettings) -> ResolvedHole {
        ResolvedHole {
            hole_id: self.hole_id.clone(),
            x: self.x,
            y: self.y,
            depth: self.depth,
            diameter: self.diameter.unwrap_or(pattern.diameter),
            spacing: self.spacing.unwrap_or(pattern.spacing),
            burden: self.burden.unwrap_or(pattern.burden),
            stemming: self.stemming.unwrap_or(pattern.stemming),
        }
    }
}

// ==========================================
// PatternSettings - 孔网参数（名义值）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSettings {
    #[serde(default)]
    pub name: Option<String>,

    pub spacing: f64,  // 孔距 (m)
    pub burden: f64,   // 排距/抵抗线 (m)
    pub diameter: f64, // 孔径 (m)
    pub stemming: f64, // 填塞长度 (m)

    /// 台阶高度 (m); None 时按单孔孔深计算岩石方量
    #[serde(default)]
    pub bench_height: Option<f64>,

    /// 岩石密度 (t/m³), 仅 Mass 口径单耗使用
    #[serde(default = "default_rock_density")]
    pub rock_density: f64,
}

fn default_rock_density() -> f64 {
    2.6
}

impl Default for PatternSettings {
    fn default() -> Self {
        Self {
            name: None,
            spacing: 3.0,
            burden: 3.0,
            diameter: 0.15,
            stemming: 2.0,
            bench_height: None,
            rock_density: default_rock_density(),
        }
    }
}

// ==========================================
// ResolvedHole - 补齐后的炮孔几何
// ==========================================
// 装药计算只接受此类型, 保证不会遗漏默认值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedHole {
    pub hole_id: String,
    pub x: f64,
    pub y: f64,
    pub depth: f64,
    pub diameter: f64,
    pub spacing: f64,
    pub burden: f64,
    pub stemming: f64,
}

impl ResolvedHole {
    /// 可装药长度 = 孔深 - 填塞
    pub fn chargeable_length(&self) -> f64 {
        self.depth - self.stemming
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_uses_pattern_defaults() {
        let scope = SiteScope::new(1, 1);
        let pattern = PatternSettings::default();
        let resolved = DrillPoint::new("A", scope, 0.0, 0.0, 10.0).resolve(&pattern);

        assert_eq!(resolved.diameter, 0.15);
        assert_eq!(resolved.stemming, 2.0);
        assert_eq!(resolved.spacing, 3.0);
        assert_eq!(resolved.burden, 3.0);
        assert_eq!(resolved.chargeable_length(), 8.0);
    }

    #[test]
    fn test_resolve_prefers_point_overrides() {
        let scope = SiteScope::new(1, 1);
        let pattern = PatternSettings::default();
        let resolved = DrillPoint::new("A", scope, 0.0, 0.0, 10.0)
            .with_stemming(3.5)
            .with_diameter(0.102)
            .with_spacing_burden(4.0, 3.2)
            .resolve(&pattern);

        assert_eq!(resolved.stemming, 3.5);
        assert_eq!(resolved.diameter, 0.102);
        assert_eq!(resolved.spacing, 4.0);
        assert_eq!(resolved.burden, 3.2);
    }

    #[test]
    fn test_pattern_settings_rock_density_default_on_deserialize() {
        let pattern: PatternSettings = serde_json::from_str(
            r#"{"spacing":3.0,"burden":2.5,"diameter":0.115,"stemming":2.0}"#,
        )
        .unwrap();
        assert_eq!(pattern.rock_density, 2.6);
        assert!(pattern.bench_height.is_none());
    }
}

// ==========================================
// 爆破设计引擎 - 外部数据来源接口
// ==========================================
// 职责: 定义孔网/物料/连接数据的读取接口（不含存储实现）
// 实现者: InMemoryBlastSource（测试与命令行输入）
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::connector::InitiationPlan;
use crate::domain::drill_point::{DrillPoint, PatternSettings};
use crate::domain::material::ExplosiveMaterial;
use crate::domain::types::SiteScope;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::RwLock;

// ==========================================
// 来源 Trait
// ==========================================

/// 孔网来源: 炮孔 + 孔网名义参数
#[async_trait]
pub trait PatternSource: Send + Sync {
    async fn load_points(&self, scope: SiteScope) -> ApiResult<Vec<DrillPoint>>;

    async fn load_pattern(&self, scope: SiteScope) -> ApiResult<PatternSettings>;
}

/// 物料来源: 炸药密度与单孔配额
#[async_trait]
pub trait MaterialSource: Send + Sync {
    async fn load_material(&self, scope: SiteScope) -> ApiResult<ExplosiveMaterial>;
}

/// 连接来源: 连接 + 雷管 + 起爆点
#[async_trait]
pub trait ConnectorSource: Send + Sync {
    async fn load_plan(&self, scope: SiteScope) -> ApiResult<InitiationPlan>;
}

// ==========================================
// SiteDesign - 单个爆区的完整设计输入
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteDesign {
    pub scope: SiteScope,
    pub points: Vec<DrillPoint>,
    #[serde(default)]
    pub pattern: PatternSettings,
    #[serde(default)]
    pub material: ExplosiveMaterial,
    #[serde(default)]
    pub plan: InitiationPlan,
}

impl SiteDesign {
    /// 炮孔与已标注作用域的连接必须归属本爆区
    pub fn check_scope(&self) -> ApiResult<()> {
        if let Some(point) = self.points.iter().find(|p| p.scope() != self.scope) {
            return Err(ApiError::InvalidInput(format!(
                "炮孔 {} 属于 {}, 与爆区 {} 不符",
                point.hole_id,
                point.scope(),
                self.scope
            )));
        }
        let foreign = self
            .plan
            .connectors
            .iter()
            .find(|c| c.scope.is_some_and(|s| s != self.scope));
        if let Some(connector) = foreign {
            return Err(ApiError::InvalidInput(format!(
                "连接 {} → {} 不属于爆区 {}",
                connector.from, connector.to, self.scope
            )));
        }
        Ok(())
    }
}

// ==========================================
// InMemoryBlastSource - 内存数据来源
// ==========================================
#[derive(Debug, Default)]
pub struct InMemoryBlastSource {
    sites: RwLock<BTreeMap<SiteScope, SiteDesign>>,
}

impl InMemoryBlastSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// 批量载入; 任一设计作用域不一致即整体拒绝
    pub fn with_sites(designs: Vec<SiteDesign>) -> ApiResult<Self> {
        let source = Self::new();
        for design in designs {
            source.upsert(design)?;
        }
        Ok(source)
    }

    /// 新增或整体替换一个爆区的设计
    pub fn upsert(&self, design: SiteDesign) -> ApiResult<()> {
        design.check_scope()?;
        let mut sites = self
            .sites
            .write()
            .map_err(|e| ApiError::Source(format!("爆区数据锁已损坏: {}", e)))?;
        sites.insert(design.scope, design);
        Ok(())
    }

    pub fn scopes(&self) -> ApiResult<Vec<SiteScope>> {
        let sites = self
            .sites
            .read()
            .map_err(|e| ApiError::Source(format!("爆区数据锁已损坏: {}", e)))?;
        Ok(sites.keys().copied().collect())
    }

    fn with_design<T>(&self, scope: SiteScope, f: impl FnOnce(&SiteDesign) -> T) -> ApiResult<T> {
        let sites = self
            .sites
            .read()
            .map_err(|e| ApiError::Source(format!("爆区数据锁已损坏: {}", e)))?;
        sites
            .get(&scope)
            .map(f)
            .ok_or_else(|| ApiError::NotFound(format!("爆区({})不存在", scope)))
    }
}

#[async_trait]
impl PatternSource for InMemoryBlastSource {
    async fn load_points(&self, scope: SiteScope) -> ApiResult<Vec<DrillPoint>> {
        self.with_design(scope, |d| d.points.clone())
    }

    async fn load_pattern(&self, scope: SiteScope) -> ApiResult<PatternSettings> {
        self.with_design(scope, |d| d.pattern.clone())
    }
}

#[async_trait]
impl MaterialSource for InMemoryBlastSource {
    async fn load_material(&self, scope: SiteScope) -> ApiResult<ExplosiveMaterial> {
        self.with_design(scope, |d| d.material.clone())
    }
}

#[async_trait]
impl ConnectorSource for InMemoryBlastSource {
    async fn load_plan(&self, scope: SiteScope) -> ApiResult<InitiationPlan> {
        self.with_design(scope, |d| d.plan.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::connector::Connector;

    fn design(scope: SiteScope) -> SiteDesign {
        SiteDesign {
            scope,
            points: vec![
                DrillPoint::new("A", scope, 0.0, 0.0, 10.0),
                DrillPoint::new("B", scope, 3.0, 0.0, 10.0),
            ],
            pattern: PatternSettings::default(),
            material: ExplosiveMaterial::default(),
            plan: InitiationPlan::default(),
        }
    }

    #[test]
    fn test_upsert_rejects_foreign_points() {
        let source = InMemoryBlastSource::new();
        let mut d = design(SiteScope::new(1, 1));
        d.points[1].site_id = 2;

        let err = source.upsert(d).unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(ref msg) if msg.contains("B")));
        assert!(err.is_input_error());
        assert!(source.scopes().unwrap().is_empty());
    }

    #[test]
    fn test_with_sites_rejects_foreign_connector() {
        let mut d = design(SiteScope::new(1, 1));
        d.plan.connectors.push(Connector::new("A", "B", 25, 0).in_scope(SiteScope::new(1, 2)));
        assert!(matches!(
            InMemoryBlastSource::with_sites(vec![d]),
            Err(ApiError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_poisoned_store_reports_source_error() {
        let source = std::sync::Arc::new(InMemoryBlastSource::new());
        let poisoner = source.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.sites.write().unwrap();
            panic!("写入中断");
        })
        .join();

        assert!(matches!(source.scopes(), Err(ApiError::Source(_))));
        assert!(matches!(
            source.upsert(design(SiteScope::new(1, 1))),
            Err(ApiError::Source(_))
        ));
    }
}

// ==========================================
// 爆破设计引擎 - 爆破设计 API
// ==========================================
// 职责: 从外部来源读取输入, 驱动引擎计算, 返回不可变结果
// 并发: 每次计算在阻塞线程池内作为原子单元执行,
//       丢弃 future 即放弃结果, 不存在可观察的中间状态
// ==========================================

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::sources::{ConnectorSource, InMemoryBlastSource, MaterialSource, PatternSource};
use crate::config::{EngineConfig, EngineConfigReader};
use crate::domain::charge::ChargeResult;
use crate::domain::schedule::{FiringSchedule, TimingAnalysis};
use crate::domain::types::SiteScope;
use crate::engine::charge_calculator::ChargeCalculator;
use crate::engine::network::InitiationNetwork;
use crate::engine::sequencer::Sequencer;
use crate::engine::{timing_analysis, validation};

// ==========================================
// BlastDesignReport - 单个爆区的完整评估
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlastDesignReport {
    pub scope: SiteScope,
    pub charges: ChargeResult,
    pub schedule: FiringSchedule,
    pub timing: TimingAnalysis,
    /// 起爆网络弱连通分量
    pub network_components: Vec<BTreeSet<String>>,
    pub generated_at: DateTime<Utc>,
}

// ==========================================
// BlastDesignApi
// ==========================================
pub struct BlastDesignApi {
    patterns: Arc<dyn PatternSource>,
    materials: Arc<dyn MaterialSource>,
    connectors: Arc<dyn ConnectorSource>,
    config_reader: Arc<dyn EngineConfigReader>,
}

impl BlastDesignApi {
    pub fn new(
        patterns: Arc<dyn PatternSource>,
        materials: Arc<dyn MaterialSource>,
        connectors: Arc<dyn ConnectorSource>,
        config_reader: Arc<dyn EngineConfigReader>,
    ) -> Self {
        Self {
            patterns,
            materials,
            connectors,
            config_reader,
        }
    }

    /// 三类来源由同一内存来源提供
    pub fn from_source(source: Arc<InMemoryBlastSource>, config_reader: Arc<dyn EngineConfigReader>) -> Self {
        Self::new(source.clone(), source.clone(), source, config_reader)
    }

    async fn load_config(&self, scope: SiteScope) -> ApiResult<EngineConfig> {
        let loaded = self.config_reader.load_engine_config(Some(scope)).await;
        loaded.map_err(|e| ApiError::ConfigError(e.to_string()))
    }

    // ==========================================
    // 装药计算
    // ==========================================

    /// 计算爆区装药量
    #[instrument(skip(self), fields(scope = %scope))]
    pub async fn calculate_charges(&self, scope: SiteScope) -> ApiResult<ChargeResult> {
        let config = self.load_config(scope).await?;
        let points = self.patterns.load_points(scope).await?;
        let pattern = self.patterns.load_pattern(scope).await?;
        let material = self.materials.load_material(scope).await?;

        let result = tokio::task::spawn_blocking(move || {
            ChargeCalculator::new(config).compute_in_scope(scope, &points, &material, &pattern)
        })
        .await??;
        Ok(result)
    }

    /// 校验已定稿的装药结果所引用的炮孔未被修改
    #[instrument(skip(self, result), fields(scope = %result.scope, calculation_id = %result.calculation_id))]
    pub async fn verify_charge_result(&self, result: &ChargeResult) -> ApiResult<()> {
        let points = self.patterns.load_points(result.scope).await?;
        validation::ensure_points_unchanged(result, &points)?;
        Ok(())
    }

    // ==========================================
    // 起爆时序
    // ==========================================

    /// 构建起爆网络
    pub async fn build_network(&self, scope: SiteScope) -> ApiResult<(InitiationNetwork, Vec<String>)> {
        let points = self.patterns.load_points(scope).await?;
        let plan = self.connectors.load_plan(scope).await?;
        let network = InitiationNetwork::from_plan(scope, &points, &plan)?;
        Ok((network, plan.initiation_points))
    }

    /// 计算爆区起爆时序
    #[instrument(skip(self), fields(scope = %scope))]
    pub async fn compute_firing_schedule(&self, scope: SiteScope) -> ApiResult<FiringSchedule> {
        let (network, initiation_points) = self.build_network(scope).await?;
        let schedule = tokio::task::spawn_blocking(move || {
            Sequencer::compute_schedule(&network, &initiation_points)
        })
        .await??;
        Ok(schedule)
    }

    // ==========================================
    // 综合评估
    // ==========================================

    /// 装药 + 时序 + 时序统计
    ///
    /// 各来源只读取一次, 装药与时序基于同一份快照在一个阻塞任务内完成;
    /// 两者覆盖的炮孔不一致即拒绝
    #[instrument(skip(self), fields(scope = %scope))]
    pub async fn evaluate_site(&self, scope: SiteScope) -> ApiResult<BlastDesignReport> {
        let config = self.load_config(scope).await?;
        let points = self.patterns.load_points(scope).await?;
        let pattern = self.patterns.load_pattern(scope).await?;
        let material = self.materials.load_material(scope).await?;
        let plan = self.connectors.load_plan(scope).await?;

        let report = tokio::task::spawn_blocking(move || -> ApiResult<BlastDesignReport> {
            let window_ms = config.simultaneity_window_ms;
            let charges = ChargeCalculator::new(config).compute_in_scope(scope, &points, &material, &pattern)?;
            let network = InitiationNetwork::from_plan(scope, &points, &plan)?;
            let schedule = Sequencer::compute_schedule(&network, &plan.initiation_points)?;
            validation::ensure_same_holes(&charges, &schedule)?;

            let timing = timing_analysis::analyze(&schedule, Some(&charges), window_ms);
            Ok(BlastDesignReport {
                scope,
                charges,
                schedule,
                timing,
                network_components: network.connected_components(),
                generated_at: Utc::now(),
            })
        })
        .await??;

        info!(
            total_explosive_kg = report.charges.total_explosive,
            duration_ms = report.timing.total_duration_ms,
            max_charge_per_window_kg = report.timing.max_charge_per_window_kg.unwrap_or(0.0),
            "爆区评估完成"
        );
        Ok(report)
    }

    /// 并行评估多个爆区, 各爆区结果相互独立
    pub async fn evaluate_sites(&self, scopes: &[SiteScope]) -> Vec<(SiteScope, ApiResult<BlastDesignReport>)> {
        let results = join_all(scopes.iter().map(|scope| self.evaluate_site(*scope))).await;
        let outcome: Vec<(SiteScope, ApiResult<BlastDesignReport>)> = scopes.iter().copied().zip(results).collect();

        let failed = outcome.iter().filter(|(_, r)| r.is_err()).count();
        if failed > 0 {
            warn!(total = scopes.len(), failed, "部分爆区评估失败");
        }
        outcome
    }
}

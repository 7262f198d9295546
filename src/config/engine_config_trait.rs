// ==========================================
// 爆破设计引擎 - 引擎参数读取 Trait
// ==========================================
// 职责: 定义引擎所需的参数读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::engine_config::EngineConfig;
use crate::domain::types::{PowderFactorBasis, SiteScope};
use async_trait::async_trait;
use std::error::Error;

// ==========================================
// EngineConfigReader Trait
// ==========================================
// 实现者:
// - ConfigManager（从 config_kv 表读取, site → project → global 覆写）
// - EngineConfig（固定参数, 忽略作用域）
//
// scope 为 None 时只读 global
#[async_trait]
pub trait EngineConfigReader: Send + Sync {
    /// 单耗口径（默认 VOLUME）
    async fn get_powder_factor_basis(
        &self,
        scope: Option<SiteScope>,
    ) -> Result<PowderFactorBasis, Box<dyn Error>>;

    /// 炸药密度上限 (乳化, ANFO), g/cm³（默认 10.0, 5.0）
    async fn get_density_limits(&self, scope: Option<SiteScope>) -> Result<(f64, f64), Box<dyn Error>>;

    /// 孔径上限 (m)（默认 1.0）
    async fn get_max_diameter(&self, scope: Option<SiteScope>) -> Result<f64, Box<dyn Error>>;

    /// 单孔乳化炸药配额上限 (kg)（默认 1000）
    async fn get_max_emulsion_per_hole(&self, scope: Option<SiteScope>) -> Result<f64, Box<dyn Error>>;

    /// 装药柱守恒误差（默认 1e-9）
    async fn get_column_epsilon(&self, scope: Option<SiteScope>) -> Result<f64, Box<dyn Error>>;

    /// 时序统计窗口 (ms)（默认 8）
    async fn get_simultaneity_window_ms(&self, scope: Option<SiteScope>) -> Result<u32, Box<dyn Error>>;

    /// 是否拒绝坐标重合（默认 true）
    async fn get_require_unique_coordinates(
        &self,
        scope: Option<SiteScope>,
    ) -> Result<bool, Box<dyn Error>>;

    /// 组装完整引擎参数
    async fn load_engine_config(&self, scope: Option<SiteScope>) -> Result<EngineConfig, Box<dyn Error>> {
        let (max_emulsion_density, max_anfo_density) = self.get_density_limits(scope).await?;
        let max_diameter_m = self.get_max_diameter(scope).await?;
        let max_emulsion_per_hole_kg = self.get_max_emulsion_per_hole(scope).await?;
        let column_epsilon = self.get_column_epsilon(scope).await?;
        let powder_factor_basis = self.get_powder_factor_basis(scope).await?;
        let simultaneity_window_ms = self.get_simultaneity_window_ms(scope).await?;
        let require_unique_coordinates = self.get_require_unique_coordinates(scope).await?;

        Ok(EngineConfig {
            max_emulsion_density,
            max_anfo_density,
            max_diameter_m,
            max_emulsion_per_hole_kg,
            column_epsilon,
            powder_factor_basis,
            simultaneity_window_ms,
            require_unique_coordinates,
        })
    }
}

// ==========================================
// 固定参数实现
// ==========================================
#[async_trait]
impl EngineConfigReader for EngineConfig {
    async fn get_powder_factor_basis(
        &self,
        _scope: Option<SiteScope>,
    ) -> Result<PowderFactorBasis, Box<dyn Error>> {
        Ok(self.powder_factor_basis)
    }

    async fn get_density_limits(&self, _scope: Option<SiteScope>) -> Result<(f64, f64), Box<dyn Error>> {
        Ok((self.max_emulsion_density, self.max_anfo_density))
    }

    async fn get_max_diameter(&self, _scope: Option<SiteScope>) -> Result<f64, Box<dyn Error>> {
        Ok(self.max_diameter_m)
    }

    async fn get_max_emulsion_per_hole(&self, _scope: Option<SiteScope>) -> Result<f64, Box<dyn Error>> {
        Ok(self.max_emulsion_per_hole_kg)
    }

    async fn get_column_epsilon(&self, _scope: Option<SiteScope>) -> Result<f64, Box<dyn Error>> {
        Ok(self.column_epsilon)
    }

    async fn get_simultaneity_window_ms(&self, _scope: Option<SiteScope>) -> Result<u32, Box<dyn Error>> {
        Ok(self.simultaneity_window_ms)
    }

    async fn get_require_unique_coordinates(
        &self,
        _scope: Option<SiteScope>,
    ) -> Result<bool, Box<dyn Error>> {
        Ok(self.require_unique_coordinates)
    }

    async fn load_engine_config(&self, _scope: Option<SiteScope>) -> Result<EngineConfig, Box<dyn Error>> {
        Ok(self.clone())
    }
}

// ==========================================
// 爆破设计引擎 - 领域类型定义
// ==========================================
// 依据: 数据模型 - 复合主键 (holeId, projectId, siteId)
// 红线: 禁止跨 (project, site) 引用
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 作用域 (Site Scope)
// ==========================================
// 多租户隔离单元: 所有炮孔/连接/结果均归属于一个 (project, site)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SiteScope {
    pub project_id: i64,
    pub site_id: i64,
}

impl SiteScope {
    pub fn new(project_id: i64, site_id: i64) -> Self {
        Self {
            project_id,
            site_id,
        }
    }
}

impl fmt::Display for SiteScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "project={}/site={}", self.project_id, self.site_id)
    }
}

// ==========================================
// 炮孔复合键 (Hole Key)
// ==========================================
// 用途: 图节点 / Map 键; 不使用全局代理键
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HoleKey {
    pub hole_id: String,
    pub project_id: i64,
    pub site_id: i64,
}

impl HoleKey {
    pub fn new(hole_id: impl Into<String>, scope: SiteScope) -> Self {
        Self {
            hole_id: hole_id.into(),
            project_id: scope.project_id,
            site_id: scope.site_id,
        }
    }

    pub fn scope(&self) -> SiteScope {
        SiteScope::new(self.project_id, self.site_id)
    }
}

impl fmt::Display for HoleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.hole_id, self.scope())
    }
}

// ==========================================
// 连接器类型 (Connector Type)
// ==========================================
// 引擎不区分类型语义, 仅透传给调用方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectorType {
    #[default]
    Surface,       // 地表延时连接
    InHole,        // 孔内
    Trunk,         // 主干线
    DetonatingCord, // 导爆索
}

impl fmt::Display for ConnectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectorType::Surface => write!(f, "SURFACE"),
            ConnectorType::InHole => write!(f, "IN_HOLE"),
            ConnectorType::Trunk => write!(f, "TRUNK"),
            ConnectorType::DetonatingCord => write!(f, "DETONATING_CORD"),
        }
    }
}

// ==========================================
// 雷管类型 (Detonator Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetonatorType {
    Electric,    // 电雷管
    NonElectric, // 导爆管雷管
    Electronic,  // 电子雷管
}

impl fmt::Display for DetonatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetonatorType::Electric => write!(f, "ELECTRIC"),
            DetonatorType::NonElectric => write!(f, "NON_ELECTRIC"),
            DetonatorType::Electronic => write!(f, "ELECTRONIC"),
        }
    }
}

// ==========================================
// 炸药单耗口径 (Powder Factor Basis)
// ==========================================
// Volume: kg/m³ (岩石体积)
// Mass:   kg/t  (岩石质量 = 体积 × 岩石密度)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PowderFactorBasis {
    #[default]
    Volume,
    Mass,
}

impl PowderFactorBasis {
    /// 单耗单位标签
    pub fn unit(&self) -> &'static str {
        match self {
            PowderFactorBasis::Volume => "kg/m3",
            PowderFactorBasis::Mass => "kg/t",
        }
    }
}

impl fmt::Display for PowderFactorBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowderFactorBasis::Volume => write!(f, "VOLUME"),
            PowderFactorBasis::Mass => write!(f, "MASS"),
        }
    }
}

impl std::str::FromStr for PowderFactorBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "VOLUME" => Ok(PowderFactorBasis::Volume),
            "MASS" => Ok(PowderFactorBasis::Mass),
            other => Err(format!("未知的单耗口径: {}", other)),
        }
    }
}

// ==========================================
// 起爆时序计算状态 (Schedule State)
// ==========================================
// 状态机: Pending → Validating → {Scheduled | Rejected}
// 终态不可变, 重算必须新建实例
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleState {
    Pending,
    Validating,
    Scheduled,
    Rejected,
}

impl ScheduleState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScheduleState::Scheduled | ScheduleState::Rejected)
    }
}

impl fmt::Display for ScheduleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleState::Pending => write!(f, "PENDING"),
            ScheduleState::Validating => write!(f, "VALIDATING"),
            ScheduleState::Scheduled => write!(f, "SCHEDULED"),
            ScheduleState::Rejected => write!(f, "REJECTED"),
        }
    }
}

// ==========================================
// 爆破设计引擎 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================
// 红线: 全部为可恢复错误, 由调用方修正输入后重试
// 红线: 任一不变量违反即拒绝整个计算, 不返回部分结果
// ==========================================

use crate::domain::types::SiteScope;
use thiserror::Error;

// ==========================================
// GeometryError - 孔网几何数据错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("几何参数必须为正数 (hole={hole_id}, field={field}): {value}")]
    NonPositive {
        hole_id: String,
        field: String,
        value: f64,
    },

    #[error("坐标非有限值 (hole={hole_id}): x={x}, y={y}")]
    NonFiniteCoordinate { hole_id: String, x: f64, y: f64 },

    #[error("可装药长度不为正 (hole={hole_id}): depth={depth}, stemming={stemming}")]
    NonPositiveChargeableLength {
        hole_id: String,
        depth: f64,
        stemming: f64,
    },

    #[error("炮孔坐标重合: {first} 与 {second}")]
    CoincidentPoints { first: String, second: String },
}

// ==========================================
// ValidationError - 跨模块不变量校验错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("跨作用域引用 (hole={hole_id}): expected {expected}, actual {actual}")]
    CrossScopeReference {
        hole_id: String,
        expected: SiteScope,
        actual: SiteScope,
    },

    #[error("炮孔重复: {hole_id}")]
    DuplicateHole { hole_id: String },

    #[error("炮孔缺失: {hole_id}")]
    MissingHole { hole_id: String },

    #[error("装药柱分段不守恒 (hole={hole_id}): emulsion={emulsion} + remaining={remaining} != chargeable={chargeable}")]
    ColumnPartitionMismatch {
        hole_id: String,
        emulsion: f64,
        remaining: f64,
        chargeable: f64,
    },

    #[error("填塞+装药长度超过孔深 (hole={hole_id}): stemming={stemming}, charge={charge_length}, depth={depth}")]
    ChargeExceedsDepth {
        hole_id: String,
        stemming: f64,
        charge_length: f64,
        depth: f64,
    },

    #[error("汇总值不一致 (field={field}): expected={expected}, actual={actual}")]
    TotalsMismatch {
        field: String,
        expected: f64,
        actual: f64,
    },

    #[error("起爆时序不一致 (hole={hole_id}): {reason}")]
    ScheduleInconsistent { hole_id: String, reason: String },

    #[error("计算结果引用的炮孔已被修改 (calculation_id={calculation_id})")]
    PointsModified { calculation_id: String },
}

// ==========================================
// CalcError - 装药计算错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalcError {
    #[error("孔网几何无效: {0}")]
    InvalidGeometry(#[from] GeometryError),

    #[error("无可装药炮孔, 炸药单耗无定义")]
    EmptyPattern,

    #[error("单位/量纲异常 (field={field}): 值 {value} 超出范围 ({min}, {max}]")]
    InconsistentUnits {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("结果校验失败: {0}")]
    Validation(#[from] ValidationError),
}

// ==========================================
// NetworkError - 起爆网络构建错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("连接端点不存在: {hole_id}")]
    UnknownEndpoint { hole_id: String },

    #[error("连接重复: {from} -> {to}")]
    DuplicateConnector { from: String, to: String },

    #[error("连接首尾为同一炮孔: {hole_id}")]
    SelfConnection { hole_id: String },

    #[error("炮孔作用域不符 (hole={hole_id}): expected {expected}, actual {actual}")]
    ScopeMismatch {
        hole_id: String,
        expected: SiteScope,
        actual: SiteScope,
    },

    #[error("炮孔重复注册: {hole_id}")]
    DuplicateHole { hole_id: String },

    #[error("同一炮孔重复分配雷管: {hole_id}")]
    DuplicateDetonator { hole_id: String },
}

// ==========================================
// CycleError - 起爆网络环路
// ==========================================
/// `cycle` 首尾为同一炮孔, 例如 [A, B, C, A]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("起爆网络存在环路: {}", .cycle.join(" -> "))]
pub struct CycleError {
    pub cycle: Vec<String>,
}

// ==========================================
// ScheduleError - 起爆时序计算错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    #[error("{0}")]
    CycleDetected(#[from] CycleError),

    #[error("炮孔无法从任何起爆点到达: {hole_id} (共 {} 个)", .unreachable.len())]
    UnreachableHole {
        hole_id: String,
        unreachable: Vec<String>,
    },

    #[error("未指定起爆点")]
    NoInitiationPoints,

    #[error("起爆点不是已知炮孔: {hole_id}")]
    UnknownInitiationPoint { hole_id: String },

    #[error("时序校验失败: {0}")]
    Validation(#[from] ValidationError),
}

/// Result 类型别名
pub type CalcResult<T> = Result<T, CalcError>;
pub type ScheduleResult<T> = Result<T, ScheduleError>;

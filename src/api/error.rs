// ==========================================
// 爆破设计引擎 - API层错误类型
// ==========================================
// 职责: 汇总引擎各层错误, 转换为调用方可读的错误消息
// 红线: 所有错误信息必须包含显式原因
// ==========================================

use crate::engine::error::{CalcError, NetworkError, ScheduleError, ValidationError};
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 引擎错误
    // ==========================================
    #[error("装药计算失败: {0}")]
    Calculation(#[from] CalcError),

    #[error("起爆网络无效: {0}")]
    Network(#[from] NetworkError),

    #[error("起爆时序计算失败: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("校验失败: {0}")]
    Validation(#[from] ValidationError),

    // ==========================================
    // 输入/来源错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("数据来源错误: {0}")]
    Source(String),

    #[error("配置读取失败: {0}")]
    ConfigError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("计算任务中断: {0}")]
    TaskAborted(String),

    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 是否为输入数据问题（修正输入后可重试）
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ApiError::Calculation(_)
                | ApiError::Network(_)
                | ApiError::Schedule(_)
                | ApiError::Validation(_)
                | ApiError::InvalidInput(_)
        )
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::TaskAborted(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

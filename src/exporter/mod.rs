// ==========================================
// 爆破设计引擎 - 导出层
// ==========================================
// 格式: CSV (csv) / JSON (serde_json)
// 红线: 数值字段保持 f64 全精度, 不做舍入
// ==========================================

pub mod charge_exporter;
pub mod error;
pub mod schedule_exporter;

use serde::Serialize;

pub use charge_exporter::{charges_to_csv, write_charges_csv};
pub use error::{ExportError, ExportResult};
pub use schedule_exporter::{schedule_to_csv, write_schedule_csv};

/// 任意结果导出为带缩进的 JSON
pub fn to_json_pretty<T: Serialize>(value: &T) -> ExportResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn into_string(bytes: Vec<u8>) -> ExportResult<String> {
    String::from_utf8(bytes).map_err(|e| ExportError::Encoding(e.to_string()))
}

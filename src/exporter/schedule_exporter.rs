// ==========================================
// 爆破设计引擎 - 起爆时序导出
// ==========================================
// 行顺序: 起爆顺序 (firing_order)
// ==========================================

use crate::domain::schedule::FiringSchedule;
use crate::exporter::error::ExportResult;
use crate::exporter::into_string;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

#[derive(Debug, Serialize)]
struct ScheduleRow<'a> {
    rank: usize,
    hole_id: &'a str,
    fire_time_ms: u64,
    in_hole_delay_ms: u32,
    detonation_time_ms: u64,
    via_from: Option<&'a str>,
    via_delay_ms: Option<u32>,
    via_sequence_index: Option<i32>,
}

/// 写出起爆时序 CSV
pub fn write_schedule<W: Write>(schedule: &FiringSchedule, writer: W) -> ExportResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for (index, hole_id) in schedule.firing_order.iter().enumerate() {
        let Some(entry) = schedule.entries.get(hole_id) else {
            continue;
        };
        csv_writer.serialize(ScheduleRow {
            rank: index + 1,
            hole_id: &entry.hole_id,
            fire_time_ms: entry.fire_time_ms,
            in_hole_delay_ms: entry.in_hole_delay_ms,
            detonation_time_ms: entry.detonation_time_ms,
            via_from: entry.via.as_ref().map(|v| v.from.as_str()),
            via_delay_ms: entry.via.as_ref().map(|v| v.delay_ms),
            via_sequence_index: entry.via.as_ref().map(|v| v.sequence_index),
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// 起爆时序导出为 CSV 文本
pub fn schedule_to_csv(schedule: &FiringSchedule) -> ExportResult<String> {
    let mut buffer = Vec::new();
    write_schedule(schedule, &mut buffer)?;
    into_string(buffer)
}

/// 起爆时序导出为 CSV 文件
pub fn write_schedule_csv(schedule: &FiringSchedule, path: &Path) -> ExportResult<()> {
    let file = File::create(path)?;
    write_schedule(schedule, file)?;
    info!(path = %path.display(), rows = schedule.len(), "起爆时序已导出");
    Ok(())
}

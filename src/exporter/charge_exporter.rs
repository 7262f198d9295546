// ==========================================
// 爆破设计引擎 - 装药明细导出
// ==========================================
// 每孔一行, 末行为汇总 (hole_id = TOTAL)
// ==========================================

use crate::domain::charge::ChargeResult;
use crate::exporter::error::ExportResult;
use crate::exporter::into_string;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// 汇总行孔号
pub const TOTAL_ROW_ID: &str = "TOTAL";

#[derive(Debug, Serialize)]
struct ChargeRow<'a> {
    hole_id: &'a str,
    depth: f64,
    stemming: f64,
    diameter: Option<f64>,
    chargeable_length: f64,
    emulsion_covering_space: f64,
    anfo_covering_space: f64,
    emulsion_kg: f64,
    anfo_kg: f64,
    total_kg: f64,
    rock_volume_m3: f64,
}

/// 写出装药明细 CSV
pub fn write_charges<W: Write>(result: &ChargeResult, writer: W) -> ExportResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for hole in &result.holes {
        csv_writer.serialize(ChargeRow {
            hole_id: &hole.hole_id,
            depth: hole.depth,
            stemming: hole.stemming,
            diameter: Some(hole.diameter),
            chargeable_length: hole.chargeable_length,
            emulsion_covering_space: hole.emulsion_covering_space,
            anfo_covering_space: hole.anfo_covering_space,
            emulsion_kg: hole.emulsion_kg,
            anfo_kg: hole.anfo_kg,
            total_kg: hole.total_kg(),
            rock_volume_m3: hole.rock_volume_m3,
        })?;
    }

    let stemming_total: f64 = result.holes.iter().map(|h| h.stemming).sum();
    let chargeable_total: f64 = result.holes.iter().map(|h| h.chargeable_length).sum();
    csv_writer.serialize(ChargeRow {
        hole_id: TOTAL_ROW_ID,
        depth: result.total_depth,
        stemming: stemming_total,
        diameter: None,
        chargeable_length: chargeable_total,
        emulsion_covering_space: result.emulsion_covering_space,
        anfo_covering_space: result.anfo_covering_space,
        emulsion_kg: result.total_emulsion,
        anfo_kg: result.total_anfo,
        total_kg: result.total_explosive,
        rock_volume_m3: result.total_volume,
    })?;
    csv_writer.flush()?;
    Ok(())
}

/// 装药明细导出为 CSV 文本
pub fn charges_to_csv(result: &ChargeResult) -> ExportResult<String> {
    let mut buffer = Vec::new();
    write_charges(result, &mut buffer)?;
    into_string(buffer)
}

/// 装药明细导出为 CSV 文件
pub fn write_charges_csv(result: &ChargeResult, path: &Path) -> ExportResult<()> {
    let file = File::create(path)?;
    write_charges(result, file)?;
    info!(
        path = %path.display(),
        calculation_id = %result.calculation_id,
        "装药明细已导出"
    );
    Ok(())
}

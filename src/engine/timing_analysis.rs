// ==========================================
// 爆破设计引擎 - 起爆时序统计
// ==========================================
// 指标: 总延时 / 波次 / 同段最大孔数 / 平均间隔 / 窗口内最大孔数与药量
// 口径: 全部基于实际起爆时刻 (到达时刻 + 孔内延时)
// ==========================================

use crate::domain::charge::ChargeResult;
use crate::domain::schedule::{FiringSchedule, TimingAnalysis};
use std::collections::BTreeMap;
use tracing::debug;

/// 默认统计窗口 (ms)
pub const DEFAULT_WINDOW_MS: u32 = 8;

/// 统计起爆时序
///
/// `charges` 与时序共享孔号空间时, 统计任一窗口内的最大起爆药量
pub fn analyze(
    schedule: &FiringSchedule,
    charges: Option<&ChargeResult>,
    window_ms: u32,
) -> TimingAnalysis {
    let mut waves: BTreeMap<u64, Vec<&str>> = BTreeMap::new();
    for entry in schedule.entries.values() {
        waves
            .entry(entry.detonation_time_ms)
            .or_default()
            .push(entry.hole_id.as_str());
    }

    let times: Vec<u64> = waves.keys().copied().collect();
    let total_duration_ms = times.last().copied().unwrap_or(0);
    let max_simultaneous = waves.values().map(Vec::len).max().unwrap_or(0);
    let average_interval_ms = match (times.first(), times.last()) {
        (Some(first), Some(last)) if times.len() > 1 => (last - first) as f64 / (times.len() - 1) as f64,
        _ => 0.0,
    };

    // 窗口 [t, t + window), 以每个波次为左端点滑动
    let span = u64::from(window_ms.max(1));
    let wave_charge = |holes: &[&str]| -> f64 {
        charges
            .map(|c| holes.iter().filter_map(|h| c.hole(h)).map(|h| h.total_kg()).sum())
            .unwrap_or(0.0)
    };
    let per_wave: Vec<(u64, usize, f64)> = waves
        .iter()
        .map(|(t, holes)| (*t, holes.len(), wave_charge(holes)))
        .collect();

    // 孔数用滑动计数; 药量每个窗口重新求和, 不做浮点增减
    let mut max_holes_in_window = 0usize;
    let mut max_charge = 0.0f64;
    let mut right = 0usize;
    let mut holes_in = 0usize;
    for left in 0..per_wave.len() {
        while right < per_wave.len() && per_wave[right].0 < per_wave[left].0 + span {
            holes_in += per_wave[right].1;
            right += 1;
        }
        max_holes_in_window = max_holes_in_window.max(holes_in);
        let charge_in: f64 = per_wave[left..right].iter().map(|w| w.2).sum();
        max_charge = max_charge.max(charge_in);
        holes_in -= per_wave[left].1;
    }

    let analysis = TimingAnalysis {
        total_duration_ms,
        wave_count: waves.len(),
        max_simultaneous,
        average_interval_ms,
        window_ms,
        max_holes_in_window,
        max_charge_per_window_kg: charges.map(|_| max_charge),
    };
    debug!(
        waves = analysis.wave_count,
        duration_ms = analysis.total_duration_ms,
        max_in_window = analysis.max_holes_in_window,
        "时序统计完成"
    );
    analysis
}

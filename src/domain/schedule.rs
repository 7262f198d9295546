// ==========================================
// 爆破设计引擎 - 起爆时序领域模型
// ==========================================
// 说明: FiringSchedule 为派生数据, 无独立身份
//       标识 = 生成它的网络状态指纹
// ==========================================

use crate::domain::types::SiteScope;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 到达某孔的最优入边
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrivalEdge {
    pub from: String,
    pub delay_ms: u32,
    pub sequence_index: i32,
}

// ==========================================
// ScheduleEntry - 单孔起爆时刻
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub hole_id: String,
    /// 地表信号到达时刻 (ms)
    pub fire_time_ms: u64,
    /// 孔内雷管延时 (ms)
    pub in_hole_delay_ms: u32,
    /// 实际起爆时刻 = fire_time_ms + in_hole_delay_ms
    pub detonation_time_ms: u64,
    /// None 表示起爆点
    pub via: Option<ArrivalEdge>,
}

impl ScheduleEntry {
    pub fn is_initiation_point(&self) -> bool {
        self.via.is_none()
    }
}

// ==========================================
// FiringSchedule - 起爆时序
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiringSchedule {
    pub scope: SiteScope,
    /// 起爆点（排序去重后）
    pub initiation_points: Vec<String>,
    /// 拓扑起爆顺序（按到达时刻稳定排序）
    pub firing_order: Vec<String>,
    /// hole_id → 时刻明细
    pub entries: BTreeMap<String, ScheduleEntry>,
    /// 网络状态指纹
    pub network_fingerprint: String,
}

impl FiringSchedule {
    /// 单孔地表到达时刻
    pub fn time_of(&self, hole_id: &str) -> Option<u64> {
        self.entries.get(hole_id).map(|e| e.fire_time_ms)
    }

    pub fn detonation_time_of(&self, hole_id: &str) -> Option<u64> {
        self.entries.get(hole_id).map(|e| e.detonation_time_ms)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按实际起爆时刻排序（同刻按起爆顺序）
    pub fn detonation_order(&self) -> Vec<String> {
        let rank: BTreeMap<&str, usize> = self
            .firing_order
            .iter()
            .enumerate()
            .map(|(i, h)| (h.as_str(), i))
            .collect();

        let mut order: Vec<&ScheduleEntry> = self.entries.values().collect();
        order.sort_by_key(|e| (e.detonation_time_ms, rank.get(e.hole_id.as_str()).copied()));
        order.into_iter().map(|e| e.hole_id.clone()).collect()
    }
}

// ==========================================
// TimingAnalysis - 时序统计
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingAnalysis {
    /// 最晚起爆时刻 (ms)
    pub total_duration_ms: u64,
    /// 起爆波次（不同起爆时刻的个数）
    pub wave_count: usize,
    /// 同一时刻最多起爆孔数
    pub max_simultaneous: usize,
    /// 相邻波次平均间隔 (ms)
    pub average_interval_ms: f64,
    /// 统计窗口 (ms)
    pub window_ms: u32,
    /// 任一窗口内最多起爆孔数
    pub max_holes_in_window: usize,
    /// 任一窗口内最大起爆药量 (kg); 无装药结果时为 None
    pub max_charge_per_window_kg: Option<f64>,
}

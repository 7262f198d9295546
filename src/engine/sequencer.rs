// ==========================================
// 爆破设计引擎 - 起爆时序计算
// ==========================================
// 算法: DAG 上的多源最短路（拓扑序单遍松弛, O(V+E)）
//   time(p) = 0, p ∈ 起爆点
//   time(h) = min(time(pred) + delay)
// 同刻竞争: sequence_index 小者优先, 再按前驱孔号字典序
// ==========================================
// 状态机: Pending → Validating → {Scheduled | Rejected}
// 红线: 终态不可变; 重新计算必须新建 ScheduleComputation
// 红线: 任一炮孔不可达即整体拒绝, 不输出部分时序
// ==========================================

use crate::domain::schedule::{ArrivalEdge, FiringSchedule, ScheduleEntry};
use crate::domain::types::ScheduleState;
use crate::engine::error::{ScheduleError, ScheduleResult};
use crate::engine::network::InitiationNetwork;
use crate::engine::validation;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument, warn};

// ==========================================
// ScheduleComputation - 单次时序计算
// ==========================================
#[derive(Debug, Clone)]
pub struct ScheduleComputation {
    state: ScheduleState,
    transitions: Vec<ScheduleState>,
    outcome: Option<ScheduleResult<FiringSchedule>>,
}

impl Default for ScheduleComputation {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleComputation {
    pub fn new() -> Self {
        Self {
            state: ScheduleState::Pending,
            transitions: vec![ScheduleState::Pending],
            outcome: None,
        }
    }

    pub fn state(&self) -> ScheduleState {
        self.state
    }

    /// 已经历的状态序列
    pub fn transitions(&self) -> &[ScheduleState] {
        &self.transitions
    }

    pub fn outcome(&self) -> Option<&ScheduleResult<FiringSchedule>> {
        self.outcome.as_ref()
    }

    fn transition(&mut self, next: ScheduleState) {
        debug!(from = %self.state, to = %next, "时序计算状态变更");
        self.state = next;
        self.transitions.push(next);
    }

    /// 执行计算; 已处于终态时不做任何事
    pub fn run(mut self, network: &InitiationNetwork, initiation_points: &[String]) -> Self {
        if self.state.is_terminal() {
            warn!(state = %self.state, "时序计算已结束, 忽略重复执行");
            return self;
        }

        self.transition(ScheduleState::Validating);
        let outcome = Sequencer::schedule(network, initiation_points);
        self.transition(if outcome.is_ok() {
            ScheduleState::Scheduled
        } else {
            ScheduleState::Rejected
        });
        self.outcome = Some(outcome);
        self
    }

    pub fn into_result(self) -> ScheduleResult<FiringSchedule> {
        self.outcome.unwrap_or(Err(ScheduleError::NoInitiationPoints))
    }
}

// ==========================================
// Sequencer - 起爆时序引擎
// ==========================================
pub struct Sequencer {}

impl Sequencer {
    /// 计算起爆时序
    #[instrument(skip(network, initiation_points), fields(
        scope = %network.scope(),
        holes = network.hole_count(),
        connectors = network.connector_count(),
        initiation_points = initiation_points.len()
    ))]
    pub fn compute_schedule(
        network: &InitiationNetwork,
        initiation_points: &[String],
    ) -> ScheduleResult<FiringSchedule> {
        let result = ScheduleComputation::new()
            .run(network, initiation_points)
            .into_result();
        match &result {
            Ok(s) => info!(
                fingerprint = %s.network_fingerprint,
                last_fire_ms = s.firing_order.last().and_then(|h| s.time_of(h)).unwrap_or(0),
                "起爆时序计算完成"
            ),
            Err(e) => warn!(error = %e, "起爆时序被拒绝"),
        }
        result
    }

    fn schedule(
        network: &InitiationNetwork,
        initiation_points: &[String],
    ) -> ScheduleResult<FiringSchedule> {
        // 1. 起爆点
        if initiation_points.is_empty() {
            return Err(ScheduleError::NoInitiationPoints);
        }
        let sources: BTreeSet<String> = initiation_points.iter().cloned().collect();
        if let Some(unknown) = sources.iter().find(|p| !network.contains_hole(p)) {
            return Err(ScheduleError::UnknownInitiationPoint {
                hole_id: unknown.clone(),
            });
        }
        let sources: Vec<String> = sources.into_iter().collect();

        // 2. 环路（先于松弛）
        network.detect_cycles()?;

        // 3. 可达性
        let reached = network.reachable_from(&sources);
        let unreachable: Vec<String> = network
            .holes()
            .filter(|h| !reached.contains(*h))
            .map(str::to_string)
            .collect();
        if let Some(first) = unreachable.first() {
            return Err(ScheduleError::UnreachableHole {
                hole_id: first.clone(),
                unreachable,
            });
        }

        // 4. 拓扑序单遍松弛
        let topo = network.topological_order()?;
        let mut best: BTreeMap<String, (u64, Option<ArrivalEdge>)> = sources
            .iter()
            .map(|p| (p.clone(), (0, None)))
            .collect();

        for hole in &topo {
            let Some(&(time, _)) = best.get(hole) else {
                continue;
            };
            for connector in network.outgoing(hole) {
                if sources.contains(&connector.to) {
                    continue;
                }
                let candidate = time + u64::from(connector.delay_ms);
                let better = match best.get(&connector.to) {
                    None => true,
                    Some((current, via)) => {
                        let current_key = via
                            .as_ref()
                            .map(|v| (v.sequence_index, v.from.as_str()))
                            .unwrap_or((i32::MIN, ""));
                        (candidate, connector.sequence_index, connector.from.as_str())
                            < (*current, current_key.0, current_key.1)
                    }
                };
                if better {
                    best.insert(
                        connector.to.clone(),
                        (
                            candidate,
                            Some(ArrivalEdge {
                                from: connector.from.clone(),
                                delay_ms: connector.delay_ms,
                                sequence_index: connector.sequence_index,
                            }),
                        ),
                    );
                }
            }
        }

        // 5. 组装
        let mut entries = BTreeMap::new();
        for (hole_id, (fire_time_ms, via)) in best {
            let in_hole_delay_ms = network.in_hole_delay(&hole_id);
            entries.insert(
                hole_id.clone(),
                ScheduleEntry {
                    hole_id,
                    fire_time_ms,
                    in_hole_delay_ms,
                    detonation_time_ms: fire_time_ms + u64::from(in_hole_delay_ms),
                    via,
                },
            );
        }

        // 拓扑序按到达时刻稳定排序, 仍为合法拓扑序
        let mut firing_order = topo;
        firing_order.sort_by_key(|h| entries.get(h).map(|e| e.fire_time_ms).unwrap_or(u64::MAX));

        let schedule = FiringSchedule {
            scope: network.scope(),
            initiation_points: sources,
            firing_order,
            entries,
            network_fingerprint: network.fingerprint(),
        };

        // 6. 自检
        validation::validate_schedule(network, &schedule)?;
        Ok(schedule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::drill_point::DrillPoint;
    use crate::domain::types::SiteScope;

    fn abc_network() -> InitiationNetwork {
        let scope = SiteScope::new(1, 1);
        let points: Vec<DrillPoint> = ["A", "B", "C"]
            .iter()
            .enumerate()
            .map(|(i, id)| DrillPoint::new(*id, scope, i as f64 * 3.0, 0.0, 10.0).with_stemming(3.0))
            .collect();
        let mut net = InitiationNetwork::from_points(scope, &points).unwrap();
        net.add_connector("A", "B", 25, 0).unwrap();
        net.add_connector("B", "C", 50, 0).unwrap();
        net
    }

    #[test]
    fn test_linear_chain() {
        let schedule = Sequencer::compute_schedule(&abc_network(), &["A".to_string()]).unwrap();
        assert_eq!(schedule.time_of("A"), Some(0));
        assert_eq!(schedule.time_of("B"), Some(25));
        assert_eq!(schedule.time_of("C"), Some(75));
        assert_eq!(schedule.firing_order, vec!["A", "B", "C"]);
        assert!(schedule.entries["A"].is_initiation_point());
        assert_eq!(schedule.entries["C"].via.as_ref().map(|v| v.from.as_str()), Some("B"));
    }

    #[test]
    fn test_cycle_rejected_before_relaxation() {
        let mut net = abc_network();
        net.add_connector("C", "A", 10, 0).unwrap();
        let err = Sequencer::compute_schedule(&net, &["A".to_string()]).unwrap_err();
        match err {
            ScheduleError::CycleDetected(cycle) => assert_eq!(cycle.cycle, vec!["A", "B", "C", "A"]),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_state_machine_scheduled() {
        let computation = ScheduleComputation::new();
        assert_eq!(computation.state(), ScheduleState::Pending);
        let computation = computation.run(&abc_network(), &["A".to_string()]);
        assert_eq!(computation.state(), ScheduleState::Scheduled);
        assert_eq!(
            computation.transitions(),
            &[ScheduleState::Pending, ScheduleState::Validating, ScheduleState::Scheduled]
        );
        assert!(matches!(computation.outcome(), Some(Ok(_))));
    }

    #[test]
    fn test_state_machine_rejected_is_terminal() {
        let computation = ScheduleComputation::new().run(&abc_network(), &[]);
        assert_eq!(computation.state(), ScheduleState::Rejected);

        // 终态再次执行不改变结果
        let computation = computation.run(&abc_network(), &["A".to_string()]);
        assert_eq!(computation.state(), ScheduleState::Rejected);
        assert_eq!(computation.into_result(), Err(ScheduleError::NoInitiationPoints));
    }

    #[test]
    fn test_unknown_initiation_point() {
        let err = Sequencer::compute_schedule(&abc_network(), &["Z".to_string()]).unwrap_err();
        assert_eq!(err, ScheduleError::UnknownInitiationPoint { hole_id: "Z".into() });
    }
}

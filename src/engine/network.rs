// ==========================================
// 爆破设计引擎 - 起爆网络
// ==========================================
// 依据: BlastConnections / DetonatorInfos 表结构
// 结构: petgraph StableDiGraph, 节点 = 炮孔, 边 = 有效(非隐藏)连接
// ==========================================
// 红线: 节点仅限同一 (project, site) 作用域
// 红线: 隐藏连接只做展示, 不参与任何图算法
// ==========================================

use crate::domain::connector::{Connector, DetonatorAssignment, InitiationPlan};
use crate::domain::drill_point::DrillPoint;
use crate::domain::types::{HoleKey, SiteScope};
use crate::engine::error::{CycleError, NetworkError};
use crate::engine::fingerprint::calculate_checksum;
use petgraph::algo::tarjan_scc;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::{Dfs, EdgeRef};
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument};

// ==========================================
// InitiationNetwork - 起爆网络
// ==========================================
#[derive(Debug, Clone)]
pub struct InitiationNetwork {
    scope: SiteScope,
    graph: StableDiGraph<String, Connector>,
    index: BTreeMap<String, NodeIndex>,
    hidden: BTreeMap<(String, String), Connector>,
    detonators: BTreeMap<String, DetonatorAssignment>,
}

impl InitiationNetwork {
    pub fn new(scope: SiteScope) -> Self {
        Self {
            scope,
            graph: StableDiGraph::new(),
            index: BTreeMap::new(),
            hidden: BTreeMap::new(),
            detonators: BTreeMap::new(),
        }
    }

    /// 由炮孔列表构建（仅注册节点）
    pub fn from_points(scope: SiteScope, points: &[DrillPoint]) -> Result<Self, NetworkError> {
        let mut network = Self::new(scope);
        for point in points {
            network.add_hole(point)?;
        }
        Ok(network)
    }

    /// 由炮孔 + 连接/雷管计划构建
    #[instrument(skip(points, plan), fields(
        scope = %scope,
        holes = points.len(),
        connectors = plan.connectors.len()
    ))]
    pub fn from_plan(
        scope: SiteScope,
        points: &[DrillPoint],
        plan: &InitiationPlan,
    ) -> Result<Self, NetworkError> {
        let mut network = Self::from_points(scope, points)?;
        for connector in &plan.connectors {
            network.insert_connector(connector.clone())?;
        }
        for detonator in &plan.detonators {
            network.assign_detonator(detonator.clone())?;
        }
        debug!(
            active = network.connector_count(),
            hidden = network.hidden.len(),
            detonators = network.detonators.len(),
            "起爆网络构建完成"
        );
        Ok(network)
    }

    // ==========================================
    // 构建
    // ==========================================

    /// 注册炮孔
    pub fn add_hole(&mut self, point: &DrillPoint) -> Result<(), NetworkError> {
        self.ensure_in_scope(point.key())?;
        if self.index.contains_key(&point.hole_id) {
            return Err(NetworkError::DuplicateHole {
                hole_id: point.hole_id.clone(),
            });
        }
        let node = self.graph.add_node(point.hole_id.clone());
        self.index.insert(point.hole_id.clone(), node);
        Ok(())
    }

    /// 添加表面连接 from → to
    pub fn add_connector(
        &mut self,
        from: &str,
        to: &str,
        delay_ms: u32,
        sequence_index: i32,
    ) -> Result<(), NetworkError> {
        self.insert_connector(Connector::new(from, to, delay_ms, sequence_index).in_scope(self.scope))
    }

    /// 添加完整连接（含类型与隐藏标记）
    ///
    /// 同一 (from, to) 已存在有效连接时拒绝; 已存在隐藏连接时替换之
    /// 标注了其他 (project, site) 的连接即使孔号相同也拒绝
    pub fn insert_connector(&mut self, mut connector: Connector) -> Result<(), NetworkError> {
        if let Some((from_key, to_key)) = connector.endpoint_keys() {
            self.ensure_in_scope(from_key)?;
            self.ensure_in_scope(to_key)?;
        }
        connector.scope = Some(self.scope);

        let from = self.node(&connector.from)?;
        let to = self.node(&connector.to)?;
        if from == to {
            return Err(NetworkError::SelfConnection {
                hole_id: connector.from.clone(),
            });
        }
        if self.graph.find_edge(from, to).is_some() {
            return Err(NetworkError::DuplicateConnector {
                from: connector.from.clone(),
                to: connector.to.clone(),
            });
        }

        let key = (connector.from.clone(), connector.to.clone());
        if connector.hidden {
            self.hidden.insert(key, connector);
        } else {
            self.hidden.remove(&key);
            self.graph.add_edge(from, to, connector);
        }
        Ok(())
    }

    /// 分配孔内雷管（每孔至多一发）
    pub fn assign_detonator(&mut self, assignment: DetonatorAssignment) -> Result<(), NetworkError> {
        self.node(&assignment.hole_id)?;
        if self.detonators.contains_key(&assignment.hole_id) {
            return Err(NetworkError::DuplicateDetonator {
                hole_id: assignment.hole_id.clone(),
            });
        }
        self.detonators.insert(assignment.hole_id.clone(), assignment);
        Ok(())
    }

    fn ensure_in_scope(&self, key: HoleKey) -> Result<(), NetworkError> {
        let actual = key.scope();
        if actual != self.scope {
            return Err(NetworkError::ScopeMismatch {
                hole_id: key.hole_id,
                expected: self.scope,
                actual,
            });
        }
        Ok(())
    }

    fn node(&self, hole_id: &str) -> Result<NodeIndex, NetworkError> {
        self.index
            .get(hole_id)
            .copied()
            .ok_or_else(|| NetworkError::UnknownEndpoint {
                hole_id: hole_id.to_string(),
            })
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn scope(&self) -> SiteScope {
        self.scope
    }

    pub fn contains_hole(&self, hole_id: &str) -> bool {
        self.index.contains_key(hole_id)
    }

    /// 已注册炮孔（按孔号排序）
    pub fn holes(&self) -> impl Iterator<Item = &str> + '_ {
        self.index.keys().map(String::as_str)
    }

    pub fn hole_count(&self) -> usize {
        self.index.len()
    }

    /// 有效连接数
    pub fn connector_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// 有效连接（按 from, to 排序）
    pub fn active_connectors(&self) -> Vec<&Connector> {
        let mut connectors: Vec<&Connector> = self
            .graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_weight(e))
            .collect();
        connectors.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));
        connectors
    }

    /// 隐藏连接（按 from, to 排序）
    pub fn hidden_connectors(&self) -> Vec<&Connector> {
        self.hidden.values().collect()
    }

    /// 某孔的有效出边（按 sequence_index, to 排序）
    pub fn outgoing(&self, hole_id: &str) -> Vec<&Connector> {
        self.edges(hole_id, Direction::Outgoing)
    }

    /// 某孔的有效入边（按 sequence_index, from 排序）
    pub fn incoming(&self, hole_id: &str) -> Vec<&Connector> {
        self.edges(hole_id, Direction::Incoming)
    }

    fn edges(&self, hole_id: &str, direction: Direction) -> Vec<&Connector> {
        let Some(&node) = self.index.get(hole_id) else {
            return Vec::new();
        };
        let mut edges: Vec<&Connector> = self
            .graph
            .edges_directed(node, direction)
            .map(|e| e.weight())
            .collect();
        edges.sort_by(|a, b| {
            (a.sequence_index, &a.to, &a.from).cmp(&(b.sequence_index, &b.to, &b.from))
        });
        edges
    }

    pub fn detonator(&self, hole_id: &str) -> Option<&DetonatorAssignment> {
        self.detonators.get(hole_id)
    }

    /// 孔内延时 (ms), 未分配雷管为 0
    pub fn in_hole_delay(&self, hole_id: &str) -> u32 {
        self.detonators.get(hole_id).map(|d| d.delay_ms).unwrap_or(0)
    }

    // ==========================================
    // 图算法
    // ==========================================

    /// 环路检测
    ///
    /// 返回的环路从所在强连通分量中孔号最小的炮孔出发并回到该孔,
    /// 出边按 (sequence_index, to) 顺序探索, 结果确定
    pub fn detect_cycles(&self) -> Result<(), CycleError> {
        let cyclic: Vec<BTreeSet<String>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| scc.into_iter().map(|n| self.graph[n].clone()).collect())
            .collect();

        let Some(component) = cyclic.into_iter().min_by(|a, b| a.first().cmp(&b.first())) else {
            return Ok(());
        };
        Err(CycleError {
            cycle: self.trace_cycle(&component),
        })
    }

    /// 在强连通分量内做确定性 DFS, 找回到起点的路径
    fn trace_cycle(&self, component: &BTreeSet<String>) -> Vec<String> {
        let Some(start) = component.first() else {
            return Vec::new();
        };

        let mut path: Vec<&str> = vec![start.as_str()];
        let mut cursor: Vec<usize> = vec![0];
        let mut visited: BTreeSet<&str> = BTreeSet::from([start.as_str()]);

        while let Some(&current) = path.last() {
            let depth = path.len() - 1;
            let next = self
                .outgoing(current)
                .into_iter()
                .filter(|c| component.contains(&c.to))
                .nth(cursor[depth]);

            match next {
                Some(edge) => {
                    cursor[depth] += 1;
                    if edge.to == *start {
                        let mut cycle: Vec<String> = path.iter().map(|h| h.to_string()).collect();
                        cycle.push(start.clone());
                        return cycle;
                    }
                    if visited.insert(edge.to.as_str()) {
                        path.push(edge.to.as_str());
                        cursor.push(0);
                    }
                }
                None => {
                    path.pop();
                    cursor.pop();
                }
            }
        }
        // 强连通分量内必然存在回到起点的边
        vec![start.clone(), start.clone()]
    }

    /// 弱连通分量（孤立炮孔单独成组）, 按各组最小孔号排序
    pub fn connected_components(&self) -> Vec<BTreeSet<String>> {
        let nodes: Vec<NodeIndex> = self.index.values().copied().collect();
        let position: BTreeMap<NodeIndex, usize> =
            nodes.iter().enumerate().map(|(i, n)| (*n, i)).collect();

        let mut sets = UnionFind::<usize>::new(nodes.len());
        for edge in self.graph.edge_indices() {
            let Some((source, target)) = self.graph.edge_endpoints(edge) else {
                continue;
            };
            if let (Some(&a), Some(&b)) = (position.get(&source), position.get(&target)) {
                sets.union(a, b);
            }
        }

        let mut groups: BTreeMap<usize, BTreeSet<String>> = BTreeMap::new();
        for (i, node) in nodes.iter().enumerate() {
            groups
                .entry(sets.find(i))
                .or_default()
                .insert(self.graph[*node].clone());
        }

        let mut components: Vec<BTreeSet<String>> = groups.into_values().collect();
        components.sort_by(|a, b| a.first().cmp(&b.first()));
        components
    }

    /// 从给定起爆点沿有效连接可达的炮孔（含起爆点本身）
    pub fn reachable_from(&self, initiation_points: &[String]) -> BTreeSet<String> {
        let mut reached = BTreeSet::new();
        let mut dfs = Dfs::empty(&self.graph);
        for point in initiation_points {
            let Some(&start) = self.index.get(point) else {
                continue;
            };
            dfs.move_to(start);
            while let Some(node) = dfs.next(&self.graph) {
                reached.insert(self.graph[node].clone());
            }
        }
        reached
    }

    /// 拓扑序（Kahn, 就绪集按孔号排序）
    pub fn topological_order(&self) -> Result<Vec<String>, CycleError> {
        self.detect_cycles()?;

        let mut in_degree: BTreeMap<&str, usize> = self
            .index
            .iter()
            .map(|(hole, node)| {
                (
                    hole.as_str(),
                    self.graph.edges_directed(*node, Direction::Incoming).count(),
                )
            })
            .collect();

        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(h, _)| *h)
            .collect();

        let mut order = Vec::with_capacity(self.index.len());
        while let Some(hole) = ready.pop_first() {
            order.push(hole.to_string());
            for edge in self.outgoing(hole) {
                if let Some(d) = in_degree.get_mut(edge.to.as_str()) {
                    *d -= 1;
                    if *d == 0 {
                        ready.insert(edge.to.as_str());
                    }
                }
            }
        }
        Ok(order)
    }

    /// 网络状态指纹（作用域 + 炮孔 + 有效连接 + 雷管）
    pub fn fingerprint(&self) -> String {
        let mut content = format!("scope:{}\n", self.scope);
        for hole in self.holes() {
            content.push_str(&format!("hole:{}\n", hole));
        }
        for c in self.active_connectors() {
            content.push_str(&format!(
                "edge:{}>{}|{}|{}|{}\n",
                c.from, c.to, c.delay_ms, c.sequence_index, c.connector_type
            ));
        }
        for d in self.detonators.values() {
            content.push_str(&format!("det:{}|{}|{}\n", d.hole_id, d.detonator_type, d.delay_ms));
        }
        calculate_checksum(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{ConnectorType, DetonatorType};

    fn scope() -> SiteScope {
        SiteScope::new(1, 1)
    }

    fn network(ids: &[&str]) -> InitiationNetwork {
        let points: Vec<DrillPoint> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| DrillPoint::new(*id, scope(), i as f64 * 3.0, 0.0, 10.0))
            .collect();
        InitiationNetwork::from_points(scope(), &points).unwrap()
    }

    #[test]
    fn test_add_connector_unknown_endpoint() {
        let mut net = network(&["A", "B"]);
        let err = net.add_connector("A", "Z", 25, 0).unwrap_err();
        assert_eq!(err, NetworkError::UnknownEndpoint { hole_id: "Z".into() });
    }

    #[test]
    fn test_add_connector_duplicate_and_self() {
        let mut net = network(&["A", "B"]);
        net.add_connector("A", "B", 25, 0).unwrap();
        assert!(matches!(
            net.add_connector("A", "B", 42, 1),
            Err(NetworkError::DuplicateConnector { .. })
        ));
        assert_eq!(
            net.add_connector("A", "A", 0, 0),
            Err(NetworkError::SelfConnection { hole_id: "A".into() })
        );
        // 反方向不视为重复
        net.add_connector("B", "A", 10, 0).unwrap();
        assert_eq!(net.connector_count(), 2);
    }

    #[test]
    fn test_hidden_connector_replaced_by_active() {
        let mut net = network(&["A", "B"]);
        net.insert_connector(Connector::new("A", "B", 17, 0).hidden()).unwrap();
        assert_eq!(net.connector_count(), 0);
        assert_eq!(net.hidden_connectors().len(), 1);

        net.insert_connector(Connector::new("A", "B", 25, 0).with_type(ConnectorType::Trunk))
            .unwrap();
        assert_eq!(net.connector_count(), 1);
        assert!(net.hidden_connectors().is_empty());
        assert_eq!(net.outgoing("A")[0].delay_ms, 25);
    }

    #[test]
    fn test_foreign_connector_rejected() {
        let mut net = network(&["A", "B"]);
        let foreign = Connector::new("A", "B", 25, 0).in_scope(SiteScope::new(1, 2));
        assert_eq!(
            net.insert_connector(foreign),
            Err(NetworkError::ScopeMismatch {
                hole_id: "A".into(),
                expected: scope(),
                actual: SiteScope::new(1, 2),
            })
        );
        assert_eq!(net.connector_count(), 0);

        // 未标注或同作用域的连接归入本网络
        net.insert_connector(Connector::new("A", "B", 25, 0).in_scope(scope())).unwrap();
        assert_eq!(net.outgoing("A")[0].scope, Some(scope()));
    }

    #[test]
    fn test_hole_scope_mismatch() {
        let mut net = InitiationNetwork::new(scope());
        let foreign = DrillPoint::new("X", SiteScope::new(1, 2), 0.0, 0.0, 10.0);
        assert!(matches!(net.add_hole(&foreign), Err(NetworkError::ScopeMismatch { .. })));
    }

    #[test]
    fn test_detect_cycles_reports_exact_cycle() {
        let mut net = network(&["A", "B", "C"]);
        net.add_connector("A", "B", 25, 0).unwrap();
        net.add_connector("B", "C", 50, 0).unwrap();
        assert!(net.detect_cycles().is_ok());

        net.add_connector("C", "A", 10, 0).unwrap();
        let err = net.detect_cycles().unwrap_err();
        assert_eq!(err.cycle, vec!["A", "B", "C", "A"]);
    }

    #[test]
    fn test_hidden_edge_does_not_close_cycle() {
        let mut net = network(&["A", "B"]);
        net.add_connector("A", "B", 25, 0).unwrap();
        net.insert_connector(Connector::new("B", "A", 10, 0).hidden()).unwrap();
        assert!(net.detect_cycles().is_ok());
    }

    #[test]
    fn test_connected_components() {
        let mut net = network(&["A", "B", "C", "D"]);
        net.add_connector("A", "B", 25, 0).unwrap();
        net.add_connector("C", "B", 25, 0).unwrap();
        let components = net.connected_components();
        assert_eq!(components.len(), 2);
        assert_eq!(components[0], BTreeSet::from(["A".to_string(), "B".into(), "C".into()]));
        assert_eq!(components[1], BTreeSet::from(["D".to_string()]));
    }

    #[test]
    fn test_topological_order_breaks_ties_by_hole_id() {
        let mut net = network(&["A", "B", "C", "D"]);
        net.add_connector("A", "D", 25, 0).unwrap();
        net.add_connector("A", "C", 25, 0).unwrap();
        net.add_connector("C", "B", 25, 0).unwrap();
        assert_eq!(net.topological_order().unwrap(), vec!["A", "C", "B", "D"]);
    }

    #[test]
    fn test_reachable_from() {
        let mut net = network(&["A", "B", "C"]);
        net.add_connector("A", "B", 25, 0).unwrap();
        let reached = net.reachable_from(&["A".to_string()]);
        assert!(reached.contains("A") && reached.contains("B"));
        assert!(!reached.contains("C"));
    }

    #[test]
    fn test_detonator_assignment() {
        let mut net = network(&["A"]);
        let det = DetonatorAssignment {
            hole_id: "A".into(),
            detonator_type: DetonatorType::NonElectric,
            delay_ms: 500,
        };
        net.assign_detonator(det.clone()).unwrap();
        assert_eq!(net.in_hole_delay("A"), 500);
        assert_eq!(
            net.assign_detonator(det),
            Err(NetworkError::DuplicateDetonator { hole_id: "A".into() })
        );
    }

    #[test]
    fn test_fingerprint_tracks_active_edges_only() {
        let mut net = network(&["A", "B"]);
        let before = net.fingerprint();
        net.insert_connector(Connector::new("A", "B", 25, 0).hidden()).unwrap();
        assert_eq!(net.fingerprint(), before);
        net.add_connector("A", "B", 25, 0).unwrap();
        assert_ne!(net.fingerprint(), before);
    }
}

// ==========================================
// 爆破设计引擎 - 起爆连接领域模型
// ==========================================
// 依据: BlastConnections / DetonatorInfos 表结构
// 单位: 延时 ms (整数)
// ==========================================
// 红线: 连接按 point1 → point2 有向处理（起爆时间具有因果性）
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::types::{ConnectorType, DetonatorType, HoleKey, SiteScope};

// ==========================================
// Connector - 孔间延时连接
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connector {
    pub from: String,
    pub to: String,
    pub delay_ms: u32,
    /// 同时刻竞争时的先后次序（越小越优先）
    pub sequence_index: i32,
    #[serde(default)]
    pub connector_type: ConnectorType,
    /// 仅用于展示; 引擎忽略隐藏连接
    #[serde(default)]
    pub hidden: bool,
    /// 所属 (project, site); 未标注时归属于接收它的网络
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<SiteScope>,
}

impl Connector {
    pub fn new(from: impl Into<String>, to: impl Into<String>, delay_ms: u32, sequence_index: i32) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            delay_ms,
            sequence_index,
            connector_type: ConnectorType::Surface,
            hidden: false,
            scope: None,
        }
    }

    pub fn in_scope(mut self, scope: SiteScope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// 两端炮孔的复合键（未标注作用域时为 None）
    pub fn endpoint_keys(&self) -> Option<(HoleKey, HoleKey)> {
        self.scope
            .map(|scope| (HoleKey::new(self.from.clone(), scope), HoleKey::new(self.to.clone(), scope)))
    }

    pub fn with_type(mut self, connector_type: ConnectorType) -> Self {
        self.connector_type = connector_type;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}


// ==========================================
// DetonatorAssignment - 孔内雷管
// ==========================================
// 孔内延时叠加在地表到达时间之上: 起爆时刻 = 到达时刻 + delay_ms
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DetonatorAssignment {
    pub hole_id: String,
    pub detonator_type: DetonatorType,
    pub delay_ms: u32,
}

// ==========================================
// InitiationPlan - 连接/雷管来源交付的完整输入
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InitiationPlan {
    #[serde(default)]
    pub connectors: Vec<Connector>,
    #[serde(default)]
    pub detonators: Vec<DetonatorAssignment>,
    #[serde(default)]
    pub initiation_points: Vec<String>,
}

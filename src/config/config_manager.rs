// ==========================================
// 爆破设计引擎 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 覆写: site → project → global, 取最先命中者
// ==========================================

use crate::config::engine_config::EngineConfig;
use crate::config::engine_config_trait::EngineConfigReader;
use crate::db::{ensure_config_schema, open_sqlite_connection};
use crate::domain::types::{PowderFactorBasis, SiteScope};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigScope - 配置作用域
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigScope {
    Global,                            // 全局
    Project { project_id: i64 },       // 项目
    Site { scope: SiteScope },         // 爆区（项目+场地）
}

impl ConfigScope {
    /// config_kv.scope_id 取值
    pub fn scope_id(&self) -> String {
        match self {
            ConfigScope::Global => "global".to_string(),
            ConfigScope::Project { project_id } => format!("project/{}", project_id),
            ConfigScope::Site { scope } => format!("site/{}/{}", scope.project_id, scope.site_id),
        }
    }

    /// 查找链: 由具体到一般
    pub fn lookup_chain(scope: Option<SiteScope>) -> Vec<ConfigScope> {
        match scope {
            Some(s) => vec![
                ConfigScope::Site { scope: s },
                ConfigScope::Project {
                    project_id: s.project_id,
                },
                ConfigScope::Global,
            ],
            None => vec![ConfigScope::Global],
        }
    }
}

impl fmt::Display for ConfigScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.scope_id())
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例（自动建表）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        ensure_config_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA 并建表（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
            ensure_config_schema(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 读取单一作用域的配置值
    pub fn get_config_value(&self, scope: ConfigScope, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![scope.scope_id(), key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(ConfigScope::Global, key)
    }

    /// 按 site → project → global 顺序读取配置值
    pub fn get_scoped_value(&self, scope: Option<SiteScope>, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        for candidate in ConfigScope::lookup_chain(scope) {
            if let Some(value) = self.get_config_value(candidate, key)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// 写入配置值（UPSERT）
    pub fn set_config_value(&self, scope: ConfigScope, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![scope.scope_id(), key, value],
        )?;
        tracing::debug!(scope = %scope, key, value, "配置已写入");
        Ok(())
    }

    /// 删除配置值, 返回是否存在
    pub fn delete_config_value(&self, scope: ConfigScope, key: &str) -> Result<bool, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let affected = conn.execute(
            "DELETE FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![scope.scope_id(), key],
        )?;
        Ok(affected > 0)
    }

    /// 读取配置值，带默认值（按作用域覆写）
    fn get_config_or_default(
        &self,
        scope: Option<SiteScope>,
        key: &str,
        default: &str,
    ) -> Result<String, Box<dyn Error>> {
        Ok(self.get_scoped_value(scope, key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 解析数值配置; 格式错误时告警并使用默认值
    fn get_parsed_or_default<T>(&self, scope: Option<SiteScope>, key: &str, default: T) -> Result<T, Box<dyn Error>>
    where
        T: std::str::FromStr + fmt::Display + Copy,
    {
        let Some(raw) = self.get_scoped_value(scope, key)? else {
            return Ok(default);
        };
        match raw.trim().parse::<T>() {
            Ok(v) => Ok(v),
            Err(_) => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    default = %default,
                    "配置格式错误，使用默认值"
                );
                Ok(default)
            }
        }
    }

    /// 获取指定作用域配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 与装药/时序结果一起归档, 便于复核当时所用参数
    pub fn get_config_snapshot(&self, scope: ConfigScope) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map(params![scope.scope_id()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }

    /// 从配置快照恢复配置
    ///
    /// # 返回
    /// - Ok(usize): 恢复的配置项数量
    ///
    /// # 注意
    /// - 覆盖该作用域下同名配置, 不删除快照外的配置
    /// - 以 `__meta_` 开头的键为元信息, 不回写
    pub fn restore_config_from_snapshot(&self, scope: ConfigScope, snapshot_json: &str) -> Result<usize, Box<dyn Error>> {
        let config_map: BTreeMap<String, String> = serde_json::from_str(snapshot_json)?;

        let mut conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for (key, value) in config_map.iter() {
            if key.starts_with("__meta_") {
                continue;
            }
            let affected = tx.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
                params![scope.scope_id(), key, value],
            )?;
            count += affected;
        }

        tx.commit()?;
        tracing::info!(scope = %scope, restored = count, "配置快照已恢复");
        Ok(count)
    }
}

// ==========================================
// EngineConfigReader Trait 实现
// ==========================================
#[async_trait]
impl EngineConfigReader for ConfigManager {
    async fn get_powder_factor_basis(
        &self,
        scope: Option<SiteScope>,
    ) -> Result<PowderFactorBasis, Box<dyn Error>> {
        let value = self.get_config_or_default(scope, config_keys::POWDER_FACTOR_BASIS, "VOLUME")?;
        match value.parse::<PowderFactorBasis>() {
            Ok(basis) => Ok(basis),
            Err(e) => {
                tracing::warn!(
                    config_key = config_keys::POWDER_FACTOR_BASIS,
                    raw_value = %value,
                    "{}，使用 VOLUME",
                    e
                );
                Ok(PowderFactorBasis::Volume)
            }
        }
    }

    async fn get_density_limits(&self, scope: Option<SiteScope>) -> Result<(f64, f64), Box<dyn Error>> {
        let defaults = EngineConfig::default();
        let emulsion =
            self.get_parsed_or_default(scope, config_keys::MAX_EMULSION_DENSITY, defaults.max_emulsion_density)?;
        let anfo = self.get_parsed_or_default(scope, config_keys::MAX_ANFO_DENSITY, defaults.max_anfo_density)?;
        Ok((emulsion, anfo))
    }

    async fn get_max_diameter(&self, scope: Option<SiteScope>) -> Result<f64, Box<dyn Error>> {
        self.get_parsed_or_default(scope, config_keys::MAX_DIAMETER_M, EngineConfig::default().max_diameter_m)
    }

    async fn get_max_emulsion_per_hole(&self, scope: Option<SiteScope>) -> Result<f64, Box<dyn Error>> {
        self.get_parsed_or_default(
            scope,
            config_keys::MAX_EMULSION_PER_HOLE_KG,
            EngineConfig::default().max_emulsion_per_hole_kg,
        )
    }

    async fn get_column_epsilon(&self, scope: Option<SiteScope>) -> Result<f64, Box<dyn Error>> {
        self.get_parsed_or_default(scope, config_keys::COLUMN_EPSILON, EngineConfig::default().column_epsilon)
    }

    async fn get_simultaneity_window_ms(&self, scope: Option<SiteScope>) -> Result<u32, Box<dyn Error>> {
        self.get_parsed_or_default(
            scope,
            config_keys::SIMULTANEITY_WINDOW_MS,
            EngineConfig::default().simultaneity_window_ms,
        )
    }

    async fn get_require_unique_coordinates(
        &self,
        scope: Option<SiteScope>,
    ) -> Result<bool, Box<dyn Error>> {
        let value = self.get_config_or_default(scope, config_keys::REQUIRE_UNIQUE_COORDINATES, "true")?;
        Ok(!matches!(value.trim().to_lowercase().as_str(), "false" | "0" | "no"))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 单耗
    pub const POWDER_FACTOR_BASIS: &str = "powder_factor_basis";

    // 量纲边界
    pub const MAX_EMULSION_DENSITY: &str = "max_emulsion_density";
    pub const MAX_ANFO_DENSITY: &str = "max_anfo_density";
    pub const MAX_DIAMETER_M: &str = "max_diameter_m";
    pub const MAX_EMULSION_PER_HOLE_KG: &str = "max_emulsion_per_hole_kg";

    // 校验
    pub const COLUMN_EPSILON: &str = "column_epsilon";
    pub const REQUIRE_UNIQUE_COORDINATES: &str = "require_unique_coordinates";

    // 时序统计
    pub const SIMULTANEITY_WINDOW_MS: &str = "simultaneity_window_ms";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_scope_ids() {
        assert_eq!(ConfigScope::Global.scope_id(), "global");
        assert_eq!(ConfigScope::Project { project_id: 7 }.scope_id(), "project/7");
        assert_eq!(
            ConfigScope::Site {
                scope: SiteScope::new(7, 3)
            }
            .scope_id(),
            "site/7/3"
        );
    }

    #[test]
    fn test_site_overrides_project_overrides_global() {
        let mgr = manager();
        let site = SiteScope::new(7, 3);
        mgr.set_config_value(ConfigScope::Global, "k", "g").unwrap();
        assert_eq!(mgr.get_scoped_value(Some(site), "k").unwrap().as_deref(), Some("g"));

        mgr.set_config_value(ConfigScope::Project { project_id: 7 }, "k", "p").unwrap();
        assert_eq!(mgr.get_scoped_value(Some(site), "k").unwrap().as_deref(), Some("p"));

        mgr.set_config_value(ConfigScope::Site { scope: site }, "k", "s").unwrap();
        assert_eq!(mgr.get_scoped_value(Some(site), "k").unwrap().as_deref(), Some("s"));

        // 其他场地不受影响
        let other = SiteScope::new(7, 4);
        assert_eq!(mgr.get_scoped_value(Some(other), "k").unwrap().as_deref(), Some("p"));
        assert_eq!(mgr.get_scoped_value(None, "k").unwrap().as_deref(), Some("g"));
    }

    #[tokio::test]
    async fn test_malformed_value_falls_back_to_default() {
        let mgr = manager();
        mgr.set_config_value(ConfigScope::Global, config_keys::MAX_DIAMETER_M, "abc").unwrap();
        assert_eq!(mgr.get_max_diameter(None).await.unwrap(), 1.0);
    }
}

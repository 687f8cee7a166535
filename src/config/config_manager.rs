// ==========================================
// 检验员分配系统 - 配置管理器
// ==========================================
// 职责: 规则配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 红线: 运行期间不重读，引擎只消费 AssignmentRules 快照
// ==========================================

use crate::config::rule_config_trait::RuleConfigReader;
use crate::db::{ensure_config_schema, open_sqlite_connection, GLOBAL_SCOPE_ID};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

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
    /// 会对传入连接再次应用统一 PRAGMA 并建表（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
            ensure_config_schema(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        Ok(crate::db::read_global_value(&conn, key)?)
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![GLOBAL_SCOPE_ID, key, value],
        )?;
        Ok(())
    }

    /// 读取并解析配置值，缺失或格式错误时回落到默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> Result<T, Box<dyn Error>>
    where
        T: FromStr + Copy + std::fmt::Display,
    {
        let raw = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };
        match raw.trim().parse::<T>() {
            Ok(v) => Ok(v),
            Err(_) => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    default = %default,
                    "配置值格式错误，使用默认值"
                );
                Ok(default)
            }
        }
    }

    /// 获取所有配置的快照（JSON格式，键升序）
    ///
    /// # 用途
    /// - 在运行前记录配置快照，便于复现
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;

        let rows = stmt.query_map([GLOBAL_SCOPE_ID], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&config_map)?)
    }

    /// 从配置快照恢复配置
    ///
    /// # 返回
    /// - Ok(usize): 恢复的配置项数量
    ///
    /// # 注意
    /// - 覆盖现有的 global 配置
    /// - 以 `__meta_` 开头的键不回写
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> Result<usize, Box<dyn Error>> {
        let config_map: BTreeMap<String, String> = serde_json::from_str(snapshot_json)?;

        let mut conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for (key, value) in config_map.iter() {
            if key.starts_with("__meta_") {
                continue;
            }
            count += tx.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3",
                params![GLOBAL_SCOPE_ID, key, value],
            )?;
        }

        tx.commit()?;
        Ok(count)
    }
}

// ==========================================
// RuleConfigReader Trait 实现
// ==========================================
#[async_trait]
impl RuleConfigReader for ConfigManager {
    async fn get_product_hour_cap(&self) -> Result<f64, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::PRODUCT_HOUR_CAP, 4.0)
    }

    async fn get_hours_per_inspector(&self) -> Result<f64, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::HOURS_PER_INSPECTOR, 3.0)
    }

    async fn get_allow_hour_cap_relaxation(&self) -> Result<bool, Box<dyn Error>> {
        let value = self.get_config_value(config_keys::ALLOW_HOUR_CAP_RELAXATION)?;
        Ok(match value.as_deref().map(|v| v.trim().to_lowercase()) {
            Some(v) => !matches!(v.as_str(), "0" | "false" | "no" | "off"),
            None => true,
        })
    }

    async fn get_default_shift_minutes(&self) -> Result<i64, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::DEFAULT_SHIFT_MINUTES, 480)
    }

    async fn get_taboo_lookback_hours(&self) -> Result<f64, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::TABOO_LOOKBACK_HOURS, 48.0)
    }

    async fn get_taboo_weight(&self) -> Result<f64, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::TABOO_WEIGHT, 0.3)
    }

    async fn get_fairness_weight_per_hour(&self) -> Result<f64, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::FAIRNESS_WEIGHT_PER_HOUR, 0.1)
    }

    async fn get_acceptance_floor(&self) -> Result<f64, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::ACCEPTANCE_FLOOR, 0.0)
    }

    async fn get_score_epsilon(&self) -> Result<f64, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::SCORE_EPSILON, 1e-6)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 硬约束
    pub const PRODUCT_HOUR_CAP: &str = "product_hour_cap";
    pub const HOURS_PER_INSPECTOR: &str = "hours_per_inspector";
    pub const ALLOW_HOUR_CAP_RELAXATION: &str = "allow_hour_cap_relaxation";
    pub const DEFAULT_SHIFT_MINUTES: &str = "default_shift_minutes";

    // 评分
    pub const TABOO_LOOKBACK_HOURS: &str = "taboo_lookback_hours";
    pub const TABOO_WEIGHT: &str = "taboo_weight";
    pub const FAIRNESS_WEIGHT_PER_HOUR: &str = "fairness_weight_per_hour";
    pub const ACCEPTANCE_FLOOR: &str = "acceptance_floor";
    pub const SCORE_EPSILON: &str = "score_epsilon";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_manager() -> (tempfile::TempDir, ConfigManager) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.db");
        let manager = ConfigManager::new(path.to_str().unwrap()).unwrap();
        (dir, manager)
    }

    #[tokio::test]
    async fn test_defaults_when_empty() {
        let (_dir, manager) = open_manager();
        assert_eq!(manager.get_product_hour_cap().await.unwrap(), 4.0);
        assert_eq!(manager.get_hours_per_inspector().await.unwrap(), 3.0);
        assert!(manager.get_allow_hour_cap_relaxation().await.unwrap());
        assert_eq!(manager.get_default_shift_minutes().await.unwrap(), 480);
    }

    #[tokio::test]
    async fn test_malformed_value_falls_back() {
        let (_dir, manager) = open_manager();
        manager
            .set_global_config_value(config_keys::TABOO_WEIGHT, "abc")
            .unwrap();
        manager
            .set_global_config_value(config_keys::ALLOW_HOUR_CAP_RELAXATION, "false")
            .unwrap();

        assert_eq!(manager.get_taboo_weight().await.unwrap(), 0.3);
        assert!(!manager.get_allow_hour_cap_relaxation().await.unwrap());
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let (_dir, manager) = open_manager();
        manager
            .set_global_config_value(config_keys::PRODUCT_HOUR_CAP, "3.5")
            .unwrap();
        let snapshot = manager.get_config_snapshot().unwrap();
        assert_eq!(snapshot, r#"{"product_hour_cap":"3.5"}"#);

        let (_dir2, other) = open_manager();
        let restored = other
            .restore_config_from_snapshot(r#"{"product_hour_cap":"3.5","__meta_name":"x"}"#)
            .unwrap();
        assert_eq!(restored, 1);
        assert_eq!(
            other
                .get_global_config_value(config_keys::PRODUCT_HOUR_CAP)
                .unwrap(),
            Some("3.5".to_string())
        );
    }
}

// ==========================================
// 检验员分配系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 规则配置表 (config_scope / config_kv) 的建表
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 全局配置作用域 ID
pub const GLOBAL_SCOPE_ID: &str = "global";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// foreign_keys 与 busy_timeout 需要每个连接单独设置。
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 创建规则配置表（幂等）
pub fn ensure_config_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id   TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key  TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id   TEXT NOT NULL REFERENCES config_scope(scope_id),
            key        TEXT NOT NULL,
            value      TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key) VALUES (?1, 'GLOBAL', 'global')",
        [GLOBAL_SCOPE_ID],
    )?;
    Ok(())
}

/// 读取单个全局配置值（表或键不存在时返回 None）
pub fn read_global_value(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
        [GLOBAL_SCOPE_ID, key],
        |row| row.get(0),
    )
    .optional()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        ensure_config_schema(&conn).unwrap();
        ensure_config_schema(&conn).unwrap();

        assert_eq!(read_global_value(&conn, "product_hour_cap").unwrap(), None);

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', 'product_hour_cap', '3.5')",
            [],
        )
        .unwrap();
        assert_eq!(
            read_global_value(&conn, "product_hour_cap").unwrap(),
            Some("3.5".to_string())
        );
    }
}

// ==========================================
// 检验员分配系统 - 配置层
// ==========================================
// 职责: 规则配置管理 + 运行期规则快照
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod rule_config_trait;
pub mod rule_snapshot;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use rule_config_trait::RuleConfigReader;
pub use rule_snapshot::AssignmentRules;

// ==========================================
// 检验员分配系统 - 分配规则配置读取 Trait
// ==========================================
// 职责: 定义引擎所需的规则配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;

// ==========================================
// RuleConfigReader Trait
// ==========================================
// 用途: 运行开始时一次性读取规则快照
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait RuleConfigReader: Send + Sync {
    // ===== 硬约束 =====

    /// 同品番工时上限（小时）
    ///
    /// # 默认值
    /// - 4.0
    async fn get_product_hour_cap(&self) -> Result<f64, Box<dyn Error>>;

    /// 每名检验员承担的工时阈值（小时），用于计算所需人数
    ///
    /// # 默认值
    /// - 3.0
    async fn get_hours_per_inspector(&self) -> Result<f64, Box<dyn Error>>;

    /// 是否允许在最后阶段突破同品番上限
    ///
    /// # 默认值
    /// - true
    async fn get_allow_hour_cap_relaxation(&self) -> Result<bool, Box<dyn Error>>;

    /// 班次缺失时的可用分钟
    ///
    /// # 默认值
    /// - 480
    async fn get_default_shift_minutes(&self) -> Result<i64, Box<dyn Error>>;

    // ===== 评分权重 =====

    /// 禁忌回看窗口（小时）
    ///
    /// # 默认值
    /// - 48.0
    async fn get_taboo_lookback_hours(&self) -> Result<f64, Box<dyn Error>>;

    /// 禁忌惩罚（年龄为 0 时的最大值）
    ///
    /// # 默认值
    /// - 0.3
    async fn get_taboo_weight(&self) -> Result<f64, Box<dyn Error>>;

    /// 公平惩罚（每超出均值 1 小时）
    ///
    /// # 默认值
    /// - 0.1
    async fn get_fairness_weight_per_hour(&self) -> Result<f64, Box<dyn Error>>;

    /// 严格策略下的最低可接受评分
    ///
    /// # 默认值
    /// - 0.0
    async fn get_acceptance_floor(&self) -> Result<f64, Box<dyn Error>>;

    /// 评分并列判定阈值
    ///
    /// # 默认值
    /// - 1e-6
    async fn get_score_epsilon(&self) -> Result<f64, Box<dyn Error>>;
}

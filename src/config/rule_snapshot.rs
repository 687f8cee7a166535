// ==========================================
// 检验员分配系统 - 分配规则快照
// ==========================================
// 职责: 运行开始时一次性读取的不可变规则集合
// 红线: 运行期间不重读、不修改
// ==========================================

use crate::config::rule_config_trait::RuleConfigReader;
use crate::domain::inspector::DEFAULT_SHIFT_MINUTES;
use crate::engine::error::{ConfigurationError, EngineError};
use serde::{Deserialize, Serialize};

// ==========================================
// AssignmentRules - 规则快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRules {
    pub product_hour_cap: f64,          // 同品番工时上限 (h)
    pub hours_per_inspector: f64,       // 每人工时阈值 (h)
    pub taboo_lookback_hours: f64,      // 禁忌回看窗口 (h)
    pub taboo_weight: f64,              // 禁忌惩罚最大值
    pub fairness_weight_per_hour: f64,  // 公平惩罚 / 小时
    pub acceptance_floor: f64,          // 严格策略最低评分
    pub score_epsilon: f64,             // 并列阈值
    pub allow_hour_cap_relaxation: bool,
    pub default_shift_minutes: i64,
}

impl Default for AssignmentRules {
    fn default() -> Self {
        Self {
            product_hour_cap: 4.0,
            hours_per_inspector: 3.0,
            taboo_lookback_hours: 48.0,
            taboo_weight: 0.3,
            fairness_weight_per_hour: 0.1,
            acceptance_floor: 0.0,
            score_epsilon: 1e-6,
            allow_hour_cap_relaxation: true,
            default_shift_minutes: DEFAULT_SHIFT_MINUTES,
        }
    }
}

impl AssignmentRules {
    /// 从配置读取器加载快照并校验
    pub async fn load<R>(reader: &R) -> Result<Self, EngineError>
    where
        R: RuleConfigReader + ?Sized,
    {
        let read_err = |e: Box<dyn std::error::Error>| EngineError::ConfigRead(e.to_string());

        let rules = Self {
            product_hour_cap: reader.get_product_hour_cap().await.map_err(read_err)?,
            hours_per_inspector: reader.get_hours_per_inspector().await.map_err(read_err)?,
            taboo_lookback_hours: reader.get_taboo_lookback_hours().await.map_err(read_err)?,
            taboo_weight: reader.get_taboo_weight().await.map_err(read_err)?,
            fairness_weight_per_hour: reader
                .get_fairness_weight_per_hour()
                .await
                .map_err(read_err)?,
            acceptance_floor: reader.get_acceptance_floor().await.map_err(read_err)?,
            score_epsilon: reader.get_score_epsilon().await.map_err(read_err)?,
            allow_hour_cap_relaxation: reader
                .get_allow_hour_cap_relaxation()
                .await
                .map_err(read_err)?,
            default_shift_minutes: reader.get_default_shift_minutes().await.map_err(read_err)?,
        };

        rules.validate()?;
        tracing::info!(
            product_hour_cap = rules.product_hour_cap,
            hours_per_inspector = rules.hours_per_inspector,
            allow_hour_cap_relaxation = rules.allow_hour_cap_relaxation,
            "规则快照已加载"
        );
        Ok(rules)
    }

    /// 校验规则值
    ///
    /// # 规则
    /// - 上限 / 阈值 必须为有限正数
    /// - 权重 / 回看窗口 必须为有限非负数
    /// - epsilon 必须为有限正数
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.product_hour_cap.is_finite() && self.product_hour_cap > 0.0) {
            return Err(ConfigurationError::NonPositiveHourCap(self.product_hour_cap));
        }
        if !(self.hours_per_inspector.is_finite() && self.hours_per_inspector > 0.0) {
            return Err(ConfigurationError::NonPositiveThreshold(
                self.hours_per_inspector,
            ));
        }

        let non_negative = [
            ("taboo_lookback_hours", self.taboo_lookback_hours),
            ("taboo_weight", self.taboo_weight),
            ("fairness_weight_per_hour", self.fairness_weight_per_hour),
        ];
        for (key, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigurationError::InvalidWeight {
                    key: key.to_string(),
                    value,
                });
            }
        }

        if !self.acceptance_floor.is_finite() {
            return Err(ConfigurationError::InvalidWeight {
                key: "acceptance_floor".to_string(),
                value: self.acceptance_floor,
            });
        }
        if !(self.score_epsilon.is_finite() && self.score_epsilon > 0.0) {
            return Err(ConfigurationError::InvalidWeight {
                key: "score_epsilon".to_string(),
                value: self.score_epsilon,
            });
        }
        if self.default_shift_minutes < 0 {
            return Err(ConfigurationError::InvalidWeight {
                key: "default_shift_minutes".to_string(),
                value: self.default_shift_minutes as f64,
            });
        }
        Ok(())
    }

    /// 同品番上限（分钟）
    pub fn cap_minutes(&self) -> i64 {
        (self.product_hour_cap * 60.0).round() as i64
    }

    /// 每人工时阈值（分钟）
    pub fn threshold_minutes(&self) -> i64 {
        ((self.hours_per_inspector * 60.0).round() as i64).max(1)
    }
}

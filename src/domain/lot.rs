// ==========================================
// 检验员分配系统 - 批次领域模型
// ==========================================
// 职责: 缺口记录 / 优先批次请求 / 检验批次
// 红线: 批次一旦生成即不可变，仅分配结果变化
// 红线: 同一缺口拆分出的批次数量之和 = 缺口数量
// ==========================================

use crate::domain::types::LotOrigin;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// ShortageRecord - 出荷不足记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortageRecord {
    pub product_id: String,             // 品番
    pub process_id: Option<String>,     // 現在工程番号
    pub shortage_quantity: i64,         // 不足数（已取正值）
    pub shipment_date: Option<NaiveDate>, // 出荷予定日
}

impl ShortageRecord {
    pub fn new(product_id: &str, process_id: Option<&str>, shortage_quantity: i64) -> Self {
        Self {
            product_id: product_id.to_string(),
            process_id: process_id.map(|s| s.to_string()),
            shortage_quantity,
            shipment_date: None,
        }
    }
}

// ==========================================
// PriorityLotRequest - 当日登録 / 洗浄 / 先行検査批次
// ==========================================
// 可选指定固定检验员
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityLotRequest {
    pub lot_id: String,
    pub product_id: String,
    pub process_id: Option<String>,
    pub quantity: i64,
    pub fixed_inspector_id: Option<String>,
    pub shipment_date: Option<NaiveDate>,
}

impl PriorityLotRequest {
    pub fn new(lot_id: &str, product_id: &str, quantity: i64) -> Self {
        Self {
            lot_id: lot_id.to_string(),
            product_id: product_id.to_string(),
            process_id: None,
            quantity,
            fixed_inspector_id: None,
            shipment_date: None,
        }
    }

    pub fn with_fixed_inspector(mut self, inspector_id: &str) -> Self {
        self.fixed_inspector_id = Some(inspector_id.to_string());
        self
    }
}

// ==========================================
// Lot - 检验批次（不可分割的工作单元）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    pub lot_id: String,
    pub product_id: String,
    pub process_id: Option<String>,
    pub quantity: i64,
    pub origin: LotOrigin,
    pub priority_rank: u8,       // 0=固定, 1=当日登録, 2=洗浄/先行, 3=普通
    pub duration_minutes: i64,   // ceil(数量 × 秒/个 / 60), 最小 1
    pub seconds_per_unit: f64,
    pub fixed_inspector_id: Option<String>,
    pub shipment_date: Option<NaiveDate>,
}

impl Lot {
    pub fn is_fixed(&self) -> bool {
        self.fixed_inspector_id.is_some()
    }

    pub fn duration_hours(&self) -> f64 {
        self.duration_minutes as f64 / 60.0
    }

    /// 处理顺序键: 优先级升序 → 时长降序 → 批次ID升序
    pub fn processing_key(&self) -> (u8, std::cmp::Reverse<i64>, String) {
        (
            self.priority_rank,
            std::cmp::Reverse(self.duration_minutes),
            self.lot_id.clone(),
        )
    }
}

/// 数量 × 秒/个 → 分钟（向上取整，最小 1）
pub fn duration_minutes(quantity: i64, seconds_per_unit: f64) -> i64 {
    let minutes = (quantity as f64 * seconds_per_unit / 60.0).ceil() as i64;
    minutes.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_minutes() {
        // 50 个 × 108 秒 = 90 分钟
        assert_eq!(duration_minutes(50, 108.0), 90);
        // 向上取整
        assert_eq!(duration_minutes(1, 61.0), 2);
        // 最小 1 分钟
        assert_eq!(duration_minutes(1, 0.5), 1);
    }
}

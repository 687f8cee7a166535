// ==========================================
// 检验员分配系统 - 製品マスタ领域模型
// ==========================================
// 职责: 品番 → 每件检验秒数 / 单批容量
// 规则: 优先取与工程番号一致的行，否则取该品番的首行
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// ProductMaster - 製品マスタ行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductMaster {
    pub product_id: String,          // 品番
    pub process_id: Option<String>,  // 工程番号（空 = 品番级别）
    pub seconds_per_unit: f64,       // 检验时间 (秒/个)
    pub lot_capacity: Option<u32>,   // 单批容量（空 = 不拆分）
}

// ==========================================
// ProductCatalog - 按品番索引的製品マスタ
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    rows: BTreeMap<String, Vec<ProductMaster>>,
}

impl ProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从行列表构建（保持输入行顺序）
    pub fn from_rows(rows: Vec<ProductMaster>) -> Self {
        let mut catalog = Self::new();
        for row in rows {
            catalog.insert(row);
        }
        catalog
    }

    pub fn insert(&mut self, row: ProductMaster) {
        self.rows.entry(row.product_id.clone()).or_default().push(row);
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.rows.contains_key(product_id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 查找每件检验秒数
    ///
    /// # 规则
    /// 1. 工程番号一致的行
    /// 2. 否则该品番首行
    pub fn seconds_per_unit(&self, product_id: &str, process_id: Option<&str>) -> Option<f64> {
        let rows = self.rows.get(product_id)?;
        if let Some(process) = process_id.filter(|p| !p.is_empty()) {
            if let Some(row) = rows
                .iter()
                .find(|r| r.process_id.as_deref() == Some(process))
            {
                return Some(row.seconds_per_unit);
            }
        }
        rows.first().map(|r| r.seconds_per_unit)
    }

    /// 单批容量（取第一个设置了容量的行）
    pub fn lot_capacity(&self, product_id: &str) -> Option<u32> {
        self.rows
            .get(product_id)?
            .iter()
            .find_map(|r| r.lot_capacity)
    }
}

// ==========================================
// 检验员分配系统 - スキルマスタ领域模型
// ==========================================
// 结构: 品番 × 工程番号（可空） → {検査員コード: 技能等级}
// 规则: 工程番号为空的行适用于所有工程；多行命中时取最高技能
// ==========================================

use crate::domain::types::SkillLevel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// SkillRow - 技能表单行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRow {
    pub process_id: Option<String>,
    pub levels: BTreeMap<String, SkillLevel>,
}

impl SkillRow {
    fn applies_to(&self, process_id: Option<&str>) -> bool {
        match self.process_id.as_deref().filter(|p| !p.is_empty()) {
            None => true,
            Some(row_process) => process_id == Some(row_process),
        }
    }
}

// ==========================================
// SkillMatrix - 技能矩阵
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillMatrix {
    rows: BTreeMap<String, Vec<SkillRow>>,
}

impl SkillMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(
        &mut self,
        product_id: &str,
        process_id: Option<&str>,
        levels: BTreeMap<String, SkillLevel>,
    ) {
        self.rows
            .entry(product_id.to_string())
            .or_default()
            .push(SkillRow {
                process_id: process_id.map(|s| s.to_string()),
                levels,
            });
    }

    /// 便捷方法：为单个检验员登记技能
    pub fn set_level(
        &mut self,
        product_id: &str,
        process_id: Option<&str>,
        inspector_id: &str,
        level: SkillLevel,
    ) {
        let rows = self.rows.entry(product_id.to_string()).or_default();
        let process = process_id.map(|s| s.to_string());
        match rows.iter_mut().find(|r| r.process_id == process) {
            Some(row) => {
                row.levels.insert(inspector_id.to_string(), level);
            }
            None => {
                let mut levels = BTreeMap::new();
                levels.insert(inspector_id.to_string(), level);
                rows.push(SkillRow {
                    process_id: process,
                    levels,
                });
            }
        }
    }

    /// 给定检验员中是否有人在品番 + 工程上登记了技能等级
    ///
    /// 无人登记时（没有技能行、单元格全空、或代码不在检验员名单中）
    /// 由约束模型回落到新製品チーム。
    pub fn covers_any<'a, I>(
        &self,
        product_id: &str,
        process_id: Option<&str>,
        inspector_ids: I,
    ) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let Some(rows) = self.rows.get(product_id) else {
            return false;
        };
        let applicable: Vec<&SkillRow> = rows.iter().filter(|r| r.applies_to(process_id)).collect();
        inspector_ids
            .into_iter()
            .any(|id| applicable.iter().any(|r| r.levels.contains_key(id)))
    }

    /// 检验员对品番 + 工程的技能等级（多行命中取最高）
    pub fn level_for(
        &self,
        inspector_id: &str,
        product_id: &str,
        process_id: Option<&str>,
    ) -> Option<SkillLevel> {
        self.rows
            .get(product_id)?
            .iter()
            .filter(|r| r.applies_to(process_id))
            .filter_map(|r| r.levels.get(inspector_id).copied())
            .min()
    }

    pub fn product_count(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_process_row_applies_to_all() {
        let mut matrix = SkillMatrix::new();
        matrix.set_level("P1", None, "V001", SkillLevel::Low);
        matrix.set_level("P1", Some("20"), "V001", SkillLevel::High);
        matrix.set_level("P1", Some("20"), "V002", SkillLevel::Medium);

        // 工程 20：两行都命中，取最高
        assert_eq!(matrix.level_for("V001", "P1", Some("20")), Some(SkillLevel::High));
        // 工程 30：只有空工程行命中
        assert_eq!(matrix.level_for("V001", "P1", Some("30")), Some(SkillLevel::Low));
        assert_eq!(matrix.level_for("V002", "P1", Some("30")), None);
        assert!(matrix.covers_any("P1", Some("30"), ["V001", "V002"]));
        assert!(!matrix.covers_any("P1", Some("30"), ["V002"]));
    }

    #[test]
    fn test_process_mismatch_has_no_rows() {
        let mut matrix = SkillMatrix::new();
        matrix.set_level("P1", Some("20"), "V001", SkillLevel::High);

        assert!(!matrix.covers_any("P1", Some("30"), ["V001"]));
        assert!(!matrix.covers_any("P9", None, ["V001"]));
        assert_eq!(matrix.level_for("V001", "P1", Some("30")), None);
    }
}

// ==========================================
// 检验员分配系统 - 分配报表结构
// ==========================================
// 职责: 供导出层消费的最终结果（按批次 / 按检验员）
// 红线: 不含时间戳、不含随机 ID，相同输入必须得到相同报表
// ==========================================

use crate::config::AssignmentRules;
use crate::domain::assignment::{Allocation, RelaxationEvent};
use crate::domain::types::{
    FairnessVerdict, LotOrigin, SkillSource, UnassignableReason,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// LotReport - 单批次结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotReport {
    pub lot_id: String,
    pub product_id: String,
    pub process_id: Option<String>,
    pub quantity: i64,
    pub origin: LotOrigin,
    pub priority_rank: u8,
    pub duration_minutes: i64,
    pub fixed_inspector_id: Option<String>,
    pub required_inspectors: usize, // 名义人数，实际分配人数见 allocations
    pub assigned: bool,
    pub allocations: Vec<Allocation>,
    pub skill_source: Option<SkillSource>,
    pub relaxations: Vec<RelaxationEvent>,
    pub unassigned_reason: Option<UnassignableReason>,
}

// ==========================================
// InspectorSummary - 单检验员汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectorSummary {
    pub inspector_id: String,
    pub name: String,
    pub on_vacation: bool,
    pub available_minutes: i64,
    pub assigned_minutes: i64,
    pub remaining_minutes: i64,
    pub lot_ids: Vec<String>,                 // 升序
    pub lot_count: u32,
    pub relaxed_count: u32,
    pub product_hours: BTreeMap<String, f64>, // 品番 → 累计小时
}

// ==========================================
// FairnessStats - 公平性统计
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairnessStats {
    pub max_assigned_minutes: i64,
    pub min_assigned_minutes: i64,
    pub mean_assigned_minutes: f64,
    pub lot_count_imbalance: u32,
    pub verdict: FairnessVerdict,
}

// ==========================================
// ValidationIssue - 被跳过的输入记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub record_ref: String,
    pub product_id: String,
    pub reason: String,
}

// ==========================================
// ReportTotals - 总计
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportTotals {
    pub lot_count: u32,
    pub assigned_count: u32,
    pub unassigned_count: u32,
    pub relaxed_count: u32,
    pub total_duration_minutes: i64,
    pub total_allocated_minutes: i64,
}

// ==========================================
// AssignmentReport - 最终报表
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentReport {
    pub run_date: NaiveDate,
    pub rules: AssignmentRules,
    pub lots: Vec<LotReport>,               // 处理顺序
    pub inspectors: Vec<InspectorSummary>,  // 按検査員コード升序
    pub fairness: FairnessStats,
    pub validation_issues: Vec<ValidationIssue>,
    pub totals: ReportTotals,
}

impl AssignmentReport {
    pub fn lot(&self, lot_id: &str) -> Option<&LotReport> {
        self.lots.iter().find(|l| l.lot_id == lot_id)
    }

    pub fn inspector(&self, inspector_id: &str) -> Option<&InspectorSummary> {
        self.inspectors
            .iter()
            .find(|i| i.inspector_id == inspector_id)
    }

    pub fn relaxation_count(&self) -> usize {
        self.lots.iter().map(|l| l.relaxations.len()).sum()
    }
}

// ==========================================
// 检验员分配系统 - 结果汇总
// ==========================================
// 职责: 分配结果 → 按批次 / 按检验员的报表结构
// 红线: 相同分配结果必须得到相同报表（BTreeMap + 固定排序）
// ==========================================

use crate::domain::assignment::Assignment;
use crate::domain::report::{
    AssignmentReport, FairnessStats, InspectorSummary, LotReport, ReportTotals, ValidationIssue,
};
use crate::domain::types::FairnessVerdict;
use crate::engine::constraint_model::ConstraintModel;
use std::collections::BTreeMap;

pub struct ResultAggregator;

#[derive(Default)]
struct InspectorTally {
    lot_ids: Vec<String>,
    relaxed_count: u32,
}

impl ResultAggregator {
    /// 汇总报表
    ///
    /// # 参数
    /// - model: 求解结束后的约束模型（提供可用 / 已用分钟）
    /// - assignments: 求解器输出（处理顺序）
    /// - validation_issues: 批次生成阶段被跳过的记录
    pub fn aggregate(
        model: &ConstraintModel<'_>,
        assignments: &[Assignment],
        validation_issues: Vec<ValidationIssue>,
    ) -> AssignmentReport {
        let mut tallies: BTreeMap<&str, InspectorTally> = BTreeMap::new();
        let mut totals = ReportTotals::default();

        let lots: Vec<LotReport> = assignments
            .iter()
            .map(|a| {
                totals.lot_count += 1;
                totals.total_duration_minutes += a.lot.duration_minutes;
                totals.total_allocated_minutes += a.allocated_minutes();
                if a.is_assigned() {
                    totals.assigned_count += 1;
                } else {
                    totals.unassigned_count += 1;
                }
                if a.is_relaxed() {
                    totals.relaxed_count += 1;
                }

                for alloc in &a.allocations {
                    let tally = tallies.entry(alloc.inspector_id.as_str()).or_default();
                    if !tally.lot_ids.contains(&a.lot.lot_id) {
                        tally.lot_ids.push(a.lot.lot_id.clone());
                        if a.is_relaxed() {
                            tally.relaxed_count += 1;
                        }
                    }
                }

                LotReport {
                    lot_id: a.lot.lot_id.clone(),
                    product_id: a.lot.product_id.clone(),
                    process_id: a.lot.process_id.clone(),
                    quantity: a.lot.quantity,
                    origin: a.lot.origin,
                    priority_rank: a.lot.priority_rank,
                    duration_minutes: a.lot.duration_minutes,
                    fixed_inspector_id: a.lot.fixed_inspector_id.clone(),
                    required_inspectors: a.required_inspectors,
                    assigned: a.is_assigned(),
                    allocations: a.allocations.clone(),
                    skill_source: a.skill_source,
                    relaxations: a.relaxations.clone(),
                    unassigned_reason: a.unassigned_reason,
                }
            })
            .collect();

        let inspectors: Vec<InspectorSummary> = model
            .states()
            .map(|state| {
                let tally = tallies.remove(state.inspector_id.as_str()).unwrap_or_default();
                let mut lot_ids = tally.lot_ids;
                lot_ids.sort();
                InspectorSummary {
                    inspector_id: state.inspector_id.clone(),
                    name: state.name.clone(),
                    on_vacation: state.on_vacation,
                    available_minutes: state.available_minutes,
                    assigned_minutes: state.assigned_minutes,
                    remaining_minutes: state.remaining_minutes(),
                    lot_count: lot_ids.len() as u32,
                    lot_ids,
                    relaxed_count: tally.relaxed_count,
                    product_hours: state
                        .product_minutes
                        .iter()
                        .map(|(product, minutes)| (product.clone(), *minutes as f64 / 60.0))
                        .collect(),
                }
            })
            .collect();

        let fairness = fairness_stats(&inspectors);

        tracing::info!(
            lot_count = totals.lot_count,
            assigned = totals.assigned_count,
            unassigned = totals.unassigned_count,
            relaxed = totals.relaxed_count,
            verdict = %fairness.verdict,
            "报表汇总完成"
        );

        AssignmentReport {
            run_date: model.run_date(),
            rules: model.rules().clone(),
            lots,
            inspectors,
            fairness,
            validation_issues,
            totals,
        }
    }
}

/// 公平性统计（只统计未休假的检验员）
pub fn fairness_stats(inspectors: &[InspectorSummary]) -> FairnessStats {
    let active: Vec<&InspectorSummary> = inspectors.iter().filter(|i| !i.on_vacation).collect();
    if active.is_empty() {
        return FairnessStats {
            max_assigned_minutes: 0,
            min_assigned_minutes: 0,
            mean_assigned_minutes: 0.0,
            lot_count_imbalance: 0,
            verdict: FairnessVerdict::Balanced,
        };
    }

    let minutes = active.iter().map(|i| i.assigned_minutes);
    let max_assigned_minutes = minutes.clone().max().unwrap_or(0);
    let min_assigned_minutes = minutes.clone().min().unwrap_or(0);
    let mean_assigned_minutes = minutes.sum::<i64>() as f64 / active.len() as f64;

    let counts = active.iter().map(|i| i.lot_count);
    let lot_count_imbalance =
        counts.clone().max().unwrap_or(0) - counts.min().unwrap_or(0);

    FairnessStats {
        max_assigned_minutes,
        min_assigned_minutes,
        mean_assigned_minutes,
        lot_count_imbalance,
        verdict: FairnessVerdict::from_imbalance(lot_count_imbalance),
    }
}

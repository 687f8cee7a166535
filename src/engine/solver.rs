// ==========================================
// 检验员分配系统 - 分配求解器
// ==========================================
// 职责: 按优先顺序逐批次选择检验员并提交到约束模型
// 流程:
//   1. 固定批次先提交给指定检验员（跳过技能检查）
//   2. 其余批次: 计算所需人数 → 按放宽阶梯评估候选 → 取前 N 名 → 按剩余分钟比例拆分
//   3. 全部阶梯都无法覆盖时记录为不可分配，继续下一批次
// 红线: 单线程顺序执行，单批次失败不影响后续批次
// ==========================================

use crate::domain::assignment::{Allocation, Assignment, RelaxationEvent};
use crate::domain::lot::Lot;
use crate::domain::types::{RelaxationKind, SkillSource, UnassignableReason};
use crate::engine::constraint_model::{ConstraintModel, EligibilityCheck, IneligibleReason};
use crate::engine::relaxation::{stage_event, RelaxationLadder, RelaxationPolicy};
use crate::engine::scorer::{Candidate, ScoreContext, Scorer};
use crate::perf::PerfGuard;
use tracing::instrument;

// ==========================================
// AssignmentSolver - 分配求解器
// ==========================================
pub struct AssignmentSolver {
    ladder: RelaxationLadder,
}

impl AssignmentSolver {
    pub fn new(ladder: RelaxationLadder) -> Self {
        Self { ladder }
    }

    /// 求解全部批次
    ///
    /// # 参数
    /// - model: 约束模型（本次运行独占）
    /// - lots: 已按处理顺序排列的批次
    ///
    /// # 返回
    /// 分配结果（固定批次在前，其余按处理顺序）
    #[instrument(skip(self, model, lots), fields(lot_count = lots.len()))]
    pub fn solve(&self, model: &mut ConstraintModel<'_>, lots: &[Lot]) -> Vec<Assignment> {
        let mut perf = PerfGuard::new("solve");
        perf.set_items(lots.len());

        let mut assignments = Vec::with_capacity(lots.len());
        let mut queue: Vec<(&Lot, Vec<RelaxationEvent>)> = Vec::with_capacity(lots.len());

        // ===== 阶段 1: 固定批次 =====
        for lot in lots.iter().filter(|l| l.is_fixed()) {
            match self.commit_fixed(model, lot) {
                Ok(assignment) => assignments.push(assignment),
                Err(event) => {
                    tracing::warn!(
                        lot_id = %lot.lot_id,
                        detail = %event.detail,
                        "固定检验员不可用，转入求解器"
                    );
                    queue.push((lot, vec![event]));
                }
            }
        }

        // ===== 阶段 2: 求解器（落空的固定批次优先级最高，排在队首）=====
        queue.extend(lots.iter().filter(|l| !l.is_fixed()).map(|l| (l, Vec::new())));
        for (lot, prior_events) in queue {
            assignments.push(self.assign_lot(model, lot, prior_events));
        }

        let unassigned = assignments.iter().filter(|a| !a.is_assigned()).count();
        tracing::info!(
            lot_count = lots.len(),
            unassigned,
            "求解完成"
        );
        assignments
    }

    // ==========================================
    // 固定批次
    // ==========================================

    /// 提交固定批次
    ///
    /// # 规则
    /// - 休假 / 剩余工时不足 / 检验员不存在 → 返回 FixedInspectorUnavailable 事件
    /// - 超出同品番上限: 允许放宽时带 HourCap 事件提交，否则视为不可用
    fn commit_fixed(
        &self,
        model: &mut ConstraintModel<'_>,
        lot: &Lot,
    ) -> Result<Assignment, RelaxationEvent> {
        let inspector_id = lot.fixed_inspector_id.as_deref().unwrap_or_default();
        let check = EligibilityCheck {
            minutes: lot.duration_minutes,
            enforce_cap: true,
            bypass_skill: true,
        };

        let mut relaxations = Vec::new();
        match model.check(inspector_id, lot, check) {
            Ok(()) => {}
            Err(IneligibleReason::OverHourCap) if model.rules().allow_hour_cap_relaxation => {
                relaxations.push(RelaxationEvent::new(
                    RelaxationKind::HourCap,
                    format!(
                        "{}: 固定检验员 {} 同品番累计 {:.1}h + {:.1}h 超过上限 {:.1}h",
                        lot.lot_id,
                        inspector_id,
                        model.hours_on_product(inspector_id, &lot.product_id),
                        lot.duration_hours(),
                        model.rules().product_hour_cap
                    ),
                ));
            }
            Err(reason) => {
                return Err(RelaxationEvent::new(
                    RelaxationKind::FixedInspectorUnavailable,
                    format!(
                        "{}: 固定检验员 {} 不可用 ({})",
                        lot.lot_id,
                        inspector_id,
                        describe(reason)
                    ),
                ));
            }
        }

        let allocation = Allocation {
            inspector_id: inspector_id.to_string(),
            minutes: lot.duration_minutes,
            skill_level: model.proficiency(inspector_id, lot).map(|(level, _)| level),
        };
        if let Err(err) = model.commit(lot, std::slice::from_ref(&allocation)) {
            return Err(RelaxationEvent::new(
                RelaxationKind::FixedInspectorUnavailable,
                format!("{}: {}", lot.lot_id, err),
            ));
        }

        Ok(Assignment::assigned(
            lot.clone(),
            1,
            vec![allocation],
            SkillSource::Fixed,
            relaxations,
        ))
    }

    // ==========================================
    // 普通求解
    // ==========================================

    #[instrument(skip(self, model, lot, prior_events), fields(lot_id = %lot.lot_id, product_id = %lot.product_id))]
    fn assign_lot(
        &self,
        model: &mut ConstraintModel<'_>,
        lot: &Lot,
        prior_events: Vec<RelaxationEvent>,
    ) -> Assignment {
        let required = required_inspectors(lot.duration_minutes, model.rules().threshold_minutes());
        let share = ceil_div(lot.duration_minutes, required as i64);
        let epsilon = model.rules().score_epsilon;
        let floor = model.rules().acceptance_floor;

        for (stage, policy) in self.ladder.stages() {
            let ctx = ScoreContext {
                policy: *policy,
                share_minutes: share,
            };

            let ranked = acceptable_candidates(model, lot, &ctx, floor, epsilon);
            if ranked.is_empty() {
                continue;
            }

            let Some(allocations) = plan_allocations(model, lot, &ranked, required, policy) else {
                continue;
            };

            if let Err(err) = model.commit(lot, &allocations) {
                tracing::error!(lot_id = %lot.lot_id, error = %err, "提交失败");
                continue;
            }

            let mut relaxations = prior_events;
            relaxations.extend(stage_event(*stage, &lot.lot_id));
            if !relaxations.is_empty() {
                tracing::info!(
                    lot_id = %lot.lot_id,
                    stage = ?stage,
                    "放宽规则后完成分配"
                );
            }

            return Assignment::assigned(
                lot.clone(),
                required,
                allocations,
                ranked[0].skill_source,
                relaxations,
            );
        }

        let reason = self.classify(model, lot, share);
        tracing::warn!(
            lot_id = %lot.lot_id,
            product_id = %lot.product_id,
            reason = %reason,
            "批次无法分配"
        );
        Assignment::unassigned(lot.clone(), required, reason, prior_events)
    }

    /// 不可分配原因
    ///
    /// 以阶梯中最宽松的策略重新检查每名检验员:
    /// - 无人具备技能 → NoSkilledInspector
    /// - 有技能者全部休假 → AllSkilledOnVacation
    /// - 有人满足硬约束但评分均低于下限 → BelowAcceptanceFloor
    /// - 有人被同品番上限挡住 → AllOverHourCap
    /// - 其它 → AllOutOfMinutes
    fn classify(&self, model: &ConstraintModel<'_>, lot: &Lot, share: i64) -> UnassignableReason {
        let policy = self.ladder.loosest();
        let check = EligibilityCheck {
            minutes: share,
            enforce_cap: policy.enforce_hour_cap,
            bypass_skill: false,
        };

        let reasons: Vec<Result<(), IneligibleReason>> = model
            .inspector_ids()
            .filter(|id| model.proficiency(id, lot).is_some())
            .map(|id| model.check(id, lot, check))
            .collect();

        if reasons.is_empty() {
            return UnassignableReason::NoSkilledInspector;
        }
        if reasons
            .iter()
            .all(|r| *r == Err(IneligibleReason::OnVacation))
        {
            return UnassignableReason::AllSkilledOnVacation;
        }

        let passers: Vec<&str> = model
            .inspector_ids()
            .filter(|id| model.check(id, lot, check).is_ok())
            .collect();
        if !passers.is_empty() {
            let ctx = ScoreContext {
                policy,
                share_minutes: share,
            };
            let floor = model.rules().acceptance_floor;
            let any_acceptable = passers
                .iter()
                .filter_map(|id| Scorer::score(model, id, lot, &ctx))
                .any(|c| c.score.total >= floor);
            if !any_acceptable {
                return UnassignableReason::BelowAcceptanceFloor;
            }
            return UnassignableReason::AllOutOfMinutes;
        }

        if reasons
            .iter()
            .any(|r| *r == Err(IneligibleReason::OverHourCap))
        {
            UnassignableReason::AllOverHourCap
        } else {
            UnassignableReason::AllOutOfMinutes
        }
    }
}

/// 满足硬约束且评分不低于下限的候选者（已排序）
fn acceptable_candidates(
    model: &ConstraintModel<'_>,
    lot: &Lot,
    ctx: &ScoreContext,
    floor: f64,
    epsilon: f64,
) -> Vec<Candidate> {
    let candidates: Vec<Candidate> = model
        .inspector_ids()
        .filter_map(|id| Scorer::score(model, id, lot, ctx))
        .filter(|c| c.score.total >= floor)
        .collect();
    Scorer::rank(candidates, epsilon)
}

/// 所需人数 = max(1, ceil(时长 / 每人阈值))
pub fn required_inspectors(duration_minutes: i64, threshold_minutes: i64) -> usize {
    if duration_minutes <= 0 || threshold_minutes <= 0 {
        return 1;
    }
    ceil_div(duration_minutes, threshold_minutes).max(1) as usize
}

fn ceil_div(a: i64, b: i64) -> i64 {
    if b <= 0 {
        return a;
    }
    (a + b - 1) / b
}

/// 从排序后的候选者中选人并拆分分钟
///
/// 先取前 N 名；若其可承担分钟之和不足以覆盖时长，依次补入后续候选者。
fn plan_allocations(
    model: &ConstraintModel<'_>,
    lot: &Lot,
    ranked: &[Candidate],
    required: usize,
    policy: &RelaxationPolicy,
) -> Option<Vec<Allocation>> {
    let limit_of = |c: &Candidate| {
        let remaining = model.remaining_minutes(&c.inspector_id);
        if policy.enforce_hour_cap {
            remaining.min(model.cap_headroom_minutes(&c.inspector_id, &lot.product_id))
        } else {
            remaining
        }
    };

    let mut take = required.min(ranked.len());
    let mut limits: Vec<i64> = ranked[..take].iter().map(limit_of).collect();
    while limits.iter().sum::<i64>() < lot.duration_minutes && take < ranked.len() {
        limits.push(limit_of(&ranked[take]));
        take += 1;
    }

    let selected = &ranked[..take];
    let weights: Vec<i64> = selected.iter().map(|c| c.remaining_minutes).collect();
    let minutes = split_minutes(lot.duration_minutes, &weights, &limits)?;

    Some(
        selected
            .iter()
            .zip(minutes)
            .filter(|(_, m)| *m > 0)
            .map(|(c, m)| Allocation {
                inspector_id: c.inspector_id.clone(),
                minutes: m,
                skill_level: Some(c.skill_level),
            })
            .collect(),
    )
}

/// 按权重比例拆分分钟，每人不超过各自上限
///
/// 整数注水: 超出上限者先截断，其余按比例重新分配；
/// 取整余数按最大余数分配（相同时按下标）。
/// 上限之和不足时返回 None。
pub fn split_minutes(total: i64, weights: &[i64], limits: &[i64]) -> Option<Vec<i64>> {
    let n = limits.len();
    if weights.len() != n || total < 0 || limits.iter().map(|l| (*l).max(0)).sum::<i64>() < total {
        return None;
    }

    let mut result = vec![0i64; n];
    let mut active: Vec<usize> = (0..n).filter(|&i| limits[i] > 0).collect();
    let mut left = total;

    while left > 0 {
        if active.is_empty() {
            return None;
        }
        let weight_sum: i128 = active.iter().map(|&i| weights[i].max(0) as i128).sum();
        let uniform = weight_sum == 0;
        let w = |i: usize| -> i128 {
            if uniform {
                1
            } else {
                weights[i].max(0) as i128
            }
        };
        let denom = if uniform { active.len() as i128 } else { weight_sum };

        // 理想份额达到上限者先截断
        let capped: Vec<usize> = active
            .iter()
            .copied()
            .filter(|&i| (left as i128) * w(i) / denom >= limits[i] as i128)
            .collect();
        if !capped.is_empty() {
            for &i in &capped {
                result[i] = limits[i];
                left -= limits[i];
            }
            active.retain(|i| !capped.contains(i));
            continue;
        }

        // 无人截断: 各自下取整份额 < 上限，余数按最大余数逐个 +1
        let mut shares: Vec<(usize, i64, i128)> = active
            .iter()
            .map(|&i| {
                let numer = (left as i128) * w(i);
                (i, (numer / denom) as i64, numer % denom)
            })
            .collect();
        let mut remainder = left - shares.iter().map(|(_, s, _)| *s).sum::<i64>();
        shares.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));
        for (i, share, _) in shares {
            let bump = if remainder > 0 { 1 } else { 0 };
            remainder -= bump;
            result[i] = share + bump;
        }
        left = 0;
    }

    Some(result)
}

fn describe(reason: IneligibleReason) -> &'static str {
    match reason {
        IneligibleReason::UnknownInspector => "检验员不存在",
        IneligibleReason::OnVacation => "休假",
        IneligibleReason::NoSkill => "无技能",
        IneligibleReason::OutOfMinutes => "剩余工时不足",
        IneligibleReason::OverHourCap => "超过同品番上限",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_inspectors() {
        assert_eq!(required_inspectors(90, 180), 1);
        assert_eq!(required_inspectors(180, 180), 1);
        assert_eq!(required_inspectors(181, 180), 2);
        assert_eq!(required_inspectors(600, 180), 4);
        assert_eq!(required_inspectors(0, 180), 1);
    }

    #[test]
    fn test_split_minutes_proportional() {
        let split = split_minutes(300, &[300, 100], &[300, 100]).unwrap();
        assert_eq!(split, vec![225, 75]);
        assert_eq!(split.iter().sum::<i64>(), 300);
    }

    #[test]
    fn test_split_minutes_respects_limits() {
        // 比例份额 (150, 150) 超过 B 的上限 60
        let split = split_minutes(300, &[200, 200], &[400, 60]).unwrap();
        assert_eq!(split, vec![240, 60]);
    }

    #[test]
    fn test_split_minutes_remainder() {
        let split = split_minutes(10, &[1, 1, 1], &[10, 10, 10]).unwrap();
        assert_eq!(split, vec![4, 3, 3]);
    }

    #[test]
    fn test_split_minutes_insufficient() {
        assert_eq!(split_minutes(100, &[50, 40], &[50, 40]), None);
    }
}

// ==========================================
// 检验员分配系统 - 评分器
// ==========================================
// 职责: 计算 (批次, 检验员) 的适合度，越高越好
// 组成:
//   基础项 = 技能等级归一化 (高 1.0 / 中 0.667 / 低 0.333)
//   公平项 = -权重 × (该员累计小时 - 在岗检验员平均累计小时)
//   禁忌项 = -权重 × (1 - 距上次同品番分配时间 / 回看窗口)
// 并列: 相邻评分差在 epsilon 内的连续段视为同分，段内剩余分钟多者优先，再按検査員コード
// ==========================================

use crate::domain::lot::Lot;
use crate::domain::types::{SkillLevel, SkillSource};
use crate::engine::constraint_model::{ConstraintModel, EligibilityCheck};
use crate::engine::relaxation::RelaxationPolicy;

// ==========================================
// ScoreBreakdown - 评分明细
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub base: f64,
    pub fairness: f64,
    pub taboo: f64,
    pub total: f64,
}

// ==========================================
// Candidate - 通过硬约束的候选检验员
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub inspector_id: String,
    pub skill_level: SkillLevel,
    pub skill_source: SkillSource,
    pub remaining_minutes: i64,
    pub score: ScoreBreakdown,
}

// ==========================================
// ScoreContext - 单批次评分上下文
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct ScoreContext {
    pub policy: RelaxationPolicy,
    pub share_minutes: i64, // 每人拟承担分钟
}

// ==========================================
// Scorer - 评分器（无状态）
// ==========================================
pub struct Scorer;

impl Scorer {
    /// 计算评分
    ///
    /// 不满足硬约束时返回 None（不可比较）。
    pub fn score(
        model: &ConstraintModel<'_>,
        inspector_id: &str,
        lot: &Lot,
        ctx: &ScoreContext,
    ) -> Option<Candidate> {
        let check = EligibilityCheck {
            minutes: ctx.share_minutes,
            enforce_cap: ctx.policy.enforce_hour_cap,
            bypass_skill: false,
        };
        model.check(inspector_id, lot, check).ok()?;
        let (skill_level, skill_source) = model.proficiency(inspector_id, lot)?;
        let state = model.state(inspector_id)?;
        let rules = model.rules();

        let base = skill_level.normalized();

        let fairness = if ctx.policy.use_fairness {
            -rules.fairness_weight_per_hour
                * (state.assigned_minutes as f64 - model.mean_assigned_minutes())
                / 60.0
        } else {
            0.0
        };

        let taboo = if ctx.policy.use_taboo {
            let age = model.taboo_age_minutes(inspector_id, &lot.product_id);
            taboo_penalty(age, rules.taboo_lookback_hours, rules.taboo_weight)
        } else {
            0.0
        };

        Some(Candidate {
            inspector_id: inspector_id.to_string(),
            skill_level,
            skill_source,
            remaining_minutes: state.remaining_minutes(),
            score: ScoreBreakdown {
                base,
                fairness,
                taboo,
                total: base + fairness + taboo,
            },
        })
    }

    /// 排序: 评分降序 → 同分段内剩余分钟降序 → 検査員コード升序
    ///
    /// 按评分降序排列后，相邻差值不超过 epsilon 的候选者合并为同一段。
    pub fn rank(mut candidates: Vec<Candidate>, epsilon: f64) -> Vec<Candidate> {
        candidates.sort_by(|a, b| b.score.total.total_cmp(&a.score.total));

        let mut ranked = Vec::with_capacity(candidates.len());
        let mut run: Vec<Candidate> = Vec::new();
        for candidate in candidates {
            let same_run = run
                .last()
                .map_or(true, |last| last.score.total - candidate.score.total <= epsilon);
            if !same_run {
                flush_run(&mut run, &mut ranked);
            }
            run.push(candidate);
        }
        flush_run(&mut run, &mut ranked);
        ranked
    }
}

fn flush_run(run: &mut Vec<Candidate>, ranked: &mut Vec<Candidate>) {
    run.sort_by(|a, b| {
        b.remaining_minutes
            .cmp(&a.remaining_minutes)
            .then_with(|| a.inspector_id.cmp(&b.inspector_id))
    });
    ranked.append(run);
}

/// 禁忌惩罚（线性衰减，超出回看窗口为 0）
pub fn taboo_penalty(age_minutes: Option<i64>, lookback_hours: f64, weight: f64) -> f64 {
    let lookback_minutes = lookback_hours * 60.0;
    match age_minutes {
        Some(age) if lookback_minutes > 0.0 && (age as f64) < lookback_minutes => {
            -weight * (1.0 - age as f64 / lookback_minutes)
        }
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, total: f64, remaining: i64) -> Candidate {
        Candidate {
            inspector_id: id.to_string(),
            skill_level: SkillLevel::High,
            skill_source: SkillSource::Master,
            remaining_minutes: remaining,
            score: ScoreBreakdown {
                base: total,
                fairness: 0.0,
                taboo: 0.0,
                total,
            },
        }
    }

    #[test]
    fn test_taboo_penalty_decays() {
        assert_eq!(taboo_penalty(None, 48.0, 0.3), 0.0);
        assert!((taboo_penalty(Some(0), 48.0, 0.3) + 0.3).abs() < 1e-12);
        assert!((taboo_penalty(Some(24 * 60), 48.0, 0.3) + 0.15).abs() < 1e-12);
        assert_eq!(taboo_penalty(Some(48 * 60), 48.0, 0.3), 0.0);
        assert_eq!(taboo_penalty(Some(0), 0.0, 0.3), 0.0);
    }

    #[test]
    fn test_rank_tie_break_by_remaining() {
        let ranked = Scorer::rank(
            vec![
                candidate("A", 0.5, 100),
                candidate("B", 0.5 + 1e-9, 300),
                candidate("C", 0.9, 10),
            ],
            1e-6,
        );
        let ids: Vec<&str> = ranked.iter().map(|c| c.inspector_id.as_str()).collect();
        assert_eq!(ids, vec!["C", "B", "A"]);
    }

    #[test]
    fn test_rank_ties_across_rounding_boundary() {
        // 两者相差 2e-7 < epsilon，但分别落在 0.5000005 两侧
        let ranked = Scorer::rank(
            vec![candidate("A", 0.5000006, 10), candidate("B", 0.5000004, 300)],
            1e-6,
        );
        let ids: Vec<&str> = ranked.iter().map(|c| c.inspector_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A"]);
    }

    #[test]
    fn test_rank_separates_beyond_epsilon() {
        let ranked = Scorer::rank(
            vec![candidate("A", 0.5, 10), candidate("B", 0.49, 300)],
            1e-6,
        );
        assert_eq!(ranked[0].inspector_id, "A");
    }

    #[test]
    fn test_rank_full_tie_by_id() {
        let ranked = Scorer::rank(
            vec![candidate("V2", 0.5, 100), candidate("V1", 0.5, 100)],
            1e-6,
        );
        assert_eq!(ranked[0].inspector_id, "V1");
    }
}

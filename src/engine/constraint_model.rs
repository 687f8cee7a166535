// ==========================================
// 检验员分配系统 - 约束模型
// ==========================================
// 职责: 持有每名检验员的技能 / 剩余工时 / 休假 / 同品番累计工时
// 查询: is_eligible / remaining_minutes / hours_on_product
// 变更: commit（唯一的变更入口，校验通过后整体生效）
// 红线: 剩余工时单调递减，永不为负
// 红线: 只由求解器持有并修改，不跨运行保留
// ==========================================

use crate::config::AssignmentRules;
use crate::domain::assignment::Allocation;
use crate::domain::inspector::{Inspector, TabooEntry};
use crate::domain::lot::Lot;
use crate::domain::skill::SkillMatrix;
use crate::domain::types::{SkillLevel, SkillSource};
use crate::domain::vacation::VacationSchedule;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::BTreeMap;
use thiserror::Error;

// ==========================================
// IneligibleReason - 不满足硬约束的原因
// ==========================================
// 检查顺序即枚举顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IneligibleReason {
    UnknownInspector,
    OnVacation,
    NoSkill,
    OutOfMinutes,
    OverHourCap,
}

// ==========================================
// EligibilityCheck - 单次硬约束检查参数
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityCheck {
    pub minutes: i64,        // 本次拟分配分钟
    pub enforce_cap: bool,   // 是否执行同品番上限
    pub bypass_skill: bool,  // 固定分配跳过技能检查
}

// ==========================================
// CommitError - 提交失败（整体不生效）
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommitError {
    #[error("检验员不存在: {0}")]
    UnknownInspector(String),

    #[error("检验员休假中: {0}")]
    OnVacation(String),

    #[error("分配分钟必须为正数 (检验员 {inspector_id}): {minutes}")]
    NonPositiveAllocation { inspector_id: String, minutes: i64 },

    #[error("剩余工时不足 (检验员 {inspector_id}): 需要 {requested}, 剩余 {remaining}")]
    InsufficientMinutes {
        inspector_id: String,
        requested: i64,
        remaining: i64,
    },
}

// ==========================================
// InspectorState - 单名检验员的运行期状态
// ==========================================
#[derive(Debug, Clone)]
pub struct InspectorState {
    pub inspector_id: String,
    pub name: String,
    pub new_product_team: bool,
    pub on_vacation: bool,
    pub available_minutes: i64,
    pub assigned_minutes: i64,
    pub product_minutes: BTreeMap<String, i64>,
    pub taboo_history: Vec<TabooEntry>,
}

impl InspectorState {
    pub fn remaining_minutes(&self) -> i64 {
        (self.available_minutes - self.assigned_minutes).max(0)
    }

    pub fn minutes_on_product(&self, product_id: &str) -> i64 {
        self.product_minutes.get(product_id).copied().unwrap_or(0)
    }
}

// ==========================================
// ConstraintModel - 约束模型
// ==========================================
pub struct ConstraintModel<'a> {
    run_date: NaiveDate,
    run_at: NaiveDateTime,
    rules: &'a AssignmentRules,
    skills: &'a SkillMatrix,
    states: BTreeMap<String, InspectorState>,
    // 公平性均值: 在岗检验员的累计分钟之和 / 人数
    total_assigned_minutes: i64,
    active_count: usize,
}

impl<'a> ConstraintModel<'a> {
    /// 构建约束模型
    ///
    /// # 规则
    /// - 全天休假: 可用分钟 = 0，标记休假
    /// - 部分休假: 可用分钟 = 班次分钟 - 不在时间与班次的重叠
    /// - 运行时刻 = 运行日期 + 标准班次开始时刻（禁忌年龄的基准）
    pub fn new(
        run_date: NaiveDate,
        rules: &'a AssignmentRules,
        inspectors: &[Inspector],
        skills: &'a SkillMatrix,
        vacations: &VacationSchedule,
    ) -> Self {
        let mut states = BTreeMap::new();
        for inspector in inspectors {
            let on_vacation = vacations.is_on_vacation(&inspector.inspector_id, run_date);
            let available_minutes = if on_vacation {
                0
            } else {
                let base = inspector.base_minutes(rules.default_shift_minutes);
                let absent = vacations.absence_minutes(
                    &inspector.inspector_id,
                    run_date,
                    &inspector.effective_shift(),
                );
                (base - absent).max(0)
            };

            states.insert(
                inspector.inspector_id.clone(),
                InspectorState {
                    inspector_id: inspector.inspector_id.clone(),
                    name: inspector.name.clone(),
                    new_product_team: inspector.new_product_team,
                    on_vacation,
                    available_minutes,
                    assigned_minutes: 0,
                    product_minutes: BTreeMap::new(),
                    taboo_history: inspector.taboo_history.clone(),
                },
            );
        }

        let active_count = states.values().filter(|s| !s.on_vacation).count();
        let shift_start = NaiveTime::from_hms_opt(8, 30, 0).unwrap_or(NaiveTime::MIN);

        Self {
            run_date,
            run_at: run_date.and_time(shift_start),
            rules,
            skills,
            states,
            total_assigned_minutes: 0,
            active_count,
        }
    }

    pub fn run_date(&self) -> NaiveDate {
        self.run_date
    }

    pub fn rules(&self) -> &AssignmentRules {
        self.rules
    }

    pub fn state(&self, inspector_id: &str) -> Option<&InspectorState> {
        self.states.get(inspector_id)
    }

    /// 按検査員コード升序遍历
    pub fn states(&self) -> impl Iterator<Item = &InspectorState> {
        self.states.values()
    }

    pub fn inspector_ids(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(|k| k.as_str())
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn remaining_minutes(&self, inspector_id: &str) -> i64 {
        self.states
            .get(inspector_id)
            .map(|s| s.remaining_minutes())
            .unwrap_or(0)
    }

    pub fn hours_on_product(&self, inspector_id: &str, product_id: &str) -> f64 {
        self.states
            .get(inspector_id)
            .map(|s| s.minutes_on_product(product_id) as f64 / 60.0)
            .unwrap_or(0.0)
    }

    /// 同品番上限的剩余分钟
    pub fn cap_headroom_minutes(&self, inspector_id: &str, product_id: &str) -> i64 {
        let used = self
            .states
            .get(inspector_id)
            .map(|s| s.minutes_on_product(product_id))
            .unwrap_or(0);
        (self.rules.cap_minutes() - used).max(0)
    }

    /// 技能等级与来源
    ///
    /// 名单中有人在技能表登记了该品番 + 工程时按技能表判断；
    /// 否则新製品チーム成员视为中等技能。
    pub fn proficiency(&self, inspector_id: &str, lot: &Lot) -> Option<(SkillLevel, SkillSource)> {
        let process_id = lot.process_id.as_deref();
        if self
            .skills
            .covers_any(&lot.product_id, process_id, self.inspector_ids())
        {
            return self
                .skills
                .level_for(inspector_id, &lot.product_id, process_id)
                .map(|level| (level, SkillSource::Master));
        }
        match self.states.get(inspector_id) {
            Some(state) if state.new_product_team => {
                Some((SkillLevel::Medium, SkillSource::NewProductTeam))
            }
            _ => None,
        }
    }

    /// 硬约束检查
    ///
    /// 检查顺序: 存在 → 休假 → 技能 → 剩余工时 → 同品番上限
    pub fn check(
        &self,
        inspector_id: &str,
        lot: &Lot,
        check: EligibilityCheck,
    ) -> Result<(), IneligibleReason> {
        let state = self
            .states
            .get(inspector_id)
            .ok_or(IneligibleReason::UnknownInspector)?;
        if state.on_vacation {
            return Err(IneligibleReason::OnVacation);
        }
        if !check.bypass_skill && self.proficiency(inspector_id, lot).is_none() {
            return Err(IneligibleReason::NoSkill);
        }
        if check.minutes > state.remaining_minutes() {
            return Err(IneligibleReason::OutOfMinutes);
        }
        if check.enforce_cap
            && state.minutes_on_product(&lot.product_id) + check.minutes > self.rules.cap_minutes()
        {
            return Err(IneligibleReason::OverHourCap);
        }
        Ok(())
    }

    /// 以整批时长判断检验员是否满足全部硬约束
    pub fn is_eligible(&self, inspector_id: &str, lot: &Lot) -> bool {
        let bypass_skill = lot.fixed_inspector_id.as_deref() == Some(inspector_id);
        self.check(
            inspector_id,
            lot,
            EligibilityCheck {
                minutes: lot.duration_minutes,
                enforce_cap: true,
                bypass_skill,
            },
        )
        .is_ok()
    }

    /// 检验员的虚拟当前时刻（运行时刻 + 已分配分钟）
    pub fn virtual_now(&self, inspector_id: &str) -> NaiveDateTime {
        let assigned = self
            .states
            .get(inspector_id)
            .map(|s| s.assigned_minutes)
            .unwrap_or(0);
        self.run_at + Duration::minutes(assigned)
    }

    /// 距最近一次同品番分配的分钟数（无历史时为 None）
    pub fn taboo_age_minutes(&self, inspector_id: &str, product_id: &str) -> Option<i64> {
        let state = self.states.get(inspector_id)?;
        let last = state
            .taboo_history
            .iter()
            .filter(|e| e.product_id == product_id)
            .map(|e| e.assigned_at)
            .max()?;
        Some((self.virtual_now(inspector_id) - last).num_minutes().max(0))
    }

    /// 在岗检验员的平均累计分钟（公平项基准，随 commit 增量维护）
    pub fn mean_assigned_minutes(&self) -> f64 {
        if self.active_count == 0 {
            return 0.0;
        }
        self.total_assigned_minutes as f64 / self.active_count as f64
    }

    // ==========================================
    // 变更
    // ==========================================

    /// 提交批次分配
    ///
    /// 先校验全部份额，任何一项失败则整体不生效。
    /// 同品番上限不在此检查，由求解器按放宽策略负责。
    pub fn commit(&mut self, lot: &Lot, allocations: &[Allocation]) -> Result<(), CommitError> {
        // 同一检验员可能出现多次，按合计校验
        let mut requested: BTreeMap<&str, i64> = BTreeMap::new();
        for alloc in allocations {
            if alloc.minutes <= 0 {
                return Err(CommitError::NonPositiveAllocation {
                    inspector_id: alloc.inspector_id.clone(),
                    minutes: alloc.minutes,
                });
            }
            *requested.entry(alloc.inspector_id.as_str()).or_insert(0) += alloc.minutes;
        }
        for (inspector_id, minutes) in &requested {
            let state = self
                .states
                .get(*inspector_id)
                .ok_or_else(|| CommitError::UnknownInspector(inspector_id.to_string()))?;
            if state.on_vacation {
                return Err(CommitError::OnVacation(inspector_id.to_string()));
            }
            if *minutes > state.remaining_minutes() {
                return Err(CommitError::InsufficientMinutes {
                    inspector_id: inspector_id.to_string(),
                    requested: *minutes,
                    remaining: state.remaining_minutes(),
                });
            }
        }

        for (inspector_id, minutes) in requested {
            let assigned_at = self.virtual_now(inspector_id);
            if let Some(state) = self.states.get_mut(inspector_id) {
                state.assigned_minutes += minutes;
                *state
                    .product_minutes
                    .entry(lot.product_id.clone())
                    .or_insert(0) += minutes;
                state.taboo_history.push(TabooEntry {
                    product_id: lot.product_id.clone(),
                    assigned_at,
                });
            }
            self.total_assigned_minutes += minutes;
        }

        tracing::debug!(
            lot_id = %lot.lot_id,
            product_id = %lot.product_id,
            inspectors = allocations.len(),
            "批次已提交"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::LotOrigin;

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 4).unwrap()
    }

    fn lot(product: &str, minutes: i64) -> Lot {
        Lot {
            lot_id: format!("L-{}-{}", product, minutes),
            product_id: product.to_string(),
            process_id: None,
            quantity: 10,
            origin: LotOrigin::Ordinary,
            priority_rank: 3,
            duration_minutes: minutes,
            seconds_per_unit: 60.0,
            fixed_inspector_id: None,
            shipment_date: None,
        }
    }

    fn inspector(id: &str, minutes: i64) -> Inspector {
        let mut i = Inspector::new(id, id);
        i.daily_minutes = Some(minutes);
        i
    }

    fn alloc(id: &str, minutes: i64) -> Allocation {
        Allocation {
            inspector_id: id.to_string(),
            minutes,
            skill_level: None,
        }
    }

    #[test]
    fn test_eligibility_order_and_commit() {
        let rules = AssignmentRules::default();
        let mut skills = SkillMatrix::new();
        skills.set_level("P", None, "A", SkillLevel::High);
        let inspectors = vec![inspector("A", 240), inspector("B", 480)];
        let vacations = VacationSchedule::new();
        let mut model = ConstraintModel::new(run_date(), &rules, &inspectors, &skills, &vacations);

        let l = lot("P", 90);
        assert!(model.is_eligible("A", &l));
        assert!(!model.is_eligible("B", &l));
        assert!(!model.is_eligible("Z", &l));

        model.commit(&l, &[alloc("A", 90)]).unwrap();
        assert_eq!(model.remaining_minutes("A"), 150);
        assert!((model.hours_on_product("A", "P") - 1.5).abs() < 1e-9);
        assert_eq!(model.taboo_age_minutes("A", "P"), Some(90));
        assert!((model.mean_assigned_minutes() - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_hour_cap_blocks() {
        let rules = AssignmentRules::default();
        let mut skills = SkillMatrix::new();
        skills.set_level("P", None, "A", SkillLevel::High);
        let inspectors = vec![inspector("A", 480)];
        let vacations = VacationSchedule::new();
        let mut model = ConstraintModel::new(run_date(), &rules, &inspectors, &skills, &vacations);

        model.commit(&lot("P", 180), &[alloc("A", 180)]).unwrap();
        let next = lot("P", 90);
        let check = EligibilityCheck {
            minutes: 90,
            enforce_cap: true,
            bypass_skill: false,
        };
        assert_eq!(model.check("A", &next, check), Err(IneligibleReason::OverHourCap));
        assert_eq!(model.cap_headroom_minutes("A", "P"), 60);

        let relaxed = EligibilityCheck {
            enforce_cap: false,
            ..check
        };
        assert_eq!(model.check("A", &next, relaxed), Ok(()));
    }

    #[test]
    fn test_commit_is_atomic() {
        let rules = AssignmentRules::default();
        let skills = SkillMatrix::new();
        let inspectors = vec![inspector("A", 100), inspector("B", 30)];
        let vacations = VacationSchedule::new();
        let mut model = ConstraintModel::new(run_date(), &rules, &inspectors, &skills, &vacations);

        let result = model.commit(&lot("P", 90), &[alloc("A", 50), alloc("B", 40)]);
        assert!(matches!(result, Err(CommitError::InsufficientMinutes { .. })));
        // A 未被部分扣减
        assert_eq!(model.remaining_minutes("A"), 100);
    }

    #[test]
    fn test_vacation_and_new_product_team() {
        let rules = AssignmentRules::default();
        let skills = SkillMatrix::new();
        let mut team = inspector("T", 480);
        team.new_product_team = true;
        let inspectors = vec![team, inspector("V", 480)];
        let mut vacations = VacationSchedule::new();
        vacations.mark_on_vacation("V", run_date());
        let model = ConstraintModel::new(run_date(), &rules, &inspectors, &skills, &vacations);

        let l = lot("NEW", 60);
        assert_eq!(
            model.proficiency("T", &l),
            Some((SkillLevel::Medium, SkillSource::NewProductTeam))
        );
        assert!(model.is_eligible("T", &l));
        assert_eq!(model.state("V").unwrap().available_minutes, 0);
        let check = EligibilityCheck {
            minutes: 60,
            enforce_cap: true,
            bypass_skill: true,
        };
        assert_eq!(model.check("V", &l, check), Err(IneligibleReason::OnVacation));
    }

    #[test]
    fn test_team_fallback_when_no_listed_code_is_on_roster() {
        let rules = AssignmentRules::default();
        let mut skills = SkillMatrix::new();
        skills.set_level("P", None, "V999", SkillLevel::High);
        let mut team = inspector("T", 480);
        team.new_product_team = true;
        let inspectors = vec![team, inspector("A", 480)];
        let vacations = VacationSchedule::new();
        let model = ConstraintModel::new(run_date(), &rules, &inspectors, &skills, &vacations);

        let l = lot("P", 60);
        assert_eq!(
            model.proficiency("T", &l),
            Some((SkillLevel::Medium, SkillSource::NewProductTeam))
        );
        assert_eq!(model.proficiency("A", &l), None);
    }

    #[test]
    fn test_running_mean_ignores_vacation() {
        let rules = AssignmentRules::default();
        let skills = SkillMatrix::new();
        let inspectors = vec![inspector("A", 480), inspector("B", 480), inspector("V", 480)];
        let mut vacations = VacationSchedule::new();
        vacations.mark_on_vacation("V", run_date());
        let mut model = ConstraintModel::new(run_date(), &rules, &inspectors, &skills, &vacations);

        assert_eq!(model.mean_assigned_minutes(), 0.0);
        model.commit(&lot("P", 120), &[alloc("A", 90), alloc("B", 30)]).unwrap();
        assert!((model.mean_assigned_minutes() - 60.0).abs() < 1e-9);
        assert!(model.commit(&lot("P", 10), &[alloc("V", 10)]).is_err());
        assert!((model.mean_assigned_minutes() - 60.0).abs() < 1e-9);
    }
}

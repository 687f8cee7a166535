// ==========================================
// 检验员分配系统 - 放宽策略
// ==========================================
// 职责: 定义有序的放宽阶梯，每一阶是纯函数 Policy → Policy
// 顺序: 严格 → 去禁忌 → 去公平 → 突破同品番上限（可由配置关闭）
// 红线: 使用了哪一阶，必须作为 RelaxationEvent 记录
// ==========================================

use crate::config::AssignmentRules;
use crate::domain::assignment::RelaxationEvent;
use crate::domain::types::RelaxationKind;

// ==========================================
// RelaxationPolicy - 一次候选评估所用的规则开关
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelaxationPolicy {
    pub use_taboo: bool,
    pub use_fairness: bool,
    pub enforce_hour_cap: bool,
}

impl RelaxationPolicy {
    pub fn strict() -> Self {
        Self {
            use_taboo: true,
            use_fairness: true,
            enforce_hour_cap: true,
        }
    }
}

pub fn relax_taboo(policy: RelaxationPolicy) -> RelaxationPolicy {
    RelaxationPolicy {
        use_taboo: false,
        ..policy
    }
}

pub fn relax_fairness(policy: RelaxationPolicy) -> RelaxationPolicy {
    RelaxationPolicy {
        use_fairness: false,
        ..policy
    }
}

pub fn relax_hour_cap(policy: RelaxationPolicy) -> RelaxationPolicy {
    RelaxationPolicy {
        enforce_hour_cap: false,
        ..policy
    }
}

// ==========================================
// RelaxationStage - 阶梯中的一阶
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaxationStage {
    Strict,
    Taboo,
    Fairness,
    HourCap,
}

impl RelaxationStage {
    pub fn kind(&self) -> Option<RelaxationKind> {
        match self {
            RelaxationStage::Strict => None,
            RelaxationStage::Taboo => Some(RelaxationKind::Taboo),
            RelaxationStage::Fairness => Some(RelaxationKind::Fairness),
            RelaxationStage::HourCap => Some(RelaxationKind::HourCap),
        }
    }
}

type Transform = fn(RelaxationPolicy) -> RelaxationPolicy;

const STEPS: [(RelaxationStage, Transform); 3] = [
    (RelaxationStage::Taboo, relax_taboo),
    (RelaxationStage::Fairness, relax_fairness),
    (RelaxationStage::HourCap, relax_hour_cap),
];

// ==========================================
// RelaxationLadder - 累积的放宽阶梯
// ==========================================
#[derive(Debug, Clone)]
pub struct RelaxationLadder {
    stages: Vec<(RelaxationStage, RelaxationPolicy)>,
}

impl RelaxationLadder {
    /// 按规则构建阶梯（每一阶在前一阶的基础上再放宽）
    pub fn from_rules(rules: &AssignmentRules) -> Self {
        let mut policy = RelaxationPolicy::strict();
        let mut stages = vec![(RelaxationStage::Strict, policy)];
        for (stage, transform) in STEPS {
            if stage == RelaxationStage::HourCap && !rules.allow_hour_cap_relaxation {
                continue;
            }
            policy = transform(policy);
            stages.push((stage, policy));
        }
        Self { stages }
    }

    pub fn stages(&self) -> &[(RelaxationStage, RelaxationPolicy)] {
        &self.stages
    }

    /// 阶梯中最宽松的策略
    pub fn loosest(&self) -> RelaxationPolicy {
        self.stages
            .last()
            .map(|(_, policy)| *policy)
            .unwrap_or_else(RelaxationPolicy::strict)
    }
}

/// 完成覆盖的那一阶对应的放宽事件（严格阶为 None）
pub fn stage_event(stage: RelaxationStage, lot_id: &str) -> Option<RelaxationEvent> {
    let detail = match stage {
        RelaxationStage::Strict => return None,
        RelaxationStage::Taboo => format!("{}: 忽略禁忌惩罚后才有可用检验员", lot_id),
        RelaxationStage::Fairness => format!("{}: 忽略禁忌与公平惩罚后才有可用检验员", lot_id),
        RelaxationStage::HourCap => format!("{}: 突破同品番工时上限", lot_id),
    };
    stage.kind().map(|kind| RelaxationEvent::new(kind, detail))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_order() {
        let ladder = RelaxationLadder::from_rules(&AssignmentRules::default());
        let stages: Vec<RelaxationStage> = ladder.stages().iter().map(|(s, _)| *s).collect();
        assert_eq!(
            stages,
            vec![
                RelaxationStage::Strict,
                RelaxationStage::Taboo,
                RelaxationStage::Fairness,
                RelaxationStage::HourCap,
            ]
        );

        let (_, fairness) = ladder.stages()[2];
        assert!(!fairness.use_taboo);
        assert!(!fairness.use_fairness);
        assert!(fairness.enforce_hour_cap);
        assert!(!ladder.loosest().enforce_hour_cap);
    }

    #[test]
    fn test_hour_cap_stage_can_be_disabled() {
        let rules = AssignmentRules {
            allow_hour_cap_relaxation: false,
            ..AssignmentRules::default()
        };
        let ladder = RelaxationLadder::from_rules(&rules);
        assert_eq!(ladder.stages().len(), 3);
        assert!(ladder.loosest().enforce_hour_cap);
    }

    #[test]
    fn test_transforms_are_independent() {
        let p = relax_hour_cap(RelaxationPolicy::strict());
        assert!(p.use_taboo && p.use_fairness && !p.enforce_hour_cap);
        let q = relax_fairness(RelaxationPolicy::strict());
        assert!(q.use_taboo && !q.use_fairness && q.enforce_hour_cap);
    }

    #[test]
    fn test_only_covering_stage_is_recorded() {
        assert!(stage_event(RelaxationStage::Strict, "L1").is_none());

        let event = stage_event(RelaxationStage::HourCap, "L1").unwrap();
        assert_eq!(event.kind, RelaxationKind::HourCap);
        assert!(event.detail.starts_with("L1"));
        assert_eq!(
            stage_event(RelaxationStage::Fairness, "L1").map(|e| e.kind),
            Some(RelaxationKind::Fairness)
        );
    }
}

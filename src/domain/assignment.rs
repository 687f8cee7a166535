// ==========================================
// 检验员分配系统 - 分配结果领域模型
// ==========================================
// 职责: 批次 → 检验员（可多人）的绑定
// 红线: 已分配批次的分配分钟之和 >= 批次时长
// 红线: 放宽事件必须随分配一起记录
// ==========================================

use crate::domain::lot::Lot;
use crate::domain::types::{RelaxationKind, SkillLevel, SkillSource, UnassignableReason};
use serde::{Deserialize, Serialize};

// ==========================================
// Allocation - 单个检验员的分配份额
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub inspector_id: String,
    pub minutes: i64,
    pub skill_level: Option<SkillLevel>,  // 固定分配时为 None
}

// ==========================================
// RelaxationEvent - 放宽事件（信息记录，不是错误）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelaxationEvent {
    pub kind: RelaxationKind,
    pub detail: String,
}

impl RelaxationEvent {
    pub fn new(kind: RelaxationKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

// ==========================================
// Assignment - 批次分配结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub lot: Lot,
    pub required_inspectors: usize,
    pub allocations: Vec<Allocation>,
    pub skill_source: Option<SkillSource>,
    pub relaxations: Vec<RelaxationEvent>,
    pub unassigned_reason: Option<UnassignableReason>,
}

impl Assignment {
    pub fn assigned(
        lot: Lot,
        required_inspectors: usize,
        allocations: Vec<Allocation>,
        skill_source: SkillSource,
        relaxations: Vec<RelaxationEvent>,
    ) -> Self {
        Self {
            lot,
            required_inspectors,
            allocations,
            skill_source: Some(skill_source),
            relaxations,
            unassigned_reason: None,
        }
    }

    pub fn unassigned(
        lot: Lot,
        required_inspectors: usize,
        reason: UnassignableReason,
        relaxations: Vec<RelaxationEvent>,
    ) -> Self {
        Self {
            lot,
            required_inspectors,
            allocations: Vec::new(),
            skill_source: None,
            relaxations,
            unassigned_reason: Some(reason),
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.unassigned_reason.is_none()
    }

    /// 是否为放宽规则后的分配
    pub fn is_relaxed(&self) -> bool {
        !self.relaxations.is_empty()
    }

    pub fn has_relaxation(&self, kind: RelaxationKind) -> bool {
        self.relaxations.iter().any(|r| r.kind == kind)
    }

    pub fn allocated_minutes(&self) -> i64 {
        self.allocations.iter().map(|a| a.minutes).sum()
    }

    pub fn inspector_ids(&self) -> Vec<&str> {
        self.allocations
            .iter()
            .map(|a| a.inspector_id.as_str())
            .collect()
    }
}

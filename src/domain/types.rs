// ==========================================
// 检验员分配系统 - 领域类型定义
// ==========================================
// 职责: 批次来源、技能等级、放宽规则、不可分配原因等枚举
// 序列化格式: SCREAMING_SNAKE_CASE (与报表输出一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 批次来源 (Lot Origin)
// ==========================================
// 红线: 优先来源必须在普通缺口批次之前处理
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LotOrigin {
    SameDayRegistered,  // 当日登録品番
    CleaningRequest,    // 洗浄依頼
    AdvanceInspection,  // 先行検査
    Ordinary,           // 普通缺口
}

impl LotOrigin {
    /// 来源对应的优先级（数值越小越先处理）
    ///
    /// 固定分配批次的等级为 0，由 LotBuilder 单独赋值。
    pub fn priority_rank(&self) -> u8 {
        match self {
            LotOrigin::SameDayRegistered => 1,
            LotOrigin::CleaningRequest | LotOrigin::AdvanceInspection => 2,
            LotOrigin::Ordinary => 3,
        }
    }
}

impl fmt::Display for LotOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LotOrigin::SameDayRegistered => write!(f, "SAME_DAY_REGISTERED"),
            LotOrigin::CleaningRequest => write!(f, "CLEANING_REQUEST"),
            LotOrigin::AdvanceInspection => write!(f, "ADVANCE_INSPECTION"),
            LotOrigin::Ordinary => write!(f, "ORDINARY"),
        }
    }
}

/// 固定分配批次的优先级
pub const FIXED_PRIORITY_RANK: u8 = 0;

// ==========================================
// 技能等级 (Skill Level)
// ==========================================
// 技能表取值: 1=高, 2=中, 3=低
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkillLevel {
    High,
    Medium,
    Low,
}

impl SkillLevel {
    /// 从技能表代码解析（1/2/3），其它值视为无技能
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "1" => Some(SkillLevel::High),
            "2" => Some(SkillLevel::Medium),
            "3" => Some(SkillLevel::Low),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            SkillLevel::High => 1,
            SkillLevel::Medium => 2,
            SkillLevel::Low => 3,
        }
    }

    /// 归一化熟练度（0, 1]，高技能为 1.0
    pub fn normalized(&self) -> f64 {
        f64::from(4 - self.code()) / 3.0
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ==========================================
// 技能来源 (Skill Source)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkillSource {
    Master,          // 技能表命中
    NewProductTeam,  // 技能表无该品番，回落到新製品チーム
    Fixed,           // 固定分配，跳过技能检查
}

impl fmt::Display for SkillSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkillSource::Master => write!(f, "MASTER"),
            SkillSource::NewProductTeam => write!(f, "NEW_PRODUCT_TEAM"),
            SkillSource::Fixed => write!(f, "FIXED"),
        }
    }
}

// ==========================================
// 放宽规则 (Relaxation Kind)
// ==========================================
// 红线: 任何放宽都必须记录在分配结果上，不允许静默放宽
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelaxationKind {
    Taboo,                      // 去掉禁忌惩罚
    Fairness,                   // 去掉公平惩罚
    HourCap,                    // 突破同品番工时上限
    FixedInspectorUnavailable,  // 固定检验员不可用，转入求解器
}

impl fmt::Display for RelaxationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelaxationKind::Taboo => write!(f, "TABOO"),
            RelaxationKind::Fairness => write!(f, "FAIRNESS"),
            RelaxationKind::HourCap => write!(f, "HOUR_CAP"),
            RelaxationKind::FixedInspectorUnavailable => write!(f, "FIXED_INSPECTOR_UNAVAILABLE"),
        }
    }
}

// ==========================================
// 不可分配原因 (Unassignable Reason)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnassignableReason {
    NoSkilledInspector,     // 无人具备该品番技能
    AllSkilledOnVacation,   // 有技能者全部休假
    AllOverHourCap,         // 有技能者全部超出同品番上限
    AllOutOfMinutes,        // 有技能者剩余工时不足
    BelowAcceptanceFloor,   // 有技能者评分均低于接受下限
}

impl fmt::Display for UnassignableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnassignableReason::NoSkilledInspector => write!(f, "NO_SKILLED_INSPECTOR"),
            UnassignableReason::AllSkilledOnVacation => write!(f, "ALL_SKILLED_ON_VACATION"),
            UnassignableReason::AllOverHourCap => write!(f, "ALL_OVER_HOUR_CAP"),
            UnassignableReason::AllOutOfMinutes => write!(f, "ALL_OUT_OF_MINUTES"),
            UnassignableReason::BelowAcceptanceFloor => write!(f, "BELOW_ACCEPTANCE_FLOOR"),
        }
    }
}

// ==========================================
// 公平性判定 (Fairness Verdict)
// ==========================================
// 依据: 分配次数极差 (max - min)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FairnessVerdict {
    Balanced,        // 极差 <= 1
    SlightlySkewed,  // 极差 <= 2
    Skewed,          // 其它
}

impl FairnessVerdict {
    pub fn from_imbalance(imbalance: u32) -> Self {
        match imbalance {
            0 | 1 => FairnessVerdict::Balanced,
            2 => FairnessVerdict::SlightlySkewed,
            _ => FairnessVerdict::Skewed,
        }
    }
}

impl fmt::Display for FairnessVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FairnessVerdict::Balanced => write!(f, "BALANCED"),
            FairnessVerdict::SlightlySkewed => write!(f, "SLIGHTLY_SKEWED"),
            FairnessVerdict::Skewed => write!(f, "SKEWED"),
        }
    }
}

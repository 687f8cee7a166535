// ==========================================
// 检验员分配系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、报表结构
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod assignment;
pub mod inspector;
pub mod lot;
pub mod product;
pub mod report;
pub mod skill;
pub mod types;
pub mod vacation;

// 重导出核心类型
pub use assignment::{Allocation, Assignment, RelaxationEvent};
pub use inspector::{Inspector, TabooEntry, WorkShift, DEFAULT_SHIFT_MINUTES};
pub use lot::{Lot, PriorityLotRequest, ShortageRecord};
pub use product::{ProductCatalog, ProductMaster};
pub use report::{
    AssignmentReport, FairnessStats, InspectorSummary, LotReport, ReportTotals, ValidationIssue,
};
pub use skill::{SkillMatrix, SkillRow};
pub use types::{
    FairnessVerdict, LotOrigin, RelaxationKind, SkillLevel, SkillSource, UnassignableReason,
    FIXED_PRIORITY_RANK,
};
pub use vacation::{VacationCode, VacationSchedule};

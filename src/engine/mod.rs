// ==========================================
// 检验员分配系统 - 引擎层
// ==========================================
// 职责: 批次生成 / 约束模型 / 评分 / 求解 / 汇总
// 红线: 引擎不访问数据库和文件，只消费内存中的规范化数据
// 红线: 所有放宽和不可分配都必须输出原因
// ==========================================

pub mod aggregator;
pub mod constraint_model;
pub mod error;
pub mod lot_builder;
pub mod orchestrator;
pub mod relaxation;
pub mod scorer;
pub mod solver;

// 重导出核心引擎
pub use aggregator::ResultAggregator;
pub use constraint_model::{
    CommitError, ConstraintModel, EligibilityCheck, IneligibleReason, InspectorState,
};
pub use error::{ConfigurationError, EngineError, EngineResult, ValidationError};
pub use lot_builder::{split_quantity, LotBuildInput, LotBuildOutput, LotBuilder};
pub use orchestrator::{run_with_rules, AssignmentOrchestrator, EngineInput};
pub use relaxation::{RelaxationLadder, RelaxationPolicy, RelaxationStage};
pub use scorer::{Candidate, ScoreBreakdown, ScoreContext, Scorer};
pub use solver::{required_inspectors, split_minutes, AssignmentSolver};

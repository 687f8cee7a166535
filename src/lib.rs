// ==========================================
// 检验员分配系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite（配置存储）
// 系统定位: 出荷检查批次 → 检验员 的分配引擎
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 分配规则
pub mod engine;

// 导入层 - 主数据文件
pub mod importer;

// 配置层 - 规则配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 性能埋点
pub mod perf;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    FairnessVerdict, LotOrigin, RelaxationKind, SkillLevel, SkillSource, UnassignableReason,
};

// 领域实体
pub use domain::{
    Allocation, Assignment, AssignmentReport, Inspector, Lot, ProductCatalog, SkillMatrix,
    VacationSchedule,
};

// 引擎
pub use engine::{
    run_with_rules, AssignmentOrchestrator, AssignmentSolver, ConstraintModel, EngineError,
    EngineInput, LotBuilder, ResultAggregator, Scorer,
};

// 配置
pub use config::{AssignmentRules, ConfigManager, RuleConfigReader};

// 导入
pub use importer::{MasterData, MasterDataLoader};

// ==========================================
// 版本信息
// ==========================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "出荷検査 检验员分配引擎";

// ==========================================
// 检验员分配系统 - 引擎编排器
// ==========================================
// 用途: 协调批次生成 → 约束模型 → 求解 → 汇总 的执行顺序
// 红线: 规则快照只在运行开始时读取一次
// 红线: 报表中不含运行 ID 和时间戳（运行 ID 只进入日志 span）
// ==========================================

use crate::config::{AssignmentRules, RuleConfigReader};
use crate::domain::inspector::Inspector;
use crate::domain::product::ProductCatalog;
use crate::domain::report::AssignmentReport;
use crate::domain::skill::SkillMatrix;
use crate::domain::vacation::VacationSchedule;
use crate::engine::error::{ConfigurationError, EngineResult};
use crate::engine::{
    AssignmentSolver, ConstraintModel, LotBuildInput, LotBuilder, RelaxationLadder,
    ResultAggregator,
};
use crate::perf::PerfGuard;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info};

// ==========================================
// EngineInput - 引擎输入（已规范化的内存数据）
// ==========================================
#[derive(Debug, Clone)]
pub struct EngineInput {
    pub run_date: NaiveDate,
    pub catalog: ProductCatalog,
    pub inspectors: Vec<Inspector>,
    pub skills: SkillMatrix,
    pub vacations: VacationSchedule,
    pub lots: LotBuildInput,
}

impl EngineInput {
    pub fn new(run_date: NaiveDate) -> Self {
        Self {
            run_date,
            catalog: ProductCatalog::new(),
            inspectors: Vec::new(),
            skills: SkillMatrix::new(),
            vacations: VacationSchedule::new(),
            lots: LotBuildInput::default(),
        }
    }
}

// ==========================================
// AssignmentOrchestrator - 引擎编排器
// ==========================================
pub struct AssignmentOrchestrator<C>
where
    C: RuleConfigReader,
{
    config: Arc<C>,
}

impl<C> AssignmentOrchestrator<C>
where
    C: RuleConfigReader,
{
    /// 创建新的编排器实例
    ///
    /// # 参数
    /// - config: 规则配置读取器
    pub fn new(config: Arc<C>) -> Self {
        Self { config }
    }

    /// 读取规则快照并执行一次完整分配
    pub async fn run(&self, input: &EngineInput) -> EngineResult<AssignmentReport> {
        let rules = AssignmentRules::load(self.config.as_ref()).await?;
        Ok(run_with_rules(input, &rules)?)
    }
}

/// 以给定规则快照执行一次完整分配
///
/// 配置无效时在处理任何批次之前返回错误。
pub fn run_with_rules(
    input: &EngineInput,
    rules: &AssignmentRules,
) -> Result<AssignmentReport, ConfigurationError> {
    rules.validate()?;

    let run_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("assignment_run", %run_id, run_date = %input.run_date);
    let _enter = span.enter();

    let mut perf = PerfGuard::new("assignment_run");

    info!(
        inspectors = input.inspectors.len(),
        shortages = input.lots.shortages.len(),
        "开始执行检验员分配"
    );

    // ==========================================
    // 步骤1: 批次生成
    // ==========================================
    debug!("步骤1: 生成批次");
    let built = LotBuilder::new(&input.catalog).build(&input.lots);
    perf.set_items(built.lots.len());

    // ==========================================
    // 步骤2: 约束模型
    // ==========================================
    debug!("步骤2: 构建约束模型");
    let mut model = ConstraintModel::new(
        input.run_date,
        rules,
        &input.inspectors,
        &input.skills,
        &input.vacations,
    );

    // ==========================================
    // 步骤3: 求解
    // ==========================================
    debug!("步骤3: 求解");
    let solver = AssignmentSolver::new(RelaxationLadder::from_rules(rules));
    let assignments = solver.solve(&mut model, &built.lots);

    // ==========================================
    // 步骤4: 汇总
    // ==========================================
    debug!("步骤4: 汇总报表");
    Ok(ResultAggregator::aggregate(&model, &assignments, built.issues))
}

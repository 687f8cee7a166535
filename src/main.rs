// ==========================================
// 检验员分配系统 - 命令行入口
// ==========================================
// 用法: inspection-assign <data_dir> <run_date> [db_path]
// 输出: 分配报表 JSON → stdout；日志 → stderr
// ==========================================

use anyhow::{bail, Context, Result};
use inspection_assign::config::ConfigManager;
use inspection_assign::engine::AssignmentOrchestrator;
use inspection_assign::importer::field_mapper::parse_date_str;
use inspection_assign::importer::MasterDataLoader;
use inspection_assign::logging;
use std::sync::Arc;

const DEFAULT_DB_PATH: &str = "inspection_assign.db";

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        bail!("用法: {} <data_dir> <run_date> [db_path]", args[0]);
    }
    let data_dir = &args[1];
    let run_date = parse_date_str(&args[2])
        .with_context(|| format!("无法解析运行日期: {}", args[2]))?;
    let db_path = args.get(3).map(String::as_str).unwrap_or(DEFAULT_DB_PATH);

    tracing::info!("==================================================");
    tracing::info!("{} v{}", inspection_assign::APP_NAME, inspection_assign::VERSION);
    tracing::info!(data_dir = %data_dir, run_date = %run_date, db_path, "启动");
    tracing::info!("==================================================");

    let config = ConfigManager::new(db_path)
        .map_err(|e| anyhow::anyhow!("无法打开配置库 {}: {}", db_path, e))?;

    let master = MasterDataLoader::new(data_dir)
        .load_all()
        .await
        .into_complete()
        .context("主数据加载失败")?;

    let orchestrator = AssignmentOrchestrator::new(Arc::new(config));
    let report = orchestrator
        .run(&master.into_engine_input(run_date))
        .await
        .context("分配执行失败")?;

    tracing::info!(
        lots = report.totals.lot_count,
        assigned = report.totals.assigned_count,
        unassigned = report.totals.unassigned_count,
        relaxed = report.totals.relaxed_count,
        "分配完成"
    );

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

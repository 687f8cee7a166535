// ==========================================
// 主数据加载集成测试
// ==========================================
// 职责: CSV 夹具 → MasterDataLoader::load_all → 引擎输入 → 报表
// ==========================================


use inspection_assign::config::AssignmentRules;
use inspection_assign::domain::{SkillLevel, VacationCode};
use inspection_assign::engine::run_with_rules;
use inspection_assign::importer::{ImportError, MasterDataLoader, MasterSource};
use std::path::Path;
use tempfile::TempDir;
use test_helpers::*;

fn write_full_fixture(dir: &Path) {
    write_csv(
        dir,
        "products.csv",
        "品番,工程番号,検査時間,ロット数量\nP1,,108,50\nP2,,60,\nP2,20,30,\n",
    );
    write_csv(
        dir,
        "inspectors.csv",
        "検査員コード,氏名,開始時刻,終了時刻,新製品チーム\n\
         V001,山田,8:30,17:30,\n\
         V002,佐藤,8:30,12:00,★\n\
         V003,鈴木,8:30,17:30,\n",
    );
    write_csv(
        dir,
        "skills.csv",
        "品番,工程番号,V001,V002,V003\nP1,,1,,3\nP2,,,2,1\n",
    );
    write_csv(
        dir,
        "vacations.csv",
        "検査員コード,日付,休暇区分\nV003,2025-11-04,休\nV001,2025-11-05,AM\n",
    );
    write_csv(
        dir,
        "shortages.csv",
        "品番,現在工程番号,不足数,出荷予定日\nP1,,-130,2025-11-05\nP2,20,-60,2025-11-06\n",
    );
    write_csv(dir, "registered_products.csv", "品番\nP2\n");
    write_csv(
        dir,
        "cleaning_lots.csv",
        "ロットID,品番,工程番号,数量,固定検査員,出荷予定日\nCL-1,P2,,30,V002,\n",
    );
    write_csv(
        dir,
        "taboo_history.csv",
        "検査員コード,品番,割当日時\nV001,P1,2025-11-03 15:00\n",
    );
}

#[tokio::test]
async fn test_load_all_builds_engine_input() {
    let dir = TempDir::new().unwrap();
    write_full_fixture(dir.path());

    let outcome = MasterDataLoader::new(dir.path()).load_all().await;
    assert!(outcome.failures.is_empty(), "{:?}", outcome.failures);
    let master = outcome.into_complete().unwrap();

    assert_eq!(master.catalog.len(), 2);
    assert_eq!(master.catalog.seconds_per_unit("P2", Some("20")), Some(30.0));
    assert_eq!(master.catalog.seconds_per_unit("P2", Some("99")), Some(60.0));
    assert_eq!(master.inspectors.len(), 3);
    assert_eq!(master.skills.level_for("V003", "P2", None), Some(SkillLevel::High));
    assert_eq!(
        master.vacations.code_for("V003", run_date()),
        VacationCode::FullDay
    );
    assert_eq!(master.lots.shortages[0].shortage_quantity, 130);
    assert!(master.lots.registered_products.contains("P2"));
    assert_eq!(master.lots.cleaning_lots[0].fixed_inspector_id.as_deref(), Some("V002"));
    assert!(master.lots.advance_lots.is_empty());

    let v001 = master
        .inspectors
        .iter()
        .find(|i| i.inspector_id == "V001")
        .unwrap();
    assert_eq!(v001.taboo_history.len(), 1);
}

#[tokio::test]
async fn test_loaded_masters_drive_assignment() {
    let dir = TempDir::new().unwrap();
    write_full_fixture(dir.path());

    let master = MasterDataLoader::new(dir.path())
        .load_all()
        .await
        .into_complete()
        .unwrap();
    let input = master.into_engine_input(run_date());
    let report = run_with_rules(&input, &AssignmentRules::default()).unwrap();

    // 固定批次先提交给 V002（半日班 210 分钟）
    let cleaning = report.lot("CL-1").unwrap();
    assert!(cleaning.assigned);
    assert_eq!(cleaning.allocations[0].inspector_id, "V002");

    // P1 三批只能由 V001 承担（V003 休假）
    for id in ["SH0001-P1-01", "SH0001-P1-02", "SH0001-P1-03"] {
        let lot = report.lot(id).unwrap();
        assert!(lot.assigned, "{} should be assigned", id);
        assert_eq!(lot.allocations[0].inspector_id, "V001");
    }
    assert!(report.inspector("V003").unwrap().on_vacation);
    assert_eq!(report.inspector("V002").unwrap().available_minutes, 210);
    assert!(report.validation_issues.is_empty());
}

#[tokio::test]
async fn test_missing_optional_sources_are_empty() {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "products.csv", "品番,検査時間\nP1,60\n");
    write_csv(dir.path(), "inspectors.csv", "検査員コード,氏名\nV001,山田\n");
    write_csv(dir.path(), "skills.csv", "品番,V001\nP1,1\n");
    write_csv(dir.path(), "shortages.csv", "品番,不足数\nP1,10\n");

    let master = MasterDataLoader::new(dir.path())
        .load_all()
        .await
        .into_complete()
        .unwrap();

    assert!(master.vacations.is_empty());
    assert!(master.lots.registered_products.is_empty());
    assert!(master.lots.cleaning_lots.is_empty());
    assert_eq!(master.lots.shortages.len(), 1);
}

#[tokio::test]
async fn test_failed_sources_reported_as_partial_data() {
    let dir = TempDir::new().unwrap();
    write_full_fixture(dir.path());
    // 検査時間 无法解析 + 缺少 skills 文件
    write_csv(dir.path(), "products.csv", "品番,検査時間\nP1,abc\n");
    std::fs::remove_file(dir.path().join("skills.csv")).unwrap();

    let outcome = MasterDataLoader::new(dir.path()).load_all().await;

    let failed: Vec<&str> = outcome.failures.iter().map(|f| f.source.as_str()).collect();
    assert_eq!(failed, vec!["products", "skills"]);
    // 其它数据源不受影响
    assert_eq!(outcome.master.inspectors.len(), 3);

    match outcome.into_complete() {
        Err(ImportError::PartialData { failures }) => assert_eq!(failures.len(), 2),
        other => panic!("expected PartialData, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_resolve_path_prefers_csv() {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "products.csv", "品番\n");
    std::fs::write(dir.path().join("products.xlsx"), b"").unwrap();

    let loader = MasterDataLoader::new(dir.path());
    assert_eq!(
        loader.resolve_path(MasterSource::Products),
        Some(dir.path().join("products.csv"))
    );
    assert_eq!(loader.resolve_path(MasterSource::Vacations), None);
}

// ==========================================
// ConfigManager / 规则快照 集成测试
// ==========================================
// 测试目标: config_kv 读取 → AssignmentRules 快照 → 编排器
// ==========================================


use inspection_assign::config::{config_keys, AssignmentRules, ConfigManager, RuleConfigReader};
use inspection_assign::domain::SkillLevel;
use inspection_assign::engine::{AssignmentOrchestrator, ConfigurationError, EngineError};
use std::sync::Arc;
use test_helpers::*;

#[tokio::test]
async fn test_config_manager_creation() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");

    let config_manager = ConfigManager::new(&db_path);
    assert!(
        config_manager.is_ok(),
        "ConfigManager should be created successfully"
    );
}

#[tokio::test]
async fn test_rules_loaded_from_store() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let manager = ConfigManager::new(&db_path).unwrap();
    manager
        .set_global_config_value(config_keys::PRODUCT_HOUR_CAP, "3.5")
        .unwrap();
    manager
        .set_global_config_value(config_keys::HOURS_PER_INSPECTOR, "2.5")
        .unwrap();
    manager
        .set_global_config_value(config_keys::ALLOW_HOUR_CAP_RELAXATION, "off")
        .unwrap();

    let rules = AssignmentRules::load(&manager).await.unwrap();

    assert_eq!(rules.product_hour_cap, 3.5);
    assert_eq!(rules.hours_per_inspector, 2.5);
    assert!(!rules.allow_hour_cap_relaxation);
    assert_eq!(rules.cap_minutes(), 210);
    assert_eq!(rules.threshold_minutes(), 150);
    assert_eq!(rules.taboo_weight, AssignmentRules::default().taboo_weight);
}

#[tokio::test]
async fn test_values_persist_across_managers() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    {
        let manager = ConfigManager::new(&db_path).unwrap();
        manager
            .set_global_config_value(config_keys::TABOO_LOOKBACK_HOURS, "24")
            .unwrap();
    }

    let reopened = ConfigManager::new(&db_path).unwrap();
    assert_eq!(reopened.get_taboo_lookback_hours().await.unwrap(), 24.0);
}

#[tokio::test]
async fn test_zero_hour_cap_rejected_before_any_lot() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let manager = ConfigManager::new(&db_path).unwrap();
    manager
        .set_global_config_value(config_keys::PRODUCT_HOUR_CAP, "0")
        .unwrap();

    let mut input = engine_input(
        vec![product("P", 60.0, None)],
        vec![inspector("A", 480)],
        &[("P", "A", SkillLevel::High)],
    );
    input.lots.shortages.push(shortage("P", 30));

    let orchestrator = AssignmentOrchestrator::new(Arc::new(manager));
    let result = orchestrator.run(&input).await;

    assert!(matches!(
        result,
        Err(EngineError::Configuration(ConfigurationError::NonPositiveHourCap(v))) if v == 0.0
    ));
}

#[tokio::test]
async fn test_negative_threshold_from_mock_rejected() {
    let config = MockRuleConfig::new(AssignmentRules {
        hours_per_inspector: -1.0,
        ..AssignmentRules::default()
    });

    let result = AssignmentRules::load(&config).await;
    assert!(matches!(
        result,
        Err(EngineError::Configuration(ConfigurationError::NonPositiveThreshold(_)))
    ));
}

#[tokio::test]
async fn test_config_read_failure_surfaces() {
    let orchestrator = AssignmentOrchestrator::new(Arc::new(MockRuleConfig::failing()));
    let input = engine_input(Vec::new(), Vec::new(), &[]);

    let result = orchestrator.run(&input).await;
    assert!(matches!(result, Err(EngineError::ConfigRead(_))));
}

#[tokio::test]
async fn test_snapshot_restores_rules() {
    let (_src_file, src_path) = create_test_db().unwrap();
    let source = ConfigManager::new(&src_path).unwrap();
    source
        .set_global_config_value(config_keys::FAIRNESS_WEIGHT_PER_HOUR, "0.25")
        .unwrap();
    let snapshot = source.get_config_snapshot().unwrap();

    let (_dst_file, dst_path) = create_test_db().unwrap();
    let target = ConfigManager::new(&dst_path).unwrap();
    assert_eq!(target.restore_config_from_snapshot(&snapshot).unwrap(), 1);

    let rules = AssignmentRules::load(&target).await.unwrap();
    assert_eq!(rules.fairness_weight_per_hour, 0.25);
}

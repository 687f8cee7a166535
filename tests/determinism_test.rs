// ==========================================
// 确定性测试
// ==========================================
// 职责: 相同输入 + 相同规则 → 逐字节相同的报表
// ==========================================


use inspection_assign::config::AssignmentRules;
use inspection_assign::domain::{SkillLevel, TabooEntry};
use inspection_assign::engine::{run_with_rules, AssignmentOrchestrator, EngineInput};
use std::sync::Arc;
use test_helpers::*;

fn busy_input() -> EngineInput {
    let mut c = inspector("C", 300);
    c.taboo_history.push(TabooEntry {
        product_id: "P".to_string(),
        assigned_at: run_date().and_hms_opt(6, 0, 0).unwrap(),
    });
    let mut input = engine_input(
        vec![
            product("P", 45.0, Some(40)),
            product("Q", 90.0, None),
            product("R", 30.0, Some(100)),
        ],
        vec![inspector("A", 480), inspector("B", 420), c, inspector("D", 480)],
        &[
            ("P", "A", SkillLevel::High),
            ("P", "B", SkillLevel::Medium),
            ("P", "C", SkillLevel::High),
            ("Q", "B", SkillLevel::High),
            ("Q", "D", SkillLevel::Low),
            ("R", "A", SkillLevel::Low),
            ("R", "C", SkillLevel::Medium),
            ("R", "D", SkillLevel::High),
        ],
    );
    input.lots.shortages.push(shortage("P", 170));
    input.lots.shortages.push(shortage("Q", 150));
    input.lots.shortages.push(shortage("R", 420));
    input.lots.shortages.push(shortage("P", 35));
    input.lots.registered_products.insert("Q".to_string());
    input
        .lots
        .cleaning_lots
        .push(fixed_request("CL-1", "R", 120, "A"));
    input.vacations.mark_on_vacation("D", run_date());
    input
}

#[test]
fn test_identical_runs_produce_identical_reports() {
    let input = busy_input();
    let rules = AssignmentRules::default();

    let first = serde_json::to_string(&run_with_rules(&input, &rules).unwrap()).unwrap();
    let second = serde_json::to_string(&run_with_rules(&input, &rules).unwrap()).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_inspector_input_order_does_not_change_report() {
    let input = busy_input();
    let mut reversed = input.clone();
    reversed.inspectors.reverse();
    let rules = AssignmentRules::default();

    let a = serde_json::to_string(&run_with_rules(&input, &rules).unwrap()).unwrap();
    let b = serde_json::to_string(&run_with_rules(&reversed, &rules).unwrap()).unwrap();

    assert_eq!(a, b);
}

#[tokio::test]
async fn test_orchestrator_runs_are_identical() {
    let input = busy_input();
    let orchestrator =
        AssignmentOrchestrator::new(Arc::new(MockRuleConfig::new(AssignmentRules::default())));

    let first = orchestrator.run(&input).await.unwrap();
    let second = orchestrator.run(&input).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

mod support;

use action_flow::{
    Collaborators, ExecutionConfig, LadderOutcome, RecoveryContext, RecoveryLadder, RecoveryTier,
    RunState, StepExecutionController,
};
use action_primitives::ActionError;
use agent_core::MockLlmProvider;
use serde_json::json;
use std::sync::Arc;
use support::{click, waits, ScriptedDriver};
use surefoot_core_types::{Action, Plan, Step};

fn single_click_plan() -> Plan {
    Plan::with_steps("click", vec![Step::new("Click go", click(&["#go"]))])
}

fn clicks_on_go(action: &Action) -> bool {
    matches!(action, Action::Click { target } if target.selectors.primary() == Some("#go"))
}

#[tokio::test]
async fn test_quick_dismiss_recovers_in_place() {
    let driver = Arc::new(ScriptedDriver::failing_clicks(1));
    let mut controller = StepExecutionController::new(
        single_click_plan(),
        Collaborators::new(driver.clone()),
        ExecutionConfig::fast(),
    );

    let result = controller.execute(None).await.unwrap();

    let step = &result.final_plan.steps[0];
    assert!(step.completed);
    assert_eq!(step.retry_count, 1);
    assert_eq!(result.final_plan.len(), 1);
    assert_eq!(
        driver.actions()[1],
        Action::Press {
            key: "Escape".into()
        }
    );
    assert_eq!(driver.count("click"), 2);
}

#[tokio::test]
async fn test_autonomous_script_runs_sandboxed() {
    let driver = Arc::new(
        ScriptedDriver::failing_clicks(2).with_evaluate_result(json!({ "ok": true, "error": null })),
    );
    let author = Arc::new(
        MockLlmProvider::new().with_remediation_script("document.querySelector('#cookie-banner')?.remove();"),
    );
    let env = Collaborators::new(driver.clone()).with_remediation(author);

    let mut controller = StepExecutionController::new(single_click_plan(), env, ExecutionConfig::fast());
    let result = controller.execute(None).await.unwrap();

    assert!(result.final_plan.steps[0].completed);
    assert_eq!(waits(&result.final_plan), 0);
    let scripts = driver.evaluated();
    assert_eq!(scripts.len(), 1);
    assert!(scripts[0].contains("cookie-banner"));
    assert!(scripts[0].contains("XMLHttpRequest"));
    assert!(result.screenshots.iter().any(|p| p.to_string_lossy().contains("failure-click-go")));
}

#[tokio::test]
async fn test_rejected_script_never_evaluated() {
    let driver = Arc::new(ScriptedDriver::failing_clicks(2));
    let author = Arc::new(MockLlmProvider::new().with_remediation_script("fetch('/steal')"));
    let env = Collaborators::new(driver.clone()).with_remediation(author);
    let config = ExecutionConfig::fast().with_autonomous_iterations(2);

    let mut controller = StepExecutionController::new(single_click_plan(), env, config);
    let result = controller.execute(None).await.unwrap();

    assert!(driver.evaluated().iter().all(|script| !script.contains("steal")));
    // structured recovery took over with a wait
    assert_eq!(waits(&result.final_plan), 1);
    assert!(result.final_plan.steps.iter().all(|s| s.completed));
}

#[tokio::test]
async fn test_overlay_dismissal_offered_when_probe_positive() {
    let driver = Arc::new(
        ScriptedDriver::new()
            .fail_when(clicks_on_go, 2)
            .with_evaluate_result(json!({
                "present": true,
                "kind": "cookie_banner",
                "closeSelector": "#accept",
                "coverage": 0.5
            })),
    );
    let mut controller = StepExecutionController::new(
        single_click_plan(),
        Collaborators::new(driver.clone()),
        ExecutionConfig::fast(),
    );

    let result = controller.execute(None).await.unwrap();

    let plan = &result.final_plan;
    assert_eq!(plan.len(), 3);
    let dismiss = plan.steps[0].action.as_ref().and_then(Action::target).unwrap();
    assert_eq!(dismiss.selectors.primary(), Some("#accept"));
    assert!(matches!(plan.steps[1].action, Some(Action::Wait { .. })));
    assert!(plan.steps.iter().all(|s| s.completed));
}

#[tokio::test]
async fn test_non_retryable_error_climbs_to_abandonment() {
    let driver = Arc::new(
        ScriptedDriver::failing_clicks(usize::MAX)
            .with_error(ActionError::Unsupported("drag and drop".into())),
    );
    let mut controller = StepExecutionController::new(
        single_click_plan(),
        Collaborators::new(driver.clone()),
        ExecutionConfig::fast(),
    );

    let result = controller.execute(None).await.unwrap();

    // wait-then-retry still outranks skip-step, so every escalation inserts a wait
    assert_eq!(waits(&result.final_plan), 4);
    assert_eq!(driver.count("click"), 10);
    assert_eq!(result.skipped_steps(), 0);
    assert_eq!(result.failed_steps(), 1);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("abandoned"));
    assert!(!result.final_plan.steps.last().unwrap().completed);
}

#[tokio::test]
async fn test_skip_after_insertion_budget_is_recorded() {
    let driver = Arc::new(
        ScriptedDriver::failing_clicks(usize::MAX)
            .with_error(ActionError::Unsupported("drag and drop".into())),
    );
    let config = ExecutionConfig::fast().with_max_inserted_steps(1);
    let mut controller =
        StepExecutionController::new(single_click_plan(), Collaborators::new(driver.clone()), config);

    let result = controller.execute(None).await.unwrap();

    assert_eq!(waits(&result.final_plan), 1);
    assert_eq!(driver.count("click"), 4);
    assert!(result.final_plan.steps.last().unwrap().completed);
    assert_eq!(result.skipped_steps(), 1);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("skipped"));
}

#[tokio::test]
async fn test_vision_captcha_steps_inserted() {
    let driver = Arc::new(
        ScriptedDriver::new()
            .fail_when(clicks_on_go, 4)
            .with_error(ActionError::TargetInvalid("covered by challenge".into())),
    );
    let vision = Arc::new(MockLlmProvider::new().with_vision_response(
        r##"{"failure_reason":"captcha","captcha":{"present":true,"type":"checkbox","confidence":0.9,
            "solution_steps":[{"description":"Tick the captcha box","action_type":"click","selectors":["#captcha-box"]}]},
            "page_state":"blocked"}"##,
    ));
    let env = Collaborators::new(driver.clone()).with_vision(vision);

    let mut controller = StepExecutionController::new(single_click_plan(), env, ExecutionConfig::fast());
    let result = controller.execute(None).await.unwrap();

    // the first escalation waits; the repeated wait defers to vision, which finds the captcha
    let plan = &result.final_plan;
    assert_eq!(plan.len(), 3);
    assert!(matches!(plan.steps[0].action, Some(Action::Wait { .. })));
    assert_eq!(plan.steps[1].description, "Tick the captcha box");
    assert!(plan.steps[2].completed);
    assert_eq!(plan.steps[2].retry_count, 2);
    assert!(result.screenshots.iter().any(|p| p.to_string_lossy().contains("failure-")));
}

#[tokio::test]
async fn test_vision_alternative_replaces_action() {
    let driver = Arc::new(
        ScriptedDriver::new()
            .fail_when(clicks_on_go, usize::MAX)
            .with_error(ActionError::TargetInvalid("button is gone".into())),
    );
    let vision = Arc::new(MockLlmProvider::new().with_vision_response(
        "```json\n{\"failure_reason\":\"button removed\",\"captcha\":{\"present\":false},\
         \"alternative_action\":{\"description\":\"Submit with Enter\",\"action_type\":\"press\",\"key\":\"Enter\"}}\n```",
    ));
    let env = Collaborators::new(driver.clone()).with_vision(vision);

    let mut controller = StepExecutionController::new(single_click_plan(), env, ExecutionConfig::fast());
    let result = controller.execute(None).await.unwrap();

    let plan = &result.final_plan;
    assert_eq!(waits(plan), 2);
    let step = plan.steps.last().unwrap();
    assert!(step.completed);
    assert_eq!(step.action, Some(Action::press("Enter")));
}

#[tokio::test]
async fn test_low_confidence_captcha_falls_back_to_wait() {
    let driver = Arc::new(
        ScriptedDriver::failing_clicks(usize::MAX)
            .with_error(ActionError::TargetInvalid("challenge".into())),
    );
    let vision = Arc::new(MockLlmProvider::new().with_vision_response(
        r##"{"captcha":{"present":true,"confidence":0.3,
            "solution_steps":[{"description":"tick","action_type":"click","selectors":["#box"]}]}}"##,
    ));
    let env = Collaborators::new(driver).with_vision(vision);

    let mut controller = StepExecutionController::new(single_click_plan(), env, ExecutionConfig::fast());
    let result = controller.execute(None).await.unwrap();

    let plan = &result.final_plan;
    assert!(plan.steps.iter().all(|s| s.description != "tick"));
    assert_eq!(waits(plan), 4);
    assert_eq!(plan.len(), 5);
    assert!(!plan.steps.last().unwrap().completed);
    assert_eq!(result.skipped_steps(), 0);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("abandoned"));
}

#[tokio::test]
async fn test_ladder_runs_tiers_in_order() {
    let ladder = RecoveryLadder::standard();
    assert_eq!(
        ladder.tiers(),
        vec![
            RecoveryTier::QuickDismiss,
            RecoveryTier::AutonomousRecovery,
            RecoveryTier::StructuredOptions,
            RecoveryTier::VisionDiagnostic,
        ]
    );
}

#[tokio::test]
async fn test_recovery_steps_do_not_insert_more_steps() {
    let driver = Arc::new(ScriptedDriver::failing_clicks(usize::MAX));
    let env = Collaborators::new(driver);
    let config = ExecutionConfig::fast();
    let mut plan = single_click_plan();
    let mut run = RunState::new();

    let origin = plan.steps[0].id.clone();
    plan.insert_before(0, vec![Step::new("Recovery click", click(&["#x"]))])
        .unwrap();
    let recovery_id = plan.steps[0].id.clone();
    run.record_inserted(&origin, &[recovery_id]);

    let outcome = {
        let mut ctx = RecoveryContext::new(
            &mut plan,
            0,
            ActionError::WaitTimeout("slow".into()),
            &mut run,
            &env,
            &config,
            "task",
        );
        assert!(!ctx.can_insert(1));
        RecoveryLadder::standard().recover(&mut ctx).await
    };

    assert!(matches!(outcome, LadderOutcome::Advance { .. }));
    assert_eq!(plan.len(), 2);
}

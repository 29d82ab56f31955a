use agent_core::{
    extract_script, parse_diagnosis, plan_or_bootstrap, MockLlmProvider, RemediationAuthor,
    RemediationRequest, StepDescriptor, TaskPlanner, VisionAnalyzer,
};
use futures::executor::block_on;
use std::path::Path;
use surefoot_core_types::{Action, ElementCategory};

#[test]
fn mock_provider_emits_deterministic_plan() {
    let provider = MockLlmProvider::default();

    let first = block_on(provider.plan("look around", "https://example.com")).expect("plan");
    let second = block_on(provider.plan("look around", "https://example.com")).expect("plan");

    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
    assert_eq!(first[0].url.as_deref(), Some("https://example.com"));
}

#[test]
fn mock_search_plan_targets_search_box() {
    let provider = MockLlmProvider::default();
    let plan = block_on(plan_or_bootstrap(
        Some(&provider),
        "Search for rust ownership",
        "https://duckduckgo.com",
    ));

    assert_eq!(plan.len(), 6);
    match &plan.steps[2].action {
        Some(Action::Type { target, text, .. }) => {
            assert_eq!(text, "rust ownership");
            assert_eq!(target.category, Some(ElementCategory::Search));
        }
        other => panic!("unexpected action {other:?}"),
    }
    assert_eq!(plan.steps[3].action, Some(Action::press("Enter")));
}

#[test]
fn mock_provider_rejects_empty_task() {
    let provider = MockLlmProvider::default();
    assert!(block_on(provider.plan("  ", "https://example.com")).is_err());
}

#[test]
fn default_vision_response_parses() {
    let provider = MockLlmProvider::default();
    let raw = block_on(provider.analyze(Path::new("shot.png"), "diagnose", None, None)).unwrap();
    let diagnosis = parse_diagnosis(&raw).expect("diagnosis");
    assert!(!diagnosis.captcha.present);
    assert!(diagnosis.alternative_action.is_none());
}

#[test]
fn remediation_script_round_trips_through_fence() {
    let provider = MockLlmProvider::default().with_remediation_script("document.body.click();");
    let raw = block_on(provider.author(&RemediationRequest::default())).unwrap();
    assert_eq!(extract_script(&raw).as_deref(), Some("document.body.click();"));

    assert!(block_on(MockLlmProvider::default().author(&RemediationRequest::default())).is_err());
}

#[test]
fn scripted_alternative_is_returned() {
    let alternative = StepDescriptor::new("press enter instead", "press");
    let provider = MockLlmProvider::default().with_alternative(alternative.clone());
    let suggested = block_on(provider.suggest_alternative(&Default::default())).unwrap();
    assert_eq!(suggested, Some(alternative));
}

#[test]
fn intent_summary_mentions_last_step() {
    let provider = MockLlmProvider::default();
    let summary = block_on(provider.summarize_intent(
        "find docs",
        &["Open page".to_string(), "Click docs".to_string()],
    ))
    .unwrap();
    assert!(summary.contains("2 step(s)"));
    assert!(summary.contains("Click docs"));
}

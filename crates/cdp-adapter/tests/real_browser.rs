//! Real-browser checks. Set `SUREFOOT_CDP_TESTS=1` (and optionally `SUREFOOT_CHROME`) to run.

use action_primitives::{ActionError, BrowserDriver, ScreenshotOptions};
use cdp_adapter::{CdpConfig, ChromiumDriver};
use surefoot_core_types::{Action, ElementCategory, ElementTarget};

const FORM_PAGE: &str = "data:text/html,<html><head><title>form</title></head><body>\
<input id='q' aria-label='Search the catalogue'>\
<select id='color'><option value='r'>Red</option><option value='b'>Blue</option></select>\
<button id='go' onclick=\"document.title='clicked'\">Go</button></body></html>";

fn enabled() -> bool {
    if std::env::var("SUREFOOT_CDP_TESTS").ok().as_deref() != Some("1") {
        eprintln!("Skipping real browser test (set SUREFOOT_CDP_TESTS=1 to enable)");
        return false;
    }
    true
}

fn driver(dir: &std::path::Path) -> ChromiumDriver {
    ChromiumDriver::new(CdpConfig::default().with_screenshot_dir(dir))
}

#[tokio::test]
async fn test_form_interactions() {
    if !enabled() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let driver = driver(dir.path());
    driver.ensure_ready().await.unwrap();
    driver
        .execute_action(&Action::Navigate { url: FORM_PAGE.into() })
        .await
        .unwrap();

    let typed = driver
        .execute_action(&Action::Type {
            target: ElementTarget::candidates(["#missing", "role=textbox[name*=catalogue]"]),
            text: "boots".into(),
            clear: true,
        })
        .await
        .unwrap();
    let heal = typed.self_heal.expect("fallback candidate should be reported");
    assert_eq!(heal.original_anchor, "#missing");
    assert_eq!(
        driver.evaluate("document.getElementById('q').value").await.unwrap(),
        serde_json::json!("boots")
    );

    driver
        .execute_action(&Action::Select {
            target: ElementTarget::new("#color"),
            value: "Blue".into(),
        })
        .await
        .unwrap();
    let missing = driver
        .execute_action(&Action::Select {
            target: ElementTarget::new("#color"),
            value: "Green".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(missing, ActionError::OptionNotFound(_)));

    let clicked = driver
        .execute_action(&Action::click(
            ElementTarget::new("#nope").with_category(ElementCategory::Button),
        ))
        .await
        .unwrap();
    assert_eq!(clicked.post_signals.title_after.as_deref(), Some("clicked"));

    let shot = driver
        .take_screenshot("form", ScreenshotOptions::default())
        .await
        .unwrap();
    assert!(shot.exists());
    driver.close().await.unwrap();
}

#[tokio::test]
async fn test_tabs_and_missing_targets() {
    if !enabled() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let driver = driver(dir.path());
    driver.ensure_ready().await.unwrap();

    driver
        .execute_action(&Action::NewTab { url: Some(FORM_PAGE.into()) })
        .await
        .unwrap();
    assert_eq!(driver.session().tab_count().await, 2);

    let err = driver
        .execute_action(&Action::click(ElementTarget::new("#does-not-exist")))
        .await
        .unwrap_err();
    assert!(err.is_resolution_failure());

    let err = driver
        .execute_action(&Action::SwitchTab { index: 7 })
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::TargetInvalid(_)));

    driver
        .execute_action(&Action::CloseTab { index: None })
        .await
        .unwrap();
    assert_eq!(driver.session().tab_count().await, 1);
    driver.close().await.unwrap();
}

//! Launch configuration and Chrome discovery

use serde::{Deserialize, Serialize};
use std::{
    env,
    path::{Path, PathBuf},
};
use which::which;

/// Configuration for launching and tuning the Chromium session.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CdpConfig {
    /// Chrome binary; `None` lets chromiumoxide search on its own
    pub executable: Option<PathBuf>,
    pub user_data_dir: Option<PathBuf>,
    pub headless: bool,
    pub no_sandbox: bool,
    pub window_width: u32,
    pub window_height: u32,
    /// Directory screenshots are written to
    pub screenshot_dir: PathBuf,
    pub navigation_timeout_ms: u64,
    pub launch_timeout_ms: u64,
}

impl Default for CdpConfig {
    fn default() -> Self {
        Self {
            executable: detect_chrome_executable(),
            user_data_dir: default_profile_dir(),
            headless: resolve_headless_default(),
            no_sandbox: true,
            window_width: 1280,
            window_height: 900,
            screenshot_dir: PathBuf::from("./screenshots"),
            navigation_timeout_ms: 30_000,
            launch_timeout_ms: 20_000,
        }
    }
}

impl CdpConfig {
    pub fn headed(mut self) -> Self {
        self.headless = false;
        self
    }

    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = dir.into();
        self
    }

    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }
}

/// `SUREFOOT_HEADLESS` set to "0", "false", "no" or "off" means headed
fn resolve_headless_default() -> bool {
    match env::var("SUREFOOT_HEADLESS") {
        Ok(value) => parse_headless(&value),
        Err(_) => true,
    }
}

pub(crate) fn parse_headless(value: &str) -> bool {
    let lower = value.trim().to_ascii_lowercase();
    !matches!(lower.as_str(), "0" | "false" | "no" | "off")
}

fn default_profile_dir() -> Option<PathBuf> {
    match env::var("SUREFOOT_CHROME_PROFILE") {
        Ok(path) if !path.trim().is_empty() => Some(PathBuf::from(path.trim())),
        _ => None,
    }
}

/// Find a Chrome/Chromium binary: `SUREFOOT_CHROME`, then `PATH`, then well-known install paths.
pub fn detect_chrome_executable() -> Option<PathBuf> {
    if let Ok(raw) = env::var("SUREFOOT_CHROME") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let candidate = PathBuf::from(trimmed);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    for name in chrome_executable_names() {
        if let Ok(path) = which(name) {
            return Some(path);
        }
    }

    os_specific_chrome_paths()
        .into_iter()
        .find(|candidate| Path::new(candidate).exists())
}

fn chrome_executable_names() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["chrome.exe", "chromium.exe", "msedge.exe"]
    }

    #[cfg(not(target_os = "windows"))]
    {
        &[
            "google-chrome-stable",
            "google-chrome",
            "chromium",
            "chromium-browser",
        ]
    }
}

fn os_specific_chrome_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let mut paths = Vec::new();
        for var in ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"] {
            if let Ok(root) = env::var(var) {
                let root = PathBuf::from(root);
                paths.push(root.join("Google/Chrome/Application/chrome.exe"));
                paths.push(root.join("Chromium/Application/chrome.exe"));
            }
        }
        paths
    }

    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ]
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        vec![
            PathBuf::from("/usr/bin/google-chrome-stable"),
            PathBuf::from("/usr/bin/google-chrome"),
            PathBuf::from("/usr/bin/chromium-browser"),
            PathBuf::from("/usr/bin/chromium"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_parsing() {
        assert!(parse_headless("1"));
        assert!(parse_headless("yes"));
        assert!(!parse_headless("OFF"));
        assert!(!parse_headless(" false "));
    }

    #[test]
    fn test_builders() {
        let config = CdpConfig::default()
            .headed()
            .with_screenshot_dir("/tmp/shots")
            .with_executable("/opt/chrome");
        assert!(!config.headless);
        assert_eq!(config.screenshot_dir, PathBuf::from("/tmp/shots"));
        assert_eq!(config.executable, Some(PathBuf::from("/opt/chrome")));
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: CdpConfig = serde_json::from_str(r#"{ "navigation_timeout_ms": 5000 }"#).unwrap();
        assert_eq!(config.navigation_timeout_ms, 5000);
        assert_eq!(config.window_width, 1280);
    }
}

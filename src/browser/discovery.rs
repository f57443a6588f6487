use std::path::PathBuf;
use std::process::Command;

use crate::error::{Result, WebpilotError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserType {
    Chrome,
    Brave,
    Edge,
    Chromium,
}

impl BrowserType {
    pub fn name(&self) -> &'static str {
        match self {
            BrowserType::Chrome => "Google Chrome",
            BrowserType::Brave => "Brave",
            BrowserType::Edge => "Microsoft Edge",
            BrowserType::Chromium => "Chromium",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BrowserInfo {
    pub browser_type: BrowserType,
    pub path: PathBuf,
    pub version: Option<String>,
}

impl BrowserInfo {
    pub fn new(browser_type: BrowserType, path: PathBuf) -> Self {
        Self {
            browser_type,
            path,
            version: None,
        }
    }

    pub fn with_version(mut self) -> Self {
        self.version = detect_version(&self.path);
        self
    }
}

/// Discover the best available Chromium-family browser on the system
pub fn discover_browser() -> Result<BrowserInfo> {
    for (browser_type, paths) in browser_candidates() {
        for path in paths {
            let path = PathBuf::from(path);
            if path.exists() {
                return Ok(BrowserInfo::new(browser_type, path).with_version());
            }
        }
    }

    discover_from_path().ok_or(WebpilotError::BrowserNotFound)
}

/// Fall back to a PATH lookup when no well-known install location matched
fn discover_from_path() -> Option<BrowserInfo> {
    const NAMES: &[(BrowserType, &str)] = &[
        (BrowserType::Chrome, "google-chrome"),
        (BrowserType::Chrome, "google-chrome-stable"),
        (BrowserType::Chromium, "chromium"),
        (BrowserType::Chromium, "chromium-browser"),
        (BrowserType::Brave, "brave-browser"),
        (BrowserType::Edge, "microsoft-edge"),
    ];

    NAMES.iter().find_map(|(browser_type, name)| {
        which::which(name)
            .ok()
            .map(|path| BrowserInfo::new(*browser_type, path).with_version())
    })
}

/// Candidate install locations for the current platform, highest priority first
fn browser_candidates() -> Vec<(BrowserType, Vec<&'static str>)> {
    #[cfg(target_os = "macos")]
    {
        vec![
            (
                BrowserType::Chrome,
                vec!["/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"],
            ),
            (
                BrowserType::Brave,
                vec!["/Applications/Brave Browser.app/Contents/MacOS/Brave Browser"],
            ),
            (
                BrowserType::Edge,
                vec!["/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge"],
            ),
            (
                BrowserType::Chromium,
                vec!["/Applications/Chromium.app/Contents/MacOS/Chromium"],
            ),
        ]
    }

    #[cfg(target_os = "linux")]
    {
        vec![
            (
                BrowserType::Chrome,
                vec![
                    "/usr/bin/google-chrome",
                    "/usr/bin/google-chrome-stable",
                    "/snap/bin/chromium",
                ],
            ),
            (
                BrowserType::Brave,
                vec!["/usr/bin/brave-browser", "/usr/bin/brave"],
            ),
            (
                BrowserType::Edge,
                vec!["/usr/bin/microsoft-edge", "/usr/bin/microsoft-edge-stable"],
            ),
            (
                BrowserType::Chromium,
                vec!["/usr/bin/chromium", "/usr/bin/chromium-browser"],
            ),
        ]
    }

    #[cfg(target_os = "windows")]
    {
        vec![
            (
                BrowserType::Chrome,
                vec![
                    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
                    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
                ],
            ),
            (
                BrowserType::Brave,
                vec![
                    r"C:\Program Files\BraveSoftware\Brave-Browser\Application\brave.exe",
                ],
            ),
            (
                BrowserType::Edge,
                vec![
                    r"C:\Program Files\Microsoft\Edge\Application\msedge.exe",
                    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
                ],
            ),
        ]
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        vec![]
    }
}

/// Detect the browser version from `--version` output, e.g.
/// "Google Chrome 120.0.6099.109" -> "120.0.6099.109"
fn detect_version(path: &PathBuf) -> Option<String> {
    let output = Command::new(path).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }

    let version = String::from_utf8_lossy(&output.stdout);
    let version = version.trim();
    match version.rfind(' ') {
        Some(idx) => Some(version[idx + 1..].to_string()),
        None => Some(version.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_type_names_are_human_readable() {
        assert_eq!(BrowserType::Chrome.name(), "Google Chrome");
        assert_eq!(BrowserType::Chromium.name(), "Chromium");
    }

    #[test]
    fn browser_info_starts_without_version() {
        let info = BrowserInfo::new(BrowserType::Chrome, PathBuf::from("/nonexistent"));
        assert!(info.version.is_none());
    }

    #[test]
    fn candidates_exist_for_this_platform() {
        assert!(!browser_candidates().is_empty());
    }
}

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tokio::time::sleep;

use super::discovery::{discover_browser, BrowserInfo, BrowserType};
use super::http_client;
use crate::config::Config;
use crate::error::{Result, WebpilotError};

/// Starts a browser with CDP enabled and waits for the endpoint to come up.
///
/// The launched process is intentionally detached: it must survive the CLI
/// invocation so later commands can reattach to it.
pub struct BrowserLauncher {
    browser_info: BrowserInfo,
    cdp_port: u16,
    headless: bool,
    user_data_dir: PathBuf,
}

impl BrowserLauncher {
    pub fn from_config(config: &Config) -> Result<Self> {
        let browser_info = match &config.browser.executable {
            Some(path) => {
                let path = PathBuf::from(shellexpand::tilde(path).to_string());
                if !path.exists() {
                    return Err(WebpilotError::BrowserLaunchFailed(format!(
                        "Browser not found at: {}",
                        path.display()
                    )));
                }
                // Assume Chrome-compatible when the user points at a binary
                BrowserInfo::new(BrowserType::Chrome, path)
            }
            None => discover_browser()?,
        };

        let user_data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("webpilot")
            .join("profile");

        Ok(Self {
            browser_info,
            cdp_port: config.browser.cdp_port,
            headless: config.browser.headless,
            user_data_dir,
        })
    }

    pub fn cdp_port(&self) -> u16 {
        self.cdp_port
    }

    fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--remote-debugging-port={}", self.cdp_port),
            format!("--user-data-dir={}", self.user_data_dir.display()),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            "--disable-blink-features=AutomationControlled".to_string(),
        ];

        if self.headless {
            args.push("--headless=new".to_string());
        }

        args
    }

    fn launch(&self) -> Result<Child> {
        std::fs::create_dir_all(&self.user_data_dir)?;

        let args = self.build_args();
        tracing::debug!(
            "launching {} {} at {:?} with args {:?}",
            self.browser_info.browser_type.name(),
            self.browser_info.version.as_deref().unwrap_or("(unknown version)"),
            self.browser_info.path,
            args
        );

        let child = Command::new(&self.browser_info.path)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                WebpilotError::BrowserLaunchFailed(format!(
                    "Failed to launch {}: {}",
                    self.browser_info.browser_type.name(),
                    e
                ))
            })?;

        Ok(child)
    }

    /// Launch the browser and wait until CDP advertises a WebSocket URL
    pub async fn launch_and_wait(&self) -> Result<(Child, String)> {
        let child = self.launch()?;
        let cdp_url = self.wait_for_cdp().await?;
        Ok((child, cdp_url))
    }

    async fn wait_for_cdp(&self) -> Result<String> {
        let url = format!("http://127.0.0.1:{}/json/version", self.cdp_port);
        let client = http_client(Duration::from_secs(5));

        // Up to 10 seconds for the endpoint to come up
        for attempt in 0..20 {
            sleep(Duration::from_millis(500)).await;

            match client.get(&url).send().await {
                Ok(response) if response.status().is_success() => {
                    let json: serde_json::Value = response.json().await.map_err(|e| {
                        WebpilotError::CdpConnectionFailed(format!(
                            "Failed to parse CDP version response: {e}"
                        ))
                    })?;

                    if let Some(ws_url) =
                        json.get("webSocketDebuggerUrl").and_then(|v| v.as_str())
                    {
                        tracing::debug!("CDP ready at {ws_url}");
                        return Ok(ws_url.to_string());
                    }
                }
                Ok(_) => {
                    tracing::debug!("CDP not ready yet (attempt {})", attempt + 1);
                }
                Err(e) => {
                    tracing::debug!("CDP connection attempt {} failed: {e}", attempt + 1);
                }
            }
        }

        Err(WebpilotError::CdpConnectionFailed(
            "Timeout waiting for CDP to become ready".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_args_carry_the_fixed_launch_flags() {
        let launcher = BrowserLauncher {
            browser_info: BrowserInfo::new(BrowserType::Chrome, PathBuf::from("/usr/bin/true")),
            cdp_port: 9222,
            headless: false,
            user_data_dir: PathBuf::from("/tmp/webpilot-test-profile"),
        };

        let args = launcher.build_args();
        assert!(args.contains(&"--remote-debugging-port=9222".to_string()));
        assert!(args.contains(&"--no-first-run".to_string()));
        assert!(args.contains(&"--no-default-browser-check".to_string()));
        assert!(args.contains(&"--disable-blink-features=AutomationControlled".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--headless")));
    }

    #[test]
    fn headless_flag_is_opt_in() {
        let launcher = BrowserLauncher {
            browser_info: BrowserInfo::new(BrowserType::Chrome, PathBuf::from("/usr/bin/true")),
            cdp_port: 9400,
            headless: true,
            user_data_dir: PathBuf::from("/tmp/webpilot-test-profile"),
        };

        assert!(launcher.build_args().contains(&"--headless=new".to_string()));
    }

    #[test]
    fn from_config_rejects_missing_executable_override() {
        let mut config = Config::default();
        config.browser.executable = Some("/definitely/not/a/browser".to_string());

        let result = BrowserLauncher::from_config(&config);
        assert!(matches!(
            result,
            Err(WebpilotError::BrowserLaunchFailed(_))
        ));
    }
}

use std::fs;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chrono::Utc;
use colored::Colorize;
use tokio::time::timeout;

use crate::cli::Cli;
use crate::config::Config;
use crate::error::{Result, WebpilotError};
use crate::session::{SessionManager, SessionStatus};

const INTERACTION_TIMEOUT: Duration = Duration::from_secs(10);
const TITLE_TIMEOUT: Duration = Duration::from_secs(5);
const RENDER_SETTLE: Duration = Duration::from_secs(2);

/// Load configuration and build the session manager, folding in the global
/// CLI overrides.
fn session_manager(cli: &Cli) -> Result<(Config, SessionManager)> {
    let mut config = Config::load()?;
    apply_cli_overrides(&mut config, cli);
    let manager = SessionManager::new(config.clone());
    Ok((config, manager))
}

fn apply_cli_overrides(config: &mut Config, cli: &Cli) {
    if let Some(path) = &cli.browser_path {
        config.browser.executable = Some(path.clone());
    }
    if cli.headless {
        config.browser.headless = true;
    }
}

pub async fn open(cli: &Cli, url: &str) -> Result<()> {
    let (_, manager) = session_manager(cli)?;
    let session = manager.ensure_session(Some(url)).await?;

    let title = match timeout(TITLE_TIMEOUT, session.page.get_title()).await {
        Ok(Ok(Some(title))) => title,
        _ => String::new(),
    };

    if cli.json {
        println!(
            "{}",
            serde_json::json!({ "success": true, "url": url, "title": title })
        );
    } else {
        println!("Opened: {url}");
        println!("Title: {}", title.bold());
    }

    Ok(())
}

pub async fn screenshot(cli: &Cli, url: Option<&str>) -> Result<()> {
    let (config, manager) = session_manager(cli)?;
    let session = manager.ensure_session(url).await?;

    // Give a freshly loaded page a moment to render before capturing
    if url.is_some() {
        tokio::time::sleep(RENDER_SETTLE).await;
    }

    let bytes = session
        .page
        .screenshot(
            ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .full_page(false)
                .build(),
        )
        .await?;

    let dir = config.screenshot_dir();
    fs::create_dir_all(&dir)?;
    let path = dir.join(screenshot_filename(Utc::now().timestamp_millis()));
    fs::write(&path, bytes)?;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({ "success": true, "path": path.display().to_string() })
        );
    } else {
        println!("{} Screenshot saved: {}", "✓".green(), path.display());
    }

    Ok(())
}

fn screenshot_filename(millis: i64) -> String {
    format!("screenshot-{millis}.png")
}

pub async fn html(cli: &Cli, url: Option<&str>) -> Result<()> {
    let (_, manager) = session_manager(cli)?;
    let session = manager.ensure_session(url).await?;

    let html = session.page.content().await?;

    if cli.json {
        println!("{}", serde_json::json!({ "html": html }));
    } else {
        println!("{html}");
    }

    Ok(())
}

pub async fn text(cli: &Cli, url: Option<&str>) -> Result<()> {
    let (_, manager) = session_manager(cli)?;
    let session = manager.ensure_session(url).await?;

    let text = session
        .page
        .evaluate("document.body ? document.body.innerText : ''")
        .await?
        .into_value::<String>()
        .unwrap_or_default();

    if cli.json {
        println!("{}", serde_json::json!({ "text": text }));
    } else {
        println!("{text}");
    }

    Ok(())
}

pub async fn click(cli: &Cli, selector: &str) -> Result<()> {
    let (_, manager) = session_manager(cli)?;
    let session = manager.ensure_session(None).await?;

    let interaction = async {
        let element = session
            .page
            .find_element(selector)
            .await
            .map_err(|_| WebpilotError::ElementNotFound(selector.to_string()))?;
        element.click().await?;
        Ok::<_, WebpilotError>(())
    };

    match timeout(INTERACTION_TIMEOUT, interaction).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(WebpilotError::Timeout(format!(
                "Click on '{selector}' timed out after 10s"
            )));
        }
    }

    if cli.json {
        println!(
            "{}",
            serde_json::json!({ "success": true, "selector": selector })
        );
    } else {
        println!("{} Clicked: {}", "✓".green(), selector);
    }

    Ok(())
}

pub async fn type_text(cli: &Cli, selector: &str, text: &str) -> Result<()> {
    let (_, manager) = session_manager(cli)?;
    let session = manager.ensure_session(None).await?;

    let interaction = async {
        let element = session
            .page
            .find_element(selector)
            .await
            .map_err(|_| WebpilotError::ElementNotFound(selector.to_string()))?;

        // Click to focus, clear whatever is there, then type
        element.click().await?;
        session
            .page
            .evaluate(
                "if (document.activeElement && 'value' in document.activeElement) \
                 { document.activeElement.value = ''; }",
            )
            .await?;
        element.type_str(text).await?;
        Ok::<_, WebpilotError>(())
    };

    match timeout(INTERACTION_TIMEOUT, interaction).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(WebpilotError::Timeout(format!(
                "Typing into '{selector}' timed out after 10s"
            )));
        }
    }

    if cli.json {
        println!(
            "{}",
            serde_json::json!({ "success": true, "selector": selector, "text": text })
        );
    } else {
        println!("{} Typed into {}: {}", "✓".green(), selector, text);
    }

    Ok(())
}

pub async fn eval(cli: &Cli, code: &str) -> Result<()> {
    let (_, manager) = session_manager(cli)?;
    let session = manager.ensure_session(None).await?;

    let result = session
        .page
        .evaluate(code)
        .await
        .map_err(|e| WebpilotError::JavaScriptError(e.to_string()))?;
    let value = result.value().cloned().unwrap_or(serde_json::Value::Null);

    println!("{}", serde_json::to_string_pretty(&value)?);

    Ok(())
}

pub async fn close(cli: &Cli) -> Result<()> {
    let (_, manager) = session_manager(cli)?;
    let closed = manager.close_session().await?;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({ "success": true, "closed": closed })
        );
    } else if closed {
        println!("{} Browser closed.", "✓".green());
    } else {
        println!("No browser running.");
    }

    Ok(())
}

pub async fn status(cli: &Cli) -> Result<()> {
    let (_, manager) = session_manager(cli)?;

    match manager.status().await {
        SessionStatus::Running { handle, pages } => {
            if cli.json {
                let pages_json: Vec<_> = pages
                    .iter()
                    .map(|p| serde_json::json!({ "id": p.id, "title": p.title, "url": p.url }))
                    .collect();
                println!(
                    "{}",
                    serde_json::json!({
                        "running": true,
                        "cdp_port": handle.cdp_port,
                        "cdp_url": handle.cdp_url,
                        "pid": handle.pid,
                        "pages": pages_json,
                    })
                );
            } else {
                println!("{} Browser running. Pages: {}", "✓".green(), pages.len());
                for page in &pages {
                    println!(
                        "  - {} {}",
                        page.title.bold(),
                        format!("({})", page.url).dimmed()
                    );
                }
            }
        }
        SessionStatus::Stale => {
            if cli.json {
                println!("{}", serde_json::json!({ "running": false, "stale": true }));
            } else {
                println!("{} Browser state exists but not reachable.", "!".yellow());
            }
        }
        SessionStatus::NotRunning => {
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({ "running": false, "stale": false })
                );
            } else {
                println!("No browser running.");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Commands;

    fn test_cli(browser_path: Option<&str>, headless: bool) -> Cli {
        Cli {
            browser_path: browser_path.map(str::to_string),
            headless,
            json: false,
            verbose: false,
            command: Commands::Status,
        }
    }

    #[test]
    fn cli_browser_path_overrides_config_executable() {
        let mut config = Config::default();
        let cli = test_cli(Some("/opt/chrome/chrome"), false);

        apply_cli_overrides(&mut config, &cli);
        assert_eq!(
            config.browser.executable.as_deref(),
            Some("/opt/chrome/chrome")
        );
    }

    #[test]
    fn cli_headless_flag_wins_over_config() {
        let mut config = Config::default();
        let cli = test_cli(None, true);

        apply_cli_overrides(&mut config, &cli);
        assert!(config.browser.headless);
    }

    #[test]
    fn absent_cli_overrides_leave_config_untouched() {
        let mut config = Config::default();
        config.browser.executable = Some("/usr/bin/chromium".to_string());
        let cli = test_cli(None, false);

        apply_cli_overrides(&mut config, &cli);
        assert_eq!(
            config.browser.executable.as_deref(),
            Some("/usr/bin/chromium")
        );
        assert!(!config.browser.headless);
    }

    #[test]
    fn screenshot_filenames_are_timestamped_pngs() {
        assert_eq!(
            screenshot_filename(1754300000000),
            "screenshot-1754300000000.png"
        );
    }
}

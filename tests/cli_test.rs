//! CLI argument parsing tests
//!
//! These verify the argument surface only: required arguments are enforced
//! with a usage error and exit code 1, and no browser is ever touched.

use assert_cmd::Command;
use predicates::prelude::*;

fn webpilot() -> Command {
    Command::cargo_bin("webpilot").unwrap()
}

mod help {
    use super::*;

    #[test]
    fn shows_help() {
        webpilot()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("webpilot"))
            .stdout(predicate::str::contains("drive a running browser"));
    }

    #[test]
    fn shows_version() {
        webpilot()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("webpilot"));
    }

    #[test]
    fn unknown_command_fails() {
        webpilot().arg("teleport").assert().failure();
    }

    #[test]
    fn missing_command_fails() {
        webpilot()
            .assert()
            .failure()
            .stderr(predicate::str::contains("Usage"));
    }
}

mod required_args {
    use super::*;

    #[test]
    fn open_requires_url() {
        webpilot()
            .arg("open")
            .assert()
            .failure()
            .stderr(predicate::str::contains("URL"));
    }

    #[test]
    fn click_requires_selector() {
        webpilot()
            .arg("click")
            .assert()
            .failure()
            .stderr(predicate::str::contains("SELECTOR"));
    }

    #[test]
    fn type_requires_selector_and_text() {
        webpilot()
            .arg("type")
            .assert()
            .failure()
            .stderr(predicate::str::contains("SELECTOR"));

        webpilot()
            .args(["type", "#search"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("TEXT"));
    }

    #[test]
    fn eval_requires_code() {
        webpilot()
            .arg("eval")
            .assert()
            .failure()
            .stderr(predicate::str::contains("CODE"));
    }

    #[test]
    fn screenshot_url_is_optional() {
        webpilot()
            .args(["screenshot", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[URL]"));
    }

    #[test]
    fn html_url_is_optional() {
        webpilot()
            .args(["html", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[URL]"));
    }

    #[test]
    fn text_url_is_optional() {
        webpilot()
            .args(["text", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[URL]"));
    }
}

mod config_command {
    use super::*;

    #[test]
    fn config_requires_subcommand() {
        webpilot()
            .arg("config")
            .assert()
            .failure()
            .stderr(predicate::str::contains("subcommand"));
    }

    #[test]
    fn config_path_prints_a_toml_path() {
        webpilot()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_prints_context_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        webpilot()
            .env("HOME", tmp.path())
            .env("XDG_CONFIG_HOME", tmp.path().join("config"))
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("viewport_width"))
            .stdout(predicate::str::contains("zh-CN"))
            .stdout(predicate::str::contains("Asia/Shanghai"));
    }
}

mod global_flags {
    use super::*;

    #[test]
    fn json_flag_available_globally() {
        webpilot().args(["--json", "config", "path"]).assert().success();
    }

    #[test]
    fn verbose_flag_available_globally() {
        webpilot()
            .args(["--verbose", "config", "path"])
            .assert()
            .success();
    }

    #[test]
    fn headless_flag_available_globally() {
        webpilot()
            .args(["--headless", "config", "path"])
            .assert()
            .success();
    }

    #[test]
    fn browser_path_flag_available_globally() {
        webpilot()
            .args(["--browser-path", "/usr/bin/chromium", "config", "path"])
            .assert()
            .success();
    }
}

mod status_command {
    use super::*;

    // Point HOME at an empty directory so the session slot is guaranteed
    // absent; status must not launch anything.
    #[test]
    fn status_without_session_reports_no_browser() {
        let tmp = tempfile::tempdir().unwrap();
        webpilot()
            .env("HOME", tmp.path())
            .env("XDG_CONFIG_HOME", tmp.path().join("config"))
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("No browser running."));
    }

    #[test]
    fn status_with_unreachable_handle_reports_stale_state() {
        let tmp = tempfile::tempdir().unwrap();
        let slot = tmp.path().join(".webpilot");
        std::fs::create_dir_all(&slot).unwrap();
        std::fs::write(
            slot.join("session.json"),
            r#"{"cdp_port":19999,"cdp_url":"ws://127.0.0.1:19999/devtools/browser/defunct","pid":null}"#,
        )
        .unwrap();

        webpilot()
            .env("HOME", tmp.path())
            .env("XDG_CONFIG_HOME", tmp.path().join("config"))
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("not reachable"));
    }

    #[test]
    fn status_with_malformed_handle_reports_no_browser() {
        let tmp = tempfile::tempdir().unwrap();
        let slot = tmp.path().join(".webpilot");
        std::fs::create_dir_all(&slot).unwrap();
        std::fs::write(slot.join("session.json"), "{not json").unwrap();

        webpilot()
            .env("HOME", tmp.path())
            .env("XDG_CONFIG_HOME", tmp.path().join("config"))
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("No browser running."));
    }
}

mod close_command {
    use super::*;

    #[test]
    fn close_without_session_is_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        webpilot()
            .env("HOME", tmp.path())
            .env("XDG_CONFIG_HOME", tmp.path().join("config"))
            .arg("close")
            .assert()
            .success()
            .stdout(predicate::str::contains("No browser running."));
    }

    #[test]
    fn close_with_unreachable_session_clears_the_handle() {
        let tmp = tempfile::tempdir().unwrap();
        let slot = tmp.path().join(".webpilot");
        std::fs::create_dir_all(&slot).unwrap();
        let handle_path = slot.join("session.json");
        std::fs::write(
            &handle_path,
            r#"{"cdp_port":19999,"cdp_url":"ws://127.0.0.1:19999/devtools/browser/defunct","pid":null}"#,
        )
        .unwrap();

        webpilot()
            .env("HOME", tmp.path())
            .env("XDG_CONFIG_HOME", tmp.path().join("config"))
            .arg("close")
            .assert()
            .success();

        assert!(!handle_path.exists());
    }
}

mod discovery;
mod launcher;

pub use discovery::{discover_browser, BrowserInfo, BrowserType};
pub use launcher::BrowserLauncher;

use std::time::Duration;

/// HTTP client for the local CDP discovery endpoints. Proxies are bypassed:
/// these requests must hit the loopback interface directly.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

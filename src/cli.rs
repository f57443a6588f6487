use clap::{Parser, Subcommand};

use crate::commands;
use crate::error::Result;

/// Webpilot CLI - drive a running browser over CDP
#[derive(Parser)]
#[command(name = "webpilot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Browser executable path (overrides auto-discovery)
    #[arg(long, env = "WEBPILOT_BROWSER_PATH", global = true)]
    pub browser_path: Option<String>,

    /// Launch a fresh browser in headless mode
    #[arg(long, env = "WEBPILOT_HEADLESS", global = true)]
    pub headless: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open a URL, reusing the running browser when one is reachable
    Open {
        /// URL to open
        url: String,
    },

    /// Take a screenshot of the current page
    Screenshot {
        /// URL to navigate to before capturing
        url: Option<String>,
    },

    /// Print the page HTML
    Html {
        /// URL to navigate to first
        url: Option<String>,
    },

    /// Print the visible text content of the page
    Text {
        /// URL to navigate to first
        url: Option<String>,
    },

    /// Click an element
    Click {
        /// CSS selector
        selector: String,
    },

    /// Clear an input element and type text into it
    Type {
        /// CSS selector
        selector: String,
        /// Text to type
        text: String,
    },

    /// Execute JavaScript on the current page
    Eval {
        /// JavaScript code to execute
        code: String,
    },

    /// Close the browser and discard the session
    Close,

    /// Show session status and open pages
    Status,

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}

impl Cli {
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Open { url } => commands::browser::open(self, url).await,
            Commands::Screenshot { url } => {
                commands::browser::screenshot(self, url.as_deref()).await
            }
            Commands::Html { url } => commands::browser::html(self, url.as_deref()).await,
            Commands::Text { url } => commands::browser::text(self, url.as_deref()).await,
            Commands::Click { selector } => commands::browser::click(self, selector).await,
            Commands::Type { selector, text } => {
                commands::browser::type_text(self, selector, text).await
            }
            Commands::Eval { code } => commands::browser::eval(self, code).await,
            Commands::Close => commands::browser::close(self).await,
            Commands::Status => commands::browser::status(self).await,
            Commands::Config { command } => commands::config::run(self, command).await,
        }
    }
}

//! Command-line definition and entry point.

use std::io::{BufRead, IsTerminal};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::Input;
use redhelm_core::{Assistant, Config, ConfigOverrides, Provider};
use tracing::debug;

use crate::app::{AppContext, OutputFormat};
use crate::output::Renderer;

const QUERY_PROMPT: &str = "How can I help you";

/// redhelm - ask a language model, get a structured answer
#[derive(Parser, Debug)]
#[command(name = "redhelm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Question to ask (prompted for when omitted)
    pub query: Option<String>,

    /// Model provider: gemini or anthropic [env: REDHELM_PROVIDER]
    #[arg(long)]
    pub provider: Option<Provider>,

    /// Model identifier [env: REDHELM_MODEL]
    #[arg(long)]
    pub model: Option<String>,

    /// Override the provider API base URL [env: REDHELM_BASE_URL]
    #[arg(long)]
    pub base_url: Option<String>,

    /// Replace the built-in persona with the contents of a file [env: REDHELM_PERSONA_FILE]
    #[arg(long)]
    pub persona_file: Option<PathBuf>,

    /// Per-request timeout in seconds [env: REDHELM_TIMEOUT_SECS]
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Total attempts on transient failures [env: REDHELM_MAX_ATTEMPTS]
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Print the validated reply as JSON instead of panels
    #[arg(long)]
    pub json: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Also append logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = Config::from_env(self.overrides())?;
        debug!(?config, "Resolved configuration");

        let color = self.use_color();
        if !color {
            colored::control::set_override(false);
        }

        let format = if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Panels
        };
        let ctx = AppContext::new(
            Assistant::from_config(&config),
            Renderer::for_terminal(color),
            format,
        );

        let query = match self.query {
            Some(query) => query,
            None => read_query()?,
        };

        let stdout = std::io::stdout();
        ctx.run(&query, &mut stdout.lock()).await
    }

    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            provider: self.provider,
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            timeout_secs: self.timeout_secs,
            max_attempts: self.max_attempts,
            persona_file: self.persona_file.clone(),
        }
    }

    fn use_color(&self) -> bool {
        !self.no_color
            && std::env::var_os("NO_COLOR").is_none()
            && std::io::stdout().is_terminal()
    }
}

/// Read the query interactively, or a single line when stdin is not a terminal.
fn read_query() -> Result<String> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Input::<String>::new()
            .with_prompt(QUERY_PROMPT)
            .allow_empty(true)
            .interact_text()
            .context("Failed to read query");
    }

    let mut line = String::new();
    stdin
        .lock()
        .read_line(&mut line)
        .context("Failed to read query from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

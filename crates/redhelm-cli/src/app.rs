//! Application context: everything one run needs, built once in `main`.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use redhelm_core::Assistant;

use crate::output::{layout, Renderer};

/// How the validated reply is written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Panels,
    Json,
}

pub struct AppContext {
    assistant: Assistant,
    renderer: Renderer,
    format: OutputFormat,
    show_spinner: bool,
}

impl AppContext {
    pub fn new(assistant: Assistant, renderer: Renderer, format: OutputFormat) -> Self {
        Self {
            assistant,
            renderer,
            format,
            show_spinner: true,
        }
    }

    /// Suppress the "thinking" spinner.
    pub fn without_spinner(mut self) -> Self {
        self.show_spinner = false;
        self
    }

    /// Ask one question and write the answer to `out`.
    pub async fn run(&self, query: &str, out: &mut impl Write) -> Result<()> {
        let spinner = self.show_spinner.then(thinking_spinner);
        let result = self.assistant.ask(query).await;
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }

        let reply = result.with_context(|| {
            format!("No usable answer from {}", self.assistant.model_name())
        })?;

        match self.format {
            OutputFormat::Panels => self
                .renderer
                .render(&layout(&reply), out)
                .context("Failed to write output")?,
            OutputFormat::Json => {
                writeln!(out, "{}", serde_json::to_string_pretty(&reply)?)
                    .context("Failed to write output")?;
            }
        }
        Ok(())
    }
}

/// Spinner shown on stderr while waiting for the model.
fn thinking_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_strings(&[
            "▰▱▱▱▱▱▱",
            "▰▰▱▱▱▱▱",
            "▰▰▰▱▱▱▱",
            "▰▰▰▰▱▱▱",
            "▰▰▰▰▰▱▱",
            "▰▰▰▰▰▰▱",
            "▰▰▰▰▰▰▰",
            "▱▱▱▱▱▱▱",
        ])
        .template("{spinner:.green} {msg:.green.bold}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message("Thinking hard...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use redhelm_core::{ChatMessage, ChatModel, PromptTemplate, RedhelmError, RedhelmResult};

    struct CannedModel(Option<&'static str>);

    #[async_trait]
    impl ChatModel for CannedModel {
        fn name(&self) -> String {
            "canned/test".to_string()
        }

        async fn complete(&self, _messages: &[ChatMessage]) -> RedhelmResult<String> {
            self.0
                .map(String::from)
                .ok_or(RedhelmError::Api {
                    status: 401,
                    body: "bad key".to_string(),
                })
        }
    }

    const RECON: &str = r#"{"title":"Recon","content":"Run an nmap scan","summary":"Initial recon step","sources":"MITRE T1595","tools_used":["nmap"],"commands":"nmap -sV example.com"}"#;

    fn context(answer: Option<&'static str>, format: OutputFormat) -> AppContext {
        let model = Box::new(CannedModel(answer));
        let assistant = Assistant::new(model, PromptTemplate::default());
        AppContext::new(assistant, Renderer::new(60, false), format).without_spinner()
    }

    async fn run(ctx: &AppContext, query: &str) -> Result<String> {
        let mut out = Vec::new();
        ctx.run(query, &mut out).await?;
        Ok(String::from_utf8(out)?)
    }

    #[tokio::test]
    async fn test_scan_query_end_to_end() {
        let ctx = context(Some(RECON), OutputFormat::Panels);
        let text = run(&ctx, "scan example.com").await.unwrap();

        let positions: Vec<usize> = [
            " Recon ",
            " Content ",
            "Run an nmap scan",
            " Commands ",
            "nmap -sV example.com",
            " Tools Used ",
            "│ nmap ",
            " Sources ",
            "1. MITRE T1595",
            " Summary ",
            "Initial recon step",
        ]
        .iter()
        .map(|needle| {
            text.find(needle)
                .unwrap_or_else(|| panic!("{needle:?} missing in:\n{text}"))
        })
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "out of order: {positions:?}");
    }

    #[tokio::test]
    async fn test_json_output() {
        let ctx = context(Some(RECON), OutputFormat::Json);
        let text = run(&ctx, "scan example.com").await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["title"], "Recon");
        assert_eq!(value["tools_used"][0], "nmap");
    }

    #[tokio::test]
    async fn test_schema_violation_aborts_without_output() {
        let ctx = context(Some(r#"{"title":"Recon"}"#), OutputFormat::Panels);
        let mut out = Vec::new();
        let err = ctx.run("q", &mut out).await.unwrap_err();
        assert!(out.is_empty());
        assert!(format!("{err:#}").contains("schema"));
    }

    #[tokio::test]
    async fn test_provider_error_is_reported() {
        let ctx = context(None, OutputFormat::Panels);
        let err = run(&ctx, "q").await.unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("canned/test"));
        assert!(message.contains("401"));
    }
}

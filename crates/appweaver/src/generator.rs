//! Pluggable generation backends.
//!
//! A [`Generator`] turns a [`GenerationRequest`] into files. Two
//! implementations ship:
//!
//! | Generator | When |
//! |-----------|------|
//! | [`LlmGenerator`] | An OpenRouter key is configured; drives the [`Harness`] |
//! | [`TemplateGenerator`] | No key; emits a static page embedding the prompt |
//!
//! Both pick create or update mode from whether the request carries prior
//! files.

use crate::agent::config::{
    DEFAULT_CREATE_MAX_TOKENS, DEFAULT_MAX_ROUNDS, DEFAULT_UPDATE_MAX_TOKENS, HarnessConfig,
};
use crate::agent::events::LoggingHandler;
use crate::agent::harness::Harness;
use crate::agent::prompt::{create_prompt, update_prompt, update_user_text};
use crate::api::retry::RetryConfig;
use crate::api::tracing::CostTracker;
use crate::tools::{ToolSet, WriteFile};
use crate::vision::{Attachment, ContentBuilder, DEFAULT_MAX_IMAGE_BYTES};
use crate::{ChatBackend, DEFAULT_MODEL, FileSet, GenerationError};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::info;

/// Boxed future returned by [`Generator::generate`].
pub type GenerateFuture<'a> =
    Pin<Box<dyn Future<Output = Result<GenerationOutput, GenerationError>> + Send + 'a>>;

/// Something that can produce a project's files from a prompt.
pub trait Generator: Send + Sync {
    /// Short identifier, reported by the health endpoint.
    fn name(&self) -> &str;

    fn generate(&self, request: GenerationRequest) -> GenerateFuture<'_>;
}

/// Input to one generation call.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub prompt: String,
    pub attachments: Vec<Attachment>,
    /// Files to iterate on; empty for a fresh project.
    pub prior_files: FileSet,
}

impl GenerationRequest {
    /// A create-mode request.
    pub fn create(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// An update-mode request over `prior_files`.
    pub fn iterate(prompt: impl Into<String>, prior_files: FileSet) -> Self {
        Self {
            prompt: prompt.into(),
            attachments: Vec::new(),
            prior_files,
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn is_update(&self) -> bool {
        !self.prior_files.is_empty()
    }
}

/// Files plus what producing them cost.
#[derive(Debug, Clone, Default)]
pub struct GenerationOutput {
    pub files: FileSet,
    pub usage: CostTracker,
}

/// Settings for [`LlmGenerator`].
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub model: String,
    pub max_rounds: u32,
    pub create_max_tokens: u32,
    pub update_max_tokens: u32,
    pub temperature: f32,
    pub retry: RetryConfig,
    /// Per-image ceiling before normalization.
    pub max_image_bytes: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            create_max_tokens: DEFAULT_CREATE_MAX_TOKENS,
            update_max_tokens: DEFAULT_UPDATE_MAX_TOKENS,
            temperature: 0.7,
            retry: RetryConfig::with_retries(2),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

impl GenerationConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_create_max_tokens(mut self, tokens: u32) -> Self {
        self.create_max_tokens = tokens;
        self
    }

    pub fn with_update_max_tokens(mut self, tokens: u32) -> Self {
        self.update_max_tokens = tokens;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retry = RetryConfig::with_retries(retries);
        self
    }

    pub fn with_max_image_bytes(mut self, max: usize) -> Self {
        self.max_image_bytes = max;
        self
    }

    /// Harness settings for one run in the given mode.
    pub fn harness_config(&self, update: bool) -> HarnessConfig {
        HarnessConfig::new(self.model.clone())
            .with_max_rounds(self.max_rounds)
            .with_max_tokens(if update {
                self.update_max_tokens
            } else {
                self.create_max_tokens
            })
            .with_temperature(self.temperature)
            .with_retry(self.retry.clone())
    }
}

// ── LlmGenerator ───────────────────────────────────────────────────

/// Generates files by running the [`Harness`] against a [`ChatBackend`].
pub struct LlmGenerator {
    backend: Arc<dyn ChatBackend>,
    tools: ToolSet,
    config: GenerationConfig,
    content: ContentBuilder,
}

impl LlmGenerator {
    pub fn new(backend: Arc<dyn ChatBackend>, config: GenerationConfig) -> Self {
        let content = ContentBuilder::new().with_max_image_bytes(config.max_image_bytes);
        Self {
            backend,
            tools: ToolSet::new().with(WriteFile),
            config,
            content,
        }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }
}

impl Generator for LlmGenerator {
    fn name(&self) -> &str {
        "llm"
    }

    fn generate(&self, request: GenerationRequest) -> GenerateFuture<'_> {
        Box::pin(async move {
            let update = request.is_update();
            let (system_prompt, user_text) = if update {
                (
                    update_prompt(),
                    update_user_text(&request.prior_files, &request.prompt),
                )
            } else {
                (create_prompt(), request.prompt.clone())
            };
            let attachment_count = request.attachments.len();
            let content = self.content.clone();
            let attachments = request.attachments;
            // Image decoding and JPEG encoding stay off the async workers.
            let blocks =
                tokio::task::spawn_blocking(move || content.build(&user_text, &attachments))
                    .await
                    .map_err(|e| GenerationError::Attachments(e.to_string()))?;
            info!(
                "Generating ({} mode): {attachment_count} attachment(s), {} image block(s)",
                if update { "update" } else { "create" },
                blocks.len().saturating_sub(1)
            );

            let result = Harness::new(
                self.backend.as_ref(),
                &self.tools,
                self.config.harness_config(update),
            )
            .with_event_handler(&LoggingHandler)
            .run(&system_prompt, blocks, request.prior_files)
            .await?;

            Ok(GenerationOutput {
                files: result.files,
                usage: result.usage,
            })
        })
    }
}

// ── TemplateGenerator ──────────────────────────────────────────────

/// Offline generator: a single styled `index.html` that echoes the prompt.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateGenerator;

impl TemplateGenerator {
    fn render_page(prompt: &str, attachments: &[Attachment]) -> String {
        let title: String = prompt
            .lines()
            .next()
            .unwrap_or_default()
            .chars()
            .take(60)
            .collect();
        let title = if title.trim().is_empty() {
            "Untitled app".to_string()
        } else {
            title
        };
        let images: String = attachments
            .iter()
            .filter(|a| a.is_image())
            .filter_map(|a| {
                a.remote_url.as_deref().map(|url| {
                    format!(
                        "    <img src=\"{}\" alt=\"{}\">\n",
                        escape_html(url),
                        escape_html(&a.name)
                    )
                })
            })
            .collect();

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{title}</title>
  <style>
    body {{ margin: 0; min-height: 100vh; display: grid; place-items: center;
      background: #0f172a; color: #e2e8f0;
      font: 16px/1.6 -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; }}
    main {{ max-width: 640px; margin: 32px; padding: 32px; border-radius: 12px;
      background: #1e293b; border: 1px solid #334155; }}
    h1 {{ margin: 0 0 16px; font-size: 28px; letter-spacing: -0.02em; }}
    .prompt {{ white-space: pre-wrap; }}
    img {{ max-width: 100%; border-radius: 8px; margin-top: 16px; }}
    .note {{ margin-top: 24px; color: #94a3b8; font-size: 14px; }}
  </style>
</head>
<body>
  <main>
    <h1>{title}</h1>
    <p class="prompt">{prompt}</p>
{images}    <p class="note">Generated from a static template. Set OPENROUTER_KEY to generate full applications.</p>
  </main>
</body>
</html>
"#,
            title = escape_html(&title),
            prompt = escape_html(prompt),
        )
    }
}

impl Generator for TemplateGenerator {
    fn name(&self) -> &str {
        "template"
    }

    fn generate(&self, request: GenerationRequest) -> GenerateFuture<'_> {
        Box::pin(async move {
            let mut files = request.prior_files;
            let page = match files.get("index.html") {
                Some(existing) => format!(
                    "{existing}\n<!-- Requested change: {} -->\n",
                    escape_comment(&request.prompt)
                ),
                None => Self::render_page(&request.prompt, &request.attachments),
            };
            files.insert("index.html", page);
            Ok(GenerationOutput {
                files,
                usage: CostTracker::new(),
            })
        })
    }
}

/// Escape text for an HTML element body or attribute value.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Make text safe inside `<!-- ... -->`.
fn escape_comment(text: &str) -> String {
    let mut out = text.replace('>', "&gt;");
    while out.contains("--") {
        out = out.replace("--", "- -");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedBackend, text_reply, tool_reply, write_call};

    fn llm(backend: Arc<ScriptedBackend>) -> LlmGenerator {
        LlmGenerator::new(backend, GenerationConfig::default().with_retries(0))
    }

    #[tokio::test]
    async fn create_mode_uses_design_brief_and_create_budget() {
        let backend = Arc::new(ScriptedBackend::replies(vec![
            tool_reply(vec![write_call("c1", "index.html", "<html></html>")]),
            text_reply("done"),
        ]));
        let output = llm(backend.clone())
            .generate(GenerationRequest::create("a countdown timer"))
            .await
            .unwrap();

        assert_eq!(output.files.get("index.html"), Some("<html></html>"));
        assert_eq!(output.usage.prompt_tokens, 100);

        let first = &backend.requests()[0];
        assert_eq!(first.max_tokens, DEFAULT_CREATE_MAX_TOKENS);
        let system = first.messages[0].text().unwrap();
        assert!(system.contains("## Palette"));
        assert_eq!(first.messages[1].text().as_deref(), Some("a countdown timer"));
    }

    #[tokio::test]
    async fn update_mode_lists_files_and_merges() {
        let backend = Arc::new(ScriptedBackend::replies(vec![
            tool_reply(vec![write_call("c1", "style.css", "body{color:blue}")]),
            text_reply("done"),
        ]));
        let prior: FileSet = [("index.html", "OLD")].into_iter().collect();
        let output = llm(backend.clone())
            .generate(GenerationRequest::iterate("make it blue", prior))
            .await
            .unwrap();

        let paths: Vec<&str> = output.files.paths().collect();
        assert_eq!(paths, vec!["index.html", "style.css"]);
        assert_eq!(output.files.get("index.html"), Some("OLD"));

        let first = &backend.requests()[0];
        assert_eq!(first.max_tokens, DEFAULT_UPDATE_MAX_TOKENS);
        assert!(first.messages[0].text().unwrap().contains("smallest change"));
        let user = first.messages[1].text().unwrap();
        assert!(user.starts_with("Current project files:"));
        assert!(user.contains("--- FILE: index.html ---\nOLD"));
        assert!(user.ends_with("make it blue"));
    }

    #[tokio::test]
    async fn update_with_no_changes_returns_prior() {
        let backend = Arc::new(ScriptedBackend::replies(vec![text_reply("already fine")]));
        let prior: FileSet = [("index.html", "OLD")].into_iter().collect();
        let output = llm(backend)
            .generate(GenerationRequest::iterate("tweak", prior.clone()))
            .await
            .unwrap();
        assert_eq!(output.files, prior);
    }

    #[tokio::test]
    async fn template_create_embeds_escaped_prompt() {
        let output = TemplateGenerator
            .generate(GenerationRequest::create("<script>alert(1)</script> & timer"))
            .await
            .unwrap();
        let page = output.files.get("index.html").unwrap();
        assert!(page.contains("&lt;script&gt;alert(1)&lt;/script&gt; &amp; timer"));
        assert!(!page.contains("<script>alert"));
        assert_eq!(output.files.len(), 1);
        assert_eq!(output.usage.total_tokens(), 0);
    }

    #[tokio::test]
    async fn template_always_produces_index_html() {
        for request in [
            GenerationRequest::create(""),
            GenerationRequest::iterate("add footer", [("app.js", "x")].into_iter().collect()),
        ] {
            let output = TemplateGenerator.generate(request).await.unwrap();
            assert!(output.files.contains("index.html"));
        }
    }

    #[tokio::test]
    async fn template_update_appends_comment() {
        let prior: FileSet = [("index.html", "<p>hi</p>"), ("app.js", "x")]
            .into_iter()
            .collect();
        let output = TemplateGenerator
            .generate(GenerationRequest::iterate("dark mode --now", prior))
            .await
            .unwrap();
        let page = output.files.get("index.html").unwrap();
        assert!(page.starts_with("<p>hi</p>"));
        assert!(page.contains("<!-- Requested change: dark mode - -now -->"));
        assert_eq!(output.files.get("app.js"), Some("x"));
    }

    #[test]
    fn comment_text_never_contains_double_dash() {
        assert_eq!(escape_comment("a---b"), "a- - -b");
        assert_eq!(escape_comment("----"), "- - - -");
        assert_eq!(escape_comment("x -->"), "x - -&gt;");
        assert!(!escape_comment("-- --- -----").contains("--"));
    }

    #[tokio::test]
    async fn template_renders_hosted_images() {
        let request = GenerationRequest::create("gallery").with_attachments(vec![
            Attachment::inline("cat.png", "image/png", "").with_remote_url("https://x/cat.png"),
        ]);
        let output = TemplateGenerator.generate(request).await.unwrap();
        assert!(
            output
                .files
                .get("index.html")
                .unwrap()
                .contains(r#"<img src="https://x/cat.png" alt="cat.png">"#)
        );
    }

    #[test]
    fn harness_config_picks_budget_by_mode() {
        let config = GenerationConfig::default()
            .with_create_max_tokens(1000)
            .with_update_max_tokens(2000)
            .with_max_rounds(4);
        assert_eq!(config.harness_config(false).max_tokens, 1000);
        assert_eq!(config.harness_config(true).max_tokens, 2000);
        assert_eq!(config.harness_config(true).max_rounds, 4);
    }
}

//! System prompts for create and update mode.
//!
//! [`SystemPromptBuilder`] assembles `## Section` blocks; [`create_prompt`]
//! and [`update_prompt`] use it to produce the two fixed briefs the harness
//! runs with. [`update_user_text`] prefixes an iteration request with the
//! full listing of the existing files.

use crate::FileSet;
use crate::tools::WRITE_FILE;

/// Builder for multi-section system prompts.
///
/// Sections are joined with blank lines. Empty sections are skipped.
///
/// ```
/// use appweaver::agent::prompt::SystemPromptBuilder;
///
/// let prompt = SystemPromptBuilder::new("You build web apps.")
///     .section("Output", "Use write_file.")
///     .section("Skipped", "")
///     .build();
///
/// assert!(prompt.contains("## Output"));
/// assert!(!prompt.contains("## Skipped"));
/// ```
pub struct SystemPromptBuilder {
    sections: Vec<String>,
}

impl SystemPromptBuilder {
    /// Start with a preamble, included as-is.
    pub fn new(preamble: impl Into<String>) -> Self {
        Self {
            sections: vec![preamble.into()],
        }
    }

    /// Append a named section. Skipped if `content` is empty.
    pub fn section(mut self, heading: &str, content: impl Into<String>) -> Self {
        let content = content.into();
        if !content.is_empty() {
            self.sections.push(format!("## {heading}\n\n{content}"));
        }
        self
    }

    pub fn build(self) -> String {
        self.sections.join("\n\n")
    }
}

const DESIGN_PALETTE: &str = "\
- Background: #0f172a (slate-900) for dark surfaces, #f8fafc (slate-50) for light ones
- Surface: #ffffff with a 1px #e2e8f0 border
- Primary: #6366f1 (indigo-500); hover #4f46e5
- Accent: #14b8a6 (teal-500) for highlights and success states
- Text: #0f172a on light surfaces, #e2e8f0 on dark ones; muted text #64748b
- Danger: #ef4444";

const DESIGN_SPACING: &str = "\
Use an 8px spacing grid: 4, 8, 16, 24, 32, 48, 64. Cards get 24px padding and \
12px border radius. Keep content within a 1100px max-width container, centered.";

const DESIGN_TYPOGRAPHY: &str = "\
Use the system font stack (-apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, \
sans-serif). Body 16px/1.6, headings bold with tight letter-spacing: h1 40px, h2 \
28px, h3 20px. Use tabular numerals for timers, prices and scores.";

/// System prompt for generating a new application from scratch.
pub fn create_prompt() -> String {
    SystemPromptBuilder::new(
        "You are an expert front-end engineer. You turn a short product \
         description into a complete, polished, self-contained web application \
         built with plain HTML, CSS and JavaScript. No build step, no external \
         frameworks, no CDN links unless the user asks for them.",
    )
    .section(
        "Output",
        format!(
            "Deliver every file by calling the `{WRITE_FILE}` tool once per file with \
             a relative `path` and the complete `content`. Always include \
             `index.html` as the entry point. Split styles and scripts into \
             separate files when they grow beyond a screenful. When every file is \
             written, stop calling tools and reply with one short sentence \
             summarizing what you built."
        ),
    )
    .section("Palette", DESIGN_PALETTE)
    .section("Spacing", DESIGN_SPACING)
    .section("Typography", DESIGN_TYPOGRAPHY)
    .section(
        "Quality bar",
        "The app must work when index.html is opened directly. Handle empty and \
         error states, make interactive elements keyboard accessible, and make the \
         layout responsive down to 360px wide. If the user attached images, use \
         them as design references or embed them as instructed.",
    )
    .build()
}

/// System prompt for surgical edits to an existing application.
pub fn update_prompt() -> String {
    SystemPromptBuilder::new(
        "You are an expert front-end engineer maintaining an existing web \
         application. The user message starts with the full content of every file \
         in the project, followed by the change they want.",
    )
    .section(
        "Rules",
        format!(
            "- Make the smallest change that fully satisfies the request.\n\
             - Only call `{WRITE_FILE}` for files you actually change or add; \
             untouched files are kept as they are.\n\
             - Each `{WRITE_FILE}` call must contain the complete new content of that \
             file, never a diff or a fragment.\n\
             - Preserve the existing structure, naming, visual style and behavior \
             unless the request says otherwise.\n\
             - When done, stop calling tools and reply with one short sentence \
             describing the change."
        ),
    )
    .build()
}

/// User-turn text for update mode: the current files, then the request.
pub fn update_user_text(files: &FileSet, request: &str) -> String {
    format!(
        "Current project files:\n\n{}Requested change:\n{request}",
        files.render_listing()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_skips_empty_sections() {
        let prompt = SystemPromptBuilder::new("Preamble")
            .section("Empty", "")
            .section("Kept", "body")
            .build();
        assert_eq!(prompt, "Preamble\n\n## Kept\n\nbody");
    }

    #[test]
    fn create_prompt_carries_design_system() {
        let prompt = create_prompt();
        assert!(prompt.contains("## Palette"));
        assert!(prompt.contains("8px spacing grid"));
        assert!(prompt.contains("## Typography"));
        assert!(prompt.contains("write_file"));
    }

    #[test]
    fn update_prompt_asks_for_minimal_edits() {
        let prompt = update_prompt();
        assert!(prompt.contains("smallest change"));
        assert!(prompt.contains("complete new content"));
    }

    #[test]
    fn update_text_lists_files_before_request() {
        let files: FileSet = [("index.html", "OLD")].into_iter().collect();
        let text = update_user_text(&files, "make it blue");
        let listing_at = text.find("--- FILE: index.html ---").unwrap();
        let request_at = text.find("make it blue").unwrap();
        assert!(listing_at < request_at);
    }
}

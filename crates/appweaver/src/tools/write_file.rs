//! The `write_file` tool: the only way the model produces output.

use super::core::{Tool, ToolFuture, ToolOutput};
use crate::files::sanitize_path;
use crate::{FileSet, ToolDef, json_schema_for};
use schemars::JsonSchema;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

pub const WRITE_FILE: &str = "write_file";

/// Schema advertised to the model. Both fields are required.
#[derive(Deserialize, JsonSchema)]
pub struct WriteFileArgs {
    /// Relative file path inside the project, e.g. 'index.html' or 'css/site.css'.
    pub path: String,
    /// Complete file content. Always send the whole file, never a diff.
    pub content: String,
}

/// What actually gets parsed, so a missing field can be reported by name
/// instead of as a generic serde error.
#[derive(Deserialize)]
struct PartialWriteFileArgs {
    path: Option<String>,
    content: Option<String>,
}

/// Why a `write_file` invocation could not be committed. Handled inside the
/// loop as an error tool result.
#[derive(Debug, Error)]
pub(crate) enum IncompleteToolCall {
    #[error("arguments are not a valid JSON object: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("rejected path: {0}")]
    UnsafePath(String),
}

/// A validated write, ready to commit.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct FileWrite {
    pub path: String,
    pub content: String,
}

pub(crate) fn parse_write(arguments: &str) -> Result<FileWrite, IncompleteToolCall> {
    let args: PartialWriteFileArgs = serde_json::from_str(arguments)?;
    let path = args.path.ok_or(IncompleteToolCall::MissingField("path"))?;
    let content = args
        .content
        .ok_or(IncompleteToolCall::MissingField("content"))?;
    let path = sanitize_path(&path).map_err(IncompleteToolCall::UnsafePath)?;
    Ok(FileWrite { path, content })
}

/// Writes a complete file into the run's [`FileSet`].
#[derive(Debug, Default, Clone, Copy)]
pub struct WriteFile;

impl Tool for WriteFile {
    fn definition(&self) -> ToolDef {
        ToolDef::new(
            WRITE_FILE,
            "Create or overwrite one file of the web application. Call it once per \
             file; calling it again for the same path replaces the earlier content.",
            json_schema_for::<WriteFileArgs>(),
        )
    }

    fn execute<'a>(&'a self, arguments: &'a str, files: &'a mut FileSet) -> ToolFuture<'a> {
        Box::pin(async move {
            match parse_write(arguments) {
                Ok(FileWrite { path, content }) => {
                    let bytes = content.len();
                    let verb = if files.insert(path.clone(), content).is_some() {
                        "Updated"
                    } else {
                        "Wrote"
                    };
                    debug!("write_file: {verb} {path} ({bytes} bytes)");
                    ToolOutput::ok(format!("{verb} {path} ({bytes} bytes)")).with_written(path)
                }
                Err(e) => {
                    warn!("write_file rejected: {e}");
                    ToolOutput::error(format!(
                        "{e}. Call write_file again with both `path` (relative) and the \
                         full `content`."
                    ))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run(arguments: &str, files: &mut FileSet) -> ToolOutput {
        WriteFile.execute(arguments, files).await
    }

    #[test]
    fn schema_requires_both_fields() {
        let def = WriteFile.definition();
        assert_eq!(def.function.name, "write_file");
        let required = def.function.parameters["required"].as_array().unwrap();
        assert!(required.contains(&"path".into()));
        assert!(required.contains(&"content".into()));
    }

    #[tokio::test]
    async fn writes_and_overwrites() {
        let mut files = FileSet::new();
        let first = run(r#"{"path":"a.html","content":"X"}"#, &mut files).await;
        assert!(!first.is_error);
        assert!(first.content.starts_with("Wrote a.html"));

        let second = run(r#"{"path":"./a.html","content":"Y"}"#, &mut files).await;
        assert!(second.content.starts_with("Updated a.html"));
        assert_eq!(second.written.as_deref(), Some("a.html"));
        assert_eq!(files.get("a.html"), Some("Y"));
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn missing_content_leaves_no_entry() {
        let mut files = FileSet::new();
        let out = run(r#"{"path":"a.html"}"#, &mut files).await;
        assert!(out.is_error);
        assert!(out.content.contains("`content`"));
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn malformed_arguments_are_error() {
        let mut files = FileSet::new();
        let out = run(r#"{"path":"a.html","content":"#, &mut files).await;
        assert!(out.is_error);
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn traversal_is_rejected() {
        let mut files = FileSet::new();
        let out = run(r#"{"path":"../../etc/passwd","content":"x"}"#, &mut files).await;
        assert!(out.is_error);
        assert!(out.content.contains("rejected path"));
        assert!(files.is_empty());
    }

    #[test]
    fn empty_content_is_still_a_write() {
        let write = parse_write(r#"{"path":"blank.css","content":""}"#).unwrap();
        assert_eq!(
            write,
            FileWrite {
                path: "blank.css".into(),
                content: String::new()
            }
        );
        assert!(matches!(
            parse_write(r#"{"content":"x"}"#),
            Err(IncompleteToolCall::MissingField("path"))
        ));
    }
}

//! Generate a small web app from a prompt and write it to a directory.
//!
//! Reads the API key from the `OPENROUTER_KEY` environment variable. Without
//! one, the offline template generator is used.
//!
//! # Examples
//!
//! ```sh
//! # New project
//! appweaver --prompt "a pomodoro timer with a dark theme" --out ./site
//!
//! # With a reference screenshot
//! appweaver --prompt "recreate this layout" --image mockup.png --out ./site
//!
//! # Iterate on what is already in ./site
//! appweaver --prompt "make the buttons rounder" --out ./site --iterate
//! ```

use appweaver::files::sanitize_path;
use appweaver::generator::GenerationRequest;
use appweaver::setup::{GeneratorArgs, api_key_from_env, init_tracing};
use appweaver::vision::Attachment;
use appweaver::FileSet;
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, info, warn};

/// Generate a small web app from a prompt.
///
/// Reads the API key from the OPENROUTER_KEY environment variable.
#[derive(Parser)]
#[command(name = "appweaver")]
struct Cli {
    /// What to build, or what to change with --iterate
    #[arg(long)]
    prompt: String,

    /// Directory the generated files are written to
    #[arg(long, default_value = "./site")]
    out: PathBuf,

    /// Attach a file (repeatable); images are shown to the model
    #[arg(long = "image")]
    images: Vec<PathBuf>,

    /// Load the files already in --out and ask for a change to them
    #[arg(long)]
    iterate: bool,

    #[command(flatten)]
    generation: GeneratorArgs,
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.prompt.trim().is_empty() {
        return Err("--prompt must not be empty".into());
    }

    let generator = cli.generation.build_generator(api_key_from_env())?;

    let mut attachments = Vec::with_capacity(cli.images.len());
    for path in &cli.images {
        let bytes = fs::read(path).map_err(|e| format!("reading {}: {e}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        attachments.push(Attachment::from_bytes(name, &bytes));
    }

    let prior_files = if cli.iterate {
        let files = load_project_dir(&cli.out)?;
        if files.is_empty() {
            return Err(format!("--iterate: no files found in {}", cli.out.display()).into());
        }
        info!("Loaded {} existing file(s) from {}", files.len(), cli.out.display());
        files
    } else {
        FileSet::new()
    };

    let request =
        GenerationRequest::iterate(cli.prompt.clone(), prior_files).with_attachments(attachments);
    let output = generator.generate(request).await?;

    write_project_dir(&cli.out, &output.files)?;

    println!(
        "Wrote {} file(s) to {} using the {} generator",
        output.files.len(),
        cli.out.display(),
        generator.name()
    );
    for file in output.files.to_generated() {
        println!("  {} ({} bytes)", file.path, file.content.len());
    }
    if output.usage.total_tokens() > 0 {
        println!("{}", output.usage.summary());
    }
    Ok(())
}

/// Read every UTF-8 file under `root` into a [`FileSet`], keyed by its
/// slash-separated relative path. Dotfiles and dot-directories are skipped.
fn load_project_dir(root: &Path) -> std::io::Result<FileSet> {
    let mut files = FileSet::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let mut entries: Vec<_> = fs::read_dir(&dir)?.collect::<Result<_, _>>()?;
        entries.sort_by_key(|e| e.file_name());
        for entry in entries {
            let name = entry.file_name();
            if name.to_string_lossy().starts_with('.') {
                continue;
            }
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                pending.push(path);
                continue;
            }
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            match fs::read_to_string(&path) {
                Ok(content) => {
                    files.insert(key, content);
                }
                Err(e) => debug!("Skipping {}: {e}", path.display()),
            }
        }
    }
    Ok(files)
}

fn write_project_dir(root: &Path, files: &FileSet) -> std::io::Result<()> {
    for (path, content) in files.iter() {
        let Ok(safe) = sanitize_path(path) else {
            warn!("Refusing to write unsafe path {path:?}");
            continue;
        };
        let target = root.join(&safe);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, content)?;
    }
    Ok(())
}

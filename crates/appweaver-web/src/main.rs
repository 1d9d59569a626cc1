//! appweaver HTTP service.
//!
//! Serves the project API and runs generations in the background.
//!
//! # Usage
//!
//! ```bash
//! OPENROUTER_KEY=sk-... cargo run -p appweaver-web
//! OPENROUTER_KEY=sk-... cargo run -p appweaver-web -- --model google/gemini-2.5-flash
//! cargo run -p appweaver-web -- --port 8080 --data-dir /var/lib/appweaver
//! ```
//!
//! Without `OPENROUTER_KEY` the static template generator is used.
//!
//! ## Creating a project
//!
//! ```bash
//! curl -X POST localhost:3001/api/projects \
//!   -H 'x-user-id: alice' -H 'content-type: application/json' \
//!   -d '{"prompt": "a countdown timer"}'
//! ```
//!
//! Then poll `GET /api/projects/{id}` until `status.state` is `ready`.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use appweaver::project::FileProjectRepository;
use appweaver::setup::{GeneratorArgs, api_key_from_env, init_tracing};
use appweaver::vision::DEFAULT_MAX_IMAGE_BYTES;
use appweaver_web::{AppState, WebConfig, recover_interrupted, spawn_web};
use clap::Parser;
use tracing::info;

/// appweaver HTTP service.
#[derive(Parser)]
#[command(about = "Prompt-to-web-app generation service")]
struct Args {
    /// Interface to bind.
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port for the HTTP server.
    #[arg(long, default_value_t = 3001)]
    port: u16,

    /// Directory holding one JSON record per project.
    #[arg(long, default_value = "./data/projects")]
    data_dir: PathBuf,

    /// Per-image byte ceiling for uploads before normalization.
    #[arg(long, default_value_t = DEFAULT_MAX_IMAGE_BYTES)]
    max_image_bytes: usize,

    #[command(flatten)]
    generation: GeneratorArgs,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    init_tracing();
    let args = Args::parse();

    let repo = FileProjectRepository::open(&args.data_dir)
        .map_err(|e| format!("opening {}: {e}", args.data_dir.display()))?;
    info!("Project store at {}", args.data_dir.display());
    recover_interrupted(&repo).map_err(|e| format!("recovering interrupted generations: {e}"))?;

    let generator = args
        .generation
        .build_generator(api_key_from_env())
        .map_err(|e| e.to_string())?;

    let state = AppState::new(Arc::new(repo), generator).with_max_image_bytes(args.max_image_bytes);
    let config = WebConfig {
        bind_addr: SocketAddr::new(args.host, args.port),
    };
    let addr = spawn_web(state, config)
        .await
        .map_err(|e| format!("binding {}:{}: {e}", args.host, args.port))?;
    println!("appweaver listening on http://{addr}");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("waiting for shutdown signal: {e}"))?;
    info!("Shutting down");
    Ok(())
}

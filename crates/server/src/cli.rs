//! CLI argument parsing and subcommand dispatch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use orthoassist_core::{Config, Detection};
use orthoassist_triage::TriageRequest;
use tracing::info;

use crate::router::{build_router, cors_layer};
use crate::state::AppState;

/// OrthoAssist triage service.
#[derive(Parser, Debug)]
#[command(name = "orthoassist-server", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server.
    Serve {
        /// Bind address (overrides HOST).
        #[arg(long)]
        host: Option<String>,
        /// Port (overrides PORT).
        #[arg(long)]
        port: Option<u16>,
    },
    /// Triage a detections file and print the result as JSON.
    Assess {
        /// JSON file: a list of detections, or a full triage request object.
        #[arg(long)]
        file: PathBuf,
        /// Patient-reported symptoms.
        #[arg(long)]
        symptoms: Option<String>,
        /// Body part the image shows.
        #[arg(long)]
        body_part: Option<String>,
    },
}

/// Run the parsed command against `config`.
pub async fn dispatch(cli: Cli, mut config: Config) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(&config).await
        }
        Command::Assess {
            file,
            symptoms,
            body_part,
        } => {
            let request = read_request(&file, symptoms, body_part)?;
            let state = AppState::from_config(&config)?;
            let result = state.engine.process(&request).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    let state = Arc::new(AppState::from_config(config)?);
    let app = build_router(state, cors_layer(&config.server.cors_origin));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build a request from a detections file. Flags override the file's own
/// symptoms and body part.
pub fn read_request(
    path: &Path,
    symptoms: Option<String>,
    body_part: Option<String>,
) -> anyhow::Result<TriageRequest> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    let mut request = if value.is_array() {
        TriageRequest {
            detections: serde_json::from_value::<Vec<Detection>>(value)?,
            ..TriageRequest::default()
        }
    } else {
        serde_json::from_value::<TriageRequest>(value)
            .with_context(|| format!("{} is not a triage request", path.display()))?
    };

    if symptoms.is_some() {
        request.symptoms = symptoms;
    }
    if body_part.is_some() {
        request.body_part = body_part;
    }
    Ok(request)
}

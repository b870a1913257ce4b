//! Serve command - run the HTTP prediction endpoint.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use emotion_adapters::FsArtifactStore;
use emotion_core::inference::get_device;
use emotion_core::InferenceService;
use tracing::info;

use super::resolve_artifacts_dir;
use crate::config::AppConfig;
use crate::server;

/// Listen address used when neither the flag nor the config sets one.
pub const DEFAULT_ADDR: &str = "127.0.0.1:5000";

/// Arguments for the serve command
#[derive(Args, Clone)]
pub struct ServeArgs {
    /// Address to listen on (default 127.0.0.1:5000)
    #[arg(short, long)]
    pub addr: Option<SocketAddr>,

    /// Directory to load artifacts from
    #[arg(long)]
    pub artifacts_dir: Option<PathBuf>,
}

/// Run the serve command.
///
/// Missing or inconsistent artifacts do not stop the server; it starts in the
/// unavailable state and answers predictions with 503.
pub fn run(args: &ServeArgs) -> Result<()> {
    let config = AppConfig::load();
    let addr = match args.addr {
        Some(addr) => addr,
        None => config
            .server
            .addr
            .as_deref()
            .unwrap_or(DEFAULT_ADDR)
            .parse()
            .context("Invalid server.addr in config")?,
    };

    let store = FsArtifactStore::new(resolve_artifacts_dir(args.artifacts_dir.as_ref(), &config));
    let service = InferenceService::load_with_config(&store, config.model_config(), &get_device());
    match service.unavailable_reason() {
        Some(reason) => eprintln!("warning: model unavailable: {reason}"),
        None => info!("Model loaded from {}", store.dir().display()),
    }

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(server::serve(addr, Arc::new(service)))
}

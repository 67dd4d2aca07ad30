//! CLI entry point for the translation service.
//!
//! Provides the `nmt` command: `serve` starts the HTTP server, `print-config`
//! dumps the resolved environment-derived configuration for verifying a
//! deployment before starting it for real.

mod backend;
mod cli;
mod helpers;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use nmt_core::{ConfigSnapshot, ScriptHeuristicDetector};
use tracing::info;

use crate::backend::PassthroughModelSource;
use crate::cli::{Cli, Commands};
use crate::helpers::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, port } => cmd_serve(bind, port).await,
        Commands::PrintConfig => cmd_print_config().await,
    }
}

async fn cmd_serve(bind: String, port: u16) -> Result<()> {
    init_tracing("info");

    let config = Arc::new(ConfigSnapshot::from_env());
    info!(
        device = %config.device.as_label(),
        model_family = config.model_family.as_str(),
        max_inflight = config.max_inflight,
        "starting translation service"
    );

    let web_config = nmt_web::WebConfig {
        bind_addr: bind,
        port,
    };

    println!();
    println!("  nmt-web v{}", env!("CARGO_PKG_VERSION"));
    println!("  Device:       {}", config.device.as_label());
    println!("  Model family: {}", config.model_family.as_str());
    println!(
        "  Listening on: http://{}:{}",
        web_config.bind_addr, web_config.port
    );
    println!();

    let source = Arc::new(PassthroughModelSource);
    let detector = Arc::new(ScriptHeuristicDetector::new());

    let server = nmt_web::WebServer::new(web_config, config, source, detector);
    server.start().await.map_err(|e| anyhow::anyhow!("{e}"))?;

    Ok(())
}

async fn cmd_print_config() -> Result<()> {
    init_tracing("warn");

    let config = ConfigSnapshot::from_env();
    println!("{config:#?}");

    Ok(())
}

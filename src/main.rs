//! EliDex - Desktop Pokemon encyclopedia with a camera-based scanner
//!
//! Browse the catalog, inspect stats with narration, or point a camera at a
//! card and let the scanner identify it via on-device OCR or a vision AI call.

mod capture;
mod catalog;
mod config;
mod dashboard;
mod narrate;
mod recognize;
mod scanner;
mod shared;

use anyhow::Result;
use clap::Parser;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::catalog::CatalogClient;
use crate::config::AppConfig;
use crate::shared::SharedAppState;

/// EliDex - Pokemon encyclopedia and scanner
#[derive(Parser, Debug)]
#[command(name = "elidex")]
#[command(about = "Desktop Pokemon encyclopedia with a camera-based scanner")]
struct Args {
    /// Camera device index to scan with
    #[arg(short, long)]
    camera: Option<u32>,

    /// List available camera devices and exit
    #[arg(long)]
    list_cameras: bool,

    /// Override the number of catalog entries loaded at startup
    #[arg(long)]
    limit: Option<u32>,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    // List cameras mode
    if args.list_cameras {
        println!("Available cameras:");
        let cameras = capture::list_cameras();
        if cameras.is_empty() {
            println!("  No cameras detected");
        } else {
            for (index, name) in cameras {
                println!("  [{}] {}", index, name);
            }
        }
        return Ok(());
    }

    info!("EliDex starting...");

    // Load or create configuration
    let mut config = load_or_create_config();
    if let Some(camera) = args.camera {
        config.camera.device_index = camera;
    }
    if let Some(limit) = args.limit {
        config.general.catalog_limit = limit;
    }

    let client = Arc::new(CatalogClient::new()?);
    let shared_state = Arc::new(RwLock::new(SharedAppState::new(config)));

    if let Err(e) = dashboard::app::run_dashboard(shared_state, client) {
        tracing::error!("Dashboard error: {}", e);
    }

    info!("EliDex shutdown complete");

    Ok(())
}

/// Load configuration from file or create default
fn load_or_create_config() -> AppConfig {
    if let Ok(config_dir) = config::get_config_dir() {
        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            if let Ok(config) = config::load_config(&config_path) {
                info!("Loaded configuration from {:?}", config_path);
                return config;
            }
        }
    }
    info!("Using default configuration");
    AppConfig::default()
}

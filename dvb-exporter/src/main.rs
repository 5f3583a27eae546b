//! linux-dvb-exporter: exposes DVB frontend status and signal statistics to
//! Prometheus.

use std::sync::Arc;

use clap::Parser;
use log::{error, info, warn};

use dvb_exporter::config::{Args, Config, ConfigFile};
use dvb_exporter::{logging, web};
use linux_dvb::{DevDvb, DeviceTree};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Config file: explicit path > auto-detect > default
    let file_config = match ConfigFile::locate(args.config.as_deref()) {
        Some(path) => match ConfigFile::load(&path) {
            Ok(c) => {
                eprintln!("Loaded config from: {}", path.display());
                c
            }
            Err(e) => {
                eprintln!("{}", e);
                return Err(e.into());
            }
        },
        None => ConfigFile::default(),
    };
    let config = Config::resolve(&args, file_config)?;

    let _log_guard = logging::init_logging(&config.logging)?;

    info!("linux-dvb-exporter {} starting...", env!("CARGO_PKG_VERSION"));
    info!("  Listen address: {}", config.listen_addr);
    info!("  Telemetry path: {}", config.telemetry_path);
    info!("  Namespace: {}", config.namespace);
    if let Some(dir) = &config.logging.dir {
        info!("  Log directory: {} ({} days)", dir.display(), config.logging.retention_days);
    }

    let tree = DevDvb::new(config.dvb_root.clone());
    info!("  Device root: {}", tree.root().display());
    match tree.list_adapters() {
        Ok(adapters) => info!("Found {} DVB adapter(s): {:?}", adapters.len(), adapters),
        // Not fatal: adapters may be hot-plugged later, and every scrape
        // enumerates again.
        Err(e) => warn!("{}", e),
    }

    let state = Arc::new(web::AppState::new(
        tree,
        config.namespace.clone(),
        config.telemetry_path.clone(),
    )?);

    if let Err(e) = web::serve(config.listen_addr, state).await {
        error!("HTTP server error: {}", e);
        return Err(e.into());
    }

    info!("linux-dvb-exporter stopped");
    Ok(())
}

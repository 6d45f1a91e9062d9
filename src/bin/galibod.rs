//! galibod - clearance gauge API daemon
//!
//! This daemon:
//! 1. Loads the process-wide configuration (limit table, tuning constants)
//! 2. Wires the localizer and marker-locator collaborators
//! 3. Serves the analyze API until Ctrl-C

use anyhow::{anyhow, Result};
use std::sync::{mpsc, Arc};

use galibo_kernel::api::{ApiConfig, ApiServer};
use galibo_kernel::{GaliboConfig, Inspector, LocalizerRegistry, StubLocalizer, StubMarkerLocator};

fn build_registry(cfg: &GaliboConfig) -> Result<LocalizerRegistry> {
    let mut registry = LocalizerRegistry::new();
    registry.register(StubLocalizer::empty());

    #[cfg(feature = "backend-tract")]
    if cfg.backend == "tract" {
        let model_path = cfg
            .model_path
            .as_deref()
            .ok_or_else(|| anyhow!("backend 'tract' requires detect.model_path"))?;
        registry.register(galibo_kernel::TractLocalizer::new(
            model_path,
            cfg.target_resolution,
        )?);
    }

    registry.set_default(&cfg.backend).map_err(|_| {
        anyhow!(
            "localizer backend '{}' is not available in this build (registered: {:?})",
            cfg.backend,
            registry.list()
        )
    })?;
    Ok(registry)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = GaliboConfig::load()?;
    let registry = build_registry(&cfg)?;
    // The marker locator is an external collaborator; deployments plug a real
    // fiducial detector in here. The stub reports "no marker", which surfaces
    // as the no_scale_marker verdict branch.
    let inspector = Arc::new(Inspector::from_config(
        &cfg,
        registry,
        StubMarkerLocator::empty(),
    )?);

    let api_config = ApiConfig {
        addr: cfg.api_addr.clone(),
    };
    let api_handle = ApiServer::new(api_config, inspector.clone()).spawn()?;
    log::info!("analyze api listening on {}", api_handle.addr);
    log::info!(
        "serving vehicle types: {:?} (backend '{}')",
        inspector.limits().vehicle_types(),
        cfg.backend
    );

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .expect("error setting Ctrl-C handler");

    log::info!("galibod waiting for shutdown signal (Ctrl-C)...");
    let _ = rx.recv();
    log::info!("shutdown signal received, stopping API server...");
    api_handle.stop()?;

    Ok(())
}

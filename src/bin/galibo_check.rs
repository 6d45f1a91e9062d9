//! galibo_check - one-shot clearance inspection of a local image file

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::sync::Arc;

use galibo_kernel::{
    DetectOptions, GaliboConfig, Inspector, LocalizerRegistry, ScaleCalibrator, StubLocalizer,
    StubMarkerLocator,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the image file (JPEG/PNG) to inspect.
    #[arg(long)]
    image: String,
    /// Vehicle type key to evaluate against.
    #[arg(long, default_value = "camion_rigido")]
    vehiculo_tipo: String,
    /// Localizer backend name.
    #[arg(long, env = "GALIBO_BACKEND", default_value = "stub")]
    backend: String,
    /// ONNX model path (tract backend).
    #[arg(long, env = "GALIBO_MODEL_PATH")]
    model_path: Option<String>,
    /// Minimum detection confidence.
    #[arg(long, default_value_t = 0.25)]
    min_confidence: f32,
    /// Detector input resolution (long side, px).
    #[arg(long, default_value_t = 960)]
    target_resolution: u32,
    /// Fiducial marker reference length in meters.
    #[arg(long, default_value_t = 0.20)]
    marker_length_m: f64,
    /// Subject selection policy (tallest|largest-area).
    #[arg(long, default_value = "tallest")]
    selector: String,
}

fn build_registry(args: &Args) -> Result<LocalizerRegistry> {
    let mut registry = LocalizerRegistry::new();
    registry.register(StubLocalizer::empty());

    #[cfg(feature = "backend-tract")]
    if args.backend == "tract" {
        let model_path = args
            .model_path
            .as_deref()
            .ok_or_else(|| anyhow!("backend 'tract' requires --model-path"))?;
        registry.register(galibo_kernel::TractLocalizer::new(
            model_path,
            args.target_resolution,
        )?);
    }

    registry.set_default(&args.backend).map_err(|_| {
        anyhow!(
            "localizer backend '{}' is not available in this build (registered: {:?})",
            args.backend,
            registry.list()
        )
    })?;
    Ok(registry)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let cfg = GaliboConfig::load()?;
    let registry = build_registry(&args)?;
    let inspector = Arc::new(Inspector::new(
        cfg.limits.clone(),
        cfg.tolerance_m,
        DetectOptions {
            min_confidence: args.min_confidence,
            target_resolution: args.target_resolution,
        },
        registry,
        ScaleCalibrator::new(StubMarkerLocator::empty(), args.marker_length_m),
        galibo_kernel::selector_from_name(&args.selector)?,
    ));

    let bytes = std::fs::read(&args.image)
        .with_context(|| format!("failed to read image file {}", args.image))?;
    let verdict = inspector
        .inspect_bytes(&bytes, &args.vehiculo_tipo)
        .map_err(|e| anyhow!(e.to_string()))?;

    println!("{}", serde_json::to_string_pretty(&verdict.to_json())?);
    Ok(())
}

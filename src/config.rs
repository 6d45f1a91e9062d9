use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::{LimitTable, VehicleLimits};

const DEFAULT_API_ADDR: &str = "127.0.0.1:8460";
const DEFAULT_BACKEND: &str = "stub";
const DEFAULT_SELECTOR: &str = "tallest";
const DEFAULT_TOLERANCE_M: f64 = 0.05;
const DEFAULT_MARKER_LENGTH_M: f64 = 0.20;
const DEFAULT_MIN_CONFIDENCE: f32 = 0.25;
const DEFAULT_TARGET_RESOLUTION: u32 = 960;

#[derive(Debug, Deserialize, Default)]
struct GaliboConfigFile {
    api: Option<ApiConfigFile>,
    detect: Option<DetectConfigFile>,
    marker_length_m: Option<f64>,
    tolerance_m: Option<f64>,
    selector: Option<String>,
    limits: Option<BTreeMap<String, LimitsFile>>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiConfigFile {
    addr: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectConfigFile {
    backend: Option<String>,
    model_path: Option<String>,
    min_confidence: Option<f32>,
    target_resolution: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct LimitsFile {
    alto_m: f64,
    ancho_m: f64,
}

/// Process-wide configuration, loaded once at startup and immutable after.
#[derive(Debug, Clone)]
pub struct GaliboConfig {
    pub api_addr: String,
    pub backend: String,
    pub model_path: Option<String>,
    pub min_confidence: f32,
    pub target_resolution: u32,
    pub marker_length_m: f64,
    pub tolerance_m: f64,
    pub selector: String,
    pub limits: LimitTable,
}

impl GaliboConfig {
    /// Load from the file named by `GALIBO_CONFIG` (if set), apply env
    /// overrides, then validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("GALIBO_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: GaliboConfigFile) -> Self {
        let api_addr = file
            .api
            .and_then(|api| api.addr)
            .unwrap_or_else(|| DEFAULT_API_ADDR.to_string());
        let backend = file
            .detect
            .as_ref()
            .and_then(|detect| detect.backend.clone())
            .unwrap_or_else(|| DEFAULT_BACKEND.to_string());
        let model_path = file
            .detect
            .as_ref()
            .and_then(|detect| detect.model_path.clone());
        let min_confidence = file
            .detect
            .as_ref()
            .and_then(|detect| detect.min_confidence)
            .unwrap_or(DEFAULT_MIN_CONFIDENCE);
        let target_resolution = file
            .detect
            .as_ref()
            .and_then(|detect| detect.target_resolution)
            .unwrap_or(DEFAULT_TARGET_RESOLUTION);
        let limits = match file.limits {
            Some(entries) => LimitTable::from_entries(entries.into_iter().map(|(key, value)| {
                (
                    key,
                    VehicleLimits {
                        alto_m: value.alto_m,
                        ancho_m: value.ancho_m,
                    },
                )
            })),
            None => LimitTable::default(),
        };
        Self {
            api_addr,
            backend,
            model_path,
            min_confidence,
            target_resolution,
            marker_length_m: file.marker_length_m.unwrap_or(DEFAULT_MARKER_LENGTH_M),
            tolerance_m: file.tolerance_m.unwrap_or(DEFAULT_TOLERANCE_M),
            selector: file.selector.unwrap_or_else(|| DEFAULT_SELECTOR.to_string()),
            limits,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(addr) = std::env::var("GALIBO_API_ADDR") {
            if !addr.trim().is_empty() {
                self.api_addr = addr;
            }
        }
        if let Ok(backend) = std::env::var("GALIBO_BACKEND") {
            if !backend.trim().is_empty() {
                self.backend = backend;
            }
        }
        if let Ok(path) = std::env::var("GALIBO_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.model_path = Some(path);
            }
        }
        if let Ok(selector) = std::env::var("GALIBO_SELECTOR") {
            if !selector.trim().is_empty() {
                self.selector = selector;
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !self.tolerance_m.is_finite() || self.tolerance_m < 0.0 {
            return Err(anyhow!("tolerance_m must be finite and >= 0"));
        }
        if !self.marker_length_m.is_finite() || self.marker_length_m <= 0.0 {
            return Err(anyhow!("marker_length_m must be positive"));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(anyhow!("min_confidence must be within [0, 1]"));
        }
        if self.target_resolution == 0 {
            return Err(anyhow!("target_resolution must be positive"));
        }
        if self.limits.is_empty() {
            return Err(anyhow!("limit table must not be empty"));
        }
        for (vehicle_type, limits) in self.limits.entries() {
            if limits.alto_m <= 0.0 || limits.ancho_m <= 0.0 {
                return Err(anyhow!(
                    "limits for '{}' must be positive",
                    vehicle_type
                ));
            }
        }
        crate::select::selector_from_name(&self.selector)?;
        Ok(())
    }
}

impl Default for GaliboConfig {
    fn default() -> Self {
        Self::from_file(GaliboConfigFile::default())
    }
}

fn read_config_file(path: &Path) -> Result<GaliboConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

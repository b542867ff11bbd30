use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::annotation::font::{DEFAULT_FONT_SIZE, MAX_FONT_SIZE};

pub const CONFIG_ENV: &str = "RADAI_CONFIG";

const DEFAULT_ENDPOINT: &str = "https://predict.ultralytics.com";
const DEFAULT_IMGSZ: u32 = 640;
const DEFAULT_CONF: f32 = 0.25;
const DEFAULT_IOU: f32 = 0.45;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    endpoint: Option<String>,
    api_key: Option<String>,
    default_model: Option<String>,
    models: Option<BTreeMap<String, String>>,
    imgsz: Option<u32>,
    conf: Option<f32>,
    iou: Option<f32>,
    timeout_secs: Option<u64>,
    annotation: Option<AnnotationConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct AnnotationConfigFile {
    font_path: Option<PathBuf>,
    font_size: Option<f32>,
}

/// Runtime settings: file values, overridden by environment, overridden by CLI flags
#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub default_model: Option<String>,
    /// Display name -> hosted model URL
    pub models: BTreeMap<String, String>,
    pub imgsz: u32,
    pub conf: f32,
    pub iou: f32,
    pub timeout: Duration,
    pub annotation: AnnotationSettings,
}

#[derive(Debug, Clone)]
pub struct AnnotationSettings {
    pub font_path: Option<PathBuf>,
    pub font_size: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_file(ConfigFile::default())
    }
}

impl Config {
    /// Load from `path` (or `$RADAI_CONFIG`), then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_ENV).ok().map(PathBuf::from);
        let file_cfg = match path.or(env_path.as_deref()) {
            Some(path) => read_config_file(path)?,
            None => ConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse TOML text without consulting the environment
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(text).context("Invalid config file")?;
        let cfg = Self::from_file(file);
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ConfigFile) -> Self {
        let annotation = file.annotation.unwrap_or_default();
        Self {
            endpoint: file.endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            api_key: file.api_key,
            default_model: file.default_model,
            models: file.models.unwrap_or_default(),
            imgsz: file.imgsz.unwrap_or(DEFAULT_IMGSZ),
            conf: file.conf.unwrap_or(DEFAULT_CONF),
            iou: file.iou.unwrap_or(DEFAULT_IOU),
            timeout: Duration::from_secs(file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            annotation: AnnotationSettings {
                font_path: annotation.font_path,
                font_size: annotation.font_size.unwrap_or(DEFAULT_FONT_SIZE),
            },
        }
    }

    /// Apply `RADAI_*` overrides using `lookup` to read variables
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(endpoint) = non_empty("RADAI_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(api_key) = non_empty("RADAI_API_KEY") {
            self.api_key = Some(api_key);
        }
        if let Some(model) = non_empty("RADAI_MODEL") {
            self.default_model = Some(model);
        }
        if let Some(font) = non_empty("RADAI_FONT") {
            self.annotation.font_path = Some(PathBuf::from(font));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            bail!("endpoint must not be empty");
        }
        if self.imgsz == 0 {
            bail!("imgsz must be greater than zero");
        }
        if !(0.0..=1.0).contains(&self.conf) {
            bail!("conf must be within [0, 1], got {}", self.conf);
        }
        if !(0.0..=1.0).contains(&self.iou) {
            bail!("iou must be within [0, 1], got {}", self.iou);
        }
        let font_size = self.annotation.font_size;
        if !font_size.is_finite() || font_size <= 0.0 || font_size > MAX_FONT_SIZE {
            bail!(
                "annotation.font_size must be within (0, {}], got {}",
                MAX_FONT_SIZE,
                font_size
            );
        }
        Ok(())
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| anyhow!("No API key configured; set RADAI_API_KEY or api_key in the config file"))
    }

    /// Resolve a model name to the identifier sent to the endpoint.
    ///
    /// Falls back to `default_model`, then to the first configured model.
    /// Names not in the model table are accepted when they are URLs.
    pub fn resolve_model(&self, requested: Option<&str>) -> Result<String> {
        let name = requested
            .map(str::to_string)
            .or_else(|| self.default_model.clone())
            .or_else(|| self.models.keys().next().cloned())
            .ok_or_else(|| anyhow!("No model configured; add a [models] table or pass --model"))?;

        if let Some(url) = self.models.get(&name) {
            return Ok(url.clone());
        }
        if name.starts_with("http://") || name.starts_with("https://") {
            return Ok(name);
        }

        let known: Vec<&str> = self.models.keys().map(String::as_str).collect();
        bail!("Unknown model '{}' (configured: {})", name, known.join(", "))
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Invalid config file {}", path.display()))
}

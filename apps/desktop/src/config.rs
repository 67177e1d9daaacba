use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use client_core::DEFAULT_REQUEST_TIMEOUT;
use serde::Deserialize;
use shared::domain::Strength;

pub const DEFAULT_CONFIG_FILE: &str = "faceswap.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub engine_url: Option<String>,
    pub request_timeout: Duration,
    pub export_dir: PathBuf,
    /// Where manual strength adjustments start when nothing numeric is displayed.
    pub default_strength: Strength,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            engine_url: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            export_dir: default_export_dir(),
            default_strength: Strength::clamped(client_core::session::DEFAULT_NUDGE_ORIGIN),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    engine_url: Option<String>,
    request_timeout_secs: Option<u64>,
    export_dir: Option<PathBuf>,
    default_strength: Option<f64>,
}

/// Settings from the optional config file, then environment overrides.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    match fs::read_to_string(path) {
        Ok(raw) => apply_file_settings(&mut settings, &raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))?,
        Err(err) if config_path.is_some() => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()));
        }
        Err(_) => {}
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file_settings(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.engine_url {
        settings.engine_url = non_empty(v);
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout = Duration::from_secs(v.max(1));
    }
    if let Some(v) = file_cfg.export_dir {
        settings.export_dir = v;
    }
    if let Some(strength) = file_cfg
        .default_strength
        .and_then(|v| checked_strength(v, "default_strength"))
    {
        settings.default_strength = strength;
    }
    Ok(())
}

fn apply_env_overrides(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("FACESWAP_ENGINE_URL") {
        settings.engine_url = non_empty(v);
    }
    if let Some(v) = var("APP__ENGINE_URL") {
        settings.engine_url = non_empty(v);
    }

    if let Some(v) = var("APP__REQUEST_TIMEOUT_SECS") {
        match v.parse::<u64>() {
            Ok(secs) => settings.request_timeout = Duration::from_secs(secs.max(1)),
            Err(err) => tracing::warn!(value = %v, %err, "ignoring APP__REQUEST_TIMEOUT_SECS"),
        }
    }

    if let Some(v) = var("APP__EXPORT_DIR") {
        if !v.trim().is_empty() {
            settings.export_dir = PathBuf::from(v);
        }
    }

    if let Some(v) = var("APP__DEFAULT_STRENGTH") {
        match v.trim().parse::<f64>() {
            Ok(value) => {
                if let Some(strength) = checked_strength(value, "APP__DEFAULT_STRENGTH") {
                    settings.default_strength = strength;
                }
            }
            Err(err) => tracing::warn!(value = %v, %err, "ignoring APP__DEFAULT_STRENGTH"),
        }
    }
}

/// Out-of-range strengths are ignored with a warning wherever they come from.
fn checked_strength(value: f64, source: &str) -> Option<Strength> {
    match Strength::new(value) {
        Ok(strength) => Some(strength),
        Err(err) => {
            tracing::warn!(value, %err, "ignoring {source}");
            None
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn default_export_dir() -> PathBuf {
    dirs::picture_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

use std::fs;
use std::path::{Path, PathBuf};

use engine::SimConfig;
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const CONFIG_ENV_VAR: &str = "DUNGEON_SIM_CONFIG";

/// Demo driver settings wrapped around the engine's simulation constants.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct DemoConfig {
    pub(crate) sim: SimConfig,
    pub(crate) run_seconds: f32,
    pub(crate) metrics_log_interval_ms: u64,
    pub(crate) max_frame_delta_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            sim: SimConfig::default(),
            run_seconds: 10.0,
            metrics_log_interval_ms: 1000,
            max_frame_delta_ms: 250,
        }
    }
}

pub(crate) struct AppWiring {
    pub(crate) config: DemoConfig,
}

pub(crate) fn build_app() -> Result<AppWiring, String> {
    init_tracing();
    info!("=== Dungeon Sim Startup ===");

    let config = match config_path_from_env() {
        Some(path) => {
            let config = load_demo_config(&path)?;
            info!(path = %path.display(), "config_loaded");
            config
        }
        None => DemoConfig::default(),
    };

    if config.run_seconds <= 0.0 {
        warn!(run_seconds = config.run_seconds, "demo run window is empty");
    }

    Ok(AppWiring { config })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn config_path_from_env() -> Option<PathBuf> {
    let raw = std::env::var(CONFIG_ENV_VAR).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(PathBuf::from(trimmed))
}

fn load_demo_config(path: &Path) -> Result<DemoConfig, String> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("read config '{}': {error}", path.display()))?;
    parse_demo_config_json(&raw)
}

fn parse_demo_config_json(raw: &str) -> Result<DemoConfig, String> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, DemoConfig>(&mut deserializer) {
        Ok(config) => Ok(config),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(format!("parse config json: {source}"))
            } else {
                Err(format!("parse config json at {path}: {source}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_default_config() {
        let config = parse_demo_config_json("{}").expect("config");
        assert_eq!(config, DemoConfig::default());
    }

    #[test]
    fn nested_sim_fields_are_parsed() {
        let config = parse_demo_config_json(
            r#"{"sim": {"max_actor_speed": 4.0, "target_tps": 30}, "run_seconds": 2.5}"#,
        )
        .expect("config");
        assert_eq!(config.sim.max_actor_speed, 4.0);
        assert_eq!(config.sim.target_tps, 30);
        assert_eq!(config.run_seconds, 2.5);
        assert_eq!(
            config.metrics_log_interval_ms,
            DemoConfig::default().metrics_log_interval_ms
        );
    }

    #[test]
    fn parse_error_reports_the_json_path() {
        let message =
            parse_demo_config_json(r#"{"sim": {"max_actor_speed": "fast"}}"#).expect_err("err");
        assert!(
            message.contains("sim.max_actor_speed"),
            "missing path in: {message}"
        );
    }

    #[test]
    fn malformed_json_is_reported_without_a_path() {
        let message = parse_demo_config_json("{oops").expect_err("err");
        assert!(message.starts_with("parse config json"));
    }
}

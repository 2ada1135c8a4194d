use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_MAX_ACTOR_SPEED: f32 = 8.0;
pub const DEFAULT_MAX_STEP_MS: u64 = 50;
pub const DEFAULT_MAX_PROJECTILE_RADIUS: f32 = 1.5;
pub const DEFAULT_TARGET_TPS: u32 = 60;

/// Startup-time simulation constants. Not tunable per call.
///
/// `max_actor_speed` (tiles/second) and `max_step_ms` together bound
/// per-sub-step displacement; keeping that product below the smallest actor
/// radius is what makes endpoint-only collision testing sound.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub max_actor_speed: f32,
    pub max_step_ms: u64,
    pub max_projectile_radius: f32,
    pub target_tps: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_actor_speed: DEFAULT_MAX_ACTOR_SPEED,
            max_step_ms: DEFAULT_MAX_STEP_MS,
            max_projectile_radius: DEFAULT_MAX_PROJECTILE_RADIUS,
            target_tps: DEFAULT_TARGET_TPS,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config json: {0}")]
    Parse(#[from] serde_json::Error),
}

impl SimConfig {
    /// Replaces unusable values with defaults and warns when the per-step
    /// displacement bound is loose enough to allow tunneling past a
    /// half-tile obstacle.
    pub fn normalized(mut self) -> Self {
        if !self.max_actor_speed.is_finite() || self.max_actor_speed <= 0.0 {
            warn!(
                max_actor_speed = self.max_actor_speed,
                "invalid max_actor_speed, using default"
            );
            self.max_actor_speed = DEFAULT_MAX_ACTOR_SPEED;
        }
        if self.max_step_ms == 0 {
            warn!("invalid max_step_ms, using default");
            self.max_step_ms = DEFAULT_MAX_STEP_MS;
        }
        if !self.max_projectile_radius.is_finite() || self.max_projectile_radius <= 0.0 {
            warn!(
                max_projectile_radius = self.max_projectile_radius,
                "invalid max_projectile_radius, using default"
            );
            self.max_projectile_radius = DEFAULT_MAX_PROJECTILE_RADIUS;
        }
        if self.target_tps == 0 {
            warn!("invalid target_tps, using default");
            self.target_tps = DEFAULT_TARGET_TPS;
        }

        let step_displacement = self.max_actor_speed * self.max_step_ms as f32 / 1000.0;
        if step_displacement > 0.5 {
            warn!(
                step_displacement,
                "per-step displacement exceeds half a tile; fast movers may tunnel"
            );
        }
        self
    }

    pub fn max_step(&self) -> Duration {
        Duration::from_millis(self.max_step_ms)
    }

    pub fn fixed_dt(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_tps.max(1) as f64)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str::<Self>(raw)?.normalized())
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }
}

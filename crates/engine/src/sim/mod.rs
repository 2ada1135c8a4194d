mod collision;
mod config;
mod events;
mod grid;
mod metrics;
mod movement;
mod simulation;

pub use collision::{
    CollisionCheck, CollisionEngine, CollisionHit, CollisionRecord, CollisionStore, Shape,
};
pub use config::{
    ConfigError, SimConfig, DEFAULT_MAX_ACTOR_SPEED, DEFAULT_MAX_PROJECTILE_RADIUS,
    DEFAULT_MAX_STEP_MS, DEFAULT_TARGET_TPS,
};
pub use events::{CollisionEvent, EventQueue, MoveEvent, SimEvents, TeleportEvent};
pub use grid::{
    tile_of, ActorId, ActorIdAllocator, Cell, Dungeon, DungeonStore, SceneId, Terrain,
    TerrainSource, TerrainSourceError, TileCoord, Trigger, TriggerAction, Vec2,
};
pub use metrics::{MetricsAccumulator, MetricsSnapshot};
pub use movement::{MovementEngine, MovementRecord, MovementStore};
pub use simulation::Simulation;

pub mod sim;

pub use sim::{
    tile_of, ActorId, ActorIdAllocator, Cell, CollisionCheck, CollisionEngine, CollisionEvent,
    CollisionHit, CollisionRecord, CollisionStore, ConfigError, Dungeon, DungeonStore, EventQueue,
    MetricsAccumulator, MetricsSnapshot, MoveEvent, MovementEngine, MovementRecord, MovementStore,
    SceneId, Shape, SimConfig, SimEvents, Simulation, TeleportEvent, Terrain, TerrainSource,
    TerrainSourceError, TileCoord, Trigger, TriggerAction, Vec2,
};

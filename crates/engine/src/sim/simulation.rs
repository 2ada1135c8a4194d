use std::time::Duration;

use tracing::debug;

use super::collision::{CollisionEngine, CollisionRecord, CollisionStore};
use super::config::SimConfig;
use super::events::SimEvents;
use super::grid::{
    ActorId, ActorIdAllocator, DungeonStore, SceneId, TerrainSource, TileCoord, Trigger, Vec2,
};
use super::movement::{MovementEngine, MovementRecord, MovementStore};

/// Owns the stores, engines, and event fabric, and drives them in fixed
/// order: movement completes for every actor before collision starts, once
/// per sub-step. Single-threaded; all mutation happens inside `advance`.
pub struct Simulation {
    config: SimConfig,
    dungeons: DungeonStore,
    movement: MovementStore,
    collision: CollisionStore,
    events: SimEvents,
    movement_engine: MovementEngine,
    collision_engine: CollisionEngine,
    allocator: ActorIdAllocator,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Self {
        let config = config.normalized();
        Self {
            config,
            dungeons: DungeonStore::default(),
            movement: MovementStore::default(),
            collision: CollisionStore::new(config.max_projectile_radius),
            events: SimEvents::default(),
            movement_engine: MovementEngine::new(config.max_actor_speed),
            collision_engine: CollisionEngine,
            allocator: ActorIdAllocator::default(),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn create_scene(&mut self, source: &TerrainSource, tile_size: f32) -> SceneId {
        self.dungeons.create(source, tile_size)
    }

    pub fn attach_trigger(&mut self, scene: SceneId, coord: TileCoord, trigger: Box<dyn Trigger>) {
        self.dungeons.attach_trigger(scene, coord, trigger);
    }

    /// Spawns an actor into a scene. The caller validates the spawn spot;
    /// spawning into solid terrain is not auto-corrected.
    pub fn spawn_actor(
        &mut self,
        scene: SceneId,
        pos: Vec2,
        max_speed: f32,
        collision: Option<CollisionRecord>,
    ) -> ActorId {
        let actor = self.allocator.allocate();
        let mut record = MovementRecord::new(max_speed);
        self.dungeons.spawn(scene, actor, &mut record, pos);
        self.movement.insert(actor, record);
        if let Some(record) = collision {
            self.collision.insert(actor, record);
        }
        debug!(actor = actor.0, scene = scene.0, "actor_spawned");
        actor
    }

    /// Removes the actor from its scene and destroys its records. The id
    /// stays retired until `release_actor`.
    pub fn vanish_actor(&mut self, actor: ActorId) {
        if let Some(mut record) = self.movement.remove(actor) {
            self.dungeons.vanish(actor, &mut record);
        }
        self.collision.remove(actor);
    }

    /// Vanishes the actor and returns its id to the allocator.
    pub fn release_actor(&mut self, actor: ActorId) {
        self.vanish_actor(actor);
        self.allocator.release(actor);
    }

    /// Input event `{actor, move, look}` from the behavior layer.
    pub fn apply_input(&mut self, actor: ActorId, move_input: Vec2, look: Vec2) {
        self.movement_engine
            .apply_input(&mut self.movement, &mut self.events, actor, move_input, look);
    }

    /// Advances the simulation by `elapsed`, split into sub-steps no longer
    /// than the configured maximum. Returns the number of sub-steps run.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        let max_step = self.config.max_step();
        let mut remaining = elapsed;
        let mut steps = 0u32;
        while remaining > Duration::ZERO {
            let step = remaining.min(max_step);
            remaining -= step;
            self.step(step.as_secs_f32());
            steps = steps.saturating_add(1);
        }
        steps
    }

    fn step(&mut self, dt: f32) {
        self.movement_engine
            .update(&mut self.movement, &mut self.events, dt);
        self.collision_engine.check_all_collisions(
            &mut self.dungeons,
            &mut self.movement,
            &mut self.collision,
            &mut self.events,
        );
    }

    pub fn events(&self) -> &SimEvents {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut SimEvents {
        &mut self.events
    }

    pub fn dungeons(&self) -> &DungeonStore {
        &self.dungeons
    }

    /// Mutable grid access for the external map-building layer (terrain
    /// decoration, trigger placement). Cell membership stays off limits:
    /// it is owned by spawn/vanish and the collision engine.
    pub fn dungeons_mut(&mut self) -> &mut DungeonStore {
        &mut self.dungeons
    }

    pub fn movement(&self) -> &MovementStore {
        &self.movement
    }

    pub fn collision(&self) -> &CollisionStore {
        &self.collision
    }

    pub fn collision_mut(&mut self) -> &mut CollisionStore {
        &mut self.collision
    }

    /// Tears all state down for the next scenario.
    pub fn reset(&mut self) {
        self.dungeons.reset();
        self.movement.reset();
        self.collision.reset();
        self.events.clear();
        self.allocator.reset();
    }
}

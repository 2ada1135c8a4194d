use engine::{
    ActorId, CollisionRecord, SceneId, Simulation, TerrainSource, TileCoord, Trigger,
    TriggerAction, Vec2,
};
use tracing::info;

const EAST: Vec2 = Vec2 { x: 1.0, y: 0.0 };
const WEST: Vec2 = Vec2 { x: -1.0, y: 0.0 };
const NORTH: Vec2 = Vec2 { x: 0.0, y: 1.0 };
const SOUTH: Vec2 = Vec2 { x: 0.0, y: -1.0 };

const WALKER_SPEED: f32 = 2.0;
const WANDERER_SPEED: f32 = 1.5;
const PROJECTILE_SPEED: f32 = 6.0;
const PROJECTILE_LAUNCH_SECONDS: f32 = 0.25;
const WANDERER_PHASE_SECONDS: f32 = 2.0;
const BOX_PHASE_SECONDS: f32 = 4.0;

const PAD_CELL: TileCoord = TileCoord { x: 4, y: 5 };
const PAD_DESTINATION: Vec2 = Vec2 { x: 2.0, y: 2.0 };
// Sprite id the renderer draws for a pad's glow ring.
const PAD_DECORATION: u16 = 3;

const HALL_ROWS: [&str; 7] = [
    "############",
    "#..........#",
    "#..........#",
    "#.....#....#",
    "#..........#",
    "#..........#",
    "############",
];

const CELLAR_ROWS: [&str; 5] = [
    "##########",
    "#........#",
    "#........#",
    "#........#",
    "##########",
];

fn source_from_rows(rows: &[&str]) -> TerrainSource {
    TerrainSource::from_ascii(&rows.join("\n")).expect("static map shape is valid")
}

/// Teleport pad placed by the dungeon-building side: a fixed number of
/// charges, then it burns out.
struct TeleportPad {
    destination_scene: SceneId,
    destination: Vec2,
    charges: u32,
}

impl Trigger for TeleportPad {
    fn execute(&mut self, _actor: ActorId) -> Option<TriggerAction> {
        if self.charges == 0 {
            return None;
        }
        self.charges -= 1;
        Some(TriggerAction::Teleport {
            scene: self.destination_scene,
            pos: self.destination,
        })
    }

    fn is_expired(&self) -> bool {
        self.charges == 0
    }
}

/// The demo cast: a walker headed for the hall pillar, a vertical wanderer
/// that strays onto the teleport pad, a box-shaped wanderer bumping a
/// crate, and a projectile fired across the pad row.
pub(crate) struct Scenario {
    pub(crate) hall: SceneId,
    pub(crate) cellar: SceneId,
    pub(crate) walker: ActorId,
    pub(crate) wanderer: ActorId,
    pub(crate) box_wanderer: ActorId,
    pub(crate) barrier: ActorId,
    pub(crate) projectile: ActorId,
    projectile_launched: bool,
}

impl Scenario {
    pub(crate) fn build(sim: &mut Simulation) -> Self {
        let hall = sim.create_scene(&source_from_rows(&HALL_ROWS), 16.0);
        let cellar = sim.create_scene(&source_from_rows(&CELLAR_ROWS), 16.0);

        sim.attach_trigger(
            hall,
            PAD_CELL,
            Box::new(TeleportPad {
                destination_scene: cellar,
                destination: PAD_DESTINATION,
                charges: 1,
            }),
        );
        sim.dungeons_mut()
            .dungeon_mut(hall)
            .cell_mut(PAD_CELL)
            .add_decoration(PAD_DECORATION);

        let walker = sim.spawn_actor(
            hall,
            Vec2 { x: 1.0, y: 3.0 },
            WALKER_SPEED,
            Some(CollisionRecord::circle(0.45, false)),
        );
        let wanderer = sim.spawn_actor(
            hall,
            Vec2 { x: 4.0, y: 3.0 },
            WANDERER_SPEED,
            Some(CollisionRecord::circle(0.4, false)),
        );
        let box_wanderer = sim.spawn_actor(
            hall,
            Vec2 { x: 9.0, y: 1.0 },
            WANDERER_SPEED,
            Some(CollisionRecord::aabb(0.8, 0.8, false)),
        );
        let barrier = sim.spawn_actor(
            hall,
            Vec2 { x: 3.0, y: 1.0 },
            0.0,
            Some(CollisionRecord::aabb(0.9, 0.9, false)),
        );
        let projectile = sim.spawn_actor(
            hall,
            Vec2 { x: 1.0, y: 5.0 },
            PROJECTILE_SPEED,
            Some(CollisionRecord::circle(0.2, true)),
        );

        info!(
            hall = hall.0,
            cellar = cellar.0,
            actors = 5usize,
            "scenario_built"
        );

        Self {
            hall,
            cellar,
            walker,
            wanderer,
            box_wanderer,
            barrier,
            projectile,
            projectile_launched: false,
        }
    }

    /// Issues this frame's scripted intents. Re-sending an unchanged intent
    /// is a no-op, so this is safe to call every frame.
    pub(crate) fn drive(&mut self, sim: &mut Simulation, elapsed_seconds: f32) {
        sim.apply_input(self.walker, EAST, EAST);

        let wanderer_intent = if phase_index(elapsed_seconds, WANDERER_PHASE_SECONDS) % 2 == 0 {
            NORTH
        } else {
            SOUTH
        };
        sim.apply_input(self.wanderer, wanderer_intent, wanderer_intent);

        let box_intent = if phase_index(elapsed_seconds, BOX_PHASE_SECONDS) % 2 == 0 {
            WEST
        } else {
            EAST
        };
        sim.apply_input(self.box_wanderer, box_intent, box_intent);

        if !self.projectile_launched && elapsed_seconds >= PROJECTILE_LAUNCH_SECONDS {
            self.projectile_launched = true;
            sim.apply_input(self.projectile, EAST, EAST);
            info!(projectile = self.projectile.0, "projectile_launched");
        }
    }
}

fn phase_index(elapsed_seconds: f32, phase_seconds: f32) -> u64 {
    (elapsed_seconds / phase_seconds).max(0.0) as u64
}

use std::collections::BTreeMap;

use super::events::{MoveEvent, SimEvents};
use super::grid::{tile_of, ActorId, SceneId, TileCoord, Vec2};

/// Slack used when testing that a position is resting exactly on a cell
/// center (arrival snapping writes the center values verbatim).
pub(crate) const ARRIVAL_EPSILON: f32 = 1e-4;

/// Continuous state of one actor with a physical presence.
///
/// `moving` mirrors `move_intent != 0`; the intent components are always
/// -1, 0, or 1 per axis. `target` is the cell the current glide ends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementRecord {
    pub scene: Option<SceneId>,
    pub pos: Vec2,
    pub last_pos: Vec2,
    pub target: TileCoord,
    pub look: Vec2,
    pub move_intent: Vec2,
    pub max_speed: f32,
    pub moving: bool,
}

impl MovementRecord {
    pub fn new(max_speed: f32) -> Self {
        Self {
            scene: None,
            pos: Vec2::ZERO,
            last_pos: Vec2::ZERO,
            target: TileCoord { x: 0, y: 0 },
            look: Vec2 { x: 1.0, y: 0.0 },
            move_intent: Vec2::ZERO,
            max_speed,
            moving: false,
        }
    }

    /// Collision interruption: zero the intent and clamp back to the last
    /// collision-free point. The only way besides input to stop motion.
    pub fn interrupt(&mut self) {
        self.move_intent = Vec2::ZERO;
        self.moving = false;
        self.pos = self.last_pos;
        self.target = tile_of(self.pos);
    }
}

#[derive(Debug, Default)]
pub struct MovementStore {
    records: BTreeMap<ActorId, MovementRecord>,
}

impl MovementStore {
    pub fn insert(&mut self, actor: ActorId, record: MovementRecord) {
        self.records.insert(actor, record);
    }

    pub fn remove(&mut self, actor: ActorId) -> Option<MovementRecord> {
        self.records.remove(&actor)
    }

    pub fn get(&self, actor: ActorId) -> Option<&MovementRecord> {
        self.records.get(&actor)
    }

    pub fn get_mut(&mut self, actor: ActorId) -> Option<&mut MovementRecord> {
        self.records.get_mut(&actor)
    }

    pub fn contains(&self, actor: ActorId) -> bool {
        self.records.contains_key(&actor)
    }

    /// All tracked ids in ascending order; the fixed iteration order every
    /// per-actor pass uses.
    pub fn actor_ids(&self) -> Vec<ActorId> {
        self.records.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ActorId, &MovementRecord)> {
        self.records.iter().map(|(id, record)| (*id, record))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn reset(&mut self) {
        self.records.clear();
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (ActorId, &mut MovementRecord)> {
        self.records.iter_mut().map(|(id, record)| (*id, record))
    }
}

/// Advances one axis toward its target line, holding there once reached so
/// an axis with the shorter remainder never overshoots while the other one
/// catches up.
fn step_axis(pos: f32, target: f32, dir: f32, step: f32) -> f32 {
    if dir == 0.0 {
        return pos;
    }
    let next = pos + dir * step;
    if dir > 0.0 {
        next.min(target)
    } else {
        next.max(target)
    }
}

fn quantize_axis(value: f32) -> f32 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Integrates continuous positions from move intents and snaps completed
/// moves onto the grid. Speed is bounded per actor and capped engine-wide
/// so per-step displacement stays bounded.
#[derive(Debug)]
pub struct MovementEngine {
    max_speed_cap: f32,
}

impl MovementEngine {
    pub fn new(max_speed_cap: f32) -> Self {
        Self { max_speed_cap }
    }

    /// Applies an input event `{actor, move, look}`. Feeding input for an
    /// actor without a movement record is a caller bug (asserted in debug,
    /// dropped in release).
    pub fn apply_input(
        &self,
        store: &mut MovementStore,
        events: &mut SimEvents,
        actor: ActorId,
        move_input: Vec2,
        look: Vec2,
    ) {
        let Some(record) = store.get_mut(actor) else {
            debug_assert!(false, "input event for actor without movement record: {actor:?}");
            return;
        };

        let look_len_sq = look.x * look.x + look.y * look.y;
        if look_len_sq > 0.0 {
            let inv_len = look_len_sq.sqrt().recip();
            record.look = Vec2 {
                x: look.x * inv_len,
                y: look.y * inv_len,
            };
        }

        let intent = Vec2 {
            x: quantize_axis(move_input.x),
            y: quantize_axis(move_input.y),
        };
        if intent == record.move_intent {
            return;
        }

        let was_moving = record.moving;
        record.move_intent = intent;

        if intent == Vec2::ZERO {
            record.moving = false;
            record.target = tile_of(record.pos);
            if was_moving {
                events.moves.publish(MoveEvent::Reached {
                    actor,
                    target: record.target,
                });
            }
            return;
        }

        let source = tile_of(record.pos);
        record.target = source.offset(intent.x as i32, intent.y as i32);
        record.moving = true;
        if !was_moving {
            events.moves.publish(MoveEvent::Left { actor, source });
        }
    }

    /// Advances every moving actor by one sub-step, in ascending ActorId
    /// order. Reaching the target snaps the position onto the cell center,
    /// emits the reached/left pair, and extends the glide one cell further
    /// along the unchanged intent.
    pub fn update(&self, store: &mut MovementStore, events: &mut SimEvents, dt: f32) {
        for (actor, record) in store.iter_mut() {
            if record.scene.is_none() || !record.moving {
                continue;
            }
            record.last_pos = record.pos;

            let speed = record.max_speed.min(self.max_speed_cap).max(0.0);
            let step = speed * dt;
            if step <= 0.0 {
                continue;
            }

            let target_pos = record.target.center();
            let mut arrived = true;
            if record.move_intent.x != 0.0 && (target_pos.x - record.pos.x).abs() > step {
                arrived = false;
            }
            if record.move_intent.y != 0.0 && (target_pos.y - record.pos.y).abs() > step {
                arrived = false;
            }

            if arrived {
                record.pos = target_pos;
                events.moves.publish(MoveEvent::Reached {
                    actor,
                    target: record.target,
                });
                events.moves.publish(MoveEvent::Left {
                    actor,
                    source: record.target,
                });
                record.target = record
                    .target
                    .offset(record.move_intent.x as i32, record.move_intent.y as i32);
            } else {
                record.pos.x = step_axis(record.pos.x, target_pos.x, record.move_intent.x, step);
                record.pos.y = step_axis(record.pos.y, target_pos.y, record.move_intent.y, step);
            }
        }
    }
}

use std::collections::BTreeMap;

use tracing::debug;

use super::events::{CollisionEvent, SimEvents, TeleportEvent};
use super::grid::{tile_of, ActorId, Dungeon, DungeonStore, SceneId, TileCoord, TriggerAction, Vec2};
use super::movement::{MovementRecord, MovementStore, ARRIVAL_EPSILON};

/// Collision footprint of an actor. All shapes are axis-aligned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Circle { radius: f32 },
    Aabb { half_width: f32, half_height: f32 },
}

impl Shape {
    /// Radius of the circumscribing circle, used for broad-phase pruning.
    fn circumscribed_radius(self) -> f32 {
        match self {
            Shape::Circle { radius } => radius,
            Shape::Aabb {
                half_width,
                half_height,
            } => (half_width * half_width + half_height * half_height).sqrt(),
        }
    }
}

/// Per-actor collision state. Absence of a record means the actor cannot
/// collide at all.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionRecord {
    shape: Shape,
    broad_radius: f32,
    is_projectile: bool,
    ignore: Vec<ActorId>,
}

impl CollisionRecord {
    pub fn circle(radius: f32, is_projectile: bool) -> Self {
        Self::from_shape(Shape::Circle { radius }, is_projectile)
    }

    pub fn aabb(width: f32, height: f32, is_projectile: bool) -> Self {
        Self::from_shape(
            Shape::Aabb {
                half_width: width / 2.0,
                half_height: height / 2.0,
            },
            is_projectile,
        )
    }

    fn from_shape(shape: Shape, is_projectile: bool) -> Self {
        Self {
            shape,
            broad_radius: shape.circumscribed_radius(),
            is_projectile,
            ignore: Vec::new(),
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Replaces the shape and recomputes the cached broad radius.
    pub fn set_shape(&mut self, shape: Shape) {
        self.shape = shape;
        self.broad_radius = shape.circumscribed_radius();
    }

    pub fn broad_radius(&self) -> f32 {
        self.broad_radius
    }

    pub fn is_projectile(&self) -> bool {
        self.is_projectile
    }

    pub fn ignores(&self, actor: ActorId) -> bool {
        self.ignore.contains(&actor)
    }

    pub fn add_ignore(&mut self, actor: ActorId) {
        if !self.ignore.contains(&actor) {
            self.ignore.push(actor);
        }
    }

    pub fn remove_ignore(&mut self, actor: ActorId) {
        self.ignore.retain(|id| *id != actor);
    }

    pub fn clear_ignore(&mut self) {
        self.ignore.clear();
    }
}

#[derive(Debug)]
pub struct CollisionStore {
    records: BTreeMap<ActorId, CollisionRecord>,
    max_projectile_radius: f32,
}

impl CollisionStore {
    pub fn new(max_projectile_radius: f32) -> Self {
        Self {
            records: BTreeMap::new(),
            max_projectile_radius,
        }
    }

    /// Registers a record. A projectile whose broad radius exceeds the
    /// configured maximum would outgrow the 3x3 broad-phase block; that is
    /// a caller bug.
    pub fn insert(&mut self, actor: ActorId, record: CollisionRecord) {
        debug_assert!(
            !record.is_projectile || record.broad_radius <= self.max_projectile_radius,
            "projectile broad radius {} exceeds configured maximum {}",
            record.broad_radius,
            self.max_projectile_radius,
        );
        self.records.insert(actor, record);
    }

    pub fn remove(&mut self, actor: ActorId) -> Option<CollisionRecord> {
        self.records.remove(&actor)
    }

    pub fn get(&self, actor: ActorId) -> Option<&CollisionRecord> {
        self.records.get(&actor)
    }

    pub fn get_mut(&mut self, actor: ActorId) -> Option<&mut CollisionRecord> {
        self.records.get_mut(&actor)
    }

    pub fn contains(&self, actor: ActorId) -> bool {
        self.records.contains_key(&actor)
    }

    pub fn reset(&mut self) {
        self.records.clear();
    }
}

/// One hit found during resolution. `collider` is `None` for terrain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionHit {
    pub actor: ActorId,
    pub collider: Option<ActorId>,
    pub pos: Vec2,
}

/// Outcome of one actor's per-tick resolution. `interrupt` means the
/// actor's motion must be zeroed this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionCheck {
    pub hits: Vec<CollisionHit>,
    pub interrupt: bool,
}

/// Detects and resolves collisions for moving actors and keeps the grid's
/// per-cell membership consistent with corrected positions.
#[derive(Debug, Default)]
pub struct CollisionEngine;

impl CollisionEngine {
    /// Pair eligibility and overlap test, evaluated from `a`'s perspective.
    ///
    /// Policy rejections (missing record, ignore-listed pair, regular actor
    /// checking against a projectile) return `false` without logging.
    pub fn check(
        &self,
        collision: &CollisionStore,
        a: ActorId,
        pos_a: Vec2,
        b: ActorId,
        pos_b: Vec2,
    ) -> bool {
        let Some(record_a) = collision.get(a) else {
            return false;
        };
        let Some(record_b) = collision.get(b) else {
            return false;
        };
        if record_a.ignores(b) {
            return false;
        }
        // One-directional exemption: a regular actor never collides into a
        // projectile; the projectile must issue the check itself.
        if !record_a.is_projectile && record_b.is_projectile {
            return false;
        }

        let dx = pos_b.x - pos_a.x;
        let dy = pos_b.y - pos_a.y;
        let distance_sq = dx * dx + dy * dy;
        let broad_sum = record_a.broad_radius + record_b.broad_radius;
        if distance_sq > broad_sum * broad_sum {
            return false;
        }

        Self::narrow(record_a.shape, pos_a, record_b.shape, pos_b)
    }

    fn narrow(shape_a: Shape, pos_a: Vec2, shape_b: Shape, pos_b: Vec2) -> bool {
        match (shape_a, shape_b) {
            (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
                let dx = pos_b.x - pos_a.x;
                let dy = pos_b.y - pos_a.y;
                let sum = ra + rb;
                dx * dx + dy * dy <= sum * sum
            }
            (Shape::Circle { radius }, Shape::Aabb { .. }) => {
                Self::circle_vs_aabb(pos_a, radius, shape_b, pos_b)
            }
            (Shape::Aabb { .. }, Shape::Circle { radius }) => {
                Self::circle_vs_aabb(pos_b, radius, shape_a, pos_a)
            }
            (
                Shape::Aabb {
                    half_width: hwa,
                    half_height: hha,
                },
                Shape::Aabb {
                    half_width: hwb,
                    half_height: hhb,
                },
            ) => {
                (pos_b.x - pos_a.x).abs() <= hwa + hwb && (pos_b.y - pos_a.y).abs() <= hha + hhb
            }
        }
    }

    fn circle_vs_aabb(center: Vec2, radius: f32, aabb: Shape, aabb_pos: Vec2) -> bool {
        let Shape::Aabb {
            half_width,
            half_height,
        } = aabb
        else {
            return false;
        };
        let clamped_x = center
            .x
            .clamp(aabb_pos.x - half_width, aabb_pos.x + half_width);
        let clamped_y = center
            .y
            .clamp(aabb_pos.y - half_height, aabb_pos.y + half_height);
        let dx = center.x - clamped_x;
        let dy = center.y - clamped_y;
        dx * dx + dy * dy <= radius * radius
    }

    /// Per-tick resolution for one moving actor against terrain and the 3x3
    /// cell block around its destination cell.
    ///
    /// Non-projectiles stop at the first hit (terrain checked first).
    /// Projectiles record a terrain hit, keep scanning, and collect every
    /// overlapping actor; only the terrain hit interrupts their travel.
    /// Scan order is fixed: rows ascending by y, cells ascending by x,
    /// actors in arrival order within a cell.
    pub fn check_any_collision(
        &self,
        dungeon: &Dungeon,
        movement: &MovementStore,
        collision: &CollisionStore,
        actor: ActorId,
        record: &MovementRecord,
    ) -> CollisionCheck {
        let mut hits = Vec::new();
        let mut interrupt = false;
        let (has_record, is_projectile) = match collision.get(actor) {
            Some(record) => (true, record.is_projectile()),
            None => (false, false),
        };

        let result_cell = tile_of(record.pos);
        let out_of_bounds = !dungeon.has(result_cell);
        if !has_record {
            // No collision record means the actor cannot collide with
            // terrain or neighbors, but the scene boundary still clamps it.
            return CollisionCheck {
                hits,
                interrupt: out_of_bounds,
            };
        }

        let tile_solid = out_of_bounds || dungeon.cell(result_cell).terrain().is_solid();
        if tile_solid {
            hits.push(CollisionHit {
                actor,
                collider: None,
                pos: record.pos,
            });
            interrupt = true;
            if !is_projectile {
                return CollisionCheck { hits, interrupt };
            }
        }

        let dest = record.target;
        'scan: for dy in -1..=1 {
            for dx in -1..=1 {
                let coord = dest.offset(dx, dy);
                if !dungeon.has(coord) {
                    continue;
                }
                for &other in dungeon.cell(coord).entities() {
                    if other == actor {
                        continue;
                    }
                    let Some(other_record) = movement.get(other) else {
                        continue;
                    };
                    if !self.check(collision, actor, record.pos, other, other_record.pos) {
                        continue;
                    }
                    hits.push(CollisionHit {
                        actor,
                        collider: Some(other),
                        pos: record.pos,
                    });
                    if !is_projectile {
                        interrupt = true;
                        break 'scan;
                    }
                }
            }
        }

        CollisionCheck { hits, interrupt }
    }

    /// Full-frame driver: resolves every mover in ascending ActorId order,
    /// applies interruption, keeps cell membership consistent, publishes
    /// collision events in detection order, and fires destination-cell
    /// triggers for non-projectiles that arrived.
    pub fn check_all_collisions(
        &self,
        dungeons: &mut DungeonStore,
        movement: &mut MovementStore,
        collision: &mut CollisionStore,
        events: &mut SimEvents,
    ) {
        for actor in movement.actor_ids() {
            let Some(record) = movement.get(actor).copied() else {
                continue;
            };
            let Some(scene) = record.scene else {
                continue;
            };
            // Collisions are only detected on movement.
            if !record.moving {
                continue;
            }

            let from_cell = tile_of(record.last_pos);
            let outcome = self.check_any_collision(
                dungeons.dungeon(scene),
                movement,
                collision,
                actor,
                &record,
            );

            if outcome.interrupt {
                if let Some(record) = movement.get_mut(actor) {
                    record.interrupt();
                }
            }

            let is_projectile = collision
                .get(actor)
                .map(CollisionRecord::is_projectile)
                .unwrap_or(false);
            if is_projectile {
                // Suppress re-reporting the same pair while they overlap on
                // later ticks.
                if let Some(record) = collision.get_mut(actor) {
                    for hit in &outcome.hits {
                        if let Some(other) = hit.collider {
                            record.add_ignore(other);
                        }
                    }
                }
            }

            let corrected = movement.get(actor).copied().unwrap_or(record);
            let to_cell = tile_of(corrected.pos);
            if to_cell != from_cell {
                Self::update_collision_map(dungeons.dungeon_mut(scene), actor, from_cell, to_cell);
            }

            for hit in &outcome.hits {
                events.collisions.publish(CollisionEvent {
                    actor: hit.actor,
                    collider: hit.collider,
                    pos: hit.pos,
                });
            }

            if !is_projectile && !outcome.interrupt {
                if let Some(arrived_cell) = Self::arrival_cell(&corrected) {
                    self.fire_trigger(dungeons, movement, events, actor, scene, arrived_cell);
                }
            }
        }
    }

    /// Cell the actor's motion just resolved onto, if the position rests on
    /// a cell center (arrival snapping writes centers exactly).
    fn arrival_cell(record: &MovementRecord) -> Option<TileCoord> {
        let cell = tile_of(record.pos);
        let on_center = (record.pos.x - cell.x as f32).abs() <= ARRIVAL_EPSILON
            && (record.pos.y - cell.y as f32).abs() <= ARRIVAL_EPSILON;
        if on_center && record.pos != record.last_pos {
            Some(cell)
        } else {
            None
        }
    }

    /// The one sanctioned membership mutation outside spawn/vanish:
    /// remove-then-insert, and only when the cell actually changed.
    fn update_collision_map(dungeon: &mut Dungeon, actor: ActorId, from: TileCoord, to: TileCoord) {
        dungeon.cell_mut(from).remove_entity(actor);
        dungeon.cell_mut(to).push_entity(actor);
    }

    fn fire_trigger(
        &self,
        dungeons: &mut DungeonStore,
        movement: &mut MovementStore,
        events: &mut SimEvents,
        actor: ActorId,
        scene: SceneId,
        coord: TileCoord,
    ) {
        let Some(mut trigger) = dungeons.dungeon_mut(scene).cell_mut(coord).take_trigger() else {
            return;
        };
        let action = trigger.execute(actor);
        if !trigger.is_expired() {
            dungeons
                .dungeon_mut(scene)
                .cell_mut(coord)
                .set_trigger(trigger);
        }

        if let Some(TriggerAction::Teleport {
            scene: dst_scene,
            pos: dst_pos,
        }) = action
        {
            let Some(record) = movement.get_mut(actor) else {
                return;
            };
            let src_pos = record.pos;
            dungeons.vanish(actor, record);
            dungeons.spawn(dst_scene, actor, record, dst_pos);
            debug!(
                actor = actor.0,
                src_scene = scene.0,
                dst_scene = dst_scene.0,
                "actor_teleported"
            );
            events.teleports.publish(TeleportEvent {
                actor,
                src_scene: scene,
                src_pos,
                dst_scene,
                dst_pos,
            });
        }
    }
}

use super::grid::{ActorId, SceneId, TileCoord, Vec2};

/// One typed FIFO channel. `publish` appends; `dispatch` drains in order,
/// invoking the listener exactly once per event, then leaves the queue
/// empty. Within one channel, order and single delivery are guaranteed;
/// ordering across channels is not.
#[derive(Debug)]
pub struct EventQueue<T> {
    events: Vec<T>,
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<T> EventQueue<T> {
    pub fn publish(&mut self, event: T) {
        self.events.push(event);
    }

    pub fn dispatch(&mut self, mut listener: impl FnMut(&T)) {
        let drained = std::mem::take(&mut self.events);
        for event in &drained {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

/// One detected hit. `collider` is `None` when the actor hit terrain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionEvent {
    pub actor: ActorId,
    pub collider: Option<ActorId>,
    pub pos: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveEvent {
    Left { actor: ActorId, source: TileCoord },
    Reached { actor: ActorId, target: TileCoord },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeleportEvent {
    pub actor: ActorId,
    pub src_scene: SceneId,
    pub src_pos: Vec2,
    pub dst_scene: SceneId,
    pub dst_pos: Vec2,
}

/// The event fabric: one queue per event kind, drained independently by
/// consumer systems after each update.
#[derive(Debug, Default)]
pub struct SimEvents {
    pub collisions: EventQueue<CollisionEvent>,
    pub moves: EventQueue<MoveEvent>,
    pub teleports: EventQueue<TeleportEvent>,
}

impl SimEvents {
    pub fn clear(&mut self) {
        self.collisions.clear();
        self.moves.clear();
        self.teleports.clear();
    }
}

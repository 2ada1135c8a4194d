use std::collections::{HashMap, HashSet};
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use engine::{
    ActorId, CollisionEvent, MetricsAccumulator, MoveEvent, Simulation, TeleportEvent, TileCoord,
};
use tracing::{debug, info};

use super::bootstrap::AppWiring;
use super::scenario::Scenario;

/// Stand-in for the combat system: counts hits and announces each new
/// colliding pair once.
#[derive(Default)]
struct CombatLog {
    hits_total: u64,
    terrain_hits: u64,
    announced_pairs: HashSet<(ActorId, Option<ActorId>)>,
}

impl CombatLog {
    fn on_collision(&mut self, event: &CollisionEvent) {
        self.hits_total = self.hits_total.saturating_add(1);
        if event.collider.is_none() {
            self.terrain_hits = self.terrain_hits.saturating_add(1);
        }
        if self.announced_pairs.insert((event.actor, event.collider)) {
            match event.collider {
                Some(other) => info!(actor = event.actor.0, other = other.0, "combat_contact"),
                None => debug!(actor = event.actor.0, "terrain_contact"),
            }
        }
    }
}

/// Stand-in for the focus/vision system: follows which cell each actor
/// last resolved onto.
#[derive(Default)]
struct FocusTracker {
    cell_by_actor: HashMap<ActorId, TileCoord>,
    transitions: u64,
}

impl FocusTracker {
    fn on_move(&mut self, event: &MoveEvent) {
        if let MoveEvent::Reached { actor, target } = event {
            let previous = self.cell_by_actor.insert(*actor, *target);
            if previous != Some(*target) {
                self.transitions = self.transitions.saturating_add(1);
                debug!(actor = actor.0, x = target.x, y = target.y, "focus_cell_changed");
            }
        }
    }

    #[cfg(test)]
    fn cell_of(&self, actor: ActorId) -> Option<TileCoord> {
        self.cell_by_actor.get(&actor).copied()
    }
}

/// Stand-in for the audio system: chimes on every teleport.
#[derive(Default)]
struct PortalChime {
    teleports: u64,
}

impl PortalChime {
    fn on_teleport(&mut self, event: &TeleportEvent) {
        self.teleports = self.teleports.saturating_add(1);
        info!(
            actor = event.actor.0,
            src_scene = event.src_scene.0,
            dst_scene = event.dst_scene.0,
            "portal_chime"
        );
    }
}

fn dispatch_events(
    sim: &mut Simulation,
    combat: &mut CombatLog,
    focus: &mut FocusTracker,
    portal: &mut PortalChime,
) -> u32 {
    let mut delivered = 0u32;
    let events = sim.events_mut();
    events.collisions.dispatch(|event| {
        combat.on_collision(event);
        delivered = delivered.saturating_add(1);
    });
    events.moves.dispatch(|event| {
        focus.on_move(event);
        delivered = delivered.saturating_add(1);
    });
    events.teleports.dispatch(|event| {
        portal.on_teleport(event);
        delivered = delivered.saturating_add(1);
    });
    delivered
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let config = app.config;
    let mut sim = Simulation::new(config.sim);
    let mut scenario = Scenario::build(&mut sim);
    let mut combat = CombatLog::default();
    let mut focus = FocusTracker::default();
    let mut portal = PortalChime::default();

    let run_window = Duration::from_secs_f32(config.run_seconds.max(0.0));
    let max_frame_delta = Duration::from_millis(config.max_frame_delta_ms.max(1));
    let mut metrics = MetricsAccumulator::new(Duration::from_millis(
        config.metrics_log_interval_ms.max(1),
    ));
    let frame_pause = sim.config().fixed_dt();
    info!(
        run_seconds = config.run_seconds,
        max_frame_delta_ms = config.max_frame_delta_ms,
        target_tps = sim.config().target_tps,
        "loop_config"
    );

    let started = Instant::now();
    let mut last_frame = started;
    while started.elapsed() < run_window {
        let now = Instant::now();
        let mut frame_delta = now.saturating_duration_since(last_frame);
        last_frame = now;
        // The engine sub-steps internally; the clamp here keeps a stalled
        // frame from turning into a burst of catch-up work.
        if frame_delta > max_frame_delta {
            debug!(
                frame_delta_ms = frame_delta.as_millis() as u64,
                "frame_delta_clamped"
            );
            frame_delta = max_frame_delta;
        }

        scenario.drive(&mut sim, started.elapsed().as_secs_f32());
        let steps = sim.advance(frame_delta);
        let delivered = dispatch_events(&mut sim, &mut combat, &mut focus, &mut portal);

        metrics.record_frame(frame_delta);
        metrics.record_steps(steps);
        metrics.record_events(delivered);
        if let Some(snapshot) = metrics.maybe_snapshot(Instant::now()) {
            info!(
                fps = snapshot.fps,
                steps_per_second = snapshot.steps_per_second,
                events_per_second = snapshot.events_per_second,
                frame_time_ms = snapshot.frame_time_ms,
                "metrics"
            );
        }

        thread::sleep(frame_pause);
    }

    info!(
        hits = combat.hits_total,
        terrain_hits = combat.terrain_hits,
        cell_transitions = focus.transitions,
        teleports = portal.teleports,
        "=== demo complete ==="
    );
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use engine::{SceneId, Vec2};

    use super::*;

    #[test]
    fn combat_log_counts_every_hit_but_announces_pairs_once() {
        let mut combat = CombatLog::default();
        let hit = CollisionEvent {
            actor: ActorId(1),
            collider: Some(ActorId(2)),
            pos: Vec2 { x: 1.0, y: 1.0 },
        };
        combat.on_collision(&hit);
        combat.on_collision(&hit);
        combat.on_collision(&CollisionEvent {
            actor: ActorId(1),
            collider: None,
            pos: Vec2 { x: 2.0, y: 1.0 },
        });

        assert_eq!(combat.hits_total, 3);
        assert_eq!(combat.terrain_hits, 1);
        assert_eq!(combat.announced_pairs.len(), 2);
    }

    #[test]
    fn focus_tracker_follows_reached_cells() {
        let mut focus = FocusTracker::default();
        let actor = ActorId(5);
        focus.on_move(&MoveEvent::Left {
            actor,
            source: TileCoord { x: 1, y: 1 },
        });
        assert_eq!(focus.cell_of(actor), None);

        focus.on_move(&MoveEvent::Reached {
            actor,
            target: TileCoord { x: 2, y: 1 },
        });
        focus.on_move(&MoveEvent::Reached {
            actor,
            target: TileCoord { x: 2, y: 1 },
        });
        focus.on_move(&MoveEvent::Reached {
            actor,
            target: TileCoord { x: 3, y: 1 },
        });

        assert_eq!(focus.cell_of(actor), Some(TileCoord { x: 3, y: 1 }));
        assert_eq!(focus.transitions, 2);
    }

    #[test]
    fn portal_chime_counts_teleports() {
        let mut portal = PortalChime::default();
        portal.on_teleport(&TeleportEvent {
            actor: ActorId(2),
            src_scene: SceneId(1),
            src_pos: Vec2 { x: 4.0, y: 5.0 },
            dst_scene: SceneId(2),
            dst_pos: Vec2 { x: 2.0, y: 2.0 },
        });
        assert_eq!(portal.teleports, 1);
    }

    #[test]
    fn dispatch_events_delivers_every_queued_event_once() {
        let mut sim = Simulation::new(engine::SimConfig::default());
        sim.events_mut().collisions.publish(CollisionEvent {
            actor: ActorId(1),
            collider: None,
            pos: Vec2::ZERO,
        });
        sim.events_mut().moves.publish(MoveEvent::Reached {
            actor: ActorId(1),
            target: TileCoord { x: 0, y: 0 },
        });

        let mut combat = CombatLog::default();
        let mut focus = FocusTracker::default();
        let mut portal = PortalChime::default();
        assert_eq!(
            dispatch_events(&mut sim, &mut combat, &mut focus, &mut portal),
            2
        );
        assert_eq!(
            dispatch_events(&mut sim, &mut combat, &mut focus, &mut portal),
            0
        );
    }
}

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, info};

use super::movement::MovementRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };
}

/// Discrete cell coordinate. Signed so that `tile_of(pos) + move` is always
/// representable at the map edge; out-of-range coordinates fail the bounds
/// check instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub fn center(self) -> Vec2 {
        Vec2 {
            x: self.x as f32,
            y: self.y as f32,
        }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Cell nearest to a continuous position. Cell (x, y) is centered on the
/// world point (x, y), so this is a plain per-axis round.
pub fn tile_of(pos: Vec2) -> TileCoord {
    TileCoord {
        x: pos.x.round() as i32,
        y: pos.y.round() as i32,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActorId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SceneId(pub u32);

/// Allocates nonzero actor ids. Ids are never reused while the actor is
/// alive; `release` returns an id to the free list for recycling.
#[derive(Debug, Default)]
pub struct ActorIdAllocator {
    next: u64,
    free: Vec<ActorId>,
}

impl ActorIdAllocator {
    pub fn allocate(&mut self) -> ActorId {
        if let Some(id) = self.free.pop() {
            return id;
        }
        self.next = self.next.saturating_add(1);
        ActorId(self.next)
    }

    pub fn release(&mut self, id: ActorId) {
        debug_assert!(!self.free.contains(&id), "double release of {id:?}");
        self.free.push(id);
    }

    pub fn reset(&mut self) {
        self.next = 0;
        self.free.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terrain {
    Void,
    Wall,
    Floor,
}

impl Terrain {
    /// Both `Void` and `Wall` block movement; only `Floor` is passable.
    pub fn is_solid(self) -> bool {
        !matches!(self, Terrain::Floor)
    }
}

/// Side effect requested by a fired trigger. Triggers hold no references
/// into the stores; the collision engine applies the action after the
/// trigger returns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TriggerAction {
    Teleport { scene: SceneId, pos: Vec2 },
}

pub trait Trigger {
    fn execute(&mut self, actor: ActorId) -> Option<TriggerAction>;
    fn is_expired(&self) -> bool;
}

pub struct Cell {
    terrain: Terrain,
    entities: Vec<ActorId>,
    trigger: Option<Box<dyn Trigger>>,
    decorations: Vec<u16>,
}

impl Cell {
    fn new(terrain: Terrain) -> Self {
        Self {
            terrain,
            entities: Vec::new(),
            trigger: None,
            decorations: Vec::new(),
        }
    }

    pub fn terrain(&self) -> Terrain {
        self.terrain
    }

    /// Actor ids registered on this cell, in arrival order.
    pub fn entities(&self) -> &[ActorId] {
        &self.entities
    }

    pub fn contains(&self, actor: ActorId) -> bool {
        self.entities.contains(&actor)
    }

    pub(crate) fn push_entity(&mut self, actor: ActorId) {
        debug_assert!(!self.entities.contains(&actor), "{actor:?} already on cell");
        self.entities.push(actor);
    }

    pub(crate) fn remove_entity(&mut self, actor: ActorId) {
        self.entities.retain(|id| *id != actor);
    }

    pub fn has_trigger(&self) -> bool {
        self.trigger.is_some()
    }

    pub fn set_trigger(&mut self, trigger: Box<dyn Trigger>) {
        self.trigger = Some(trigger);
    }

    pub(crate) fn take_trigger(&mut self) -> Option<Box<dyn Trigger>> {
        self.trigger.take()
    }

    pub fn add_decoration(&mut self, decoration: u16) {
        self.decorations.push(decoration);
    }

    pub fn decorations(&self) -> &[u16] {
        &self.decorations
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TerrainSourceError {
    #[error("terrain count mismatch: expected {expected}, got {actual}")]
    TerrainCountMismatch { expected: usize, actual: usize },
    #[error("row {row} has width {actual}, expected {expected}")]
    UnevenRows {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("unknown terrain glyph '{glyph}' at row {row}, column {column}")]
    UnknownGlyph {
        glyph: char,
        row: usize,
        column: usize,
    },
    #[error("terrain source is empty")]
    Empty,
}

/// Row-major terrain layout handed to `DungeonStore::create` by the
/// external map-building layer. Row 0 is y = 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerrainSource {
    width: u32,
    height: u32,
    terrain: Vec<Terrain>,
}

impl TerrainSource {
    pub fn new(width: u32, height: u32, terrain: Vec<Terrain>) -> Result<Self, TerrainSourceError> {
        let expected = width as usize * height as usize;
        if expected == 0 {
            return Err(TerrainSourceError::Empty);
        }
        if terrain.len() != expected {
            return Err(TerrainSourceError::TerrainCountMismatch {
                expected,
                actual: terrain.len(),
            });
        }
        Ok(Self {
            width,
            height,
            terrain,
        })
    }

    pub fn filled(width: u32, height: u32, terrain: Terrain) -> Result<Self, TerrainSourceError> {
        Self::new(width, height, vec![terrain; width as usize * height as usize])
    }

    /// Parses an ASCII map: `#` wall, `.` floor, space void. All lines must
    /// have the same width; the first line is row y = 0.
    pub fn from_ascii(map: &str) -> Result<Self, TerrainSourceError> {
        let all_lines: Vec<&str> = map.lines().collect();
        let start = all_lines.iter().position(|line| !line.is_empty());
        let end = all_lines.iter().rposition(|line| !line.is_empty());
        let (Some(start), Some(end)) = (start, end) else {
            return Err(TerrainSourceError::Empty);
        };
        let lines = &all_lines[start..=end];

        let width = lines[0].chars().count();
        let mut terrain = Vec::with_capacity(width * lines.len());
        for (row, line) in lines.iter().enumerate() {
            let actual = line.chars().count();
            if actual != width {
                return Err(TerrainSourceError::UnevenRows {
                    row,
                    expected: width,
                    actual,
                });
            }
            for (column, glyph) in line.chars().enumerate() {
                terrain.push(match glyph {
                    '#' => Terrain::Wall,
                    '.' => Terrain::Floor,
                    ' ' => Terrain::Void,
                    other => {
                        return Err(TerrainSourceError::UnknownGlyph {
                            glyph: other,
                            row,
                            column,
                        })
                    }
                });
            }
        }

        Self::new(width as u32, lines.len() as u32, terrain)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// One grid instance. Cells live for the lifetime of the scene; entity
/// membership is mutated only through `DungeonStore::spawn`/`vanish` and the
/// collision engine's membership update.
pub struct Dungeon {
    width: u32,
    height: u32,
    tile_size: f32,
    cells: Vec<Cell>,
}

impl Dungeon {
    fn new(source: &TerrainSource, tile_size: f32) -> Self {
        let cells = source.terrain.iter().map(|&t| Cell::new(t)).collect();
        Self {
            width: source.width,
            height: source.height,
            tile_size,
            cells,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    /// Screen-space position of a world point. Pure conversion.
    pub fn to_screen(&self, pos: Vec2) -> Vec2 {
        Vec2 {
            x: pos.x * self.tile_size,
            y: pos.y * self.tile_size,
        }
    }

    fn index_of(&self, coord: TileCoord) -> Option<usize> {
        if coord.x < 0 || coord.y < 0 {
            return None;
        }
        let (x, y) = (coord.x as u32, coord.y as u32);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn has(&self, coord: TileCoord) -> bool {
        self.index_of(coord).is_some()
    }

    /// Cell at `coord`. Out-of-bounds access is a caller bug.
    pub fn cell(&self, coord: TileCoord) -> &Cell {
        let index = self
            .index_of(coord)
            .unwrap_or_else(|| panic!("cell access out of bounds: {coord:?}"));
        &self.cells[index]
    }

    pub fn cell_mut(&mut self, coord: TileCoord) -> &mut Cell {
        let index = self
            .index_of(coord)
            .unwrap_or_else(|| panic!("cell access out of bounds: {coord:?}"));
        &mut self.cells[index]
    }
}

/// Owns every live scene. Ids start at 1 and are unique for the store's
/// lifetime.
#[derive(Default)]
pub struct DungeonStore {
    scenes: BTreeMap<SceneId, Dungeon>,
    next_scene: u32,
}

impl DungeonStore {
    pub fn create(&mut self, source: &TerrainSource, tile_size: f32) -> SceneId {
        self.next_scene = self.next_scene.saturating_add(1);
        let scene = SceneId(self.next_scene);
        self.scenes.insert(scene, Dungeon::new(source, tile_size));
        info!(
            scene = scene.0,
            width = source.width(),
            height = source.height(),
            "scene_created"
        );
        scene
    }

    pub fn has_scene(&self, scene: SceneId) -> bool {
        self.scenes.contains_key(&scene)
    }

    /// Scene lookup. An unknown id is a caller bug.
    pub fn dungeon(&self, scene: SceneId) -> &Dungeon {
        self.scenes
            .get(&scene)
            .unwrap_or_else(|| panic!("unknown scene: {scene:?}"))
    }

    pub fn dungeon_mut(&mut self, scene: SceneId) -> &mut Dungeon {
        self.scenes
            .get_mut(&scene)
            .unwrap_or_else(|| panic!("unknown scene: {scene:?}"))
    }

    /// Places an actor into a scene: initializes the movement record's
    /// position bookkeeping and registers the id on the destination cell.
    /// Spawn validity (not inside solid terrain) is the caller's concern.
    pub fn spawn(&mut self, scene: SceneId, actor: ActorId, record: &mut MovementRecord, pos: Vec2) {
        let cell_coord = tile_of(pos);
        let dungeon = self.dungeon_mut(scene);
        dungeon.cell_mut(cell_coord).push_entity(actor);
        record.scene = Some(scene);
        record.pos = pos;
        record.last_pos = pos;
        record.target = cell_coord;
        debug!(actor = actor.0, scene = scene.0, "actor_placed");
    }

    /// Removes an actor from its scene's cell index and clears its scene.
    pub fn vanish(&mut self, actor: ActorId, record: &mut MovementRecord) {
        let Some(scene) = record.scene else {
            return;
        };
        let cell_coord = tile_of(record.pos);
        self.dungeon_mut(scene).cell_mut(cell_coord).remove_entity(actor);
        record.scene = None;
        debug!(actor = actor.0, scene = scene.0, "actor_vanished");
    }

    pub fn attach_trigger(&mut self, scene: SceneId, coord: TileCoord, trigger: Box<dyn Trigger>) {
        self.dungeon_mut(scene).cell_mut(coord).set_trigger(trigger);
    }

    pub fn reset(&mut self) {
        self.scenes.clear();
        self.next_scene = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor_source(width: u32, height: u32) -> TerrainSource {
        TerrainSource::filled(width, height, Terrain::Floor).expect("source")
    }

    #[test]
    fn terrain_solidity_matches_classification() {
        assert!(Terrain::Void.is_solid());
        assert!(Terrain::Wall.is_solid());
        assert!(!Terrain::Floor.is_solid());
    }

    #[test]
    fn tile_of_rounds_to_nearest_cell() {
        assert_eq!(tile_of(Vec2 { x: 1.4, y: 2.6 }), TileCoord { x: 1, y: 3 });
        assert_eq!(tile_of(Vec2 { x: -0.4, y: 0.0 }), TileCoord { x: 0, y: 0 });
    }

    #[test]
    fn allocator_hands_out_nonzero_unique_ids() {
        let mut allocator = ActorIdAllocator::default();
        let first = allocator.allocate();
        let second = allocator.allocate();
        assert_eq!(first, ActorId(1));
        assert_eq!(second, ActorId(2));
    }

    #[test]
    fn allocator_recycles_only_after_release() {
        let mut allocator = ActorIdAllocator::default();
        let first = allocator.allocate();
        let _second = allocator.allocate();
        assert_ne!(allocator.allocate(), first);

        allocator.release(first);
        assert_eq!(allocator.allocate(), first);
    }

    #[test]
    fn terrain_source_rejects_count_mismatch() {
        let err = TerrainSource::new(2, 2, vec![Terrain::Floor; 3]).expect_err("err");
        assert_eq!(
            err,
            TerrainSourceError::TerrainCountMismatch {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn ascii_source_parses_all_glyphs() {
        let source = TerrainSource::from_ascii("#.#\n. .\n###").expect("source");
        assert_eq!(source.width(), 3);
        assert_eq!(source.height(), 3);

        let mut store = DungeonStore::default();
        let scene = store.create(&source, 16.0);
        let dungeon = store.dungeon(scene);
        assert_eq!(dungeon.cell(TileCoord { x: 0, y: 0 }).terrain(), Terrain::Wall);
        assert_eq!(dungeon.cell(TileCoord { x: 1, y: 0 }).terrain(), Terrain::Floor);
        assert_eq!(dungeon.cell(TileCoord { x: 1, y: 1 }).terrain(), Terrain::Void);
        assert_eq!(dungeon.cell(TileCoord { x: 2, y: 2 }).terrain(), Terrain::Wall);
    }

    #[test]
    fn ascii_source_rejects_uneven_rows() {
        let err = TerrainSource::from_ascii("###\n##").expect_err("err");
        assert_eq!(
            err,
            TerrainSourceError::UnevenRows {
                row: 1,
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn ascii_source_rejects_unknown_glyph() {
        let err = TerrainSource::from_ascii("#?#").expect_err("err");
        assert_eq!(
            err,
            TerrainSourceError::UnknownGlyph {
                glyph: '?',
                row: 0,
                column: 1
            }
        );
    }

    #[test]
    fn has_probes_bounds_without_panicking() {
        let mut store = DungeonStore::default();
        let scene = store.create(&floor_source(4, 3), 16.0);
        let dungeon = store.dungeon(scene);
        assert!(dungeon.has(TileCoord { x: 0, y: 0 }));
        assert!(dungeon.has(TileCoord { x: 3, y: 2 }));
        assert!(!dungeon.has(TileCoord { x: 4, y: 0 }));
        assert!(!dungeon.has(TileCoord { x: 0, y: 3 }));
        assert!(!dungeon.has(TileCoord { x: -1, y: 0 }));
    }

    #[test]
    #[should_panic(expected = "cell access out of bounds")]
    fn cell_access_out_of_bounds_panics() {
        let mut store = DungeonStore::default();
        let scene = store.create(&floor_source(2, 2), 16.0);
        let _ = store.dungeon(scene).cell(TileCoord { x: 5, y: 0 });
    }

    #[test]
    fn to_screen_scales_by_tile_size() {
        let mut store = DungeonStore::default();
        let scene = store.create(&floor_source(2, 2), 32.0);
        let screen = store.dungeon(scene).to_screen(Vec2 { x: 1.5, y: 0.5 });
        assert_eq!(screen, Vec2 { x: 48.0, y: 16.0 });
    }

    #[test]
    fn scene_ids_are_unique_and_nonzero() {
        let mut store = DungeonStore::default();
        let first = store.create(&floor_source(2, 2), 16.0);
        let second = store.create(&floor_source(2, 2), 16.0);
        assert_ne!(first.0, 0);
        assert_ne!(first, second);
    }

    #[test]
    fn spawn_and_vanish_update_cell_membership() {
        let mut store = DungeonStore::default();
        let scene = store.create(&floor_source(4, 4), 16.0);
        let actor = ActorId(7);
        let mut record = MovementRecord::new(4.0);

        store.spawn(scene, actor, &mut record, Vec2 { x: 2.0, y: 1.0 });
        assert_eq!(record.scene, Some(scene));
        assert_eq!(record.target, TileCoord { x: 2, y: 1 });
        assert!(store
            .dungeon(scene)
            .cell(TileCoord { x: 2, y: 1 })
            .contains(actor));

        store.vanish(actor, &mut record);
        assert_eq!(record.scene, None);
        assert!(!store
            .dungeon(scene)
            .cell(TileCoord { x: 2, y: 1 })
            .contains(actor));
    }

    #[test]
    fn cell_entities_keep_arrival_order() {
        let mut store = DungeonStore::default();
        let scene = store.create(&floor_source(2, 2), 16.0);
        let pos = Vec2 { x: 0.0, y: 0.0 };
        for id in [3u64, 1, 2] {
            let mut record = MovementRecord::new(1.0);
            store.spawn(scene, ActorId(id), &mut record, pos);
        }
        let cell = store.dungeon(scene).cell(TileCoord { x: 0, y: 0 });
        assert_eq!(cell.entities(), &[ActorId(3), ActorId(1), ActorId(2)]);
    }

    #[test]
    fn reset_drops_all_scenes() {
        let mut store = DungeonStore::default();
        let scene = store.create(&floor_source(2, 2), 16.0);
        store.reset();
        assert!(!store.has_scene(scene));
    }

    struct CountingTrigger {
        fired: u32,
    }

    impl Trigger for CountingTrigger {
        fn execute(&mut self, _actor: ActorId) -> Option<TriggerAction> {
            self.fired += 1;
            None
        }

        fn is_expired(&self) -> bool {
            self.fired > 0
        }
    }

    #[test]
    fn decorations_accumulate_on_a_cell() {
        let mut store = DungeonStore::default();
        let scene = store.create(&floor_source(2, 2), 16.0);
        let cell = store.dungeon_mut(scene).cell_mut(TileCoord { x: 1, y: 0 });
        cell.add_decoration(12);
        cell.add_decoration(7);
        assert_eq!(
            store.dungeon(scene).cell(TileCoord { x: 1, y: 0 }).decorations(),
            &[12, 7]
        );
    }

    #[test]
    fn trigger_slot_is_exclusive_and_takeable() {
        let mut store = DungeonStore::default();
        let scene = store.create(&floor_source(2, 2), 16.0);
        let coord = TileCoord { x: 1, y: 1 };
        store.attach_trigger(scene, coord, Box::new(CountingTrigger { fired: 0 }));
        assert!(store.dungeon(scene).cell(coord).has_trigger());

        let taken = store.dungeon_mut(scene).cell_mut(coord).take_trigger();
        assert!(taken.is_some());
        assert!(!store.dungeon(scene).cell(coord).has_trigger());
    }
}

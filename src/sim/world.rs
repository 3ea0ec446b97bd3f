//! World orchestration
//!
//! The world owns its entities in a `Vec` kept sorted by id. To advance one
//! entity it is taken out of the vector, handed a [`Scene`] borrowing the
//! grid and the remaining entities, and put back in place. Entities that
//! end up terminated are swept into a graveyard after each operation.

use glam::{DVec2, IVec2};
use serde::{Deserialize, Serialize};

use super::behaviour;
use super::collision::{self, PixelBox, WorldBounds};
use super::entity::{Entity, EntityId, Kind};
use super::grid::TileGrid;
use super::material::Material;
use super::player::{self, Action};
use super::school::{self, School, SchoolId};
use super::stepper::Scene;
use crate::consts::*;
use crate::error::{SimError, SimResult};
use crate::settings::Settings;

/// Visible window, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Serializable view of a world for logging and debugging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub time: f64,
    pub started: bool,
    pub terminated: bool,
    pub viewport: Viewport,
    pub player: Option<EntityId>,
    pub reached_target: bool,
    pub entities: Vec<Entity>,
    pub schools: Vec<School>,
}

#[derive(Debug)]
pub struct World {
    grid: TileGrid,
    bounds: WorldBounds,
    target_tile: IVec2,
    viewport: Viewport,
    settings: Settings,
    /// Sorted by id
    entities: Vec<Entity>,
    schools: Vec<School>,
    graveyard: Vec<Entity>,
    player: Option<EntityId>,
    started: bool,
    terminated: bool,
    time: f64,
    next_id: u32,
}

impl World {
    /// Create an empty world; the viewport must fit inside the grid
    pub fn new(
        grid: TileGrid,
        target_tile: IVec2,
        viewport_size: IVec2,
        settings: Settings,
    ) -> SimResult<Self> {
        let bounds = WorldBounds::of(&grid);
        if viewport_size.x <= 0
            || viewport_size.y <= 0
            || viewport_size.x > bounds.width
            || viewport_size.y > bounds.height
        {
            return Err(SimError::InvalidViewport {
                width: viewport_size.x,
                height: viewport_size.y,
            });
        }
        Ok(Self {
            grid,
            bounds,
            target_tile,
            viewport: Viewport {
                x: 0,
                y: 0,
                width: viewport_size.x,
                height: viewport_size.y,
            },
            settings,
            entities: Vec::new(),
            schools: Vec::new(),
            graveyard: Vec::new(),
            player: None,
            started: false,
            terminated: false,
            time: 0.0,
            next_id: 1,
        })
    }

    // === Queries ===

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn bounds(&self) -> WorldBounds {
        self.bounds
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn target_tile(&self) -> IVec2 {
        self.target_tile
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Simulated seconds since creation
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.entities.iter().filter_map(Entity::id).collect()
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.index_of(id).ok().map(|idx| &self.entities[idx])
    }

    pub fn player(&self) -> Option<&Entity> {
        self.player.and_then(|id| self.entity(id))
    }

    pub fn schools(&self) -> &[School] {
        &self.schools
    }

    /// Player box overlaps the target tile
    pub fn reached_target(&self) -> bool {
        let Some(player) = self.player() else {
            return false;
        };
        let len = self.grid.tile_length();
        let tile = PixelBox::new(self.target_tile.x * len, self.target_tile.y * len, len, len);
        player.bbox().overlaps(&tile)
    }

    /// No living player left, or the player made it to the target
    pub fn is_game_over(&self) -> bool {
        match self.player() {
            None => true,
            Some(player) => player.is_dead() || self.reached_target(),
        }
    }

    pub fn did_player_win(&self) -> bool {
        self.player().is_some_and(|p| !p.is_dead()) && self.reached_target()
    }

    // === Population ===

    fn index_of(&self, id: EntityId) -> SimResult<usize> {
        self.entities
            .binary_search_by_key(&Some(id), Entity::id)
            .map_err(|_| SimError::UnknownEntity(id))
    }

    fn live_school(&self, id: SchoolId) -> SimResult<&School> {
        let school = self
            .schools
            .iter()
            .find(|s| s.id == id)
            .ok_or(SimError::UnknownSchool(id))?;
        if school.terminated {
            return Err(SimError::SchoolTerminated);
        }
        Ok(school)
    }

    /// Whether a solid kind would start wedged inside impassable terrain
    fn wedged(&self, kind: Kind, bbox: PixelBox) -> bool {
        matches!(kind, Kind::Player | Kind::Slime | Kind::Shark)
            && collision::overlaps_impassable(&self.grid, bbox)
            && !collision::rests_in_surface(&self.grid, bbox)
    }

    /// Add an entity before the world starts
    ///
    /// One slot of the capacity is reserved for the player until it joins.
    pub fn add_entity(&mut self, mut entity: Entity) -> SimResult<EntityId> {
        if self.terminated {
            return Err(SimError::WorldTerminated);
        }
        if self.started {
            return Err(SimError::WorldStarted);
        }
        if entity.is_terminated() {
            return Err(SimError::EntityTerminated);
        }
        if entity.id().is_some() {
            return Err(SimError::AlreadyInWorld);
        }
        let capacity = self.settings.max_entities;
        let is_player = entity.kind() == Kind::Player;
        if is_player && self.player.is_some() {
            return Err(SimError::SecondPlayer);
        }
        let reserved = usize::from(self.player.is_none() && !is_player);
        if self.entities.len() + reserved >= capacity {
            return Err(SimError::CapacityReached(capacity));
        }
        if self.wedged(entity.kind(), entity.bbox()) {
            return Err(SimError::StartsInTerrain);
        }
        if let Some(ident) = entity.slime_ident() {
            if self.entities.iter().any(|e| e.slime_ident() == Some(ident)) {
                return Err(SimError::DuplicateSlime(ident));
            }
        }
        if let Some(school) = entity.school() {
            self.live_school(school)?;
        }

        let id = EntityId(self.next_id);
        self.next_id += 1;
        entity.id = Some(id);
        log::debug!("{:?} {:?} added at {:?}", entity.kind(), id, entity.pixel());
        self.entities.push(entity);
        if is_player {
            self.player = Some(id);
            self.update_viewport();
        }
        Ok(id)
    }

    /// Take an entity out of the world; it keeps its state but loses its id
    pub fn remove_entity(&mut self, id: EntityId) -> SimResult<Entity> {
        let idx = self.index_of(id)?;
        let mut entity = self.entities.remove(idx);
        entity.id = None;
        if self.player == Some(id) {
            self.player = None;
            self.update_viewport();
        }
        Ok(entity)
    }

    /// Terminate an entity; a corpse has to finish its death delay first
    pub fn terminate_entity(&mut self, id: EntityId) -> SimResult<()> {
        let idx = self.index_of(id)?;
        let entity = &mut self.entities[idx];
        if entity.is_dead() && !entity.death_delay_over() {
            return Err(SimError::DeathDelayPending {
                elapsed: entity.death_delay(),
            });
        }
        entity.terminate();
        self.sweep();
        Ok(())
    }

    /// Teleport an entity to `pos` (world units) inside the world
    pub fn set_position(&mut self, id: EntityId, pos: DVec2) -> SimResult<()> {
        let idx = self.index_of(id)?;
        let entity = &self.entities[idx];
        if entity.is_terminated() {
            return Err(SimError::EntityTerminated);
        }
        let pixel = crate::pixel_of(pos);
        if !pos.is_finite() || self.bounds.excludes(pixel.x, pixel.y) {
            return Err(SimError::InvalidPosition { x: pos.x, y: pos.y });
        }
        if self.wedged(entity.kind(), entity.bbox_at(pixel)) {
            return Err(SimError::StartsInTerrain);
        }
        self.entities[idx].place(pos)?;
        if self.player == Some(id) {
            self.update_viewport();
        }
        Ok(())
    }

    /// Change the material of the tile holding pixel `(px, py)`
    pub fn set_material(&mut self, px: i32, py: i32, material: Material) -> SimResult<()> {
        if self.terminated {
            return Err(SimError::WorldTerminated);
        }
        self.grid.set_material_at(px, py, material)
    }

    // === Schools ===

    pub fn create_school(&mut self) -> SimResult<SchoolId> {
        if self.terminated {
            return Err(SimError::WorldTerminated);
        }
        let limit = self.settings.max_schools;
        if self.schools.iter().filter(|s| !s.terminated).count() >= limit {
            return Err(SimError::SchoolLimit(limit));
        }
        let id = SchoolId(self.schools.len() as u32);
        self.schools.push(School::new(id));
        Ok(id)
    }

    fn slime_index(&self, id: EntityId) -> SimResult<usize> {
        let idx = self.index_of(id)?;
        let entity = &self.entities[idx];
        if entity.kind() != Kind::Slime {
            return Err(SimError::NotASlime(entity.kind()));
        }
        if entity.is_terminated() {
            return Err(SimError::EntityTerminated);
        }
        Ok(idx)
    }

    /// Put a slime without a school into one; no hit points change hands
    pub fn join_school(&mut self, slime: EntityId, school: SchoolId) -> SimResult<()> {
        let idx = self.slime_index(slime)?;
        self.live_school(school)?;
        if self.entities[idx].school().is_some() {
            return Err(SimError::AlreadyInSchool);
        }
        self.entities[idx].set_school(Some(school));
        Ok(())
    }

    /// Move a slime to another school, trading hit points with both groups
    pub fn switch_school(&mut self, slime: EntityId, school: SchoolId) -> SimResult<()> {
        let idx = self.slime_index(slime)?;
        self.live_school(school)?;
        if self.entities[idx].school().is_none() {
            return Err(SimError::NoSchool);
        }
        self.with_entity(slime, |entity, scene| {
            school::transfer(entity, scene.others, school);
        })
    }

    pub fn school_members(&self, school: SchoolId) -> SimResult<Vec<EntityId>> {
        if !self.schools.iter().any(|s| s.id == school) {
            return Err(SimError::UnknownSchool(school));
        }
        Ok(school::members(&self.entities, school)
            .filter_map(Entity::id)
            .collect())
    }

    /// Retire a school; its members are left without one
    pub fn terminate_school(&mut self, school: SchoolId) -> SimResult<()> {
        self.live_school(school)?;
        for entity in self.entities.iter_mut().filter(|e| e.school() == Some(school)) {
            entity.set_school(None);
        }
        if let Some(s) = self.schools.iter_mut().find(|s| s.id == school) {
            s.terminated = true;
        }
        log::debug!("school {school:?} terminated");
        Ok(())
    }

    // === Simulation ===

    /// Run `f` on one entity with the rest of the world as its scene
    fn with_entity<T>(
        &mut self,
        id: EntityId,
        f: impl FnOnce(&mut Entity, &mut Scene<'_>) -> T,
    ) -> SimResult<T> {
        let idx = self.index_of(id)?;
        let mut entity = self.entities.remove(idx);
        let result = {
            let mut scene = Scene::attached(&self.grid, &mut self.entities);
            f(&mut entity, &mut scene)
        };
        self.entities.insert(idx, entity);
        Ok(result)
    }

    /// Move terminated entities to the graveyard, keeping their order
    fn sweep(&mut self) {
        let mut idx = 0;
        while idx < self.entities.len() {
            if !self.entities[idx].is_terminated() {
                idx += 1;
                continue;
            }
            let entity = self.entities.remove(idx);
            log::debug!("{:?} {:?} removed from the world", entity.kind(), entity.id());
            if self.player.is_some() && self.player == entity.id() {
                self.player = None;
            }
            self.graveyard.push(entity);
        }
    }

    /// Mark the world started; entities can no longer be added
    pub fn start(&mut self) -> SimResult<()> {
        if self.terminated {
            return Err(SimError::WorldTerminated);
        }
        if self.started {
            return Err(SimError::WorldStarted);
        }
        if self.entities.is_empty() {
            return Err(SimError::WorldEmpty);
        }
        self.started = true;
        log::info!("World started with {} entities", self.entities.len());
        Ok(())
    }

    /// Apply a player action
    pub fn perform(&mut self, action: Action) -> SimResult<()> {
        if self.terminated {
            return Err(SimError::WorldTerminated);
        }
        let id = self.player.ok_or(SimError::NoPlayer)?;
        self.with_entity(id, |entity, scene| player::perform(entity, scene, action))??;
        self.update_viewport();
        Ok(())
    }

    /// Advance the player, then every other entity in id order
    pub fn advance_time(&mut self, delta_t: f64) -> SimResult<()> {
        if self.terminated {
            return Err(SimError::WorldTerminated);
        }
        if !(0.0..=MAX_DELTA_T).contains(&delta_t) {
            return Err(SimError::InvalidTimeStep(delta_t));
        }
        if let Some(id) = self.player {
            self.advance_one(id, delta_t)?;
        }
        for id in self.entity_ids() {
            if Some(id) == self.player {
                continue;
            }
            // Entities terminated earlier in this tick are skipped
            if self.entity(id).is_some_and(|e| !e.is_terminated()) {
                self.advance_one(id, delta_t)?;
            }
        }
        self.sweep();
        self.time += delta_t;
        self.update_viewport();
        Ok(())
    }

    /// Advance a single entity inside the world
    pub fn advance_entity(&mut self, id: EntityId, delta_t: f64) -> SimResult<()> {
        if self.terminated {
            return Err(SimError::WorldTerminated);
        }
        self.advance_one(id, delta_t)?;
        self.sweep();
        if self.player == Some(id) || self.player.is_none() {
            self.update_viewport();
        }
        Ok(())
    }

    fn advance_one(&mut self, id: EntityId, delta_t: f64) -> SimResult<()> {
        self.with_entity(id, |entity, scene| behaviour::advance(entity, scene, delta_t))?
    }

    /// Follow the player, keeping a margin around it, clamped to the world
    fn update_viewport(&mut self) {
        let margin = self.settings.viewport_margin;
        let (width, height) = (self.viewport.width, self.viewport.height);
        let Some(player) = self.player() else {
            self.viewport.x = 0;
            self.viewport.y = 0;
            return;
        };
        let bbox = player.bbox();
        let x = follow(bbox.x, bbox.w, width, self.bounds.width, margin);
        let y = follow(bbox.y, bbox.h, height, self.bounds.height, margin);
        self.viewport.x = x;
        self.viewport.y = y;
    }

    /// Remove every entity and refuse further changes
    pub fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        self.player = None;
        self.entities.clear();
        self.viewport.x = 0;
        self.viewport.y = 0;
        log::info!("World terminated after {:.3}s", self.time);
    }

    /// Entities swept out of the world since the last call, oldest first
    pub fn take_graveyard(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.graveyard)
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            time: self.time,
            started: self.started,
            terminated: self.terminated,
            viewport: self.viewport,
            player: self.player,
            reached_target: self.reached_target(),
            entities: self.entities.clone(),
            schools: self.schools.clone(),
        }
    }
}

/// Window origin along one axis for an object at `pos` of length `size`
fn follow(pos: i32, size: i32, span: i32, world: i32, margin: i32) -> i32 {
    let origin = if pos - margin < 0 {
        0
    } else if pos + size + margin < world {
        pos - margin
    } else {
        world - span
    };
    origin.min(world - span).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Sprite;

    /// 20 x 10 tiles of 10px with a solid floor row
    fn world() -> World {
        let mut ids = vec![0u8; 200];
        ids[..20].fill(Material::Solid.id());
        let grid = TileGrid::from_ids(10, 20, 10, &ids).unwrap();
        World::new(grid, IVec2::new(18, 1), IVec2::new(100, 50), Settings::default()).unwrap()
    }

    fn player_at(x: i32, y: i32) -> Entity {
        Entity::player(x, y, vec![Sprite::new(10, 20); 12]).unwrap()
    }

    fn slime_at(ident: u64, x: i32, school: Option<SchoolId>) -> Entity {
        Entity::slime(ident, x, 10, vec![Sprite::new(10, 10); 2], school).unwrap()
    }

    #[test]
    fn test_viewport_must_fit() {
        let grid = TileGrid::from_ids(10, 5, 5, &[]).unwrap();
        let err = World::new(grid, IVec2::ZERO, IVec2::new(60, 10), Settings::default());
        assert!(matches!(err, Err(SimError::InvalidViewport { .. })));
    }

    #[test]
    fn test_add_entity_rules() {
        let mut w = world();
        let id = w.add_entity(player_at(20, 10)).unwrap();
        assert_eq!(w.player().and_then(Entity::id), Some(id));
        assert!(matches!(w.add_entity(player_at(40, 10)), Err(SimError::SecondPlayer)));
        // Wedged in the floor
        let wedged = Entity::slime(1, 40, 3, vec![Sprite::new(10, 10); 2], None).unwrap();
        assert!(matches!(w.add_entity(wedged), Err(SimError::StartsInTerrain)));
        w.add_entity(slime_at(1, 40, None)).unwrap();
        assert!(matches!(w.add_entity(slime_at(1, 60, None)), Err(SimError::DuplicateSlime(1))));
        w.start().unwrap();
        assert!(matches!(w.add_entity(slime_at(2, 80, None)), Err(SimError::WorldStarted)));
    }

    #[test]
    fn test_capacity_reserves_player_slot() {
        let mut w = world();
        w.settings.max_entities = 3;
        w.add_entity(slime_at(1, 20, None)).unwrap();
        w.add_entity(slime_at(2, 40, None)).unwrap();
        assert!(matches!(w.add_entity(slime_at(3, 60, None)), Err(SimError::CapacityReached(3))));
        w.add_entity(player_at(100, 10)).unwrap();
        assert_eq!(w.entities().len(), 3);
    }

    #[test]
    fn test_remove_player_clears_reference() {
        let mut w = world();
        let id = w.add_entity(player_at(20, 10)).unwrap();
        let player = w.remove_entity(id).unwrap();
        assert!(player.id().is_none());
        assert!(w.player().is_none());
        assert!(w.is_game_over());
        assert!(matches!(w.remove_entity(id), Err(SimError::UnknownEntity(_))));
    }

    #[test]
    fn test_start_requires_entities() {
        let mut w = world();
        assert!(matches!(w.start(), Err(SimError::WorldEmpty)));
    }

    #[test]
    fn test_advance_rejects_bad_step() {
        let mut w = world();
        w.add_entity(player_at(20, 10)).unwrap();
        assert!(matches!(w.advance_time(0.25), Err(SimError::InvalidTimeStep(_))));
        assert!(matches!(w.advance_time(-0.01), Err(SimError::InvalidTimeStep(_))));
        assert_eq!(w.player().unwrap().pixel(), IVec2::new(20, 10));
    }

    #[test]
    fn test_school_limit_and_switch() {
        let mut w = world();
        w.settings.max_schools = 2;
        let a = w.create_school().unwrap();
        let b = w.create_school().unwrap();
        assert!(matches!(w.create_school(), Err(SimError::SchoolLimit(2))));
        let s1 = w.add_entity(slime_at(1, 20, Some(a))).unwrap();
        let s2 = w.add_entity(slime_at(2, 60, Some(a))).unwrap();
        let s3 = w.add_entity(slime_at(3, 100, Some(b))).unwrap();
        w.switch_school(s1, b).unwrap();
        assert_eq!(w.school_members(b).unwrap(), vec![s1, s3]);
        assert_eq!(w.entity(s1).unwrap().hit_points(), 100);
        assert_eq!(w.entity(s2).unwrap().hit_points(), 101);
        assert_eq!(w.entity(s3).unwrap().hit_points(), 99);
        w.terminate_school(a).unwrap();
        assert!(w.entity(s2).unwrap().school().is_none());
        assert!(matches!(w.join_school(s2, a), Err(SimError::SchoolTerminated)));
        w.join_school(s2, b).unwrap();
        assert!(matches!(w.join_school(s2, b), Err(SimError::AlreadyInSchool)));
    }

    #[test]
    fn test_viewport_follows_player() {
        let mut w = world();
        w.settings.viewport_margin = 20;
        let id = w.add_entity(player_at(10, 10)).unwrap();
        assert_eq!(w.viewport().x, 0);
        w.set_position(id, DVec2::new(0.5, 0.1)).unwrap();
        assert_eq!(w.viewport().x, 30);
        assert_eq!(w.viewport().y, 0);
        w.set_position(id, DVec2::new(1.9, 0.1)).unwrap();
        // Clamped to the right edge
        assert_eq!(w.viewport().x, 100);
    }

    #[test]
    fn test_follow() {
        assert_eq!(follow(150, 10, 100, 1000, 100), 50);
        assert_eq!(follow(50, 10, 100, 1000, 100), 0);
        assert_eq!(follow(950, 10, 100, 1000, 100), 900);
    }

    #[test]
    fn test_terminate_empties_world() {
        let mut w = world();
        w.add_entity(player_at(20, 10)).unwrap();
        w.terminate();
        assert!(w.entities().is_empty());
        assert!(w.player().is_none());
        assert!(matches!(w.advance_time(0.1), Err(SimError::WorldTerminated)));
    }
}

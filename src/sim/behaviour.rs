//! Per-kind phase machines driving the integrator
//!
//! Kinds whose motion changes mode on a timer (sharks, plants) split an
//! advance into chunks that end exactly on a mode boundary, switch mode,
//! and continue with the rest in the same loop.

use serde::{Deserialize, Serialize};

use super::collision;
use super::entity::{Behaviour, Entity, Kind, Orientation};
use super::grid::TileGrid;
use super::material::Material;
use super::player;
use super::school::SchoolId;
use super::stepper::{self, Flow, Scene};
use crate::consts::*;
use crate::error::{SimError, SimResult};

/// Slack when deciding that a chunk ended exactly on a phase boundary
const PHASE_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlimeState {
    /// Identification chosen by the level, unique within a world
    pub ident: u64,
    pub school: Option<SchoolId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SharkPhase {
    /// Swimming or jumping in one direction
    Moving,
    Resting,
    /// Frozen after biting the player
    Blocked,
}

impl SharkPhase {
    pub fn duration(self) -> f64 {
        match self {
            SharkPhase::Moving => SHARK_MOVE_DURATION,
            SharkPhase::Resting => SHARK_REST_DURATION,
            SharkPhase::Blocked => CONTACT_WINDOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharkState {
    pub phase: SharkPhase,
    /// Time spent in the current phase
    pub elapsed: f64,
    /// Direction of the last burst; the next one goes the other way
    pub heading: Orientation,
    pub launched: bool,
    /// Set when a block lands mid-chunk so the chunk is not counted twice
    interrupted: bool,
}

impl Default for SharkState {
    fn default() -> Self {
        Self {
            phase: SharkPhase::Resting,
            elapsed: 0.0,
            heading: Orientation::Right,
            launched: false,
            interrupted: false,
        }
    }
}

impl SharkState {
    pub(crate) fn block(&mut self) {
        self.phase = SharkPhase::Blocked;
        self.elapsed = 0.0;
        self.interrupted = true;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantState {
    /// Time since the last change of direction
    pub sway_elapsed: f64,
    /// Time left before the plant withers
    pub lifetime: f64,
    /// Moving in the initial direction (left or up)
    pub forward: bool,
}

impl PlantState {
    pub fn new(lifetime: f64) -> Self {
        Self {
            sway_elapsed: 0.0,
            lifetime,
            forward: true,
        }
    }
}

/// Advance one entity by `delta_t`; every check happens before any change
pub(crate) fn advance(entity: &mut Entity, scene: &mut Scene<'_>, delta_t: f64) -> SimResult<()> {
    if !entity.policy().accepts_delta_t(delta_t) {
        return Err(SimError::InvalidTimeStep(delta_t));
    }
    if entity.is_terminated() {
        return Err(SimError::EntityTerminated);
    }
    let delta_t = delta_t.max(0.0);
    if entity.is_dead() {
        entity.age_corpse(delta_t);
        return Ok(());
    }
    match entity.kind() {
        Kind::Player => player::advance(entity, scene, delta_t),
        Kind::Slime => advance_slime(entity, scene, delta_t),
        Kind::Shark => advance_shark(entity, scene, delta_t),
        Kind::Sneezewort | Kind::Skullcab => advance_plant(entity, scene, delta_t),
    }
    Ok(())
}

impl Entity {
    /// Advance an entity that is not part of any world
    ///
    /// Detached entities see no terrain and no other entities; only the
    /// player treats `y = 0` as a floor.
    pub fn advance_time(&mut self, delta_t: f64) -> SimResult<()> {
        if self.id.is_some() {
            return Err(SimError::AlreadyInWorld);
        }
        let grid = TileGrid::empty();
        let mut nobody: [Entity; 0] = [];
        let mut scene = Scene::detached(&grid, &mut nobody);
        advance(self, &mut scene, delta_t)
    }
}

// === Slime ===

fn slime_sprite(orientation: Orientation) -> usize {
    match orientation {
        Orientation::Left => 1,
        _ => 0,
    }
}

/// Reverse a slime and have it start walking the other way
pub(crate) fn turn_around(slime: &mut Entity) {
    let heading = slime.orientation.reversed();
    slime.orientation = heading;
    slime.stop_horizontal();
    slime.set_acceleration_x(heading.sign() * SLIME_MOVING_ACCELERATION);
    slime.set_sprite_index(slime_sprite(heading));
}

/// A stopped slime walks on once the player is gone and nothing blocks it
fn resume(slime: &mut Entity, scene: &Scene<'_>) {
    if slime.acc.x != 0.0 {
        return;
    }
    let bbox = slime.bbox();
    let near_player = !collision::overlapping_kind(scene.others, bbox.grown(1), Kind::Player).is_empty();
    let walled = match slime.orientation {
        Orientation::Left => collision::bumps_left(scene.grid, bbox),
        Orientation::Right => collision::bumps_right(scene.grid, bbox),
        _ => true,
    };
    if !near_player && !walled {
        let sign = slime.orientation.sign();
        slime.set_acceleration_x(sign * SLIME_MOVING_ACCELERATION);
    }
}

fn advance_slime(slime: &mut Entity, scene: &mut Scene<'_>, delta_t: f64) {
    resume(slime, scene);
    if stepper::integrate(slime, scene, delta_t) == Flow::Continue {
        slime.set_sprite_index(slime_sprite(slime.orientation));
    }
}

// === Shark ===

fn shark_state(entity: &mut Entity) -> &mut SharkState {
    match &mut entity.behaviour {
        Behaviour::Shark(state) => state,
        other => unreachable!("shark behaviour on {other:?}"),
    }
}

fn shark_sprite(state: &SharkState) -> usize {
    match (state.phase, state.heading) {
        (SharkPhase::Moving, Orientation::Left) => 1,
        (SharkPhase::Moving, _) => 2,
        _ => 0,
    }
}

/// Start a burst in the direction opposite to the previous one
fn launch(shark: &mut Entity, scene: &Scene<'_>) {
    let state = shark_state(shark);
    let heading = state.heading.reversed();
    state.heading = heading;
    state.phase = SharkPhase::Moving;
    state.elapsed = 0.0;

    shark.orientation = heading;
    shark.set_acceleration_x(heading.sign() * SHARK_MOVING_ACCELERATION);
    let bbox = shark.bbox();
    let submerged = scene.attached && collision::submerged(scene.grid, bbox);
    let in_water = submerged || collision::overlaps_material(scene.grid, bbox, Material::Water);
    let on_ground = if scene.attached {
        collision::stands_on_impassable(scene.grid, bbox)
    } else {
        bbox.y <= 0
    };
    if in_water || on_ground {
        shark.set_velocity_y(SHARK_JUMP_VELOCITY);
    }
    if !submerged && shark.vel.y != 0.0 {
        shark.set_acceleration_y(GRAVITY);
    }
}

fn rest(shark: &mut Entity, phase: SharkPhase) {
    shark.stop_horizontal();
    let state = shark_state(shark);
    state.phase = phase;
    state.elapsed = 0.0;
}

fn advance_shark(shark: &mut Entity, scene: &mut Scene<'_>, delta_t: f64) {
    if !shark_state(shark).launched {
        shark_state(shark).launched = true;
        launch(shark, scene);
    }
    let mut remaining = delta_t;
    while remaining > 0.0 {
        let state = shark_state(shark);
        let chunk = remaining.min(state.phase.duration() - state.elapsed).max(0.0);
        if stepper::integrate(shark, scene, chunk) == Flow::Halt {
            return;
        }
        remaining -= chunk;
        let state = shark_state(shark);
        if state.interrupted {
            state.interrupted = false;
            continue;
        }
        state.elapsed += chunk;
        if state.elapsed + PHASE_EPSILON < state.phase.duration() {
            continue;
        }
        match state.phase {
            SharkPhase::Moving | SharkPhase::Blocked => rest(shark, SharkPhase::Resting),
            SharkPhase::Resting => launch(shark, scene),
        }
    }
    let index = shark_sprite(shark_state(shark));
    shark.set_sprite_index(index);
}

// === Plants ===

fn plant_state(entity: &mut Entity) -> &mut PlantState {
    match &mut entity.behaviour {
        Behaviour::Plant(state) => state,
        other => unreachable!("plant behaviour on {other:?}"),
    }
}

/// Reverse the sway: sneezeworts go left and right, skullcabs up and down
fn sway(plant: &mut Entity) {
    let forward = {
        let state = plant_state(plant);
        state.forward = !state.forward;
        state.sway_elapsed = 0.0;
        state.forward
    };
    match plant.kind() {
        Kind::Sneezewort => {
            plant.orientation = plant.orientation.reversed();
            plant.set_velocity_x(plant.orientation.sign() * PLANT_VELOCITY);
        }
        _ => {
            plant.orientation = if forward {
                Orientation::Up
            } else {
                Orientation::Neutral
            };
            plant.vel.y = if forward { PLANT_VELOCITY } else { -PLANT_VELOCITY };
        }
    }
    let index = match plant.kind() {
        Kind::Sneezewort => usize::from(plant.orientation == Orientation::Right),
        _ => usize::from(!forward),
    };
    plant.set_sprite_index(index);
}

fn advance_plant(plant: &mut Entity, scene: &mut Scene<'_>, delta_t: f64) {
    let mut remaining = delta_t;
    while remaining > 0.0 {
        let state = plant_state(plant);
        let chunk = remaining
            .min(PLANT_SWAY_PERIOD - state.sway_elapsed)
            .min(state.lifetime)
            .max(0.0);
        if stepper::integrate(plant, scene, chunk) == Flow::Halt {
            return;
        }
        remaining -= chunk;
        let state = plant_state(plant);
        state.sway_elapsed += chunk;
        state.lifetime -= chunk;
        if state.lifetime <= PHASE_EPSILON {
            log::debug!("{:?} {:?} withered", plant.kind(), plant.id());
            plant.kill();
            plant.age_corpse(remaining);
            return;
        }
        if state.sway_elapsed + PHASE_EPSILON >= PLANT_SWAY_PERIOD {
            sway(plant);
        }
    }
}

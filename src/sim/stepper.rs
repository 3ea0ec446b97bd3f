//! Adaptive sub-stepping integrator
//!
//! An advance of `delta_t` is walked in micro-steps short enough that no
//! entity moves more than about one pixel between two probes, followed by
//! one residual step for the remainder. At every step the entity's collision
//! checks run in policy order against the candidate position; a check that
//! fires either commits its axis at the candidate or rolls it back to the
//! previous boundary. The surviving candidate is then committed and the
//! interaction rules run against it.

use glam::{DVec2, IVec2};

use super::behaviour;
use super::collision::{self, PixelBox, WorldBounds};
use super::entity::{Axis, Behaviour, Entity, EntityId, Kind};
use super::grid::TileGrid;
use super::interaction;
use super::policy::Check;
use super::school;
use crate::consts::*;
use crate::{pixel_of, to_world};

/// Everything an advancing entity can see besides itself
pub struct Scene<'a> {
    pub grid: &'a TileGrid,
    pub bounds: WorldBounds,
    /// Every other entity of the world, in id order
    pub others: &'a mut [Entity],
    /// False for entities advanced outside any world
    pub attached: bool,
}

impl<'a> Scene<'a> {
    pub fn attached(grid: &'a TileGrid, others: &'a mut [Entity]) -> Self {
        Self {
            grid,
            bounds: WorldBounds::of(grid),
            others,
            attached: true,
        }
    }

    pub fn detached(grid: &'a TileGrid, others: &'a mut [Entity]) -> Self {
        Self {
            grid,
            bounds: WorldBounds::UNBOUNDED,
            others,
            attached: false,
        }
    }
}

/// Whether the caller should keep processing the entity after a walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The entity died or left the world
    Halt,
}

/// Micro-step length for the given motion: `0.01 / (|v| + |a| * delta_t)`,
/// or the whole of `delta_t` for an entity at rest
pub fn micro_step(vel: DVec2, acc: DVec2, delta_t: f64) -> f64 {
    let rate = vel.length() + acc.length() * delta_t;
    if rate == 0.0 {
        delta_t
    } else {
        MICRO_STEP_DISPLACEMENT / rate
    }
}

/// Kinds that fall when nothing holds them up
fn falls(kind: Kind) -> bool {
    matches!(kind, Kind::Player | Kind::Shark)
}

/// Whether a box of `kind` at `bbox` is held up
pub(crate) fn supported_at(kind: Kind, scene: &Scene<'_>, bbox: PixelBox) -> bool {
    if !scene.attached {
        return bbox.y <= 0;
    }
    match kind {
        Kind::Player => {
            collision::stands_on_impassable(scene.grid, bbox)
                || collision::stands_on_entity(scene.others, bbox)
        }
        Kind::Shark => {
            collision::stands_on_impassable(scene.grid, bbox)
                || collision::submerged(scene.grid, bbox)
        }
        _ => true,
    }
}

pub(crate) fn supported(entity: &Entity, scene: &Scene<'_>) -> bool {
    supported_at(entity.kind(), scene, entity.bbox())
}

/// Candidate state at the end of the current step
#[derive(Debug, Clone, Copy)]
struct Probe {
    pixel: IVec2,
    bbox: PixelBox,
    vel: DVec2,
}

/// Bookkeeping for one call to [`integrate`]
struct Walk {
    delta_t: f64,
    /// Time committed so far
    elapsed: f64,
    /// Length of the step being checked
    tau: f64,
    /// Axes already settled for this step
    held: [bool; 2],
    /// A side bump fired during this step
    bumped: bool,
    /// Skullcabs the player finished off during this walk
    spared: Vec<EntityId>,
}

impl Walk {
    fn new(delta_t: f64) -> Self {
        Self {
            delta_t,
            elapsed: 0.0,
            tau: 0.0,
            held: [false; 2],
            bumped: false,
            spared: Vec::new(),
        }
    }

    fn probe(&self, entity: &Entity) -> Probe {
        let t = DVec2::new(
            if self.held[0] { 0.0 } else { self.tau },
            if self.held[1] { 0.0 } else { self.tau },
        );
        let pixel = pixel_of(entity.extrapolate(t));
        Probe {
            pixel,
            bbox: entity.bbox_at(pixel),
            vel: entity.velocity_after(t),
        }
    }

    /// Accept the candidate on `axis` and stop it moving further this step
    fn commit_here(&mut self, entity: &mut Entity, axis: Axis) {
        if !self.held[axis.index()] {
            entity.commit_axis(axis, self.tau);
            self.held[axis.index()] = true;
        }
    }

    /// Keep `axis` at the previous boundary for this step
    fn roll_back(&mut self, axis: Axis) {
        self.held[axis.index()] = true;
    }

    fn step(&mut self, entity: &mut Entity, scene: &mut Scene<'_>, tau: f64) -> Flow {
        self.tau = tau;
        self.held = [false; 2];
        self.bumped = false;
        for &check in entity.policy().checks {
            if self.apply(check, entity, scene) == Flow::Halt {
                return Flow::Halt;
            }
        }
        for axis in Axis::BOTH {
            if !self.held[axis.index()] {
                entity.commit_axis(axis, tau);
            }
        }
        self.elapsed += tau;

        if falls(entity.kind()) && entity.acc.y == 0.0 && !supported(entity, scene) {
            entity.set_acceleration_y(GRAVITY);
        }

        let bbox = entity.bbox();
        interaction::expose(entity, scene, bbox, tau);
        if !entity.is_dead() {
            interaction::engage(entity, scene, bbox, tau);
        }
        if !entity.is_dead() && entity.kind() == Kind::Player {
            interaction::graze(entity, scene, bbox, tau, &mut self.spared);
        }
        if entity.is_dead() {
            entity.age_corpse(self.delta_t - self.elapsed);
            return Flow::Halt;
        }
        Flow::Continue
    }

    fn apply(&mut self, check: Check, entity: &mut Entity, scene: &mut Scene<'_>) -> Flow {
        let probe = self.probe(entity);
        match check {
            Check::Blocked => {
                let here = entity.bbox();
                let blocked = scene.others.iter().any(|o| {
                    !o.is_terminated()
                        && collision::is_solid(o.kind())
                        && o.bbox().overlaps(&probe.bbox)
                        && !o.bbox().overlaps(&here)
                });
                if blocked {
                    self.roll_back(Axis::X);
                    self.roll_back(Axis::Y);
                    entity.stop_horizontal();
                    entity.vel.y = 0.0;
                    if supported(entity, scene) {
                        settle(entity);
                    }
                }
            }
            Check::Land { on_entities } => {
                let grounded = collision::stands_on_impassable(scene.grid, probe.bbox)
                    || (on_entities && collision::stands_on_entity(scene.others, probe.bbox))
                    || (!scene.attached && probe.bbox.y <= 0);
                if probe.vel.y < 0.0 && grounded {
                    self.commit_here(entity, Axis::Y);
                    // Rest exactly on the pixel row landed on
                    entity.pos.y = to_world(entity.pixel.y.max(0));
                    entity.sync_pixel();
                    settle(entity);
                }
            }
            Check::BumpAbove => {
                if probe.vel.y > 0.0 && collision::bumps_above(scene.grid, probe.bbox) {
                    self.commit_here(entity, Axis::Y);
                    entity.vel.y = 0.0;
                }
            }
            Check::BumpSide => {
                let bumps = if probe.vel.x > 0.0 {
                    collision::bumps_right(scene.grid, probe.bbox)
                } else if probe.vel.x < 0.0 {
                    collision::bumps_left(scene.grid, probe.bbox)
                } else {
                    false
                };
                if bumps {
                    self.commit_here(entity, Axis::X);
                    entity.stop_horizontal();
                    self.bumped = true;
                }
            }
            Check::Surface => {
                if collision::submerged(scene.grid, entity.bbox())
                    && !collision::submerged(scene.grid, probe.bbox)
                {
                    self.commit_here(entity, Axis::Y);
                    entity.set_acceleration_y(GRAVITY);
                }
            }
            Check::Dive | Check::Sink => {
                let was_submerged = collision::submerged(scene.grid, entity.bbox());
                let entering = check == Check::Dive && !was_submerged;
                let sinking = check == Check::Sink && was_submerged;
                if probe.vel.y < 0.0
                    && (entering || sinking)
                    && collision::submerged(scene.grid, probe.bbox)
                {
                    self.commit_here(entity, Axis::Y);
                    entity.vel.y = 0.0;
                    entity.set_acceleration_y(0.0);
                }
            }
            Check::MeetPlayer => {
                if !collision::overlapping_kind(scene.others, probe.bbox, Kind::Player).is_empty() {
                    self.roll_back(Axis::X);
                    self.roll_back(Axis::Y);
                    entity.stop_horizontal();
                }
            }
            Check::MeetSlime => {
                if self.bumped {
                    return Flow::Continue;
                }
                let met = scene.others.iter().find(|o| {
                    o.kind() == Kind::Slime && !o.is_terminated() && o.bbox().overlaps(&probe.bbox)
                });
                let Some(other) = met else {
                    return Flow::Continue;
                };
                let theirs = match other.school() {
                    Some(s) => Some((s, school::members(scene.others, s).count())),
                    None => None,
                };
                self.roll_back(Axis::X);
                self.roll_back(Axis::Y);
                if let Some((to, size)) = theirs {
                    if school::size_with(entity, scene.others) < size {
                        school::transfer(entity, scene.others, to);
                    }
                }
                behaviour::turn_around(entity);
            }
            Check::MeetShark => {
                let shark = scene.others.iter().any(|o| {
                    o.kind() == Kind::Shark
                        && !o.is_terminated()
                        && !o.is_dead()
                        && o.bbox().overlaps(&probe.bbox)
                });
                if shark {
                    log::debug!("slime {:?} eaten by a shark", entity.id());
                    entity.kill();
                    entity.terminate();
                    return Flow::Halt;
                }
            }
            Check::Escape => {
                if scene.bounds.excludes(probe.pixel.x, probe.pixel.y) {
                    self.commit_here(entity, Axis::X);
                    self.commit_here(entity, Axis::Y);
                    if entity.kind() == Kind::Player {
                        entity.kill();
                    }
                    log::debug!("{:?} {:?} left the world", entity.kind(), entity.id());
                    entity.terminate();
                    return Flow::Halt;
                }
            }
        }
        Flow::Continue
    }
}

/// Come to rest vertically; a landing player is no longer jumping
fn settle(entity: &mut Entity) {
    entity.vel.y = 0.0;
    entity.set_acceleration_y(0.0);
    if let Behaviour::Player(player) = &mut entity.behaviour {
        player.jumping = false;
    }
}

/// Walk `entity` forward by `delta_t` seconds through `scene`
///
/// Returns [`Flow::Halt`] when the entity died or left the world on the
/// way; a corpse has already aged by the unwalked remainder.
pub(crate) fn integrate(entity: &mut Entity, scene: &mut Scene<'_>, delta_t: f64) -> Flow {
    // Zero-length exposure marks zones the entity already occupies
    let bbox = entity.bbox();
    interaction::expose(entity, scene, bbox, 0.0);
    if entity.is_dead() {
        entity.age_corpse(delta_t);
        return Flow::Halt;
    }
    if delta_t <= 0.0 {
        return Flow::Continue;
    }

    let dt = micro_step(entity.velocity(), entity.acceleration(), delta_t);
    let steps = (delta_t / dt).floor() as u64;
    let mut walk = Walk::new(delta_t);
    for _ in 0..steps {
        if walk.step(entity, scene, dt) == Flow::Halt {
            return Flow::Halt;
        }
    }
    let residual = delta_t - steps as f64 * dt;
    if residual > 0.0 && walk.step(entity, scene, residual) == Flow::Halt {
        return Flow::Halt;
    }
    Flow::Continue
}

//! Entities and their kinematic state
//!
//! One struct serves every kind. Kind-specific state lives in [`Behaviour`],
//! kind-specific limits in the policy tables.

use glam::{DVec2, IVec2};
use serde::{Deserialize, Serialize};

use super::behaviour::{PlantState, SharkState, SlimeState};
use super::collision::PixelBox;
use super::interaction::{ContactClock, ExposureClock};
use super::material::Material;
use super::player::PlayerState;
use super::policy::KindPolicy;
use super::school::SchoolId;
use super::sprite::{self, Sprite};
use crate::consts::*;
use crate::error::{SimError, SimResult};
use crate::{pixel_of, reached, world_of};

/// Handle of an entity inside its world
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Player,
    Slime,
    Shark,
    Sneezewort,
    Skullcab,
}

impl Kind {
    pub fn is_plant(self) -> bool {
        matches!(self, Kind::Sneezewort | Kind::Skullcab)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    Left,
    Right,
    #[default]
    Neutral,
    Up,
}

impl Orientation {
    /// Sign applied to horizontal velocity and acceleration
    pub fn sign(self) -> f64 {
        match self {
            Orientation::Left => -1.0,
            Orientation::Right => 1.0,
            Orientation::Neutral | Orientation::Up => 0.0,
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Orientation::Left => Orientation::Right,
            Orientation::Right => Orientation::Left,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub const BOTH: [Axis; 2] = [Axis::X, Axis::Y];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
        }
    }
}

/// Kind-specific state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Behaviour {
    Player(PlayerState),
    Slime(SlimeState),
    Shark(SharkState),
    Plant(PlantState),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Set while the entity belongs to a world
    pub(crate) id: Option<EntityId>,
    kind: Kind,
    pub(crate) behaviour: Behaviour,
    pub(crate) pos: DVec2,
    pub(crate) pixel: IVec2,
    pub(crate) vel: DVec2,
    pub(crate) acc: DVec2,
    pub(crate) orientation: Orientation,
    hit_points: i32,
    dead: bool,
    death_delay: f64,
    terminated: bool,
    sprites: Vec<Sprite>,
    pub(crate) sprite_index: usize,
    pub(crate) exposure: [ExposureClock; Material::COUNT],
    pub(crate) contacts: Vec<(EntityId, ContactClock)>,
    /// Partners already hurt by a one-shot contact rule
    #[serde(default)]
    pub(crate) struck: Vec<EntityId>,
}

impl Entity {
    fn spawn(
        kind: Kind,
        behaviour: Behaviour,
        x: i32,
        y: i32,
        sprites: Vec<Sprite>,
    ) -> SimResult<Self> {
        sprite::validate(kind, &sprites)?;
        if x < 0 || y < 0 {
            return Err(SimError::InvalidPosition {
                x: f64::from(x),
                y: f64::from(y),
            });
        }
        let pixel = IVec2::new(x, y);
        Ok(Self {
            id: None,
            kind,
            behaviour,
            pos: world_of(pixel),
            pixel,
            vel: DVec2::ZERO,
            acc: DVec2::ZERO,
            orientation: Orientation::Neutral,
            hit_points: kind.policy().hit_points,
            dead: false,
            death_delay: 0.0,
            terminated: false,
            sprites,
            sprite_index: 0,
            exposure: [ExposureClock::default(); Material::COUNT],
            contacts: Vec::new(),
            struck: Vec::new(),
        })
    }

    /// The player character, standing still and facing the camera
    pub fn player(x: i32, y: i32, sprites: Vec<Sprite>) -> SimResult<Self> {
        Self::spawn(Kind::Player, Behaviour::Player(PlayerState::default()), x, y, sprites)
    }

    /// A slime walking right, optionally already part of a school
    pub fn slime(
        ident: u64,
        x: i32,
        y: i32,
        sprites: Vec<Sprite>,
        school: Option<SchoolId>,
    ) -> SimResult<Self> {
        let mut slime = Self::spawn(
            Kind::Slime,
            Behaviour::Slime(SlimeState { ident, school }),
            x,
            y,
            sprites,
        )?;
        slime.orientation = Orientation::Right;
        slime.acc.x = SLIME_MOVING_ACCELERATION;
        Ok(slime)
    }

    /// A shark; it starts its first burst on its first advance
    pub fn shark(x: i32, y: i32, sprites: Vec<Sprite>) -> SimResult<Self> {
        Self::spawn(Kind::Shark, Behaviour::Shark(SharkState::default()), x, y, sprites)
    }

    /// A sneezewort drifting left
    pub fn sneezewort(x: i32, y: i32, sprites: Vec<Sprite>) -> SimResult<Self> {
        let mut plant = Self::spawn(
            Kind::Sneezewort,
            Behaviour::Plant(PlantState::new(SNEEZEWORT_LIFETIME)),
            x,
            y,
            sprites,
        )?;
        plant.orientation = Orientation::Left;
        plant.vel.x = -PLANT_VELOCITY;
        Ok(plant)
    }

    /// A skullcab drifting up
    pub fn skullcab(x: i32, y: i32, sprites: Vec<Sprite>) -> SimResult<Self> {
        let mut plant = Self::spawn(
            Kind::Skullcab,
            Behaviour::Plant(PlantState::new(SKULLCAB_LIFETIME)),
            x,
            y,
            sprites,
        )?;
        plant.orientation = Orientation::Up;
        plant.vel.y = PLANT_VELOCITY;
        Ok(plant)
    }

    // === Queries ===

    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn policy(&self) -> &'static KindPolicy {
        self.kind.policy()
    }

    pub fn behaviour(&self) -> &Behaviour {
        &self.behaviour
    }

    /// Position in world units
    pub fn position(&self) -> DVec2 {
        self.pos
    }

    /// Position in pixels, always `round(100 * position)`
    pub fn pixel(&self) -> IVec2 {
        self.pixel
    }

    pub fn velocity(&self) -> DVec2 {
        self.vel
    }

    pub fn acceleration(&self) -> DVec2 {
        self.acc
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn hit_points(&self) -> i32 {
        self.hit_points
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Seconds since death
    pub fn death_delay(&self) -> f64 {
        self.death_delay
    }

    pub fn death_delay_over(&self) -> bool {
        reached(self.death_delay, DEATH_DELAY)
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn sprites(&self) -> &[Sprite] {
        &self.sprites
    }

    pub fn sprite_index(&self) -> usize {
        self.sprite_index
    }

    pub fn sprite(&self) -> Sprite {
        self.sprites[self.sprite_index]
    }

    /// Bounding box of the current frame at the current pixel
    pub fn bbox(&self) -> PixelBox {
        self.bbox_at(self.pixel)
    }

    pub fn bbox_at(&self, pixel: IVec2) -> PixelBox {
        let frame = self.sprite();
        PixelBox::new(pixel.x, pixel.y, frame.width, frame.height)
    }

    pub fn is_moving(&self) -> bool {
        self.vel.x != 0.0
    }

    pub fn is_jumping(&self) -> bool {
        matches!(&self.behaviour, Behaviour::Player(p) if p.jumping)
    }

    pub fn is_ducking(&self) -> bool {
        matches!(&self.behaviour, Behaviour::Player(p) if p.ducking)
    }

    pub fn school(&self) -> Option<SchoolId> {
        match &self.behaviour {
            Behaviour::Slime(slime) => slime.school,
            _ => None,
        }
    }

    /// Identification given to a slime at construction
    pub fn slime_ident(&self) -> Option<u64> {
        match &self.behaviour {
            Behaviour::Slime(slime) => Some(slime.ident),
            _ => None,
        }
    }

    // === Hit points and lifecycle ===

    /// Set hit points, clamped to `[0, MAX_HIT_POINTS]`; zero kills
    pub fn set_hit_points(&mut self, hit_points: i32) {
        if self.dead {
            return;
        }
        if hit_points <= 0 {
            self.kill();
        } else {
            self.hit_points = hit_points.min(MAX_HIT_POINTS);
        }
    }

    pub fn adjust_hit_points(&mut self, delta: i32) {
        self.set_hit_points(self.hit_points.saturating_add(delta));
    }

    pub(crate) fn kill(&mut self) {
        if self.dead {
            return;
        }
        self.hit_points = 0;
        self.dead = true;
        self.death_delay = 0.0;
        self.vel = DVec2::ZERO;
        self.acc = DVec2::ZERO;
        log::debug!("{:?} {:?} died at {:?}", self.kind, self.id, self.pixel);
    }

    pub(crate) fn terminate(&mut self) {
        self.terminated = true;
    }

    /// Let a dead entity's delay run; it is terminated once the delay elapses
    pub(crate) fn age_corpse(&mut self, dt: f64) {
        self.death_delay += dt.max(0.0);
        if self.death_delay_over() {
            self.terminate();
        }
    }

    pub(crate) fn set_school(&mut self, school: Option<SchoolId>) {
        if let Behaviour::Slime(slime) = &mut self.behaviour {
            slime.school = school;
        }
    }

    /// Freeze a shark for one contact window
    pub(crate) fn block(&mut self) {
        if let Behaviour::Shark(shark) = &mut self.behaviour {
            shark.block();
            self.stop_horizontal();
        }
    }

    pub(crate) fn contact_clock(&mut self, partner: EntityId) -> &mut ContactClock {
        let idx = match self.contacts.iter().position(|(id, _)| *id == partner) {
            Some(idx) => idx,
            None => {
                self.contacts.push((partner, ContactClock::default()));
                self.contacts.len() - 1
            }
        };
        &mut self.contacts[idx].1
    }

    /// Record a one-shot hit on `partner`; false if it was already recorded
    pub(crate) fn strike(&mut self, partner: EntityId) -> bool {
        if self.struck.contains(&partner) {
            return false;
        }
        self.struck.push(partner);
        true
    }

    pub(crate) fn set_sprite_index(&mut self, index: usize) {
        self.sprite_index = index.min(self.sprites.len() - 1);
    }

    // === Kinematics ===

    /// Position after `t` seconds per axis under constant acceleration
    pub fn extrapolate(&self, t: DVec2) -> DVec2 {
        self.pos + self.vel * t + 0.5 * self.acc * t * t
    }

    /// Velocity after `t` seconds per axis
    pub fn velocity_after(&self, t: DVec2) -> DVec2 {
        self.vel + self.acc * t
    }

    /// Move one axis forward by `t` seconds and make it the new base
    pub(crate) fn commit_axis(&mut self, axis: Axis, t: f64) {
        let i = axis.index();
        let pos = self.pos[i] + self.vel[i] * t + 0.5 * self.acc[i] * t * t;
        let vel = self.vel[i] + self.acc[i] * t;
        self.pos[i] = pos;
        match axis {
            Axis::X => self.set_velocity_x(vel),
            Axis::Y => self.set_velocity_y(vel),
        }
        self.sync_pixel();
    }

    #[inline]
    pub(crate) fn sync_pixel(&mut self) {
        self.pixel = pixel_of(self.pos);
    }

    /// Teleport to `pos` (world units)
    pub(crate) fn place(&mut self, pos: DVec2) -> SimResult<()> {
        if !pos.is_finite() || pos.x < 0.0 || pos.y < 0.0 {
            return Err(SimError::InvalidPosition { x: pos.x, y: pos.y });
        }
        self.pos = pos;
        self.sync_pixel();
        Ok(())
    }

    /// Horizontal velocity, clamped to the kind's legal speeds; hitting the
    /// ceiling also cuts the horizontal acceleration
    pub(crate) fn set_velocity_x(&mut self, vx: f64) {
        let (vx, capped) = self.policy().horizontal.clamp(vx);
        self.vel.x = vx;
        if capped {
            self.acc.x = 0.0;
        }
    }

    /// Vertical velocity; upward speed is capped per kind
    pub(crate) fn set_velocity_y(&mut self, vy: f64) {
        self.vel.y = vy.min(self.policy().max_vertical);
    }

    pub(crate) fn set_acceleration_x(&mut self, ax: f64) {
        debug_assert!(self.policy().legal_horizontal_acceleration(ax), "{ax}");
        self.acc.x = ax;
    }

    pub(crate) fn set_acceleration_y(&mut self, ay: f64) {
        debug_assert!(self.policy().legal_vertical_acceleration(ay), "{ay}");
        self.acc.y = ay;
    }

    pub(crate) fn stop_horizontal(&mut self) {
        self.vel.x = 0.0;
        self.acc.x = 0.0;
    }

    /// Teleport a detached entity; positions must be finite and non-negative
    pub fn set_position(&mut self, pos: DVec2) -> SimResult<()> {
        if self.id.is_some() {
            return Err(SimError::AlreadyInWorld);
        }
        self.place(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{to_pixel, to_world};

    fn frames(n: usize) -> Vec<Sprite> {
        vec![Sprite::new(10, 20); n]
    }

    #[test]
    fn test_construction_validates() {
        assert!(Entity::player(0, 0, frames(12)).is_ok());
        assert!(Entity::player(0, 0, frames(10)).is_err());
        assert!(Entity::player(-1, 0, frames(12)).is_err());
        assert!(Entity::shark(5, 5, frames(2)).is_err());
    }

    #[test]
    fn test_hit_points_clamp_and_kill() {
        let mut e = Entity::player(0, 0, frames(12)).unwrap();
        e.vel = DVec2::new(1.0, 2.0);
        e.set_hit_points(900);
        assert_eq!(e.hit_points(), MAX_HIT_POINTS);
        e.adjust_hit_points(-1000);
        assert_eq!(e.hit_points(), 0);
        assert!(e.is_dead());
        assert_eq!(e.velocity(), DVec2::ZERO);
        // Corpses stay at zero
        e.adjust_hit_points(50);
        assert_eq!(e.hit_points(), 0);
    }

    #[test]
    fn test_corpse_terminates_after_delay() {
        let mut e = Entity::shark(0, 0, frames(3)).unwrap();
        e.kill();
        e.age_corpse(0.2);
        e.age_corpse(0.2);
        assert!(!e.is_terminated());
        e.age_corpse(0.2);
        assert!(e.is_terminated());

        // Rounding noise short of the delay still counts
        let mut e = Entity::shark(0, 0, frames(3)).unwrap();
        e.kill();
        e.age_corpse(0.599_999_999_99);
        assert!(e.death_delay() < DEATH_DELAY);
        assert!(e.is_terminated());
    }

    #[test]
    fn test_commit_axis_keeps_pixel_consistent() {
        let mut e = Entity::player(100, 100, frames(12)).unwrap();
        e.vel = DVec2::new(1.0, 0.0);
        e.acc = DVec2::new(PLAYER_MOVING_ACCELERATION, GRAVITY);
        e.commit_axis(Axis::X, 0.1);
        e.commit_axis(Axis::Y, 0.05);
        assert!((e.position().x - (1.0 + 0.1 + 0.5 * 0.9 * 0.01)).abs() < 1e-12);
        assert!((e.position().y - (1.0 - 0.5 * 10.0 * 0.0025)).abs() < 1e-12);
        assert_eq!(e.pixel().x, to_pixel(e.position().x));
        assert_eq!(e.pixel().y, to_pixel(e.position().y));
        assert!((e.velocity().x - 1.09).abs() < 1e-12);
        assert!((e.velocity().y + 0.5).abs() < 1e-12);
        assert_eq!(to_world(e.pixel().x), 1.1);
    }

    #[test]
    fn test_player_speed_ceiling_cuts_acceleration() {
        let mut e = Entity::player(0, 0, frames(12)).unwrap();
        e.acc.x = PLAYER_MOVING_ACCELERATION;
        e.set_velocity_x(3.5);
        assert_eq!(e.velocity().x, 3.0);
        assert_eq!(e.acceleration().x, 0.0);
        e.set_velocity_y(12.0);
        assert_eq!(e.velocity().y, PLAYER_MAX_VERTICAL_VELOCITY);
        e.set_velocity_y(-30.0);
        assert_eq!(e.velocity().y, -30.0);
    }

    #[test]
    fn test_orientation_reversed() {
        assert_eq!(Orientation::Left.reversed(), Orientation::Right);
        assert_eq!(Orientation::Right.reversed(), Orientation::Left);
    }

    #[test]
    fn test_set_position_detached() {
        let mut e = Entity::sneezewort(0, 0, frames(2)).unwrap();
        e.set_position(DVec2::new(0.505, 1.0)).unwrap();
        assert_eq!(e.pixel(), IVec2::new(51, 100));
        assert!(e.set_position(DVec2::new(-0.1, 0.0)).is_err());
        assert!(e.set_position(DVec2::new(f64::NAN, 0.0)).is_err());
    }
}

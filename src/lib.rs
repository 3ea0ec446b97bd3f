//! Jumping Alien - a deterministic tile-platformer simulation
//!
//! Core modules:
//! - `sim`: Deterministic simulation (tile grid, entities, sub-stepping, interactions)
//! - `settings`: World limits and viewport tuning, loadable from JSON
//! - `level`: Seeded demo level generation for the native harness
//! - `error`: Precondition and transition failures

pub mod error;
pub mod level;
pub mod settings;
pub mod sim;

pub use error::{ErrorClass, SimError, SimResult};
pub use settings::Settings;

use glam::{DVec2, IVec2};

/// Game configuration constants
///
/// These are game-design parameters. Several look asymmetric between kinds
/// (e.g. water hurts the player by 2 every 0.2s but a slime by 4 every 0.4s);
/// they are kept as they are.
pub mod consts {
    /// Largest time step a single advance call accepts (seconds)
    pub const MAX_DELTA_T: f64 = 0.2;
    /// Plants accept steps down to this negative value (floating noise from callers)
    pub const PLANT_DELTA_T_TOLERANCE: f64 = 1e-6;
    /// Target displacement per micro-step, in world units (one pixel)
    pub const MICRO_STEP_DISPLACEMENT: f64 = 0.01;
    /// Pixels per world unit
    pub const PIXELS_PER_UNIT: f64 = 100.0;
    /// Slack allowed when a sum of micro-steps is compared with a period
    pub const TIME_EPSILON: f64 = 1e-9;

    /// Vertical acceleration of anything falling (world units/s²)
    pub const GRAVITY: f64 = -10.0;

    /// Hit point ceiling for every kind
    pub const MAX_HIT_POINTS: i32 = 500;
    /// Grace period between death and removal from the world
    pub const DEATH_DELAY: f64 = 0.6;
    /// Window over which entity-vs-entity contact damage repeats
    pub const CONTACT_WINDOW: f64 = 0.6;

    // === Player ===
    pub const PLAYER_HIT_POINTS: i32 = 100;
    pub const PLAYER_MIN_HORIZONTAL_VELOCITY: f64 = 1.0;
    pub const PLAYER_MAX_HORIZONTAL_VELOCITY: f64 = 3.0;
    pub const PLAYER_MOVING_ACCELERATION: f64 = 0.9;
    pub const PLAYER_DUCKING_VELOCITY: f64 = 1.0;
    pub const PLAYER_JUMP_VELOCITY: f64 = 8.0;
    pub const PLAYER_MAX_VERTICAL_VELOCITY: f64 = 8.0;
    /// Walking animation frame period
    pub const PLAYER_FRAME_PERIOD: f64 = 0.075;
    /// Standing still this long turns the player back to the camera
    pub const PLAYER_FACE_FRONT_AFTER: f64 = 1.0;
    /// Hit points gained from eating a plant
    pub const PLANT_HEAL: i32 = 50;
    /// Hit points lost touching a dead plant
    pub const DEAD_PLANT_DAMAGE: i32 = 20;
    /// Hit points a skullcab loses per bite
    pub const SKULLCAB_BITE: i32 = 1;

    // === Slime ===
    pub const SLIME_HIT_POINTS: i32 = 100;
    pub const SLIME_MOVING_ACCELERATION: f64 = 0.7;
    pub const SLIME_MAX_HORIZONTAL_VELOCITY: f64 = 2.5;

    // === Shark ===
    pub const SHARK_HIT_POINTS: i32 = 100;
    pub const SHARK_MOVING_ACCELERATION: f64 = 1.5;
    pub const SHARK_JUMP_VELOCITY: f64 = 2.0;
    /// Duration of a swim/jump burst
    pub const SHARK_MOVE_DURATION: f64 = 0.5;
    /// Pause between bursts
    pub const SHARK_REST_DURATION: f64 = 1.0;

    // === Plants ===
    pub const PLANT_VELOCITY: f64 = 0.5;
    /// A plant reverses direction after this long
    pub const PLANT_SWAY_PERIOD: f64 = 0.5;
    pub const SNEEZEWORT_HIT_POINTS: i32 = 1;
    pub const SNEEZEWORT_LIFETIME: f64 = 10.0;
    pub const SKULLCAB_HIT_POINTS: i32 = 3;
    pub const SKULLCAB_LIFETIME: f64 = 12.0;
}

/// Continuous world coordinate to its pixel
#[inline]
pub fn to_pixel(coord: f64) -> i32 {
    (coord * consts::PIXELS_PER_UNIT).round() as i32
}

/// Pixel to its continuous world coordinate
#[inline]
pub fn to_world(pixel: i32) -> f64 {
    f64::from(pixel) / consts::PIXELS_PER_UNIT
}

/// Componentwise [`to_pixel`]
#[inline]
pub fn pixel_of(pos: DVec2) -> IVec2 {
    IVec2::new(to_pixel(pos.x), to_pixel(pos.y))
}

/// Whether `elapsed` has reached `period`, up to [`consts::TIME_EPSILON`]
///
/// Micro-step lengths rarely sum to an exact period; a sum that falls short
/// by rounding noise still counts as a full period.
#[inline]
pub fn reached(elapsed: f64, period: f64) -> bool {
    elapsed + consts::TIME_EPSILON >= period
}

/// Componentwise [`to_world`]
#[inline]
pub fn world_of(pixel: IVec2) -> DVec2 {
    DVec2::new(to_world(pixel.x), to_world(pixel.y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_round_trip() {
        for px in [0, 1, 7, 99, 100, 101, 12345] {
            assert_eq!(to_pixel(to_world(px)), px);
        }
    }

    #[test]
    fn test_to_pixel_rounds_to_nearest() {
        assert_eq!(to_pixel(0.014), 1);
        assert_eq!(to_pixel(0.016), 2);
        assert_eq!(to_pixel(1.004), 100);
    }

    #[test]
    fn test_reached_forgives_summation_noise() {
        let sum: f64 = (0..10).map(|_| 0.02).sum();
        assert!(sum < 0.2);
        assert!(reached(sum, 0.2));
        assert!(reached(0.2, 0.2));
        assert!(!reached(0.199, 0.2));
    }
}

//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Caller-chosen time steps, walked in adaptive micro-steps
//! - Per-kind behaviour comes from static policy tables
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod behaviour;
pub mod collision;
pub mod entity;
pub mod grid;
pub mod interaction;
pub mod material;
pub mod player;
pub mod policy;
pub mod school;
pub mod sprite;
pub mod stepper;
pub mod world;

pub use behaviour::{PlantState, SharkPhase, SharkState, SlimeState};
pub use collision::{PixelBox, WorldBounds, boxes_overlap};
pub use entity::{Axis, Behaviour, Entity, EntityId, Kind, Orientation};
pub use grid::TileGrid;
pub use interaction::{ContactClock, ExposureClock};
pub use material::Material;
pub use player::{Action, Direction, PlayerState};
pub use policy::{Check, KindPolicy};
pub use school::{School, SchoolId};
pub use sprite::Sprite;
pub use stepper::micro_step;
pub use world::{Viewport, World, WorldSnapshot};

//! Failures surfaced by simulation operations
//!
//! Every check runs before the operation mutates anything, so an `Err`
//! always leaves the world and its entities as they were.

use thiserror::Error;

use crate::sim::{EntityId, Kind, SchoolId};

pub type SimResult<T> = Result<T, SimError>;

/// Broad category of a [`SimError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// An argument was malformed or out of range
    Precondition,
    /// The operation is not allowed in the current state
    IllegalTransition,
}

#[derive(Debug, Error)]
pub enum SimError {
    // === Preconditions ===
    #[error("time step {0} is outside the accepted range")]
    InvalidTimeStep(f64),
    #[error("{kind:?} cannot use a set of {count} sprites")]
    InvalidSpriteSet { kind: Kind, count: usize },
    #[error("sprite {index} has a zero dimension")]
    EmptySprite { index: usize },
    #[error("position ({x}, {y}) is not a valid pixel position")]
    InvalidPosition { x: f64, y: f64 },
    #[error("tile grid: {0}")]
    InvalidGrid(String),
    #[error("viewport {width}x{height} does not fit the world")]
    InvalidViewport { width: i32, height: i32 },
    #[error("unknown material id {0}")]
    UnknownMaterial(u8),
    #[error("no entity {0:?} in this world")]
    UnknownEntity(EntityId),
    #[error("no school {0:?} in this world")]
    UnknownSchool(SchoolId),
    #[error("settings: {0}")]
    Settings(#[from] serde_json::Error),

    // === Illegal transitions ===
    #[error("entity is dead")]
    Dead,
    #[error("entity is already moving")]
    AlreadyMoving,
    #[error("entity is not moving")]
    NotMoving,
    #[error("entity is already jumping")]
    AlreadyJumping,
    #[error("entity is not jumping")]
    NotJumping,
    #[error("entity is not ducking")]
    NotDucking,
    #[error("{0:?} is not the player")]
    NotAPlayer(Kind),
    #[error("{0:?} is not a slime")]
    NotASlime(Kind),
    #[error("slime does not belong to a school")]
    NoSchool,
    #[error("slime already belongs to a school")]
    AlreadyInSchool,
    #[error("world has no player")]
    NoPlayer,
    #[error("slime identification {0} is already in use")]
    DuplicateSlime(u64),
    #[error("world has already been started")]
    WorldStarted,
    #[error("world has been terminated")]
    WorldTerminated,
    #[error("world has no entities to start with")]
    WorldEmpty,
    #[error("entity has been terminated")]
    EntityTerminated,
    #[error("entity already belongs to a world")]
    AlreadyInWorld,
    #[error("world already holds {0} entities")]
    CapacityReached(usize),
    #[error("world already has a player")]
    SecondPlayer,
    #[error("entity would start inside impassable terrain")]
    StartsInTerrain,
    #[error("world already holds {0} schools")]
    SchoolLimit(usize),
    #[error("school has been terminated")]
    SchoolTerminated,
    #[error("entity died {elapsed:.3}s ago and is still in its death delay")]
    DeathDelayPending { elapsed: f64 },
}

impl SimError {
    pub fn class(&self) -> ErrorClass {
        use SimError::*;
        match self {
            InvalidTimeStep(_)
            | InvalidSpriteSet { .. }
            | EmptySprite { .. }
            | InvalidPosition { .. }
            | InvalidGrid(_)
            | InvalidViewport { .. }
            | UnknownMaterial(_)
            | UnknownEntity(_)
            | UnknownSchool(_)
            | Settings(_) => ErrorClass::Precondition,
            _ => ErrorClass::IllegalTransition,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(SimError::InvalidTimeStep(0.3).class(), ErrorClass::Precondition);
        assert_eq!(SimError::AlreadyJumping.class(), ErrorClass::IllegalTransition);
        assert_eq!(
            SimError::DeathDelayPending { elapsed: 0.1 }.class(),
            ErrorClass::IllegalTransition
        );
    }

    #[test]
    fn test_error_messages() {
        let err = SimError::InvalidSpriteSet { kind: Kind::Shark, count: 2 };
        assert_eq!(err.to_string(), "Shark cannot use a set of 2 sprites");
    }
}

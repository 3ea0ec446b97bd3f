//! Sprite metadata: only the frame dimensions matter to the simulation

use serde::{Deserialize, Serialize};

use super::entity::Kind;
use crate::error::{SimError, SimResult};

/// Dimensions of one animation frame, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprite {
    pub width: i32,
    pub height: i32,
}

impl Sprite {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// How many frames a kind needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteRule {
    Exactly(usize),
    /// More than the given number, and an even count
    EvenAbove(usize),
}

impl SpriteRule {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            SpriteRule::Exactly(n) => count == n,
            SpriteRule::EvenAbove(n) => count > n && count % 2 == 0,
        }
    }
}

/// Check a sprite set against the rule of `kind`
pub fn validate(kind: Kind, sprites: &[Sprite]) -> SimResult<()> {
    if !kind.policy().sprites.accepts(sprites.len()) {
        return Err(SimError::InvalidSpriteSet {
            kind,
            count: sprites.len(),
        });
    }
    match sprites.iter().position(|s| s.width <= 0 || s.height <= 0) {
        Some(index) => Err(SimError::EmptySprite { index }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules() {
        assert!(SpriteRule::Exactly(3).accepts(3));
        assert!(!SpriteRule::Exactly(3).accepts(2));
        assert!(SpriteRule::EvenAbove(10).accepts(12));
        assert!(!SpriteRule::EvenAbove(10).accepts(10));
        assert!(!SpriteRule::EvenAbove(10).accepts(13));
    }

    #[test]
    fn test_validate_per_kind() {
        let frame = Sprite::new(10, 10);
        assert!(validate(Kind::Slime, &[frame; 2]).is_ok());
        assert!(validate(Kind::Shark, &[frame; 2]).is_err());
        assert!(validate(Kind::Player, &[frame; 12]).is_ok());
        assert!(validate(Kind::Player, &[frame; 11]).is_err());
        assert!(matches!(
            validate(Kind::Sneezewort, &[frame, Sprite::new(0, 4)]),
            Err(SimError::EmptySprite { index: 1 })
        ));
    }
}

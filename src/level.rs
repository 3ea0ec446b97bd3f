//! Seeded demo level generation
//!
//! The level is laid out in segments of ten tiles. The first holds the
//! player, the next five get one feature each in a seed-dependent order and
//! the last holds the target.

use glam::IVec2;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::error::SimResult;
use crate::settings::Settings;
use crate::sim::{Entity, Material, SchoolId, Sprite, TileGrid, World};

pub const TILE_LENGTH: i32 = 20;
pub const TILES_X: i32 = 70;
pub const TILES_Y: i32 = 16;
const SEGMENT: i32 = 10;
const VIEWPORT: IVec2 = IVec2::new(400, 240);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum Feature {
    /// Water pool with a shark
    Pool,
    MagmaPit,
    GasCloud,
    /// Floating ice ledge with a skullcab on top
    Ledge,
    /// Flat ground with a school of slimes
    Meadow,
}

/// Something to place in the world, in pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Spawn {
    Player { x: i32, y: i32 },
    Slime { ident: u64, x: i32, y: i32, school: usize },
    Shark { x: i32, y: i32 },
    Sneezewort { x: i32, y: i32 },
    Skullcab { x: i32, y: i32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub seed: u64,
    pub grid: TileGrid,
    pub target_tile: IVec2,
    pub viewport: IVec2,
    /// Number of slime schools the spawns refer to
    pub schools: usize,
    pub spawns: Vec<Spawn>,
}

pub fn player_sprites() -> Vec<Sprite> {
    let mut frames = vec![Sprite::new(14, 30); 12];
    // Ducking frames
    for idx in [1, 6, 7] {
        frames[idx] = Sprite::new(14, 18);
    }
    frames
}

pub fn slime_sprites() -> Vec<Sprite> {
    vec![Sprite::new(16, 10); 2]
}

pub fn shark_sprites() -> Vec<Sprite> {
    vec![Sprite::new(30, 16); 3]
}

pub fn plant_sprites() -> Vec<Sprite> {
    vec![Sprite::new(10, 10); 2]
}

/// Build a level from a seed; the same seed always gives the same level
pub fn generate(seed: u64) -> SimResult<Level> {
    let mut rng = Pcg32::seed_from_u64(seed);
    let mut tiles = vec![Material::Air; (TILES_X * TILES_Y) as usize];
    let mut fill = |col: i32, row: i32, material: Material| {
        tiles[(row * TILES_X + col) as usize] = material;
    };
    for col in 0..TILES_X {
        fill(col, 0, Material::Solid);
    }

    let mut features = [
        Feature::Pool,
        Feature::MagmaPit,
        Feature::GasCloud,
        Feature::Ledge,
        Feature::Meadow,
    ];
    features.shuffle(&mut rng);

    let mut spawns = vec![Spawn::Player {
        x: 2 * TILE_LENGTH,
        y: TILE_LENGTH,
    }];
    let mut next_ident = 1u64;
    let mut schools = 0;

    for (i, feature) in features.iter().enumerate() {
        let start = SEGMENT * (i as i32 + 1) + rng.random_range(1..3);
        let width = rng.random_range(3..6);
        let cols = start..start + width;
        match feature {
            Feature::Pool => {
                for col in cols {
                    fill(col, 1, Material::Water);
                    fill(col, 2, Material::Water);
                }
                spawns.push(Spawn::Shark {
                    x: start * TILE_LENGTH + 5,
                    y: TILE_LENGTH,
                });
            }
            Feature::MagmaPit => {
                for col in cols {
                    fill(col, 1, Material::Magma);
                }
            }
            Feature::GasCloud => {
                for col in cols {
                    for row in 1..=3 {
                        fill(col, row, Material::Gas);
                    }
                }
            }
            Feature::Ledge => {
                let row = rng.random_range(4..7);
                for col in cols {
                    fill(col, row, Material::Ice);
                }
                spawns.push(Spawn::Skullcab {
                    x: start * TILE_LENGTH + 4,
                    y: (row + 1) * TILE_LENGTH,
                });
            }
            Feature::Meadow => {
                let count = rng.random_range(2..=4);
                for k in 0..count {
                    spawns.push(Spawn::Slime {
                        ident: next_ident,
                        x: (start + 2 * k) * TILE_LENGTH,
                        y: TILE_LENGTH,
                        school: schools,
                    });
                    next_ident += 1;
                }
                schools += 1;
            }
        }
    }

    // A pair of stragglers near the target in their own school
    for k in 0..2 {
        spawns.push(Spawn::Slime {
            ident: next_ident,
            x: (TILES_X - 8 + 2 * k) * TILE_LENGTH,
            y: TILE_LENGTH,
            school: schools,
        });
        next_ident += 1;
    }
    schools += 1;

    for _ in 0..2 {
        let col = rng.random_range(SEGMENT..TILES_X - 2);
        spawns.push(Spawn::Sneezewort {
            x: col * TILE_LENGTH,
            y: rng.random_range(3..6) * TILE_LENGTH,
        });
    }

    let grid = TileGrid::new(TILE_LENGTH, TILES_X, TILES_Y, tiles)?;
    log::info!(
        "Level {seed}: {:?}, {} spawns in {schools} schools",
        features,
        spawns.len()
    );
    Ok(Level {
        seed,
        grid,
        target_tile: IVec2::new(TILES_X - 2, 1),
        viewport: VIEWPORT,
        schools,
        spawns,
    })
}

impl Spawn {
    fn build(&self, schools: &[SchoolId]) -> SimResult<Entity> {
        match *self {
            Spawn::Player { x, y } => Entity::player(x, y, player_sprites()),
            Spawn::Slime { ident, x, y, school } => {
                Entity::slime(ident, x, y, slime_sprites(), schools.get(school).copied())
            }
            Spawn::Shark { x, y } => Entity::shark(x, y, shark_sprites()),
            Spawn::Sneezewort { x, y } => Entity::sneezewort(x, y, plant_sprites()),
            Spawn::Skullcab { x, y } => Entity::skullcab(x, y, plant_sprites()),
        }
    }
}

impl Level {
    /// Create the world and place every spawn in it
    pub fn into_world(self, settings: Settings) -> SimResult<World> {
        let mut world = World::new(self.grid, self.target_tile, self.viewport, settings)?;
        let schools = (0..self.schools)
            .map(|_| world.create_school())
            .collect::<SimResult<Vec<_>>>()?;
        for spawn in &self.spawns {
            world.add_entity(spawn.build(&schools)?)?;
        }
        Ok(world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Kind;

    #[test]
    fn test_same_seed_same_level() {
        assert_eq!(generate(42).unwrap(), generate(42).unwrap());
    }

    #[test]
    fn test_levels_build_worlds() {
        for seed in 0..16 {
            let world = generate(seed).unwrap().into_world(Settings::default()).unwrap();
            assert!(world.player().is_some(), "seed {seed}");
            assert!(world.entities().iter().any(|e| e.kind() == Kind::Shark));
            assert_eq!(world.grid().tile(0, 0), Material::Solid);
        }
    }

    #[test]
    fn test_every_slime_has_a_school() {
        let world = generate(7).unwrap().into_world(Settings::default()).unwrap();
        let slimes: Vec<_> = world.entities().iter().filter(|e| e.kind() == Kind::Slime).collect();
        assert!(slimes.len() >= 4);
        assert!(slimes.iter().all(|s| s.school().is_some()));
    }
}

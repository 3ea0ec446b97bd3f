//! Geological materials a tile can carry

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Material {
    #[default]
    Air,
    Solid,
    Water,
    Magma,
    Ice,
    Gas,
}

impl Material {
    pub const COUNT: usize = 6;

    pub const ALL: [Material; Material::COUNT] = [
        Material::Air,
        Material::Solid,
        Material::Water,
        Material::Magma,
        Material::Ice,
        Material::Gas,
    ];

    /// Numeric tag used by level data
    pub fn id(self) -> u8 {
        match self {
            Material::Air => 0,
            Material::Solid => 1,
            Material::Water => 2,
            Material::Magma => 3,
            Material::Ice => 4,
            Material::Gas => 5,
        }
    }

    pub fn from_id(id: u8) -> SimResult<Self> {
        Material::ALL
            .get(usize::from(id))
            .copied()
            .ok_or(SimError::UnknownMaterial(id))
    }

    /// Slot in per-material tables
    #[inline]
    pub fn index(self) -> usize {
        usize::from(self.id())
    }

    pub fn is_passable(self) -> bool {
        !matches!(self, Material::Solid | Material::Ice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_round_trip() {
        for material in Material::ALL {
            assert_eq!(Material::from_id(material.id()).unwrap(), material);
        }
        assert!(Material::from_id(6).is_err());
    }

    #[test]
    fn test_passability() {
        let impassable: Vec<_> = Material::ALL.into_iter().filter(|m| !m.is_passable()).collect();
        assert_eq!(impassable, vec![Material::Solid, Material::Ice]);
    }
}

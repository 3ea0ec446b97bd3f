//! Slime schools
//!
//! Membership is recorded on each slime; a [`School`] only exists so the
//! world can bound how many groups it holds and retire them.

use serde::{Deserialize, Serialize};

use super::entity::{Entity, Kind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SchoolId(pub u32);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct School {
    pub id: SchoolId,
    pub terminated: bool,
}

impl School {
    pub fn new(id: SchoolId) -> Self {
        Self {
            id,
            terminated: false,
        }
    }
}

fn in_school(entity: &Entity, school: SchoolId) -> bool {
    entity.kind() == Kind::Slime && !entity.is_terminated() && entity.school() == Some(school)
}

/// Members of `school` among `others`
pub fn members(others: &[Entity], school: SchoolId) -> impl Iterator<Item = &Entity> {
    others.iter().filter(move |e| in_school(e, school))
}

/// Size of the school `entity` belongs to, counting `entity` itself
pub(crate) fn size_with(entity: &Entity, others: &[Entity]) -> usize {
    match entity.school() {
        Some(school) => 1 + members(others, school).count(),
        None => 1,
    }
}

/// Every other member of the entity's school loses one hit point
pub(crate) fn penalize_members(entity: &Entity, others: &mut [Entity]) {
    let Some(school) = entity.school() else {
        return;
    };
    for member in others.iter_mut().filter(|e| in_school(e, school)) {
        member.adjust_hit_points(-1);
    }
}

/// Move a slime to another school, trading hit points with both groups
///
/// Leaving costs the slime one hit point per remaining member of the old
/// school, each of whom gains one; joining gains it one per new member,
/// each of whom loses one.
pub(crate) fn transfer(slime: &mut Entity, others: &mut [Entity], to: SchoolId) {
    if let Some(from) = slime.school() {
        if from == to {
            return;
        }
        for member in others.iter_mut().filter(|e| in_school(e, from)) {
            slime.adjust_hit_points(-1);
            member.adjust_hit_points(1);
        }
    }
    slime.set_school(Some(to));
    for member in others.iter_mut().filter(|e| in_school(e, to)) {
        slime.adjust_hit_points(1);
        member.adjust_hit_points(-1);
    }
    log::debug!("slime {:?} joined school {:?}", slime.id(), to);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{EntityId, Sprite};

    fn slime(ident: u64, school: u32) -> Entity {
        let mut slime =
            Entity::slime(ident, 0, 0, vec![Sprite::new(10, 10); 2], Some(SchoolId(school))).unwrap();
        slime.id = Some(EntityId(ident as u32));
        slime
    }

    #[test]
    fn test_transfer_trades_hit_points() {
        let mut mover = slime(1, 0);
        let mut others = vec![slime(2, 0), slime(3, 1), slime(4, 1)];
        transfer(&mut mover, &mut others, SchoolId(1));

        // -1 for the one old member, +2 for the two new members
        assert_eq!(mover.hit_points(), 101);
        assert_eq!(mover.school(), Some(SchoolId(1)));
        assert_eq!(others[0].hit_points(), 101);
        assert_eq!(others[1].hit_points(), 99);
        assert_eq!(others[2].hit_points(), 99);
    }

    #[test]
    fn test_penalize_members_skips_other_schools() {
        let hurt = slime(1, 0);
        let mut others = vec![slime(2, 0), slime(3, 1)];
        penalize_members(&hurt, &mut others);
        assert_eq!(others[0].hit_points(), 99);
        assert_eq!(others[1].hit_points(), 100);
    }

    #[test]
    fn test_size_counts_self() {
        let me = slime(1, 0);
        let others = vec![slime(2, 0), slime(3, 1)];
        assert_eq!(size_with(&me, &others), 2);
        assert_eq!(members(&others, SchoolId(1)).count(), 1);
    }
}

//! Hit point rules applied while an entity moves
//!
//! Environmental exposure (water, magma, gas) is evaluated before contact
//! with other entities at every micro-step. Both kinds of rule keep a small
//! clock on the entity and fire when that clock crosses its period.

use serde::{Deserialize, Serialize};

use super::collision::{self, PixelBox};
use super::entity::{Entity, EntityId, Kind};
use super::policy::Trigger;
use super::school;
use super::stepper::Scene;
use crate::consts::*;
use crate::reached;

/// Exposure bookkeeping for one material
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExposureClock {
    active: bool,
    elapsed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exposure {
    /// First moment in the zone
    Entered,
    /// Whole periods completed since the last call
    Ticks(u32),
}

impl ExposureClock {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn advance(&mut self, dt: f64, period: f64) -> Exposure {
        if !self.active {
            self.active = true;
            self.elapsed = 0.0;
            return Exposure::Entered;
        }
        self.elapsed += dt;
        Exposure::Ticks(take_periods(&mut self.elapsed, period))
    }
}

/// Remove every whole period from `elapsed` and return how many there were
fn take_periods(elapsed: &mut f64, period: f64) -> u32 {
    if !reached(*elapsed, period) {
        return 0;
    }
    let whole = ((*elapsed + TIME_EPSILON) / period).floor();
    *elapsed = (*elapsed - whole * period).max(0.0);
    whole as u32
}

/// Contact bookkeeping against one partner
///
/// A fresh touch fires immediately and opens a window. When the window
/// runs out the contact fires again if the two still touch; otherwise the
/// clock closes and the next touch counts as fresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactClock {
    engaged: bool,
    elapsed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contact {
    Idle,
    Opened,
    Repeated(u32),
}

impl ContactClock {
    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    pub fn advance(&mut self, touching: bool, dt: f64, window: f64) -> Contact {
        if !self.engaged {
            if touching {
                self.engaged = true;
                self.elapsed = 0.0;
                return Contact::Opened;
            }
            return Contact::Idle;
        }
        self.elapsed += dt;
        let windows = take_periods(&mut self.elapsed, window);
        if windows == 0 {
            return Contact::Idle;
        }
        if touching {
            Contact::Repeated(windows)
        } else {
            self.reset();
            Contact::Idle
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Apply every exposure rule of the entity's kind for a box held for `dt`
pub(crate) fn expose(entity: &mut Entity, scene: &mut Scene<'_>, bbox: PixelBox, dt: f64) {
    let grid = scene.grid;
    for rule in entity.kind().policy().exposure {
        let slot = rule.material.index();
        let touching = collision::overlaps_material(grid, bbox, rule.material);
        let in_zone = match rule.trigger {
            Trigger::Inside => touching,
            Trigger::Outside => !touching,
        };
        if !in_zone {
            entity.exposure[slot].reset();
            continue;
        }
        if collision::overlaps_any_material(grid, bbox, rule.suppressed_by) {
            continue;
        }
        if rule.lethal {
            log::debug!("{:?} {:?} killed by {:?}", entity.kind(), entity.id(), rule.material);
            entity.kill();
            return;
        }
        let delta = match entity.exposure[slot].advance(dt, rule.period) {
            Exposure::Entered => rule.on_entry,
            Exposure::Ticks(n) => n as i32 * rule.per_tick,
        };
        if delta != 0 {
            entity.adjust_hit_points(delta);
            if rule.school_penalty && delta < 0 {
                school::penalize_members(entity, scene.others);
            }
        }
        if entity.is_dead() {
            return;
        }
    }
}

/// Apply the entity's contact rules against every partner touching `bbox`
///
/// Touching includes boxes that are merely adjacent: a solid entity that
/// walks into another is rolled back to the last pixel before the overlap.
/// A one-shot rule hurts each partner once; later hits only block.
pub(crate) fn engage(entity: &mut Entity, scene: &mut Scene<'_>, bbox: PixelBox, dt: f64) {
    let rules = entity.kind().policy().contacts;
    if rules.is_empty() {
        return;
    }
    let reach = bbox.grown(1);
    for rule in rules {
        for idx in 0..scene.others.len() {
            let other = &scene.others[idx];
            if other.kind() != rule.partner || other.is_terminated() {
                continue;
            }
            let Some(other_id) = other.id() else {
                continue;
            };
            let touching = !other.is_dead() && reach.overlaps(&other.bbox());
            let hits = match entity.contact_clock(other_id).advance(touching, dt, rule.window) {
                Contact::Opened => 1,
                Contact::Repeated(n) if rule.repeats => n,
                _ => 0,
            };
            let damaging = if rule.once && hits > 0 {
                u32::from(entity.strike(other_id))
            } else {
                hits
            };
            for _ in 0..damaging {
                entity.adjust_hit_points(rule.own);
                scene.others[idx].adjust_hit_points(rule.partner_delta);
                if rule.school_penalty && rule.own < 0 {
                    school::penalize_members(entity, scene.others);
                }
            }
            if hits > 0 && rule.blocks {
                entity.block();
            }
        }
    }
    prune_contacts(entity, scene.others);
}

/// Player eating plants overlapping `bbox`
///
/// `spared` lists skullcabs the player finished off during the current
/// advance; their corpses do not hurt the player before it moves on.
pub(crate) fn graze(
    player: &mut Entity,
    scene: &mut Scene<'_>,
    bbox: PixelBox,
    dt: f64,
    spared: &mut Vec<EntityId>,
) {
    for idx in 0..scene.others.len() {
        let plant = &scene.others[idx];
        if !plant.kind().is_plant() || plant.is_terminated() {
            continue;
        }
        let Some(plant_id) = plant.id() else {
            continue;
        };
        let touching = bbox.overlaps(&plant.bbox());
        if plant.is_dead() {
            if touching {
                if !spared.contains(&plant_id) {
                    player.adjust_hit_points(-DEAD_PLANT_DAMAGE);
                }
                scene.others[idx].terminate();
            }
            continue;
        }
        let hungry = player.hit_points() < MAX_HIT_POINTS;
        match plant.kind() {
            Kind::Sneezewort => {
                if touching && hungry {
                    scene.others[idx].terminate();
                    player.adjust_hit_points(PLANT_HEAL);
                    log::debug!("player ate sneezewort {plant_id:?}");
                }
            }
            Kind::Skullcab => {
                let bites = match player
                    .contact_clock(plant_id)
                    .advance(touching && hungry, dt, CONTACT_WINDOW)
                {
                    Contact::Opened => 1,
                    Contact::Repeated(n) => n,
                    Contact::Idle => 0,
                };
                for _ in 0..bites {
                    player.adjust_hit_points(PLANT_HEAL);
                    scene.others[idx].adjust_hit_points(-SKULLCAB_BITE);
                }
                if scene.others[idx].is_dead() {
                    spared.push(plant_id);
                }
            }
            _ => {}
        }
    }
    prune_contacts(player, scene.others);
}

fn prune_contacts(entity: &mut Entity, others: &[Entity]) {
    entity.contacts.retain(|(id, clock)| {
        clock.is_engaged() && others.iter().any(|o| o.id() == Some(*id) && !o.is_terminated())
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exposure_enters_then_ticks() {
        let mut clock = ExposureClock::default();
        assert_eq!(clock.advance(0.1, 0.2), Exposure::Entered);
        assert_eq!(clock.advance(0.1, 0.2), Exposure::Ticks(0));
        assert_eq!(clock.advance(0.1, 0.2), Exposure::Ticks(1));
        // Remainder carried over
        assert_eq!(clock.advance(0.15, 0.2), Exposure::Ticks(0));
        assert_eq!(clock.advance(0.5, 0.2), Exposure::Ticks(3));
    }

    #[test]
    fn test_exposure_ticks_on_short_sums() {
        let mut clock = ExposureClock::default();
        clock.advance(0.0, 0.2);
        let mut ticks = 0;
        for _ in 0..50 {
            if let Exposure::Ticks(n) = clock.advance(0.02, 0.2) {
                ticks += n;
            }
        }
        assert_eq!(ticks, 5);
        // A hair past a boundary is not another period
        assert_eq!(clock.advance(1e-12, 0.2), Exposure::Ticks(0));
    }

    #[test]
    fn test_exposure_reset() {
        let mut clock = ExposureClock::default();
        clock.advance(0.0, 0.2);
        clock.advance(0.19, 0.2);
        clock.reset();
        assert!(!clock.is_active());
        assert_eq!(clock.advance(0.19, 0.2), Exposure::Entered);
    }

    #[test]
    fn test_contact_repeats_while_touching() {
        let mut clock = ContactClock::default();
        assert_eq!(clock.advance(true, 0.1, 0.6), Contact::Opened);
        for _ in 0..5 {
            assert_eq!(clock.advance(true, 0.1, 0.6), Contact::Idle);
        }
        assert_eq!(clock.advance(true, 0.11, 0.6), Contact::Repeated(1));
        assert!(clock.is_engaged());
    }

    #[test]
    fn test_contact_window_on_short_sums() {
        let mut clock = ContactClock::default();
        assert_eq!(clock.advance(true, 0.0, 0.2), Contact::Opened);
        for _ in 0..9 {
            assert_eq!(clock.advance(true, 0.02, 0.2), Contact::Idle);
        }
        assert_eq!(clock.advance(true, 0.02, 0.2), Contact::Repeated(1));
    }

    #[test]
    fn test_contact_cooldown_after_separation() {
        let mut clock = ContactClock::default();
        assert_eq!(clock.advance(true, 0.0, 0.6), Contact::Opened);
        // Separated, then touching again inside the window: no fresh hit
        assert_eq!(clock.advance(false, 0.2, 0.6), Contact::Idle);
        assert_eq!(clock.advance(true, 0.2, 0.6), Contact::Idle);
        // Window expires while apart: clock closes
        assert_eq!(clock.advance(false, 0.3, 0.6), Contact::Idle);
        assert!(!clock.is_engaged());
        assert_eq!(clock.advance(true, 0.01, 0.6), Contact::Opened);
    }
}

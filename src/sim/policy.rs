//! Per-kind rule tables
//!
//! Every kind runs the same stepping and interaction code; what differs is
//! collected here: legal velocities and accelerations, exposure and contact
//! damage, and which collision checks run at each micro-step.

use super::entity::Kind;
use super::material::Material;
use super::sprite::SpriteRule;
use crate::consts::*;

/// Legal horizontal speeds: zero, or a magnitude within `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityBound {
    pub min: f64,
    pub max: f64,
}

impl VelocityBound {
    pub const FREE: VelocityBound = VelocityBound {
        min: 0.0,
        max: f64::INFINITY,
    };

    /// Nearest legal value, and whether the ceiling was hit
    pub fn clamp(self, v: f64) -> (f64, bool) {
        let speed = v.abs();
        if speed == 0.0 {
            (0.0, false)
        } else if speed > self.max {
            (self.max.copysign(v), true)
        } else if speed < self.min {
            (self.min.copysign(v), false)
        } else {
            (v, false)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Rule applies while the box overlaps the material
    Inside,
    /// Rule applies while the box stays clear of the material
    Outside,
}

#[derive(Debug, Clone, Copy)]
pub struct ExposureRule {
    pub material: Material,
    pub trigger: Trigger,
    pub period: f64,
    /// Hit point change per completed period
    pub per_tick: i32,
    /// Hit point change on entering the zone
    pub on_entry: i32,
    /// The rule is paused while any of these is also overlapped
    pub suppressed_by: &'static [Material],
    /// Touching the material kills outright
    pub lethal: bool,
    /// Damage also costs every other member of the school one hit point
    pub school_penalty: bool,
}

impl ExposureRule {
    const fn periodic(material: Material, period: f64, per_tick: i32) -> Self {
        Self {
            material,
            trigger: Trigger::Inside,
            period,
            per_tick,
            on_entry: 0,
            suppressed_by: &[],
            lethal: false,
            school_penalty: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ContactRule {
    pub partner: Kind,
    /// Hit point change for the entity applying the rule
    pub own: i32,
    /// Hit point change for the partner
    pub partner_delta: i32,
    pub window: f64,
    /// Fire again at every window while contact persists
    pub repeats: bool,
    /// Hit points change only on the first contact with each partner;
    /// later contacts still count for `blocks`
    pub once: bool,
    pub school_penalty: bool,
    /// Contact freezes the entity for one window
    pub blocks: bool,
}

impl ContactRule {
    const fn hurt_by(partner: Kind, damage: i32) -> Self {
        Self {
            partner,
            own: -damage,
            partner_delta: 0,
            window: CONTACT_WINDOW,
            repeats: true,
            once: false,
            school_penalty: false,
            blocks: false,
        }
    }
}

/// Collision checks run against each candidate position, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// Overlapping a solid entity: roll both axes back and stop
    Blocked,
    /// Touching down while falling: settle vertically
    Land { on_entities: bool },
    /// Head against the ceiling while rising
    BumpAbove,
    /// Terrain beside the box on the side it is moving towards
    BumpSide,
    /// Leaving the water surface upward: gravity resumes
    Surface,
    /// Entering water from above
    Dive,
    /// Descending while submerged
    Sink,
    /// Walking into the player
    MeetPlayer,
    /// Walking into another slime
    MeetSlime,
    /// Walking into a living shark
    MeetShark,
    /// Leaving the world
    Escape,
}

#[derive(Debug, Clone, Copy)]
pub struct KindPolicy {
    pub hit_points: i32,
    pub sprites: SpriteRule,
    pub horizontal: VelocityBound,
    /// Upward speed ceiling
    pub max_vertical: f64,
    /// Magnitude of the only non-zero horizontal acceleration
    pub moving_acceleration: f64,
    /// Smallest accepted time step
    pub min_delta_t: f64,
    pub exposure: &'static [ExposureRule],
    pub contacts: &'static [ContactRule],
    pub checks: &'static [Check],
}

impl KindPolicy {
    pub fn accepts_delta_t(&self, delta_t: f64) -> bool {
        delta_t >= self.min_delta_t && delta_t <= MAX_DELTA_T
    }

    pub fn legal_horizontal_acceleration(&self, ax: f64) -> bool {
        ax == 0.0 || ax.abs() == self.moving_acceleration
    }

    pub fn legal_vertical_acceleration(&self, ay: f64) -> bool {
        ay == 0.0 || ay == GRAVITY
    }
}

pub static PLAYER: KindPolicy = KindPolicy {
    hit_points: PLAYER_HIT_POINTS,
    sprites: SpriteRule::EvenAbove(10),
    horizontal: VelocityBound {
        min: PLAYER_MIN_HORIZONTAL_VELOCITY,
        max: PLAYER_MAX_HORIZONTAL_VELOCITY,
    },
    max_vertical: PLAYER_MAX_VERTICAL_VELOCITY,
    moving_acceleration: PLAYER_MOVING_ACCELERATION,
    min_delta_t: 0.0,
    exposure: &[
        ExposureRule {
            suppressed_by: &[Material::Magma, Material::Gas],
            ..ExposureRule::periodic(Material::Water, 0.2, -2)
        },
        ExposureRule {
            on_entry: -50,
            ..ExposureRule::periodic(Material::Magma, 0.2, -50)
        },
        ExposureRule {
            on_entry: -4,
            suppressed_by: &[Material::Magma],
            ..ExposureRule::periodic(Material::Gas, 0.2, -4)
        },
    ],
    contacts: &[
        ContactRule::hurt_by(Kind::Slime, 20),
        ContactRule {
            once: true,
            ..ContactRule::hurt_by(Kind::Shark, 50)
        },
    ],
    checks: &[
        Check::Blocked,
        Check::Land { on_entities: true },
        Check::BumpAbove,
        Check::BumpSide,
        Check::Escape,
    ],
};

pub static SLIME: KindPolicy = KindPolicy {
    hit_points: SLIME_HIT_POINTS,
    sprites: SpriteRule::Exactly(2),
    horizontal: VelocityBound {
        min: 0.0,
        max: SLIME_MAX_HORIZONTAL_VELOCITY,
    },
    max_vertical: f64::INFINITY,
    moving_acceleration: SLIME_MOVING_ACCELERATION,
    min_delta_t: 0.0,
    exposure: &[
        ExposureRule {
            school_penalty: true,
            ..ExposureRule::periodic(Material::Water, 0.4, -4)
        },
        ExposureRule {
            lethal: true,
            ..ExposureRule::periodic(Material::Magma, 0.2, 0)
        },
        ExposureRule::periodic(Material::Gas, 0.3, 2),
    ],
    contacts: &[ContactRule {
        school_penalty: true,
        ..ContactRule::hurt_by(Kind::Player, 30)
    }],
    checks: &[
        Check::BumpSide,
        Check::MeetPlayer,
        Check::MeetSlime,
        Check::MeetShark,
        Check::Escape,
    ],
};

pub static SHARK: KindPolicy = KindPolicy {
    hit_points: SHARK_HIT_POINTS,
    sprites: SpriteRule::Exactly(3),
    horizontal: VelocityBound::FREE,
    max_vertical: f64::INFINITY,
    moving_acceleration: SHARK_MOVING_ACCELERATION,
    min_delta_t: 0.0,
    exposure: &[ExposureRule {
        trigger: Trigger::Outside,
        ..ExposureRule::periodic(Material::Water, 0.2, -6)
    }],
    contacts: &[
        ContactRule {
            once: true,
            blocks: true,
            ..ContactRule::hurt_by(Kind::Player, 50)
        },
        ContactRule {
            own: 10,
            repeats: false,
            ..ContactRule::hurt_by(Kind::Slime, 0)
        },
    ],
    checks: &[
        Check::Blocked,
        Check::BumpSide,
        Check::BumpAbove,
        Check::Surface,
        Check::Dive,
        Check::Land { on_entities: false },
        Check::Sink,
        Check::Escape,
    ],
};

pub static SNEEZEWORT: KindPolicy = KindPolicy {
    hit_points: SNEEZEWORT_HIT_POINTS,
    sprites: SpriteRule::Exactly(2),
    horizontal: VelocityBound {
        min: PLANT_VELOCITY,
        max: PLANT_VELOCITY,
    },
    max_vertical: 0.0,
    moving_acceleration: 0.0,
    min_delta_t: -PLANT_DELTA_T_TOLERANCE,
    exposure: &[],
    contacts: &[],
    checks: &[Check::Escape],
};

pub static SKULLCAB: KindPolicy = KindPolicy {
    hit_points: SKULLCAB_HIT_POINTS,
    sprites: SpriteRule::Exactly(2),
    horizontal: VelocityBound { min: 0.0, max: 0.0 },
    max_vertical: PLANT_VELOCITY,
    moving_acceleration: 0.0,
    min_delta_t: -PLANT_DELTA_T_TOLERANCE,
    exposure: &[],
    contacts: &[],
    checks: &[Check::Escape],
};

impl Kind {
    pub fn policy(self) -> &'static KindPolicy {
        match self {
            Kind::Player => &PLAYER,
            Kind::Slime => &SLIME,
            Kind::Shark => &SHARK,
            Kind::Sneezewort => &SNEEZEWORT,
            Kind::Skullcab => &SKULLCAB,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_velocity_clamp() {
        let bound = PLAYER.horizontal;
        assert_eq!(bound.clamp(0.0), (0.0, false));
        assert_eq!(bound.clamp(0.4), (1.0, false));
        assert_eq!(bound.clamp(-0.4), (-1.0, false));
        assert_eq!(bound.clamp(2.0), (2.0, false));
        assert_eq!(bound.clamp(-4.0), (-3.0, true));
    }

    #[test]
    fn test_free_bound() {
        assert_eq!(SHARK.horizontal.clamp(1e6), (1e6, false));
    }

    #[test]
    fn test_acceleration_legality() {
        assert!(PLAYER.legal_horizontal_acceleration(-0.9));
        assert!(PLAYER.legal_horizontal_acceleration(0.0));
        assert!(!PLAYER.legal_horizontal_acceleration(0.7));
        assert!(SLIME.legal_vertical_acceleration(GRAVITY));
        assert!(!SLIME.legal_vertical_acceleration(-9.0));
    }

    #[test]
    fn test_delta_t_ranges() {
        assert!(PLAYER.accepts_delta_t(0.0));
        assert!(PLAYER.accepts_delta_t(0.2));
        assert!(!PLAYER.accepts_delta_t(0.21));
        assert!(!PLAYER.accepts_delta_t(-1e-9));
        assert!(!PLAYER.accepts_delta_t(f64::NAN));
        assert!(SKULLCAB.accepts_delta_t(-1e-7));
        assert!(!SKULLCAB.accepts_delta_t(-1e-5));
    }

    #[test]
    fn test_water_hurts_player_faster_than_slime() {
        let player = PLAYER.exposure.iter().find(|r| r.material == Material::Water).unwrap();
        let slime = SLIME.exposure.iter().find(|r| r.material == Material::Water).unwrap();
        assert_eq!((player.per_tick, player.period), (-2, 0.2));
        assert_eq!((slime.per_tick, slime.period), (-4, 0.4));
    }

    #[test]
    fn test_player_shark_contact_is_one_shot_both_ways() {
        let player = PLAYER.contacts.iter().find(|r| r.partner == Kind::Shark).unwrap();
        let shark = SHARK.contacts.iter().find(|r| r.partner == Kind::Player).unwrap();
        assert!(player.once && shark.once);
        assert!(shark.blocks && shark.repeats);
        let slime = PLAYER.contacts.iter().find(|r| r.partner == Kind::Slime).unwrap();
        assert!(!slime.once && slime.repeats);
    }
}

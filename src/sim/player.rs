//! The player character: input actions, sprite selection and its advance

use serde::{Deserialize, Serialize};

use super::collision::{self, PixelBox};
use super::entity::{Axis, Behaviour, Entity, Kind, Orientation};
use super::grid::TileGrid;
use super::stepper::{self, Flow, Scene};
use crate::consts::*;
use crate::error::{SimError, SimResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub jumping: bool,
    pub ducking: bool,
    /// Wants to stand up but something is in the way
    pub stand_pending: bool,
    /// Seconds since the player last moved horizontally
    pub idle_time: f64,
    /// Position in the walking cycle
    pub walk_frame: usize,
    /// Time accumulated towards the next walking frame
    pub frame_time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn orientation(self) -> Orientation {
        match self {
            Direction::Left => Orientation::Left,
            Direction::Right => Orientation::Right,
        }
    }
}

/// Input a host can apply to the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    StartMove(Direction),
    EndMove,
    StartJump,
    EndJump,
    StartDuck,
    EndDuck,
}

fn state(entity: &Entity) -> &PlayerState {
    match &entity.behaviour {
        Behaviour::Player(state) => state,
        _ => unreachable!("player behaviour on {:?}", entity.kind()),
    }
}

fn state_mut(entity: &mut Entity) -> &mut PlayerState {
    match &mut entity.behaviour {
        Behaviour::Player(state) => state,
        other => unreachable!("player behaviour on {other:?}"),
    }
}

/// Apply an action; every check happens before any state changes
pub(crate) fn perform(entity: &mut Entity, scene: &Scene<'_>, action: Action) -> SimResult<()> {
    if entity.kind() != Kind::Player {
        return Err(SimError::NotAPlayer(entity.kind()));
    }
    if entity.is_terminated() {
        return Err(SimError::EntityTerminated);
    }
    match action {
        Action::StartMove(direction) => {
            if entity.is_dead() {
                return Err(SimError::Dead);
            }
            if entity.is_moving() {
                return Err(SimError::AlreadyMoving);
            }
            let orientation = direction.orientation();
            entity.orientation = orientation;
            entity.set_velocity_x(orientation.sign() * PLAYER_MIN_HORIZONTAL_VELOCITY);
            if !state(entity).ducking {
                entity.set_acceleration_x(orientation.sign() * PLAYER_MOVING_ACCELERATION);
            }
            state_mut(entity).idle_time = 0.0;
        }
        Action::EndMove => {
            if !entity.is_moving() {
                return Err(SimError::NotMoving);
            }
            entity.stop_horizontal();
            state_mut(entity).idle_time = 0.0;
        }
        Action::StartJump => {
            if entity.is_dead() {
                return Err(SimError::Dead);
            }
            if state(entity).jumping {
                return Err(SimError::AlreadyJumping);
            }
            if state(entity).ducking {
                stand_up(entity, scene);
            }
            entity.set_velocity_y(PLAYER_JUMP_VELOCITY);
            entity.set_acceleration_y(GRAVITY);
            state_mut(entity).jumping = true;
        }
        Action::EndJump => {
            if !state(entity).jumping {
                return Err(SimError::NotJumping);
            }
            state_mut(entity).jumping = false;
            if grounded(entity, scene) {
                entity.vel.y = 0.0;
                entity.set_acceleration_y(0.0);
            } else if entity.vel.y > 0.0 {
                entity.vel.y = 0.0;
            }
        }
        Action::StartDuck => {
            if entity.is_dead() {
                return Err(SimError::Dead);
            }
            entity.set_acceleration_x(0.0);
            if entity.is_moving() {
                entity.vel.x = PLAYER_DUCKING_VELOCITY.copysign(entity.vel.x);
            }
            let player = state_mut(entity);
            player.ducking = true;
            player.stand_pending = false;
        }
        Action::EndDuck => {
            if !state(entity).ducking {
                return Err(SimError::NotDucking);
            }
            stand_up(entity, scene);
        }
    }
    refresh_sprite(entity, scene);
    Ok(())
}

impl Entity {
    /// Apply an action to a player that is not part of any world
    pub fn perform(&mut self, action: Action) -> SimResult<()> {
        if self.id.is_some() {
            return Err(SimError::AlreadyInWorld);
        }
        let grid = TileGrid::empty();
        let mut nobody: [Entity; 0] = [];
        let scene = Scene::detached(&grid, &mut nobody);
        perform(self, &scene, action)
    }
}

/// Leave the ducking pose unless the standing frame has no room
fn stand_up(entity: &mut Entity, scene: &Scene<'_>) {
    let standing = {
        let mut probe = state(entity).clone();
        probe.ducking = false;
        select_sprite(entity, &probe)
    };
    let bbox = frame_box(entity, standing);
    let blocked = scene.attached
        && ((collision::overlaps_impassable(scene.grid, bbox)
            && !collision::rests_in_surface(scene.grid, bbox))
            || collision::bumps_above(scene.grid, bbox)
            || collision::solid_overlapping(scene.others, bbox).is_some());
    if blocked {
        state_mut(entity).stand_pending = true;
        return;
    }
    let player = state_mut(entity);
    player.ducking = false;
    player.stand_pending = false;
    if entity.is_moving() {
        let sign = entity.vel.x.signum();
        entity.set_acceleration_x(sign * PLAYER_MOVING_ACCELERATION);
    }
}

fn frame_box(entity: &Entity, index: usize) -> PixelBox {
    let frame = entity.sprites()[index];
    PixelBox::new(entity.pixel.x, entity.pixel.y, frame.width, frame.height)
}

fn grounded(entity: &Entity, scene: &Scene<'_>) -> bool {
    if !scene.attached {
        return entity.pixel.y <= 0;
    }
    stepper::supported(entity, scene)
}

/// Frame index for the given pose
///
/// 0 idle, 1 idle ducking, 2/3 idle facing right/left, 4/5 jumping
/// right/left, 6/7 ducking right/left, then two walking cycles of `m`
/// frames each (right first), where `m = (frames - 8) / 2`.
pub fn select_sprite(entity: &Entity, player: &PlayerState) -> usize {
    let cycle = (entity.sprites().len() - 8) / 2;
    let moving = entity.is_moving();
    match entity.orientation {
        Orientation::Right if player.ducking => 6,
        Orientation::Left if player.ducking => 7,
        Orientation::Right if player.jumping => 4,
        Orientation::Left if player.jumping => 5,
        Orientation::Right if moving => 8 + player.walk_frame % cycle,
        Orientation::Left if moving => 8 + cycle + player.walk_frame % cycle,
        Orientation::Right => 2,
        Orientation::Left => 3,
        Orientation::Neutral | Orientation::Up => usize::from(player.ducking),
    }
}

/// Switch to the frame for the current pose, unless the new frame would
/// push into terrain
fn refresh_sprite(entity: &mut Entity, scene: &Scene<'_>) {
    let index = select_sprite(entity, state(entity));
    if scene.attached {
        let bbox = frame_box(entity, index);
        if collision::overlaps_impassable(scene.grid, bbox)
            && !collision::rests_in_surface(scene.grid, bbox)
        {
            return;
        }
    }
    entity.set_sprite_index(index);
}

/// Idle players turn to the camera; walking players cycle their frames
fn animate(entity: &mut Entity, delta_t: f64) {
    let moving = entity.is_moving();
    let cycle = (entity.sprites().len() - 8) / 2;
    let player = state_mut(entity);
    if moving {
        player.idle_time = 0.0;
    } else {
        player.idle_time += delta_t;
    }
    let face_front = player.idle_time >= PLAYER_FACE_FRONT_AFTER;
    if moving && !player.ducking && !player.jumping {
        player.frame_time += delta_t;
        let frames = (player.frame_time / PLAYER_FRAME_PERIOD).floor() as usize;
        player.walk_frame = (player.walk_frame + frames) % cycle;
        player.frame_time %= PLAYER_FRAME_PERIOD;
    } else {
        player.walk_frame = 0;
        player.frame_time = 0.0;
    }
    if face_front && entity.orientation != Orientation::Neutral {
        entity.orientation = Orientation::Neutral;
        state_mut(entity).idle_time = 0.0;
    }
}

/// Without a world the player integrates freely and y = 0 acts as the floor
fn fall_freely(entity: &mut Entity, delta_t: f64) {
    if entity.pos.y > 0.0 {
        entity.set_acceleration_y(GRAVITY);
    }
    entity.commit_axis(Axis::X, delta_t);
    entity.commit_axis(Axis::Y, delta_t);
    if entity.pos.x < 0.0 {
        entity.pos.x = 0.0;
        entity.stop_horizontal();
    }
    if entity.pos.y <= 0.0 && (entity.vel.y < 0.0 || entity.acc.y != 0.0) {
        entity.pos.y = 0.0;
        entity.vel.y = 0.0;
        entity.set_acceleration_y(0.0);
        state_mut(entity).jumping = false;
    }
    entity.sync_pixel();
}

fn facing_wall(entity: &Entity, scene: &Scene<'_>) -> bool {
    let bbox = entity.bbox();
    match entity.orientation {
        Orientation::Left => collision::bumps_left(scene.grid, bbox),
        Orientation::Right => collision::bumps_right(scene.grid, bbox),
        _ => false,
    }
}

pub(crate) fn advance(entity: &mut Entity, scene: &mut Scene<'_>, delta_t: f64) {
    animate(entity, delta_t);
    refresh_sprite(entity, scene);
    if !scene.attached {
        fall_freely(entity, delta_t);
        return;
    }
    if state(entity).stand_pending {
        stand_up(entity, scene);
        refresh_sprite(entity, scene);
    }
    if facing_wall(entity, scene) {
        entity.stop_horizontal();
    }
    if !stepper::supported(entity, scene) {
        entity.set_acceleration_y(GRAVITY);
    }
    if stepper::integrate(entity, scene, delta_t) == Flow::Halt {
        return;
    }
    if facing_wall(entity, scene) {
        entity.stop_horizontal();
    }
    refresh_sprite(entity, scene);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Sprite;

    fn player() -> Entity {
        let mut frames = vec![Sprite::new(10, 20); 12];
        frames[1] = Sprite::new(10, 12);
        frames[6] = Sprite::new(10, 12);
        frames[7] = Sprite::new(10, 12);
        Entity::player(0, 0, frames).unwrap()
    }

    fn act(entity: &mut Entity, action: Action) -> SimResult<()> {
        let grid = TileGrid::empty();
        let mut others: Vec<Entity> = Vec::new();
        let scene = Scene::detached(&grid, &mut others);
        perform(entity, &scene, action)
    }

    #[test]
    fn test_move_sets_velocity_and_acceleration() {
        let mut p = player();
        act(&mut p, Action::StartMove(Direction::Left)).unwrap();
        assert_eq!(p.velocity().x, -1.0);
        assert_eq!(p.acceleration().x, -PLAYER_MOVING_ACCELERATION);
        assert_eq!(p.orientation(), Orientation::Left);
        assert!(matches!(
            act(&mut p, Action::StartMove(Direction::Right)),
            Err(SimError::AlreadyMoving)
        ));
        act(&mut p, Action::EndMove).unwrap();
        assert_eq!(p.velocity().x, 0.0);
        assert!(matches!(act(&mut p, Action::EndMove), Err(SimError::NotMoving)));
    }

    #[test]
    fn test_jump_transitions() {
        let mut p = player();
        assert!(matches!(act(&mut p, Action::EndJump), Err(SimError::NotJumping)));
        act(&mut p, Action::StartJump).unwrap();
        assert_eq!(p.velocity().y, PLAYER_JUMP_VELOCITY);
        assert_eq!(p.acceleration().y, GRAVITY);
        assert!(matches!(act(&mut p, Action::StartJump), Err(SimError::AlreadyJumping)));
        act(&mut p, Action::EndJump).unwrap();
        // Still on the detached floor
        assert_eq!(p.velocity().y, 0.0);
        assert_eq!(p.acceleration().y, 0.0);
    }

    #[test]
    fn test_dead_player_cannot_act() {
        let mut p = player();
        p.kill();
        assert!(matches!(act(&mut p, Action::StartJump), Err(SimError::Dead)));
        assert!(matches!(
            act(&mut p, Action::StartMove(Direction::Right)),
            Err(SimError::Dead)
        ));
    }

    #[test]
    fn test_duck_slows_and_uses_ducking_frames() {
        let mut p = player();
        act(&mut p, Action::StartMove(Direction::Right)).unwrap();
        p.vel.x = 2.5;
        act(&mut p, Action::StartDuck).unwrap();
        assert_eq!(p.velocity().x, PLAYER_DUCKING_VELOCITY);
        assert_eq!(p.acceleration().x, 0.0);
        assert_eq!(p.sprite_index(), 6);
        assert_eq!(p.sprite().height, 12);
        act(&mut p, Action::EndDuck).unwrap();
        assert!(!p.is_ducking());
        assert_eq!(p.acceleration().x, PLAYER_MOVING_ACCELERATION);
        assert!(matches!(act(&mut p, Action::EndDuck), Err(SimError::NotDucking)));
    }

    #[test]
    fn test_walking_frames_cycle() {
        let mut p = player();
        act(&mut p, Action::StartMove(Direction::Right)).unwrap();
        assert_eq!(p.sprite_index(), 8);
        let grid = TileGrid::empty();
        let mut others: Vec<Entity> = Vec::new();
        let mut scene = Scene::detached(&grid, &mut others);
        advance(&mut p, &mut scene, 0.08);
        assert_eq!(p.sprite_index(), 9);
        advance(&mut p, &mut scene, 0.15);
        // Two more frames wrap the two-frame cycle
        assert_eq!(p.sprite_index(), 9);
    }

    #[test]
    fn test_idle_player_turns_to_camera() {
        let mut p = player();
        act(&mut p, Action::StartMove(Direction::Left)).unwrap();
        act(&mut p, Action::EndMove).unwrap();
        assert_eq!(p.sprite_index(), 3);
        let grid = TileGrid::empty();
        let mut others: Vec<Entity> = Vec::new();
        let mut scene = Scene::detached(&grid, &mut others);
        for _ in 0..6 {
            advance(&mut p, &mut scene, 0.2);
        }
        assert_eq!(p.orientation(), Orientation::Neutral);
        assert_eq!(p.sprite_index(), 0);
    }

    #[test]
    fn test_detached_jump_lands_on_floor() {
        let mut p = player();
        act(&mut p, Action::StartJump).unwrap();
        let grid = TileGrid::empty();
        let mut others: Vec<Entity> = Vec::new();
        let mut scene = Scene::detached(&grid, &mut others);
        advance(&mut p, &mut scene, 0.2);
        assert!(p.position().y > 0.0);
        for _ in 0..10 {
            advance(&mut p, &mut scene, 0.2);
        }
        assert_eq!(p.pixel().y, 0);
        assert_eq!(p.velocity().y, 0.0);
        assert!(!p.is_jumping());
    }
}

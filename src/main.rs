//! Jumping Alien native harness
//!
//! Generates a seeded level, drives the player with a fixed script and prints
//! the final world snapshot as JSON.
//!
//! Usage: `jumping-alien [seed] [settings.json]`

#[cfg(not(target_arch = "wasm32"))]
use jumping_alien::{
    Settings, SimResult, level,
    sim::{Action, Direction, World},
};

/// Fixed frame step (60 Hz)
#[cfg(not(target_arch = "wasm32"))]
const FRAME_DT: f64 = 1.0 / 60.0;
#[cfg(not(target_arch = "wasm32"))]
const FRAMES: u32 = 600;

/// Scripted input, keyed by frame
#[cfg(not(target_arch = "wasm32"))]
const SCRIPT: &[(u32, Action)] = &[
    (0, Action::StartMove(Direction::Right)),
    (45, Action::StartJump),
    (70, Action::EndJump),
    (150, Action::StartDuck),
    (200, Action::EndDuck),
    (240, Action::StartJump),
    (265, Action::EndJump),
    (320, Action::EndMove),
    (330, Action::StartMove(Direction::Left)),
    (360, Action::EndMove),
    (370, Action::StartMove(Direction::Right)),
    (420, Action::StartJump),
    (450, Action::EndJump),
];

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Jumping Alien (native) starting...");

    if let Err(e) = run() {
        log::error!("Simulation failed: {e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The simulation has no web front end
}

#[cfg(not(target_arch = "wasm32"))]
fn run() -> SimResult<()> {
    let mut args = std::env::args().skip(1);
    let seed = match args.next() {
        Some(arg) => arg.parse().unwrap_or_else(|_| {
            log::warn!("Seed {arg:?} is not a number, using 0");
            0
        }),
        None => 0,
    };
    let settings = args
        .next()
        .map(|path| Settings::load(std::path::Path::new(&path)))
        .unwrap_or_default();

    let mut world = level::generate(seed)?.into_world(settings)?;
    world.start()?;

    for frame in 0..FRAMES {
        for (_, action) in SCRIPT.iter().filter(|(at, _)| *at == frame) {
            if let Err(e) = world.perform(*action) {
                log::warn!("Frame {frame}: {action:?} refused: {e}");
            }
        }
        world.advance_time(FRAME_DT)?;
        report_removed(&mut world);
        if world.is_game_over() {
            log::info!("Game over at frame {frame}");
            break;
        }
    }

    if world.did_player_win() {
        log::info!("Player reached the target");
    }
    let snapshot = world.snapshot();
    match serde_json::to_string_pretty(&snapshot) {
        Ok(json) => println!("{json}"),
        Err(e) => log::error!("Failed to serialize snapshot: {e}"),
    }
    world.terminate();
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn report_removed(world: &mut World) {
    for entity in world.take_graveyard() {
        log::debug!(
            "{:?} removed at {:?} (t={:.3})",
            entity.kind(),
            entity.pixel(),
            world.time()
        );
    }
}

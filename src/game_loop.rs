use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info};

use crate::physics::{Course, FrameOutcome, InputState, Scene, World};
use crate::scheduler::Ticker;

#[derive(Debug, Error, PartialEq)]
pub enum GameError {
    #[error("no drawing surface ({width}x{height})")]
    MissingSurface { width: f64, height: f64 },
}

/// Owns the actor and drives frames while the Game page is active.
#[derive(Debug)]
pub struct GameLoop {
    world: World,
    ticker: Ticker,
    scene: Scene,
    frames: u64,
}

impl GameLoop {
    pub fn new(course: Course, frame_interval: Duration) -> Self {
        Self {
            world: World::new(course),
            ticker: Ticker::new(frame_interval),
            scene: Scene::default(),
            frames: 0,
        }
    }

    /// Starts ticking from spawn. Starting a running loop is a no-op and
    /// returns `Ok(false)`.
    pub fn start(&mut self, now: Instant) -> Result<bool, GameError> {
        if self.ticker.is_running() {
            return Ok(false);
        }
        let course = &self.world.course;
        if course.width <= 0.0 || course.height <= 0.0 {
            return Err(GameError::MissingSurface {
                width: course.width,
                height: course.height,
            });
        }

        self.world.respawn();
        self.world.draw(&mut self.scene);
        self.frames = 0;
        info!("game loop started");
        Ok(self.ticker.start(now))
    }

    /// Returns true only for the call that actually stopped the loop.
    pub fn stop(&mut self) -> bool {
        let stopped = self.ticker.stop();
        if stopped {
            info!(frames = self.frames, "game loop stopped");
        }
        stopped
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_running()
    }

    pub fn respawn(&mut self) {
        debug!("actor respawned");
        self.world.respawn();
    }

    /// Runs at most one due frame. `None` when no frame is due or the loop
    /// is stopped.
    pub fn next_frame(&mut self, now: Instant, input: InputState) -> Option<FrameOutcome> {
        if !self.ticker.take_tick(now) {
            return None;
        }
        self.frames += 1;
        Some(self.world.step(input, &mut self.scene))
    }

    /// Forgets frames that are overdue after a stall.
    pub fn skip_missed(&mut self, now: Instant) {
        self.ticker.skip_missed(now);
    }

    /// When the next frame is due; `None` while stopped.
    pub fn next_frame_due(&self) -> Option<Instant> {
        self.ticker.next_due()
    }

    pub fn frame_interval(&self) -> Duration {
        self.ticker.interval()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Draw commands from the latest frame.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }
}

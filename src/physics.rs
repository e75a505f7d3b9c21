//! Platformer physics for the reward game.
//!
//! One [`World::step`] is one frame: input, jump impulse, gravity, Euler
//! integration, landing resolution, horizontal clamp, render pass and the
//! fall check, always in that order.

pub const CANVAS_WIDTH: f64 = 800.0;
pub const CANVAS_HEIGHT: f64 = 600.0;
pub const GRAVITY: f64 = 0.6;

const SPAWN_X: f64 = 50.0;
const SPAWN_Y: f64 = 50.0;
const ACTOR_SIZE: f64 = 30.0;
const ACTOR_SPEED: f64 = 5.0;
const ACTOR_JUMP_POWER: f64 = 12.0;

/// Axis-aligned rectangle in canvas units, y grows downwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Strict AABB overlap; touching edges do not count.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }
}

pub type Platform = Rect;

/// Held movement keys for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub x: f64,
    pub y: f64,
    pub dx: f64,
    pub dy: f64,
    pub width: f64,
    pub height: f64,
    pub speed: f64,
    pub jump_power: f64,
    pub grounded: bool,
}

impl Actor {
    pub fn spawn() -> Self {
        Self {
            x: SPAWN_X,
            y: SPAWN_Y,
            dx: 0.0,
            dy: 0.0,
            width: ACTOR_SIZE,
            height: ACTOR_SIZE,
            speed: ACTOR_SPEED,
            jump_power: ACTOR_JUMP_POWER,
            grounded: false,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

impl Default for Actor {
    fn default() -> Self {
        Self::spawn()
    }
}

/// Static level geometry and tuning, fixed for a game session.
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub width: f64,
    pub height: f64,
    pub gravity: f64,
    pub platforms: Vec<Platform>,
}

impl Course {
    pub fn standard() -> Self {
        Self {
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
            gravity: GRAVITY,
            platforms: vec![
                Rect::new(0.0, 480.0, 800.0, 20.0),
                Rect::new(150.0, 410.0, 100.0, 20.0),
                Rect::new(300.0, 340.0, 100.0, 20.0),
                Rect::new(450.0, 270.0, 100.0, 20.0),
                Rect::new(300.0, 180.0, 100.0, 20.0),
                Rect::new(150.0, 110.0, 100.0, 20.0),
            ],
        }
    }
}

impl Default for Course {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    Actor,
    Platform,
}

/// Drawing target for the render pass.
pub trait Surface {
    fn clear(&mut self, width: f64, height: f64);
    fn fill_rect(&mut self, rect: Rect, fill: Fill);
}

/// Draw commands recorded by the last render pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    pub rects: Vec<(Rect, Fill)>,
}

impl Surface for Scene {
    fn clear(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.rects.clear();
    }

    fn fill_rect(&mut self, rect: Rect, fill: Fill) {
        self.rects.push((rect, fill));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Continue,
    /// The actor dropped below the bottom of the canvas.
    Fell,
}

#[derive(Debug, Clone, PartialEq)]
pub struct World {
    pub actor: Actor,
    pub course: Course,
}

impl World {
    pub fn new(course: Course) -> Self {
        Self {
            actor: Actor::spawn(),
            course,
        }
    }

    pub fn respawn(&mut self) {
        self.actor = Actor::spawn();
    }

    /// Runs one frame: update, render, then the fall check.
    pub fn step<S: Surface>(&mut self, input: InputState, surface: &mut S) -> FrameOutcome {
        self.update(input);
        self.draw(surface);
        if self.has_fallen() {
            FrameOutcome::Fell
        } else {
            FrameOutcome::Continue
        }
    }

    pub fn update(&mut self, input: InputState) {
        let actor = &mut self.actor;

        actor.dx = if input.right {
            actor.speed
        } else if input.left {
            -actor.speed
        } else {
            0.0
        };

        if input.jump && actor.grounded {
            actor.dy = -actor.jump_power;
            actor.grounded = false;
        }

        actor.dy += self.course.gravity;

        let previous_bottom = actor.y + actor.height;
        actor.x += actor.dx;
        actor.y += actor.dy;

        // Landing is the only resolved contact; sides and ceilings pass through.
        actor.grounded = false;
        for platform in &self.course.platforms {
            if actor.bounds().overlaps(platform)
                && actor.dy > 0.0
                && previous_bottom <= platform.y
            {
                actor.y = platform.y - actor.height;
                actor.dy = 0.0;
                actor.grounded = true;
            }
        }

        actor.x = actor.x.min(self.course.width - actor.width).max(0.0);
    }

    pub fn draw<S: Surface>(&self, surface: &mut S) {
        surface.clear(self.course.width, self.course.height);
        surface.fill_rect(self.actor.bounds(), Fill::Actor);
        for platform in &self.course.platforms {
            surface.fill_rect(*platform, Fill::Platform);
        }
    }

    pub fn has_fallen(&self) -> bool {
        self.actor.y > self.course.height
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(Course::standard())
    }
}

/// Dank Engine - application root owning the frame context and the scene
///
/// There is no global engine state: the host creates one `Engine`, feeds it
/// input events and view resizes, calls `tick()` (or `update(dt)`) once per
/// frame, then hands `frame()` to its renderer.
///
/// # Example
///
/// ```ignore
/// let mut engine = Engine::new(MyScene::default());
/// engine.on_view_resize(1280.0, 720.0);
/// loop {
///     engine.tick();
///     let (ctx, scene) = engine.frame();
///     renderer.render(ctx, scene)?;
/// }
/// ```

use std::time::Instant;
use crate::frame_context::FrameContext;
use crate::input::InputEvent;
use crate::scene::Scene;
use crate::engine_info;

/// Counts frames over one-second windows
#[derive(Debug, Default)]
struct FpsAccumulator {
    time: f32,
    frames: u32,
}

impl FpsAccumulator {
    /// Returns the frame count when a full second has elapsed
    fn push(&mut self, dt: f32) -> Option<u32> {
        self.time += dt;
        self.frames += 1;
        if self.time < 1.0 {
            return None;
        }
        let frames = self.frames;
        self.time = 0.0;
        self.frames = 0;
        Some(frames)
    }
}

pub struct Engine<S: Scene> {
    ctx: FrameContext,
    scene: S,
    fps: FpsAccumulator,
    last_tick: Option<Instant>,
}

impl<S: Scene> Engine<S> {
    pub fn new(scene: S) -> Self {
        engine_info!("dank::Engine", "Engine initialized");
        Self {
            ctx: FrameContext::new(),
            scene,
            fps: FpsAccumulator::default(),
            last_tick: None,
        }
    }

    pub fn context(&self) -> &FrameContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut FrameContext {
        &mut self.ctx
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    /// Frame context and scene, borrowed together for `Renderer::render`
    pub fn frame(&self) -> (&FrameContext, &S) {
        (&self.ctx, &self.scene)
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.ctx.paused = paused;
    }

    /// Forward one host event to the input state
    pub fn handle_event(&mut self, event: &InputEvent) {
        self.ctx.input.handle(event);
    }

    pub fn on_view_resize(&mut self, width: f32, height: f32) {
        self.scene.camera_mut().on_view_resize(width, height);
    }

    /// Advance one frame by `dt` seconds
    ///
    /// Order: fps accounting, timing (skipped while paused), input, scene,
    /// then camera matrices.
    pub fn update(&mut self, dt: f32) {
        let dt = dt.max(0.0);

        if let Some(frames) = self.fps.push(dt) {
            self.ctx.frames_per_second = frames;
            engine_info!("dank::Engine", "fps: {} | {:.2} ms", frames, dt * 1000.0);
        }

        if self.ctx.paused {
            self.ctx.delta_time = 0.0;
        } else {
            self.ctx.delta_time = dt;
            self.ctx.absolute_time += dt;
            self.ctx.absolute_frame += 1;
        }

        let delta = self.ctx.delta_time;
        self.ctx.input.update(delta);
        self.scene.update(&mut self.ctx);
        self.scene.camera_mut().update(delta);
    }

    /// Measure the wall-clock delta since the previous tick and `update`.
    /// The first tick has a zero delta. Returns the delta in seconds.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let dt = self
            .last_tick
            .map(|last| now.duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last_tick = Some(now);
        self.update(dt);
        dt
    }
}

impl<S: Scene> Drop for Engine<S> {
    fn drop(&mut self) {
        engine_info!("dank::Engine", "Engine released");
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;

#![allow(dead_code)]
//! Shared helpers for the integration tests
//!
//! Scenes, shaders, image payloads and a capturing logger. Everything runs
//! against `MockGraphicsDevice`; no GPU required.

use dank_engine::dank::device::ShaderSource;
use dank_engine::dank::log::{LogEntry, Logger};
use dank_engine::dank::scene::{Camera, DrawableInstance, Scene};
use dank_engine::dank::FrameContext;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Scene that redraws a fixed set of instances every frame
#[derive(Default)]
pub struct ListScene {
    pub camera: Camera,
    pub instances: Vec<DrawableInstance>,
}

impl ListScene {
    pub fn new(instances: Vec<DrawableInstance>) -> Self {
        Self { camera: Camera::new(), instances }
    }
}

impl Scene for ListScene {
    fn update(&mut self, ctx: &mut FrameContext) {
        ctx.draw_list.clear();
        ctx.draw_list.extend(self.instances.iter().copied());
    }

    fn camera(&self) -> &Camera {
        &self.camera
    }

    fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }
}

/// Minimal SPIR-V header, accepted by the mock device
pub fn shader() -> ShaderSource {
    ShaderSource::new(vec![0x0723_0203, 0x0001_0000], "main")
}

/// Encode a solid-color RGBA image as PNG
pub fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut cursor = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut cursor, image::ImageFormat::Png)
        .unwrap();
    cursor.into_inner()
}

/// Poll `condition` until it holds or five seconds pass
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    false
}

/// Logger that keeps every entry for later inspection
pub struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl CaptureLogger {
    pub fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

use std::sync::{Arc, RwLock};
use crate::resource::PixelFormat;

/// Latest captured display frame, written by the host capture backend
#[derive(Debug, Clone)]
pub struct ScreenOutput {
    /// Capture frame counter, 0 until the first frame arrives
    pub frame: u64,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixels: Option<Arc<[u8]>>,
}

impl Default for ScreenOutput {
    fn default() -> Self {
        Self {
            frame: 0,
            width: 0,
            height: 0,
            format: PixelFormat::Bgra8Unorm,
            pixels: None,
        }
    }
}

/// Capture switches and outputs shared between the host and the engine
#[derive(Debug, Clone, Default)]
pub struct CaptureConfig {
    pub capture_screen: bool,
    pub capture_microphone: bool,
    pub capture_audio: bool,
    pub selected_display: u8,
    pub screen_output: ScreenOutput,
}

impl CaptureConfig {
    /// Publish a new screen frame, bumping the frame counter
    pub fn push_screen_frame(&mut self, width: u32, height: u32, format: PixelFormat, pixels: Arc<[u8]>) {
        self.screen_output = ScreenOutput {
            frame: self.screen_output.frame + 1,
            width,
            height,
            format,
            pixels: Some(pixels),
        };
    }
}

/// Capture configuration handle polled once per frame
pub type SharedCaptureConfig = Arc<RwLock<CaptureConfig>>;

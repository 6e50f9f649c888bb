//! CPU-side texture library and texture sources.
//!
//! A texture source reports its lifecycle through `poll()` and hands its
//! pixels over through `fetch_data()`. After copying the pixels to the GPU
//! the consumer calls `release_data()` so the source can drop its CPU copy.
//!
//! ```text
//! Idle ──poll──▶ Loading ──▶ Ready ──reload/reset──▶ Idle
//!   └───────────────────────▶ Invalid (terminal)
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use crate::os::{SharedCaptureConfig, Uri};
use crate::resource::fetch::{FetchHandle, FetchPool, FetchStatus};
use crate::engine_warn;

// ============================================================================
// STATE TYPES
// ============================================================================

/// Stable texture identifier, starting at 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureId(pub u32);

/// Lifecycle state of a texture source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    Idle,
    Loading,
    Ready,
    Invalid,
}

/// CPU pixel layout of a texture payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Rgba8Unorm,
    Bgra8Unorm,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> u32 {
        4
    }
}

/// Cheap snapshot of a source, without pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureStatus {
    pub state: ResourceState,
    /// Content stamp, changes whenever the pixels change
    pub version: u64,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl TextureStatus {
    pub fn idle() -> Self {
        Self::with_state(ResourceState::Idle)
    }

    pub fn loading() -> Self {
        Self::with_state(ResourceState::Loading)
    }

    pub fn invalid() -> Self {
        Self::with_state(ResourceState::Invalid)
    }

    fn with_state(state: ResourceState) -> Self {
        Self { state, version: 0, width: 0, height: 0, format: PixelFormat::Rgba8Unorm }
    }

    /// Expected payload size in bytes
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel() as usize
    }
}

/// Status plus the pixel payload handed to the consumer
#[derive(Debug, Clone)]
pub struct TextureData {
    pub status: TextureStatus,
    pub pixels: Option<Arc<[u8]>>,
}

impl TextureData {
    pub fn without_pixels(status: TextureStatus) -> Self {
        Self { status, pixels: None }
    }
}

/// A source of texture pixels
pub trait TextureSource: Send + Sync {
    /// Current lifecycle state; may start the source's own loading
    fn poll(&self) -> TextureStatus;

    /// Current status together with the pixels, when Ready
    fn fetch_data(&self) -> TextureData;

    /// Drop the CPU copy handed over by the last `fetch_data`
    fn release_data(&self) {}
}

// ============================================================================
// DEBUG TEXTURE
// ============================================================================

/// 128x128 checker used as a placeholder
#[derive(Default)]
pub struct DebugTexture {
    pixels: Mutex<Option<Arc<[u8]>>>,
}

impl DebugTexture {
    pub const SIZE: u32 = 128;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate() -> Arc<[u8]> {
        let size = Self::SIZE as usize;
        let mut pixels = vec![0u8; size * size * 4];
        for y in 0..size {
            for x in 0..size {
                let c = if (x ^ y) & 0b100_0000 != 0 { 0xFF } else { 0x0A };
                let i = (y * size + x) * 4;
                pixels[i..i + 4].copy_from_slice(&[c, c, c, 0xFF]);
            }
        }
        pixels.into()
    }

    fn status() -> TextureStatus {
        TextureStatus {
            state: ResourceState::Ready,
            version: 1,
            width: Self::SIZE,
            height: Self::SIZE,
            format: PixelFormat::Rgba8Unorm,
        }
    }
}

impl TextureSource for DebugTexture {
    fn poll(&self) -> TextureStatus {
        Self::status()
    }

    fn fetch_data(&self) -> TextureData {
        let mut cached = match self.pixels.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let pixels = cached.get_or_insert_with(Self::generate).clone();
        TextureData { status: Self::status(), pixels: Some(pixels) }
    }

    fn release_data(&self) {
        if let Ok(mut cached) = self.pixels.lock() {
            cached.take();
        }
    }
}

// ============================================================================
// URI TEXTURE
// ============================================================================

struct UriFetch {
    handle: FetchHandle,
    version: u64,
    extent: (u32, u32),
}

/// Texture decoded from a URI on the fetch pool
///
/// The first poll submits the fetch. A failed fetch is terminal; `reload`
/// cancels any in-flight fetch and starts over with a new content stamp on
/// the next poll.
pub struct UriTexture {
    uri: Uri,
    pool: Arc<FetchPool>,
    fetch: Mutex<Option<UriFetch>>,
    generation: AtomicU64,
}

impl UriTexture {
    pub fn new(uri: Uri, pool: Arc<FetchPool>) -> Self {
        Self {
            uri,
            pool,
            fetch: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Cancel the in-flight fetch; the texture reports Idle until reloaded
    pub fn cancel(&self) {
        if let Some(fetch) = self.lock_fetch().as_ref() {
            fetch.handle.cancel();
        }
    }

    /// Drop the current result and fetch again on the next poll
    pub fn reload(&self) {
        if let Some(fetch) = self.lock_fetch().take() {
            fetch.handle.cancel();
            fetch.handle.release_image();
        }
    }

    fn lock_fetch(&self) -> std::sync::MutexGuard<'_, Option<UriFetch>> {
        match self.fetch.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn status_of(fetch: &mut UriFetch) -> TextureStatus {
        match fetch.handle.status() {
            FetchStatus::Pending | FetchStatus::Running => TextureStatus::loading(),
            FetchStatus::Failed => TextureStatus::invalid(),
            FetchStatus::Cancelled => TextureStatus::idle(),
            FetchStatus::Completed if fetch.handle.is_cancel_requested() => TextureStatus::idle(),
            FetchStatus::Completed => {
                // the extent outlives the payload once it has been released
                if let Some(image) = fetch.handle.image() {
                    fetch.extent = (image.width, image.height);
                }
                TextureStatus {
                    state: ResourceState::Ready,
                    version: fetch.version,
                    width: fetch.extent.0,
                    height: fetch.extent.1,
                    format: PixelFormat::Rgba8Unorm,
                }
            }
        }
    }
}

impl TextureSource for UriTexture {
    fn poll(&self) -> TextureStatus {
        let mut fetch = self.lock_fetch();
        if fetch.is_none() {
            let version = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
            let handle = self.pool.submit(self.uri.clone());
            *fetch = Some(UriFetch { handle, version, extent: (0, 0) });
        }
        match fetch.as_mut() {
            Some(current) => Self::status_of(current),
            None => TextureStatus::idle(),
        }
    }

    fn fetch_data(&self) -> TextureData {
        let mut fetch = self.lock_fetch();
        let Some(current) = fetch.as_mut() else {
            return TextureData::without_pixels(TextureStatus::idle());
        };
        let status = Self::status_of(current);
        if status.state != ResourceState::Ready {
            return TextureData::without_pixels(status);
        }
        let pixels = current.handle.image().map(|image| image.pixels);
        TextureData { status, pixels }
    }

    fn release_data(&self) {
        if let Some(current) = self.lock_fetch().as_ref() {
            current.handle.release_image();
        }
    }
}

// ============================================================================
// CAPTURE TEXTURE
// ============================================================================

/// Latest screen-capture frame published by the host
pub struct CaptureTexture {
    config: SharedCaptureConfig,
}

impl CaptureTexture {
    pub fn new(config: SharedCaptureConfig) -> Self {
        Self { config }
    }

    fn snapshot(&self, with_pixels: bool) -> TextureData {
        let Ok(config) = self.config.read() else {
            engine_warn!("dank::CaptureTexture", "Capture configuration lock poisoned");
            return TextureData::without_pixels(TextureStatus::idle());
        };
        let output = &config.screen_output;
        if !config.capture_screen || output.frame == 0 || output.pixels.is_none() {
            return TextureData::without_pixels(TextureStatus::idle());
        }
        TextureData {
            status: TextureStatus {
                state: ResourceState::Ready,
                version: output.frame,
                width: output.width,
                height: output.height,
                format: output.format,
            },
            pixels: if with_pixels { output.pixels.clone() } else { None },
        }
    }
}

impl TextureSource for CaptureTexture {
    fn poll(&self) -> TextureStatus {
        self.snapshot(false).status
    }

    fn fetch_data(&self) -> TextureData {
        self.snapshot(true)
    }
}

// ============================================================================
// TEXTURE LIBRARY
// ============================================================================

/// Id-keyed store of texture sources with a modification counter
pub struct TextureLibrary {
    textures: BTreeMap<TextureId, Arc<dyn TextureSource>>,
    next_id: u32,
    last_modified: u64,
}

impl Default for TextureLibrary {
    fn default() -> Self {
        Self {
            textures: BTreeMap::new(),
            next_id: 1,
            last_modified: 0,
        }
    }
}

impl TextureLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<T: TextureSource + 'static>(&mut self, source: T) -> TextureId {
        self.add_shared(Arc::new(source))
    }

    /// Add a source the caller keeps a handle to (to reload or cancel it)
    pub fn add_shared(&mut self, source: Arc<dyn TextureSource>) -> TextureId {
        let id = TextureId(self.next_id);
        self.next_id += 1;
        self.textures.insert(id, source);
        self.last_modified += 1;
        id
    }

    pub fn remove(&mut self, id: TextureId) -> bool {
        let removed = self.textures.remove(&id).is_some();
        if removed {
            self.last_modified += 1;
        }
        removed
    }

    /// Remove every source; ids are never handed out twice
    pub fn clear(&mut self) {
        self.textures.clear();
        self.last_modified += 1;
    }

    pub fn get(&self, id: TextureId) -> Option<&Arc<dyn TextureSource>> {
        self.textures.get(&id)
    }

    pub fn contains(&self, id: TextureId) -> bool {
        self.textures.contains_key(&id)
    }

    /// Sources in id order
    pub fn iter(&self) -> impl Iterator<Item = (TextureId, &Arc<dyn TextureSource>)> {
        self.textures.iter().map(|(id, source)| (*id, source))
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Modification counter, strictly increasing across mutations
    pub fn last_modified(&self) -> u64 {
        self.last_modified
    }
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;

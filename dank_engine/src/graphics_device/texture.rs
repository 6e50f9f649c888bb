/// Texture trait and texture descriptor

use std::any::Any;
use crate::error::Result;
use crate::resource::PixelFormat;

/// GPU texture formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Bgra8Unorm,
    /// Swapchain formats the renderer only draws into
    Rgba8Srgb,
    Bgra8Srgb,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> u32 {
        4
    }
}

impl From<PixelFormat> for TextureFormat {
    fn from(format: PixelFormat) -> Self {
        match format {
            PixelFormat::Rgba8Unorm => TextureFormat::Rgba8Unorm,
            PixelFormat::Bgra8Unorm => TextureFormat::Bgra8Unorm,
        }
    }
}

/// Descriptor for creating a sampled 2D texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

impl TextureDesc {
    /// Size in bytes of one full upload
    pub fn byte_len(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.format.bytes_per_pixel() as u64
    }
}

/// Texture resource trait
///
/// Pixels are written through `GraphicsDevice::write_texture`, which owns
/// the staging path. The texture is destroyed when the last handle drops.
pub trait Texture: Send + Sync {
    fn desc(&self) -> &TextureDesc;

    /// Backend handle, stable for the lifetime of the texture
    fn handle(&self) -> u64;

    /// Downcast hook for the owning backend
    fn as_any(&self) -> &dyn Any;
}

/// Check that `data` covers exactly one full upload of `desc`
pub fn validate_texture_upload(desc: &TextureDesc, data: &[u8]) -> Result<()> {
    if data.len() as u64 != desc.byte_len() {
        return Err(crate::error::Error::InvalidResource(format!(
            "texture upload of {} bytes, expected {} for {}x{}",
            data.len(),
            desc.byte_len(),
            desc.width,
            desc.height
        )));
    }
    Ok(())
}

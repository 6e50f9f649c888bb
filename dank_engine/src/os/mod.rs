//! Host OS collaborators
//!
//! URI parsing, byte loading and the screen-capture configuration shared
//! with the platform layer. These are plain services owned by the
//! application root; nothing here is process-global.

mod uri;
mod loader;
mod capture;

pub use uri::Uri;
pub use loader::{ResourceLoader, FileResourceLoader, MemoryResourceLoader};
pub use capture::{CaptureConfig, ScreenOutput, SharedCaptureConfig};

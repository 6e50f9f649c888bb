/*!
# Dank Engine

Core of the Dank real-time rendering engine.

The crate keeps CPU-side mesh and texture libraries versioned, and the
renderer mirrors them on the GPU only when their version changes. Backends
implement the `GraphicsDevice` contract; everything above it (resource
caches, binding encoder, frame pacing) is shared.

## Architecture

- **Engine**: application root owning the `FrameContext` and the `Scene`
- **MeshLibrary / TextureLibrary**: versioned CPU resource stores
- **GpuMeshCache / GpuTextureCache**: version-diffed GPU mirrors
- **BindingEncoder**: per-stage argument tables, rewritten only on change
- **FramePipeline**: N frame slots paced by monotonic fences
- **FrameRenderer**: the `Renderer` built from the pieces above over any
  `GraphicsDevice`

Backend crates (e.g. `dank_engine_renderer_vulkan`) provide the device.
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod utils;
pub mod resource;
pub mod os;
pub mod input;
pub mod scene;
pub mod frame_context;
pub mod graphics_device;
pub mod renderer;

// Main dank namespace module
pub mod dank {
    // Error types
    pub use crate::error::{Error, Result};

    // Application root
    pub use crate::engine::Engine;
    pub use crate::frame_context::FrameContext;

    // Renderer trait
    pub use crate::renderer::Renderer;

    // Logging sub-module (types only, macros live at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Backend contract
    pub mod device {
        pub use crate::graphics_device::*;
    }

    // Render sub-module with all rendering types
    pub mod render {
        pub use crate::renderer::*;
    }

    // Resource sub-module
    pub mod resource {
        pub use crate::resource::*;
    }

    // Scene sub-module
    pub mod scene {
        pub use crate::scene::*;
    }

    // Host collaborators
    pub mod os {
        pub use crate::os::*;
    }

    pub mod input {
        pub use crate::input::*;
    }
}

// Re-export math library at crate root
pub use glam;

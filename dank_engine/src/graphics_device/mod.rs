/// Graphics device module - the contract every renderer backend implements

pub mod graphics_device;
pub mod buffer;
pub mod texture;
pub mod argument_table;
pub mod fence;
pub mod command_list;
pub mod pipeline;

pub use graphics_device::*;
pub use buffer::*;
pub use texture::*;
pub use argument_table::*;
pub use fence::*;
pub use command_list::*;
pub use pipeline::*;

// Mock graphics device (no GPU required), used by unit and integration tests
pub mod mock_graphics_device;

/// Argument tables - per-stage tables mapping logical slots to resources
///
/// A table is laid out as consecutive entries, each an array of one
/// binding kind. Logical slots are numbered flat across the entries:
///
/// ```text
/// entries: [Uniform x1, Storage x2]      slot 0 -> entry 0 [0]
///                                        slot 1 -> entry 1 [0]
///                                        slot 2 -> entry 1 [1]
/// ```
///
/// Backends map an entry to one binding (Vulkan descriptor binding, Metal
/// argument id) and the element to its array index.

use std::any::Any;
use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{Buffer, Texture};

/// Shader stage owning a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Resource kind of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    UniformBuffer,
    StorageBuffer,
    SampledTexture,
}

/// `count` consecutive slots of one kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgumentEntry {
    pub kind: BindingKind,
    pub count: u32,
}

/// Descriptor for creating an argument table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentTableDesc {
    pub stage: ShaderStage,
    pub entries: Vec<ArgumentEntry>,
}

impl ArgumentTableDesc {
    /// Total number of logical slots
    pub fn capacity(&self) -> u32 {
        self.entries.iter().map(|entry| entry.count).sum()
    }

    /// Map a flat slot to `(entry index, array element, kind)`
    pub fn locate(&self, slot: u32) -> Option<(u32, u32, BindingKind)> {
        let mut base = 0;
        for (index, entry) in self.entries.iter().enumerate() {
            if slot < base + entry.count {
                return Some((index as u32, slot - base, entry.kind));
            }
            base += entry.count;
        }
        None
    }
}

/// A resource written into a table slot
#[derive(Clone)]
pub enum BindingResource {
    UniformBuffer(Arc<dyn Buffer>),
    StorageBuffer(Arc<dyn Buffer>),
    SampledTexture(Arc<dyn Texture>),
}

impl BindingResource {
    pub fn kind(&self) -> BindingKind {
        match self {
            BindingResource::UniformBuffer(_) => BindingKind::UniformBuffer,
            BindingResource::StorageBuffer(_) => BindingKind::StorageBuffer,
            BindingResource::SampledTexture(_) => BindingKind::SampledTexture,
        }
    }

    /// Backend handle of the bound resource
    pub fn handle(&self) -> u64 {
        match self {
            BindingResource::UniformBuffer(buffer) | BindingResource::StorageBuffer(buffer) => {
                buffer.handle()
            }
            BindingResource::SampledTexture(texture) => texture.handle(),
        }
    }
}

impl std::fmt::Debug for BindingResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}({:#x})", self.kind(), self.handle())
    }
}

/// Argument table trait
///
/// Writes are only issued while no in-flight frame reads the table; the
/// frame renderer drains its frame slots before re-encoding.
pub trait ArgumentTable: Send + Sync {
    fn desc(&self) -> &ArgumentTableDesc;

    /// Write resources into slots. Slots not named keep their contents.
    ///
    /// # Arguments
    ///
    /// * `bindings` - `(slot, resource)` pairs
    ///
    /// # Errors
    ///
    /// `InvalidResource` when a slot is out of range or its kind does not
    /// match the table layout.
    fn write(&self, bindings: &[(u32, BindingResource)]) -> Result<()>;

    /// Downcast hook for the owning backend
    fn as_any(&self) -> &dyn Any;
}

/// Check every binding against the table layout
pub fn validate_bindings(desc: &ArgumentTableDesc, bindings: &[(u32, BindingResource)]) -> Result<()> {
    for (slot, resource) in bindings {
        match desc.locate(*slot) {
            Some((_, _, kind)) if kind == resource.kind() => {}
            Some((_, _, kind)) => {
                return Err(crate::error::Error::InvalidResource(format!(
                    "slot {} of the {:?} table expects {:?}, got {:?}",
                    slot, desc.stage, kind, resource.kind()
                )));
            }
            None => {
                return Err(crate::error::Error::InvalidResource(format!(
                    "slot {} out of range for the {:?} table (capacity {})",
                    slot, desc.stage, desc.capacity()
                )));
            }
        }
    }
    Ok(())
}

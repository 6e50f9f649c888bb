/// Drawable instances - the per-frame draw list filled by the scene.

use glam::{Mat4, Vec4};
use crate::resource::{MeshId, TextureId};

/// One draw request: a mesh from the mesh library, textured by a texture
/// from the texture library
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawableInstance {
    /// World transform
    pub transform: Mat4,
    /// RGBA tint multiplied with the texture
    pub color: Vec4,
    pub mesh: MeshId,
    pub texture: TextureId,
}

impl DrawableInstance {
    pub fn new(mesh: MeshId, texture: TextureId) -> Self {
        Self {
            transform: Mat4::IDENTITY,
            color: Vec4::ONE,
            mesh,
            texture,
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }
}

/// Ordered list of instances for the current frame
///
/// Owns no GPU resources. The scene clears and refills it every frame and
/// the renderer walks it once, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    instances: Vec<DrawableInstance>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, instance: DrawableInstance) {
        self.instances.push(instance);
    }

    pub fn clear(&mut self) {
        self.instances.clear();
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DrawableInstance> {
        self.instances.iter()
    }

    pub fn as_slice(&self) -> &[DrawableInstance] {
        &self.instances
    }
}

impl Extend<DrawableInstance> for DrawList {
    fn extend<I: IntoIterator<Item = DrawableInstance>>(&mut self, iter: I) {
        self.instances.extend(iter);
    }
}

impl<'a> IntoIterator for &'a DrawList {
    type Item = &'a DrawableInstance;
    type IntoIter = std::slice::Iter<'a, DrawableInstance>;

    fn into_iter(self) -> Self::IntoIter {
        self.instances.iter()
    }
}

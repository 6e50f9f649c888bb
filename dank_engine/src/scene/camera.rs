/// Camera - view/projection state driven by the scene.
///
/// The scene sets position, target and projection parameters; `update`
/// recomputes the matrices and the frustum once per frame, and
/// `uniform()` packs the block the renderer copies into its persistent
/// camera buffer.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3, Vec4};
use super::frustum::Frustum;

/// Projection used by `Camera::update`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectionMode {
    Perspective,
    #[default]
    Orthographic,
}

/// GPU camera block, bound at slot 0 of the vertex argument table
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: Mat4,
    pub view: Mat4,
    pub proj: Mat4,
    pub position: Vec4,
    pub light_view_position: Vec4,
    pub near: f32,
    pub far: f32,
    pub gamma: f32,
    pub time: f32,
}

/// Scene camera
#[derive(Debug, Clone)]
pub struct Camera {
    /// Vertical field of view in degrees (perspective only)
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Orthographic zoom: the view spans `±width / scale` horizontally
    pub scale: f32,
    pub gamma: f32,
    /// Seconds accumulated by `update`
    pub time: f32,
    pub mode: ProjectionMode,
    pub up: Vec3,
    pub position: Vec3,
    pub target: Vec3,
    viewport: Vec4,
    view: Mat4,
    proj: Mat4,
    frustum: Frustum,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov: 70.0,
            near: 0.1,
            far: 100.0,
            scale: 1.0,
            gamma: 1.0,
            time: 0.0,
            mode: ProjectionMode::Orthographic,
            up: Vec3::Y,
            position: Vec3::new(0.0, 0.0, 1.0),
            target: Vec3::ZERO,
            viewport: Vec4::ZERO,
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            frustum: Frustum::default(),
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== GETTERS =====

    pub fn view_matrix(&self) -> &Mat4 {
        &self.view
    }

    pub fn projection_matrix(&self) -> &Mat4 {
        &self.proj
    }

    /// Combined view-projection matrix (projection * view)
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.proj * self.view
    }

    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// Viewport as (x, y, width, height)
    pub fn viewport(&self) -> Vec4 {
        self.viewport
    }

    // ===== FRAME UPDATE =====

    /// Store the new view size. Zero or negative sizes are ignored
    /// (minimized windows report 0x0).
    pub fn on_view_resize(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.viewport = Vec4::new(0.0, 0.0, width, height);
        }
    }

    /// Recompute matrices and frustum, and advance `time` by `dt` seconds
    pub fn update(&mut self, dt: f32) {
        let width = self.viewport.z;
        let height = self.viewport.w;

        self.proj = match self.mode {
            ProjectionMode::Perspective => {
                let ratio = if height > 0.0 { width / height } else { 1.0 };
                Mat4::perspective_rh(self.fov.to_radians(), ratio, self.near, self.far)
            }
            ProjectionMode::Orthographic => {
                let half_w = if width > 0.0 { width / self.scale } else { 1.0 };
                let half_h = if height > 0.0 { height / self.scale } else { 1.0 };
                Mat4::orthographic_rh(-half_w, half_w, -half_h, half_h, self.near, self.far)
            }
        };
        self.view = Mat4::look_at_rh(self.position, self.target, self.up);
        self.frustum = Frustum::from_view_projection(&(self.proj * self.view));
        self.time += dt;
    }

    // ===== SCREEN MAPPING =====

    /// Unproject a screen position at clip depth `depth` (0 = near, 1 = far)
    pub fn screen_to_world(&self, screen_x: f32, screen_y: f32, depth: f32) -> Vec3 {
        let ndc = Vec4::new(
            (screen_x - self.viewport.x) / self.viewport.z * 2.0 - 1.0,
            (screen_y - self.viewport.y) / self.viewport.w * 2.0 - 1.0,
            depth,
            1.0,
        );
        let world = self.view_projection_matrix().inverse() * ndc;
        world.truncate() / world.w
    }

    /// Project `offset` (in model space of `model`) to screen coordinates
    pub fn world_to_screen(&self, offset: Vec3, model: &Mat4) -> Vec2 {
        let clip = self.proj * self.view * *model * offset.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        Vec2::new(
            (ndc.x * 0.5 + 0.5) * self.viewport.z + self.viewport.x,
            (ndc.y * 0.5 + 0.5) * self.viewport.w + self.viewport.y,
        )
    }

    /// Pack the GPU camera block for the current frame
    pub fn uniform(&self) -> CameraUniform {
        let position = self.position.extend(0.0);
        CameraUniform {
            view_proj: self.proj * self.view,
            view: self.view,
            proj: self.proj,
            position,
            light_view_position: position * Vec4::new(-1.0, 1.0, -1.0, 1.0),
            near: self.near,
            far: self.far,
            gamma: self.gamma,
            time: self.time,
        }
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;

/// Frustum - six clipping planes derived from the camera matrices.
///
/// Each plane is a Vec4 (A, B, C, D) with an inward-pointing unit normal
/// (A, B, C). A point P is inside when `dot(plane, (P, 1)) >= 0` for all
/// six planes. Rebuilt by `Camera::update` every frame so scenes can cull
/// their drawables before filling the draw list.

use glam::{Mat4, Vec3, Vec4};

/// Frustum plane indices
pub const PLANE_LEFT: usize = 0;
pub const PLANE_RIGHT: usize = 1;
pub const PLANE_BOTTOM: usize = 2;
pub const PLANE_TOP: usize = 3;
pub const PLANE_NEAR: usize = 4;
pub const PLANE_FAR: usize = 5;

/// Six frustum planes: left, right, bottom, top, near, far
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub planes: [Vec4; 6],
}

impl Default for Frustum {
    fn default() -> Self {
        Self::from_view_projection(&Mat4::IDENTITY)
    }
}

impl Frustum {
    /// Extract the planes from a view-projection matrix (Gribb & Hartmann).
    ///
    /// Expects a `[0, 1]` clip depth range, the convention of glam's `*_rh`
    /// projections, so the near plane is row 2 alone.
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let row0 = vp.row(0);
        let row1 = vp.row(1);
        let row2 = vp.row(2);
        let row3 = vp.row(3);

        let mut planes = [
            row3 + row0,
            row3 - row0,
            row3 + row1,
            row3 - row1,
            row2,
            row3 - row2,
        ];

        for plane in &mut planes {
            let normal_len = plane.truncate().length();
            if normal_len > 0.0 {
                *plane /= normal_len;
            }
        }

        Self { planes }
    }

    /// Signed distance from `point` to a plane (positive inside)
    pub fn distance(&self, plane: usize, point: Vec3) -> f32 {
        self.planes[plane].dot(point.extend(1.0))
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        (0..6).all(|plane| self.distance(plane, point) >= 0.0)
    }

    /// Conservative sphere test: may accept spheres just outside a corner,
    /// never rejects a visible one.
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        (0..6).all(|plane| self.distance(plane, center) >= -radius)
    }
}

#[cfg(test)]
#[path = "frustum_tests.rs"]
mod tests;

//! Scene module - camera, frustum, draw list and the scene contract.
//!
//! The scene is owned by the application root (`Engine`) and fills the
//! frame context's draw list every frame. Nothing here touches the GPU.

mod camera;
mod drawable;
mod frustum;
mod scene;

pub use camera::{Camera, CameraUniform, ProjectionMode};
pub use drawable::{DrawableInstance, DrawList};
pub use frustum::{
    Frustum,
    PLANE_LEFT, PLANE_RIGHT, PLANE_BOTTOM, PLANE_TOP, PLANE_NEAR, PLANE_FAR,
};
pub use scene::Scene;

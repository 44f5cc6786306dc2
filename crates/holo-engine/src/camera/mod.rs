//! Per-camera GPU resources.
//!
//! Each holographic camera owns its back-buffer views, depth buffer, viewport
//! and a view-projection uniform. The [`CameraResourceMap`] holds them for all
//! cameras and is the only way to reach them across threads.

mod constants;
mod map;
mod resources;
mod viewport;

pub use constants::{
    VIEW_PROJECTION_BINDING, VIEW_PROJECTION_GROUP, ViewProjectionConstants,
    view_projection_layout,
};
pub use map::{CameraResourceMap, CameraTable};
pub use resources::{BACK_BUFFER_FORMAT, CameraResources, DEPTH_STENCIL_FORMAT};
pub use viewport::Viewport;

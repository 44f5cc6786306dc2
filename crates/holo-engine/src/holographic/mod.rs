//! Host holographic runtime contracts.
//!
//! The runtime (pose prediction, compositor, camera lifetime) is external.
//! This module only describes what the engine consumes from it.

mod error;
mod pose;
mod space;

pub use error::{GpuFault, HostError};
pub use pose::{
    CameraId, CameraPose, HolographicCamera, RenderingParameters, SpatialCoordinateSystem,
    StereoTransform,
};
pub use space::{
    AdapterId, HolographicFrame, HolographicSpace, PresentResult, PresentWaitBehavior,
};

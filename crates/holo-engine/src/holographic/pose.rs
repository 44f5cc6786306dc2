use glam::Mat4;

use crate::camera::Viewport;

/// Opaque identity of a holographic camera, assigned by the runtime.
pub type CameraId = u32;

/// Left/right eye pair of transforms.
///
/// Matrices use the runtime's row-vector convention (`v' = v * M`), so a
/// combined transform is written `view * projection`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StereoTransform {
    pub left: Mat4,
    pub right: Mat4,
}

impl StereoTransform {
    pub const IDENTITY: Self = Self {
        left: Mat4::IDENTITY,
        right: Mat4::IDENTITY,
    };

    #[inline]
    pub const fn new(left: Mat4, right: Mat4) -> Self {
        Self { left, right }
    }

    /// Same transform for both eyes (mono cameras).
    #[inline]
    pub const fn mono(m: Mat4) -> Self {
        Self { left: m, right: m }
    }
}

/// Opaque handle to a spatial coordinate system owned by the runtime.
///
/// Poses are projected into a coordinate system by the runtime; the engine
/// only passes the handle through.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SpatialCoordinateSystem(pub u64);

/// Static description of a camera delivered with the "camera added" notification.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct HolographicCamera {
    pub id: CameraId,
    /// Renders both eyes into one two-layer surface.
    pub is_stereo: bool,
    /// The display has no passthrough (VR rather than see-through).
    pub is_opaque: bool,
}

/// Pose of one camera for the frame being rendered.
pub trait CameraPose {
    /// Camera this pose belongs to.
    fn camera_id(&self) -> CameraId;

    /// Rendering rectangle for this pose, in back-buffer pixels.
    fn viewport(&self) -> Viewport;

    /// Intrinsic projection for each eye.
    fn projection_transform(&self) -> StereoTransform;

    /// Per-eye view transform in `coordinate_system`.
    ///
    /// Returns `None` when the pose cannot be located (e.g. tracking lost).
    fn try_get_view_transform(
        &self,
        coordinate_system: &SpatialCoordinateSystem,
    ) -> Option<StereoTransform>;
}

/// Back-buffer source for one camera in one frame.
#[derive(Debug, Clone)]
pub struct RenderingParameters {
    /// Surface the runtime will composite. Stereo cameras use two array layers.
    pub back_buffer: wgpu::Texture,

    /// Depth surface supplied by the runtime, if any.
    ///
    /// When absent, the camera creates and caches its own.
    pub depth_buffer: Option<wgpu::Texture>,
}

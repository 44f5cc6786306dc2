use std::time::Duration;

use super::{CameraPose, HostError, RenderingParameters};

/// Adapter identity as reported by the runtime (PCI vendor + device id).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct AdapterId {
    pub vendor: u32,
    pub device: u32,
}

impl AdapterId {
    pub fn of(info: &wgpu::AdapterInfo) -> Self {
        Self {
            vendor: info.vendor,
            device: info.device,
        }
    }

    pub fn matches(&self, info: &wgpu::AdapterInfo) -> bool {
        *self == Self::of(info)
    }
}

/// How `present` should block.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PresentWaitBehavior {
    /// Block until this frame has finished on the GPU.
    WaitForFrameToFinish,
    /// Return once queued; the next present blocks on this one instead.
    DoNotWaitForFrameToFinish,
}

/// Non-error outcomes of a present.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PresentResult {
    Success,
    /// The runtime reports that the device was removed.
    DeviceRemoved,
}

/// The host runtime that owns the head-mounted display.
///
/// Implementations are supplied by the platform layer. Camera add/remove and
/// availability notifications are delivered by the runtime itself; they are
/// forwarded to [`CameraResourceMap`](crate::camera::CameraResourceMap) and
/// [`AvailabilitySignal`](crate::present::AvailabilitySignal).
pub trait HolographicSpace {
    type Frame: HolographicFrame;

    /// Adapter the runtime wants the device created on, if it has a preference.
    fn primary_adapter_id(&self) -> Option<AdapterId>;

    /// Hands the (re)created device to the runtime.
    fn set_graphics_device(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<(), HostError>;

    /// Whether [`wait_for_next_frame_ready`](Self::wait_for_next_frame_ready)
    /// with a head start is available.
    fn supports_headstart_wait(&self) -> bool;

    /// Blocks until the runtime is ready for the next frame.
    fn wait_for_next_frame_ready(&self, headstart: Duration) -> Result<(), HostError>;

    /// Creates the frame for the next display period.
    fn create_next_frame(&self) -> Self::Frame;
}

/// One frame of the runtime's prediction.
pub trait HolographicFrame {
    type Pose: CameraPose;

    /// Predicted poses, one per active camera.
    fn camera_poses(&self) -> &[Self::Pose];

    /// Back-buffer source for the camera of `pose`.
    fn rendering_parameters(&self, pose: &Self::Pose) -> Result<RenderingParameters, HostError>;

    /// Presents the frame using the current prediction.
    fn present(&self, behavior: PresentWaitBehavior) -> Result<PresentResult, HostError>;
}

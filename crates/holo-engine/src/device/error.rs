use thiserror::Error;

use crate::holographic::{GpuFault, HostError};

/// Errors raised by device creation and by work submitted through the device.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// No hardware or software adapter could be found.
    #[error("no GPU adapter available (hardware or software)")]
    NoAdapter,

    /// An adapter was found but no feature level could be satisfied.
    #[error("failed to create a device on `{adapter}` at any feature level")]
    DeviceCreation {
        adapter: String,
        #[source]
        source: wgpu::RequestDeviceError,
    },

    /// Device resources were used before `create_device_resources`.
    #[error("device resources have not been created")]
    NotCreated,

    /// The device is gone; recovery is required.
    #[error("GPU device lost: {0}")]
    Lost(GpuFault),

    /// A camera's back buffer does not match its fixed format.
    #[error("camera {camera} back buffer is {actual:?}, expected {expected:?}")]
    BackBufferFormat {
        camera: u32,
        expected: wgpu::TextureFormat,
        actual: wgpu::TextureFormat,
    },

    #[error(transparent)]
    Host(HostError),
}

impl DeviceError {
    /// True for the transient device-loss codes (hung, removed, reset).
    pub fn is_device_lost(&self) -> bool {
        self.device_fault().is_some()
    }

    pub fn device_fault(&self) -> Option<GpuFault> {
        match self {
            DeviceError::Lost(fault) => Some(*fault),
            DeviceError::Host(err) => err.device_fault(),
            _ => None,
        }
    }
}

impl From<HostError> for DeviceError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::DeviceLost(fault) => DeviceError::Lost(fault),
            other => DeviceError::Host(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lost_codes_are_device_loss() {
        for fault in [GpuFault::Hung, GpuFault::Removed, GpuFault::Reset] {
            assert!(DeviceError::Lost(fault).is_device_lost());
        }
    }

    #[test]
    fn host_device_lost_converts_to_lost() {
        let err: DeviceError = HostError::DeviceLost(GpuFault::Reset).into();
        assert!(matches!(err, DeviceError::Lost(GpuFault::Reset)));
    }

    #[test]
    fn other_errors_are_not_device_loss() {
        assert!(!DeviceError::NoAdapter.is_device_lost());
        assert!(!DeviceError::NotCreated.is_device_lost());
        let closed: DeviceError = HostError::ConnectionClosed.into();
        assert!(!closed.is_device_lost());
        let other: DeviceError = HostError::Other("busy".into()).into();
        assert_eq!(other.device_fault(), None);
    }
}

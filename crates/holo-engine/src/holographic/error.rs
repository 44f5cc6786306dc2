use thiserror::Error;

/// GPU failure codes that mean the device is gone and must be recreated.
///
/// This is a closed set: anything else reported by the GPU or the runtime is
/// not a device loss.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum GpuFault {
    /// The GPU stopped responding (TDR).
    Hung,
    /// The adapter was removed or its driver was upgraded.
    Removed,
    /// The driver reset the device.
    Reset,
}

impl std::fmt::Display for GpuFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GpuFault::Hung => "device hung",
            GpuFault::Removed => "device removed",
            GpuFault::Reset => "device reset",
        };
        f.write_str(s)
    }
}

/// Errors reported by the host holographic runtime.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    /// The GPU device backing the runtime was lost.
    #[error("holographic runtime lost its device: {0}")]
    DeviceLost(GpuFault),

    /// The connection to the compositor/runtime is already closed.
    #[error("holographic runtime connection is closed")]
    ConnectionClosed,

    /// Any other runtime failure.
    #[error("holographic runtime error: {0}")]
    Other(String),
}

impl HostError {
    /// Returns the fault if this error is a device loss.
    pub fn device_fault(&self) -> Option<GpuFault> {
        match self {
            HostError::DeviceLost(fault) => Some(*fault),
            _ => None,
        }
    }
}

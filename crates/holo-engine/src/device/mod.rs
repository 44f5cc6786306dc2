//! GPU device management.
//!
//! This module is responsible for:
//! - building device-independent factories (GPU instance, text, imaging)
//! - creating the wgpu Adapter/Device/Queue with feature-level and software fallback
//! - detecting optional capabilities (single-pass stereo)
//! - notifying one observer of device loss and restoration

mod error;
mod independent;
mod init;
mod notify;
mod resources;

pub use error::DeviceError;
pub use independent::DeviceIndependentResources;
pub use init::{DeviceConfig, FeatureLevel};
pub use notify::DeviceNotify;
pub use resources::{DeviceCapabilities, DeviceResources};

//! Holo engine crate.
//!
//! GPU device lifetime, per-camera back-buffer resources and the present/wait
//! protocol for stereo head-mounted rendering, including recovery from GPU
//! device loss. Content renderers and the host runtime plug in through
//! [`device::DeviceNotify`] and the [`holographic`] traits.

pub mod camera;
pub mod device;
pub mod holographic;
pub mod imaging;
pub mod logging;
pub mod present;
pub mod text;

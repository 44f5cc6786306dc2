use crate::imaging::ImageLoader;
use crate::text::FontSystem;

use super::DeviceConfig;

/// Factories that do not depend on a GPU device.
///
/// Built once at startup and kept across device loss.
pub struct DeviceIndependentResources {
    /// GPU API factory; adapters and devices are requested from it.
    instance: wgpu::Instance,

    /// Text-layout factory.
    fonts: FontSystem,

    /// Imaging factory.
    images: ImageLoader,
}

impl DeviceIndependentResources {
    /// Creates the factories.
    ///
    /// Validation layers are requested only in debug builds; wgpu enables
    /// them only where they are installed. `WGPU_DEBUG`/`WGPU_VALIDATION`
    /// environment overrides are honoured.
    pub fn new(config: &DeviceConfig) -> Self {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: config.backends,
            flags: wgpu::InstanceFlags::from_build_config().with_env(),
            ..Default::default()
        });

        Self {
            instance,
            fonts: FontSystem::new(),
            images: ImageLoader::new(),
        }
    }

    pub fn instance(&self) -> &wgpu::Instance {
        &self.instance
    }

    pub fn fonts(&self) -> &FontSystem {
        &self.fonts
    }

    pub fn fonts_mut(&mut self) -> &mut FontSystem {
        &mut self.fonts
    }

    pub fn images(&self) -> &ImageLoader {
        &self.images
    }
}

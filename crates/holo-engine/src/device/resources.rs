use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::camera::view_projection_layout;
use crate::holographic::{AdapterId, GpuFault};
use crate::logging;

use super::{DeviceConfig, DeviceError, DeviceIndependentResources, DeviceNotify, FeatureLevel};

/// Optional hardware capabilities detected at device creation.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct DeviceCapabilities {
    /// The render-target layer can be selected without a geometry stage
    /// (multiview), so stereo cameras render in a single pass.
    pub supports_vprt: bool,

    /// The device runs on a software rasterizer.
    pub software: bool,
}

/// Device and context, created and destroyed together.
struct GpuDevice {
    adapter: wgpu::Adapter,
    device: wgpu::Device,

    /// Immediate submission context. Content renderers and the coordinator
    /// may take it from nested call sites within one frame, hence reentrant.
    context: ReentrantMutex<wgpu::Queue>,

    feature_level: FeatureLevel,
    capabilities: DeviceCapabilities,

    /// Layout of the per-camera view-projection bind group.
    view_projection_layout: wgpu::BindGroupLayout,

    /// Raised by wgpu's device-lost callback.
    lost: Arc<AtomicBool>,
}

/// Owns the GPU device, its submission context and the adapter.
///
/// Lifetimes:
/// - `'n` is the lifetime of the registered [`DeviceNotify`] observer. The
///   observer's owner must outlive this object; the borrow checker enforces it.
pub struct DeviceResources<'n> {
    config: DeviceConfig,
    independent: DeviceIndependentResources,
    gpu: Option<GpuDevice>,
    notify: Option<&'n dyn DeviceNotify>,
}

impl<'n> DeviceResources<'n> {
    /// Builds device-independent resources. No device is created yet.
    pub fn new(config: DeviceConfig) -> Self {
        let independent = DeviceIndependentResources::new(&config);
        Self {
            config,
            independent,
            gpu: None,
            notify: None,
        }
    }

    /// Rebuilds the device-independent factories.
    ///
    /// Fonts loaded into the previous text factory are discarded.
    pub fn create_device_independent_resources(&mut self) {
        self.independent = DeviceIndependentResources::new(&self.config);
    }

    /// Creates the device, replacing any existing one.
    ///
    /// Tries every configured feature level on a hardware adapter (the
    /// runtime's `preferred` one when it can be found), then repeats on a
    /// software adapter. Failure after the fallback is fatal.
    pub fn create_device_resources(
        &mut self,
        preferred: Option<AdapterId>,
    ) -> Result<(), DeviceError> {
        self.release_device();

        let gpu = pollster::block_on(request_gpu(
            self.independent.instance(),
            &self.config,
            preferred,
        ))?;

        log::info!(
            "device ready: feature level {:?}, vprt={}, software={}",
            gpu.feature_level,
            gpu.capabilities.supports_vprt,
            gpu.capabilities.software,
        );

        self.gpu = Some(gpu);
        Ok(())
    }

    /// Flushes outstanding work and drops the device and context.
    pub fn release_device(&mut self) {
        if let Some(gpu) = self.gpu.take() {
            gpu.context.lock().submit(std::iter::empty());
            log::debug!("released device on {}", gpu.adapter.get_info().name);
        }
    }

    /// Hints the driver that transient allocations can be reclaimed.
    ///
    /// Best effort: failures are logged and ignored.
    pub fn trim(&self) {
        let Some(gpu) = &self.gpu else {
            return;
        };

        // Flush first so nothing recorded still references transient memory.
        gpu.context.lock().submit(std::iter::empty());
        if let Err(err) = gpu.device.poll(wgpu::PollType::Poll) {
            log::debug!("trim: device poll failed: {err}");
        }
    }

    /// Registers the single device-lost/restored observer, replacing any previous one.
    pub fn register_device_notify(&mut self, notify: &'n dyn DeviceNotify) {
        self.notify = Some(notify);
    }

    pub(crate) fn notify_device_lost(&self) {
        if let Some(notify) = self.notify {
            notify.on_device_lost();
        }
    }

    pub(crate) fn notify_device_restored(&self) {
        if let Some(notify) = self.notify {
            notify.on_device_restored();
        }
    }

    /// Reports a device loss observed by wgpu outside of a present call.
    pub fn device_fault(&self) -> Option<GpuFault> {
        let gpu = self.gpu.as_ref()?;
        gpu.lost.load(Ordering::Acquire).then_some(GpuFault::Removed)
    }

    pub fn is_created(&self) -> bool {
        self.gpu.is_some()
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn independent(&self) -> &DeviceIndependentResources {
        &self.independent
    }

    pub fn independent_mut(&mut self) -> &mut DeviceIndependentResources {
        &mut self.independent
    }

    pub fn device(&self) -> Option<&wgpu::Device> {
        self.gpu.as_ref().map(|gpu| &gpu.device)
    }

    /// Locks the submission context. Reentrant on the same thread.
    pub fn context(&self) -> Option<ReentrantMutexGuard<'_, wgpu::Queue>> {
        self.gpu.as_ref().map(|gpu| gpu.context.lock())
    }

    pub fn adapter(&self) -> Option<&wgpu::Adapter> {
        self.gpu.as_ref().map(|gpu| &gpu.adapter)
    }

    pub fn adapter_id(&self) -> Option<AdapterId> {
        self.adapter().map(|a| AdapterId::of(&a.get_info()))
    }

    pub fn feature_level(&self) -> Option<FeatureLevel> {
        self.gpu.as_ref().map(|gpu| gpu.feature_level)
    }

    pub fn capabilities(&self) -> DeviceCapabilities {
        self.gpu
            .as_ref()
            .map(|gpu| gpu.capabilities)
            .unwrap_or_default()
    }

    /// Whether stereo cameras can be rendered without a geometry pass.
    pub fn supports_vprt(&self) -> bool {
        self.capabilities().supports_vprt
    }

    /// Bind group layout every content pipeline must use at
    /// [`VIEW_PROJECTION_GROUP`](crate::camera::VIEW_PROJECTION_GROUP).
    pub fn view_projection_layout(&self) -> Option<&wgpu::BindGroupLayout> {
        self.gpu.as_ref().map(|gpu| &gpu.view_projection_layout)
    }
}

impl Drop for DeviceResources<'_> {
    fn drop(&mut self) {
        self.release_device();
    }
}

async fn request_gpu(
    instance: &wgpu::Instance,
    config: &DeviceConfig,
    preferred: Option<AdapterId>,
) -> Result<GpuDevice, DeviceError> {
    match request_gpu_on(instance, config, preferred, false).await {
        Ok(gpu) => Ok(gpu),
        Err(err) if config.allow_software_fallback => {
            log::warn!("hardware device unavailable ({err}); falling back to a software adapter");
            request_gpu_on(instance, config, None, true).await
        }
        Err(err) => Err(err),
    }
}

async fn request_gpu_on(
    instance: &wgpu::Instance,
    config: &DeviceConfig,
    preferred: Option<AdapterId>,
    software: bool,
) -> Result<GpuDevice, DeviceError> {
    let adapter = select_adapter(instance, config, preferred, software).await?;
    let info = adapter.get_info();
    logging::log_adapter(&info, software);

    let supports_vprt =
        config.request_vprt && adapter.features().contains(wgpu::Features::MULTIVIEW);
    let required_features = if supports_vprt {
        wgpu::Features::MULTIVIEW
    } else {
        wgpu::Features::empty()
    };

    let mut last_error = None;
    for &level in config.levels() {
        let request = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("holo-engine device"),
                required_features,
                required_limits: level.limits(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: config.memory_hints.clone(),
                trace: wgpu::Trace::Off,
            })
            .await;

        match request {
            Ok((device, queue)) => {
                let capabilities = DeviceCapabilities {
                    supports_vprt,
                    software,
                };
                return Ok(GpuDevice::new(adapter, device, queue, level, capabilities));
            }
            Err(err) => {
                log::debug!("{}: feature level {level:?} rejected: {err}", info.name);
                last_error = Some(err);
            }
        }
    }

    match last_error {
        Some(source) => Err(DeviceError::DeviceCreation {
            adapter: info.name,
            source,
        }),
        None => Err(DeviceError::NoAdapter),
    }
}

async fn select_adapter(
    instance: &wgpu::Instance,
    config: &DeviceConfig,
    preferred: Option<AdapterId>,
    software: bool,
) -> Result<wgpu::Adapter, DeviceError> {
    if let Some(id) = preferred {
        // wgpu cannot open an adapter by id; probe both power classes.
        for power in [config.power_preference, opposite(config.power_preference)] {
            if let Some(adapter) = request_adapter(instance, power, software).await {
                if id.matches(&adapter.get_info()) {
                    return Ok(adapter);
                }
            }
        }
        log::warn!("preferred adapter {id:?} not found, using the default adapter");
    }

    request_adapter(instance, config.power_preference, software)
        .await
        .ok_or(DeviceError::NoAdapter)
}

async fn request_adapter(
    instance: &wgpu::Instance,
    power_preference: wgpu::PowerPreference,
    software: bool,
) -> Option<wgpu::Adapter> {
    let options = wgpu::RequestAdapterOptions {
        power_preference,
        force_fallback_adapter: software,
        compatible_surface: None,
    };
    instance.request_adapter(&options).await.ok()
}

fn opposite(power: wgpu::PowerPreference) -> wgpu::PowerPreference {
    match power {
        wgpu::PowerPreference::LowPower => wgpu::PowerPreference::HighPerformance,
        _ => wgpu::PowerPreference::LowPower,
    }
}

impl GpuDevice {
    fn new(
        adapter: wgpu::Adapter,
        device: wgpu::Device,
        queue: wgpu::Queue,
        feature_level: FeatureLevel,
        capabilities: DeviceCapabilities,
    ) -> Self {
        let lost = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&lost);
        device.set_device_lost_callback(move |reason, message| {
            // Our own teardown reports `Destroyed`; only real losses count.
            if !matches!(reason, wgpu::DeviceLostReason::Destroyed) {
                log::error!("GPU device lost ({reason:?}): {message}");
                flag.store(true, Ordering::Release);
            }
        });

        let view_projection_layout = view_projection_layout(&device);

        Self {
            adapter,
            device,
            context: ReentrantMutex::new(queue),
            feature_level,
            capabilities,
            view_projection_layout,
            lost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        events: RefCell<Vec<&'static str>>,
    }

    impl DeviceNotify for Recorder {
        fn on_device_lost(&self) {
            self.events.borrow_mut().push("lost");
        }

        fn on_device_restored(&self) {
            self.events.borrow_mut().push("restored");
        }
    }

    #[test]
    fn notify_without_observer_is_noop() {
        let resources = DeviceResources::new(DeviceConfig::default());
        resources.notify_device_lost();
        resources.notify_device_restored();
    }

    #[test]
    fn notify_reaches_registered_observer() {
        let recorder = Recorder::default();
        let mut resources = DeviceResources::new(DeviceConfig::default());
        resources.register_device_notify(&recorder);

        resources.notify_device_lost();
        resources.notify_device_restored();

        assert_eq!(*recorder.events.borrow(), vec!["lost", "restored"]);
    }

    #[test]
    fn accessors_before_creation_are_empty() {
        let resources = DeviceResources::new(DeviceConfig::default());
        assert!(!resources.is_created());
        assert!(resources.device().is_none());
        assert!(resources.context().is_none());
        assert!(resources.feature_level().is_none());
        assert!(!resources.supports_vprt());
        assert_eq!(resources.device_fault(), None);
        resources.trim();
    }

    #[test]
    fn opposite_power_preference() {
        assert_eq!(
            opposite(wgpu::PowerPreference::HighPerformance),
            wgpu::PowerPreference::LowPower
        );
        assert_eq!(
            opposite(wgpu::PowerPreference::LowPower),
            wgpu::PowerPreference::HighPerformance
        );
    }
}

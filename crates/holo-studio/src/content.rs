use std::cell::Cell;

use holo_engine::camera::CameraResources;
use holo_engine::device::{DeviceError, DeviceNotify, DeviceResources};

/// Minimal content renderer: clears every eye with a color that changes
/// each time the device is restored.
pub struct ClearRenderer {
    ready: Cell<bool>,
    generation: Cell<u32>,
}

impl ClearRenderer {
    pub fn new() -> Self {
        Self {
            ready: Cell::new(true),
            generation: Cell::new(0),
        }
    }

    pub fn generation(&self) -> u32 {
        self.generation.get()
    }

    fn clear_color(&self, is_opaque: bool) -> wgpu::Color {
        let tint = [
            wgpu::Color { r: 0.05, g: 0.1, b: 0.3, a: 1.0 },
            wgpu::Color { r: 0.3, g: 0.1, b: 0.05, a: 1.0 },
        ][(self.generation.get() % 2) as usize];

        // See-through displays treat black as transparent.
        if is_opaque { tint } else { wgpu::Color::TRANSPARENT }
    }

    pub fn draw(
        &self,
        device: &DeviceResources<'_>,
        camera: &mut CameraResources,
    ) -> Result<(), DeviceError> {
        if !self.ready.get() {
            return Ok(());
        }

        let gpu = device.device().ok_or(DeviceError::NotCreated)?;
        let mut encoder = gpu.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("studio camera encoder"),
        });

        let clear = self.clear_color(camera.is_opaque());
        for eye in 0..camera.eye_count() {
            let Some(mut pass) = camera.begin_eye_pass(&mut encoder, eye, clear) else {
                continue;
            };
            if !camera.attach_view_projection_buffer(&mut pass) {
                log::trace!("camera {}: constants not ready", camera.id());
            }
        }

        let queue = device.context().ok_or(DeviceError::NotCreated)?;
        queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}

impl DeviceNotify for ClearRenderer {
    fn on_device_lost(&self) {
        log::info!("content: releasing device resources");
        self.ready.set(false);
    }

    fn on_device_restored(&self) {
        self.generation.set(self.generation.get() + 1);
        self.ready.set(true);
        log::info!("content: device restored (generation {})", self.generation.get());
    }
}

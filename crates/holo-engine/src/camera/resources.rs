use crate::device::{DeviceError, DeviceResources};
use crate::holographic::{
    CameraId, CameraPose, HolographicCamera, RenderingParameters, SpatialCoordinateSystem,
};

use super::{VIEW_PROJECTION_BINDING, VIEW_PROJECTION_GROUP, ViewProjectionConstants, Viewport};

/// Color format of every camera back buffer.
pub const BACK_BUFFER_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8Unorm;

/// Format of depth buffers the camera creates itself.
pub const DEPTH_STENCIL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

/// Views derived from the runtime's back buffer for the current frame.
struct BackBuffer {
    texture: wgpu::Texture,
    size: wgpu::Extent3d,

    /// All layers; a 2D array view for stereo cameras (multiview rendering).
    render_target_view: wgpu::TextureView,
    /// One single-layer view per eye.
    eye_views: Vec<wgpu::TextureView>,

    depth_stencil_view: wgpu::TextureView,
    eye_depth_views: Vec<wgpu::TextureView>,
}

/// Lazily created uniform holding both eyes' view-projection matrices.
struct ViewProjectionBuffer {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    /// Last contents written to `buffer`.
    staged: ViewProjectionConstants,
}

/// GPU resources of one holographic camera.
///
/// Per frame the owner must call, in order:
/// 1. [`create_resources_for_back_buffer`](Self::create_resources_for_back_buffer)
/// 2. [`update_view_projection_buffer`](Self::update_view_projection_buffer)
/// 3. [`attach_view_projection_buffer`](Self::attach_view_projection_buffer) per pass
/// 4. [`end_frame`](Self::end_frame)
///
/// [`release_resources_for_back_buffer`](Self::release_resources_for_back_buffer)
/// drops everything device-bound; it runs on camera removal and device loss.
pub struct CameraResources {
    camera: HolographicCamera,
    format: wgpu::TextureFormat,
    depth_format: wgpu::TextureFormat,

    back_buffer: Option<BackBuffer>,
    /// Depth buffer we created because the runtime supplied none.
    owned_depth: Option<wgpu::Texture>,

    viewport: Viewport,
    view_projection: Option<ViewProjectionBuffer>,

    /// A back buffer was acquired this frame and its constants are usable.
    frame_pending: bool,
}

impl CameraResources {
    pub fn new(camera: HolographicCamera) -> Self {
        Self {
            camera,
            format: BACK_BUFFER_FORMAT,
            depth_format: DEPTH_STENCIL_FORMAT,
            back_buffer: None,
            owned_depth: None,
            viewport: Viewport::default(),
            view_projection: None,
            frame_pending: false,
        }
    }

    /// Derives render-target and depth views from this frame's back buffer.
    ///
    /// Must run once per camera per frame, before rendering. Views from the
    /// previous frame are replaced.
    pub fn create_resources_for_back_buffer(
        &mut self,
        device: &DeviceResources<'_>,
        parameters: &RenderingParameters,
    ) -> Result<(), DeviceError> {
        let gpu = device.device().ok_or(DeviceError::NotCreated)?;
        let texture = &parameters.back_buffer;

        if texture.format() != self.format {
            return Err(DeviceError::BackBufferFormat {
                camera: self.camera.id,
                expected: self.format,
                actual: texture.format(),
            });
        }

        let size = texture.size();
        let layers = size.depth_or_array_layers.max(1);
        if self.camera.is_stereo && layers < 2 {
            log::warn!("camera {}: stereo camera has a single-layer back buffer", self.camera.id);
        }

        let depth = match &parameters.depth_buffer {
            Some(depth) => depth.clone(),
            None => self.owned_depth_buffer(gpu, size),
        };

        let render_target_view = array_view(texture, self.format, layers, "camera render target");
        let eye_views = layer_views(texture, self.format, layers, "camera eye target");
        let depth_stencil_view = array_view(&depth, depth.format(), layers, "camera depth");
        let eye_depth_views = layer_views(&depth, depth.format(), layers, "camera eye depth");

        self.viewport = Viewport::covering(size.width, size.height);
        self.back_buffer = Some(BackBuffer {
            texture: texture.clone(),
            size,
            render_target_view,
            eye_views,
            depth_stencil_view,
            eye_depth_views,
        });
        self.frame_pending = true;
        Ok(())
    }

    /// Drops every device-bound resource. No-op if nothing was created.
    pub fn release_resources_for_back_buffer(&mut self) {
        self.back_buffer = None;
        self.owned_depth = None;
        self.view_projection = None;
        self.frame_pending = false;
    }

    /// Stages this frame's view-projection matrices.
    ///
    /// Returns `false` when the pose cannot be located in `coordinate_system`
    /// or the device is missing; the buffer then keeps its previous contents
    /// and the camera must be skipped this frame.
    pub fn update_view_projection_buffer<P: CameraPose + ?Sized>(
        &mut self,
        device: &DeviceResources<'_>,
        pose: &P,
        coordinate_system: &SpatialCoordinateSystem,
    ) -> bool {
        self.viewport = pose.viewport();

        let Some(view) = pose.try_get_view_transform(coordinate_system) else {
            log::trace!("camera {}: pose not located, skipping", self.camera.id);
            self.frame_pending = false;
            return false;
        };
        let (Some(gpu), Some(layout)) = (device.device(), device.view_projection_layout()) else {
            self.frame_pending = false;
            return false;
        };

        let constants = ViewProjectionConstants::new(&view, &pose.projection_transform());
        let target = self
            .view_projection
            .get_or_insert_with(|| ViewProjectionBuffer::new(gpu, layout, self.camera.id));

        if let Some(queue) = device.context() {
            queue.write_buffer(&target.buffer, 0, bytemuck::bytes_of(&constants));
        }
        target.staged = constants;
        true
    }

    /// Binds the view-projection uniform and viewport on `pass`.
    ///
    /// Returns `false` without binding if the buffer does not exist yet or
    /// this frame's update did not succeed.
    pub fn attach_view_projection_buffer(&self, pass: &mut wgpu::RenderPass<'_>) -> bool {
        let Some(view_projection) = &self.view_projection else {
            return false;
        };
        if !self.frame_pending {
            return false;
        }

        let vp = self.viewport;
        if vp.is_valid() {
            pass.set_viewport(vp.x, vp.y, vp.width, vp.height, 0.0, 1.0);
        }
        pass.set_bind_group(VIEW_PROJECTION_GROUP, &view_projection.bind_group, &[]);
        true
    }

    /// Marks this frame's work for the camera as done.
    pub fn end_frame(&mut self) {
        self.frame_pending = false;
    }

    /// Begins a pass that clears and targets one eye of the back buffer.
    pub fn begin_eye_pass<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        eye: usize,
        clear: wgpu::Color,
    ) -> Option<wgpu::RenderPass<'e>> {
        let back_buffer = self.back_buffer.as_ref()?;
        let color = back_buffer.eye_views.get(eye)?;
        let depth = back_buffer.eye_depth_views.get(eye)?;

        let stencil_ops = self.depth_format.has_stencil_aspect().then_some(wgpu::Operations {
            load: wgpu::LoadOp::Clear(0),
            store: wgpu::StoreOp::Store,
        });

        Some(encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("holo camera eye"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        }))
    }

    fn owned_depth_buffer(&mut self, device: &wgpu::Device, size: wgpu::Extent3d) -> wgpu::Texture {
        if let Some(depth) = &self.owned_depth {
            if depth.size() == size {
                return depth.clone();
            }
        }

        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("holo camera depth"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.depth_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        self.owned_depth = Some(depth.clone());
        depth
    }

    pub fn id(&self) -> CameraId {
        self.camera.id
    }

    pub fn camera(&self) -> &HolographicCamera {
        &self.camera
    }

    pub fn is_stereo(&self) -> bool {
        self.camera.is_stereo
    }

    pub fn is_opaque(&self) -> bool {
        self.camera.is_opaque
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn depth_format(&self) -> wgpu::TextureFormat {
        self.depth_format
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn has_back_buffer(&self) -> bool {
        self.back_buffer.is_some()
    }

    pub fn is_frame_pending(&self) -> bool {
        self.frame_pending
    }

    /// Number of eyes rendered into the back buffer.
    pub fn eye_count(&self) -> usize {
        self.back_buffer
            .as_ref()
            .map_or(0, |b| b.eye_views.len())
    }

    pub fn back_buffer(&self) -> Option<&wgpu::Texture> {
        self.back_buffer.as_ref().map(|b| &b.texture)
    }

    /// Back-buffer size in pixels (width, height).
    pub fn render_target_size(&self) -> Option<(u32, u32)> {
        self.back_buffer
            .as_ref()
            .map(|b| (b.size.width, b.size.height))
    }

    pub fn render_target_view(&self) -> Option<&wgpu::TextureView> {
        self.back_buffer.as_ref().map(|b| &b.render_target_view)
    }

    pub fn eye_render_target_view(&self, eye: usize) -> Option<&wgpu::TextureView> {
        self.back_buffer.as_ref()?.eye_views.get(eye)
    }

    pub fn depth_stencil_view(&self) -> Option<&wgpu::TextureView> {
        self.back_buffer.as_ref().map(|b| &b.depth_stencil_view)
    }

    /// Contents last staged into the view-projection buffer.
    pub fn view_projection(&self) -> Option<&ViewProjectionConstants> {
        self.view_projection.as_ref().map(|vp| &vp.staged)
    }
}

impl ViewProjectionBuffer {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, camera: CameraId) -> Self {
        log::debug!("camera {camera}: creating view-projection buffer");
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("holo camera view-projection"),
            size: ViewProjectionConstants::SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("holo camera view-projection"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: VIEW_PROJECTION_BINDING,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self {
            buffer,
            bind_group,
            staged: bytemuck::Zeroable::zeroed(),
        }
    }
}

fn array_view(
    texture: &wgpu::Texture,
    format: wgpu::TextureFormat,
    layers: u32,
    label: &'static str,
) -> wgpu::TextureView {
    let dimension = if layers > 1 {
        wgpu::TextureViewDimension::D2Array
    } else {
        wgpu::TextureViewDimension::D2
    };
    texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some(label),
        format: Some(format),
        dimension: Some(dimension),
        array_layer_count: Some(layers),
        ..Default::default()
    })
}

fn layer_views(
    texture: &wgpu::Texture,
    format: wgpu::TextureFormat,
    layers: u32,
    label: &'static str,
) -> Vec<wgpu::TextureView> {
    (0..layers)
        .map(|layer| {
            texture.create_view(&wgpu::TextureViewDescriptor {
                label: Some(label),
                format: Some(format),
                dimension: Some(wgpu::TextureViewDimension::D2),
                base_array_layer: layer,
                array_layer_count: Some(1),
                ..Default::default()
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceConfig;
    use crate::holographic::StereoTransform;

    fn camera() -> CameraResources {
        CameraResources::new(HolographicCamera {
            id: 5,
            is_stereo: true,
            is_opaque: true,
        })
    }

    #[test]
    fn new_camera_has_no_device_resources() {
        let resources = camera();
        assert_eq!(resources.id(), 5);
        assert!(resources.is_stereo());
        assert!(resources.is_opaque());
        assert_eq!(resources.format(), BACK_BUFFER_FORMAT);
        assert!(!resources.has_back_buffer());
        assert!(resources.render_target_view().is_none());
        assert!(resources.depth_stencil_view().is_none());
        assert!(resources.render_target_size().is_none());
        assert!(resources.view_projection().is_none());
        assert_eq!(resources.eye_count(), 0);
    }

    #[test]
    fn release_before_create_is_noop() {
        let mut resources = camera();
        resources.release_resources_for_back_buffer();
        assert!(!resources.has_back_buffer());
        assert!(!resources.is_frame_pending());
    }

    struct FixedPose {
        located: bool,
    }

    impl CameraPose for FixedPose {
        fn camera_id(&self) -> CameraId {
            5
        }

        fn viewport(&self) -> Viewport {
            Viewport::new(0.0, 0.0, 1440.0, 936.0)
        }

        fn projection_transform(&self) -> StereoTransform {
            StereoTransform::IDENTITY
        }

        fn try_get_view_transform(
            &self,
            _coordinate_system: &SpatialCoordinateSystem,
        ) -> Option<StereoTransform> {
            self.located.then_some(StereoTransform::IDENTITY)
        }
    }

    #[test]
    fn unlocated_pose_skips_camera() {
        let device = DeviceResources::new(DeviceConfig::default());
        let mut resources = camera();

        let updated = resources.update_view_projection_buffer(
            &device,
            &FixedPose { located: false },
            &SpatialCoordinateSystem(1),
        );

        assert!(!updated);
        assert!(!resources.is_frame_pending());
        assert!(resources.view_projection().is_none());
        assert_eq!(resources.viewport(), Viewport::new(0.0, 0.0, 1440.0, 936.0));
    }

    #[test]
    fn update_without_device_skips_camera() {
        let device = DeviceResources::new(DeviceConfig::default());
        let mut resources = camera();

        let updated = resources.update_view_projection_buffer(
            &device,
            &FixedPose { located: true },
            &SpatialCoordinateSystem(1),
        );

        assert!(!updated);
        assert!(resources.view_projection().is_none());
    }
}

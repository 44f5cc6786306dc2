use std::cell::{Cell, RefCell};
use std::sync::mpsc::Receiver;
use std::time::Duration;

use glam::{Mat4, Vec3};

use holo_engine::camera::{BACK_BUFFER_FORMAT, Viewport};
use holo_engine::holographic::{
    AdapterId, CameraId, CameraPose, GpuFault, HolographicCamera, HolographicFrame,
    HolographicSpace, HostError, PresentResult, PresentWaitBehavior, RenderingParameters,
    SpatialCoordinateSystem, StereoTransform,
};

/// Coordinate system every simulated pose is located in.
pub const STAGE: SpatialCoordinateSystem = SpatialCoordinateSystem(0);

const EYE_SIZE: u32 = 512;
const IPD: f32 = 0.064;

/// Camera changes published by the simulated dispatch thread.
pub enum CameraChange {
    Added(HolographicCamera),
    Removed(CameraId),
}

/// Desktop stand-in for a head-mounted runtime: off-screen back buffers,
/// a slowly orbiting head and one scripted device removal.
pub struct SimulatedSpace {
    device: RefCell<Option<wgpu::Device>>,
    changes: Receiver<CameraChange>,
    cameras: RefCell<Vec<HolographicCamera>>,
    frame_index: Cell<u64>,
    remove_device_at: Option<u64>,
}

impl SimulatedSpace {
    pub fn new(changes: Receiver<CameraChange>, remove_device_at: Option<u64>) -> Self {
        Self {
            device: RefCell::new(None),
            changes,
            cameras: RefCell::new(Vec::new()),
            frame_index: Cell::new(0),
            remove_device_at,
        }
    }

    fn drain_changes(&self) {
        let mut cameras = self.cameras.borrow_mut();
        while let Ok(change) = self.changes.try_recv() {
            match change {
                CameraChange::Added(camera) => {
                    cameras.retain(|c| c.id != camera.id);
                    cameras.push(camera);
                }
                CameraChange::Removed(id) => cameras.retain(|c| c.id != id),
            }
        }
    }
}

impl HolographicSpace for SimulatedSpace {
    type Frame = SimulatedFrame;

    fn primary_adapter_id(&self) -> Option<AdapterId> {
        None
    }

    fn set_graphics_device(
        &self,
        device: &wgpu::Device,
        _queue: &wgpu::Queue,
    ) -> Result<(), HostError> {
        *self.device.borrow_mut() = Some(device.clone());
        Ok(())
    }

    fn supports_headstart_wait(&self) -> bool {
        true
    }

    fn wait_for_next_frame_ready(&self, _headstart: Duration) -> Result<(), HostError> {
        std::thread::sleep(Duration::from_millis(1));
        Ok(())
    }

    fn create_next_frame(&self) -> SimulatedFrame {
        self.drain_changes();

        let index = self.frame_index.get();
        self.frame_index.set(index + 1);

        let t = index as f32 / 90.0;
        let head = Mat4::look_at_rh(
            Vec3::new(t.sin() * 0.5, 1.6, 2.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::Y,
        );

        let poses = self
            .cameras
            .borrow()
            .iter()
            .map(|camera| SimulatedPose::new(camera, head))
            .collect();

        let result = if self.remove_device_at == Some(index) {
            Err(HostError::DeviceLost(GpuFault::Removed))
        } else {
            Ok(PresentResult::Success)
        };

        SimulatedFrame {
            device: self.device.borrow().clone(),
            poses,
            result,
        }
    }
}

pub struct SimulatedPose {
    id: CameraId,
    layers: u32,
    view: StereoTransform,
    projection: StereoTransform,
}

impl SimulatedPose {
    fn new(camera: &HolographicCamera, head: Mat4) -> Self {
        // The runtime speaks row-vector matrices; glam builds column-vector ones.
        let eye = |offset: f32| {
            (Mat4::from_translation(Vec3::new(-offset, 0.0, 0.0)) * head).transpose()
        };
        let projection = Mat4::perspective_rh(1.5, 1.0, 0.05, 100.0).transpose();

        let (view, layers) = if camera.is_stereo {
            (StereoTransform::new(eye(-IPD / 2.0), eye(IPD / 2.0)), 2)
        } else {
            (StereoTransform::mono(eye(0.0)), 1)
        };

        Self {
            id: camera.id,
            layers,
            view,
            projection: StereoTransform::mono(projection),
        }
    }
}

impl CameraPose for SimulatedPose {
    fn camera_id(&self) -> CameraId {
        self.id
    }

    fn viewport(&self) -> Viewport {
        Viewport::covering(EYE_SIZE, EYE_SIZE)
    }

    fn projection_transform(&self) -> StereoTransform {
        self.projection
    }

    fn try_get_view_transform(
        &self,
        coordinate_system: &SpatialCoordinateSystem,
    ) -> Option<StereoTransform> {
        (*coordinate_system == STAGE).then_some(self.view)
    }
}

pub struct SimulatedFrame {
    device: Option<wgpu::Device>,
    poses: Vec<SimulatedPose>,
    result: Result<PresentResult, HostError>,
}

impl HolographicFrame for SimulatedFrame {
    type Pose = SimulatedPose;

    fn camera_poses(&self) -> &[SimulatedPose] {
        &self.poses
    }

    fn rendering_parameters(
        &self,
        pose: &SimulatedPose,
    ) -> Result<RenderingParameters, HostError> {
        let device = self
            .device
            .as_ref()
            .ok_or_else(|| HostError::Other("no device registered".into()))?;

        let back_buffer = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("simulated back buffer"),
            size: wgpu::Extent3d {
                width: EYE_SIZE,
                height: EYE_SIZE,
                depth_or_array_layers: pose.layers,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: BACK_BUFFER_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        Ok(RenderingParameters {
            back_buffer,
            depth_buffer: None,
        })
    }

    fn present(&self, _behavior: PresentWaitBehavior) -> Result<PresentResult, HostError> {
        self.result.clone()
    }
}

use std::sync::Arc;
use std::time::Duration;

use crate::camera::{CameraResourceMap, CameraResources, CameraTable};
use crate::device::{DeviceError, DeviceResources};
use crate::holographic::{
    CameraId, CameraPose, GpuFault, HolographicCamera, HolographicFrame, HolographicSpace,
    SpatialCoordinateSystem,
};

use super::{
    AvailabilitySignal, PresentCapabilities, PresentPhase, PresentStep, PresentationState,
    WaitStep,
};

/// Result of [`PresentationCoordinator::present`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PresentOutcome {
    Presented,
    /// The readiness wait failed; the frame was dropped.
    Skipped,
    /// The runtime connection was already closed; nothing happened.
    ConnectionClosed,
    /// The device was lost and has been recreated.
    Recovered,
}

/// Drives the per-frame pipeline and device-loss recovery.
///
/// Owns the device, the holographic space and the present state; shares the
/// camera map with the runtime's notification thread.
pub struct PresentationCoordinator<'n, S: HolographicSpace> {
    device: DeviceResources<'n>,
    cameras: Arc<CameraResourceMap>,
    availability: AvailabilitySignal,
    space: S,
    state: PresentationState,
    /// Observers were told of a loss and not yet of the restore.
    loss_notified: bool,
}

/// Recovery attempts while the runtime keeps reporting device loss.
const RECOVERY_ATTEMPTS: usize = 3;

impl<'n, S: HolographicSpace> PresentationCoordinator<'n, S> {
    /// Creates the device for `space` and registers it with the runtime.
    pub fn new(mut device: DeviceResources<'n>, space: S) -> Result<Self, DeviceError> {
        device.create_device_resources(space.primary_adapter_id())?;

        let state = PresentationState::new(PresentCapabilities::probe(&space));
        if state.capabilities().uses_legacy_wait() {
            log::info!("runtime has no head-start wait; using legacy present blocking");
        }

        let coordinator = Self {
            device,
            cameras: Arc::new(CameraResourceMap::new()),
            availability: AvailabilitySignal::new(),
            space,
            state,
            loss_notified: false,
        };
        coordinator.apply_device_to_space()?;
        Ok(coordinator)
    }

    /// Switches to a new holographic space, recreating the device for it.
    pub fn set_holographic_space(&mut self, space: S) -> Result<(), DeviceError> {
        self.cameras.release_all();
        self.space = space;
        self.device
            .create_device_resources(self.space.primary_adapter_id())?;
        self.state
            .reset(PresentCapabilities::probe(&self.space));
        self.apply_device_to_space()?;

        if self.loss_notified {
            self.loss_notified = false;
            self.device.notify_device_restored();
        }
        Ok(())
    }

    /// Runs `f` with exclusive access to the camera table.
    ///
    /// If `f` fails with a device-loss error, the lock is released first and
    /// full recovery runs; the call then returns `Ok(None)`. Other errors are
    /// returned unchanged. `f` must not call back into the camera map.
    ///
    /// While an earlier recovery is unfinished `f` is not run and the call
    /// returns `Ok(None)`.
    pub fn use_camera_resources<R, F>(&mut self, f: F) -> Result<Option<R>, DeviceError>
    where
        F: FnOnce(&DeviceResources<'n>, &mut CameraTable) -> Result<R, DeviceError>,
    {
        if self.state.phase() == PresentPhase::Lost {
            log::debug!("device lost; camera work skipped until recovery");
            return Ok(None);
        }

        let device = &self.device;
        let result = self.cameras.with_cameras(|cameras| f(device, cameras));

        // The camera lock is released here, before recovery takes it again.
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) => match err.device_fault() {
                Some(fault) => {
                    log::warn!("device lost while using camera resources: {err}");
                    self.state.on_device_lost(fault);
                    self.handle_device_lost()?;
                    Ok(None)
                }
                None => Err(err),
            },
        }
    }

    /// Acquires this frame's back buffer for every posed camera.
    ///
    /// Cameras the runtime has not announced yet are ignored; cameras whose
    /// back buffer cannot be used are skipped for this frame.
    pub fn ensure_camera_resources(&mut self, frame: &S::Frame) -> Result<(), DeviceError> {
        self.use_camera_resources(|device, cameras| {
            for pose in frame.camera_poses() {
                let id = pose.camera_id();
                let Some(camera) = cameras.get_mut(&id) else {
                    continue;
                };

                let prepared = frame
                    .rendering_parameters(pose)
                    .map_err(DeviceError::from)
                    .and_then(|parameters| {
                        camera.create_resources_for_back_buffer(device, &parameters)
                    });

                match prepared {
                    Ok(()) => {}
                    Err(err) if err.is_device_lost() => return Err(err),
                    Err(err) => {
                        log::warn!("camera {id}: skipped this frame: {err}");
                        camera.end_frame();
                    }
                }
            }
            Ok(())
        })?;
        Ok(())
    }

    /// Updates each posed camera's view-projection buffer and hands the
    /// cameras whose pose resolved to `draw`.
    ///
    /// Returns how many cameras were drawn. Zero while the device is lost.
    pub fn render_cameras<F>(
        &mut self,
        frame: &S::Frame,
        coordinate_system: &SpatialCoordinateSystem,
        mut draw: F,
    ) -> Result<usize, DeviceError>
    where
        F: FnMut(&DeviceResources<'n>, &mut CameraResources) -> Result<(), DeviceError>,
    {
        let drawn = self.use_camera_resources(|device, cameras| {
            let mut drawn = 0;
            for pose in frame.camera_poses() {
                let Some(camera) = cameras.get_mut(&pose.camera_id()) else {
                    continue;
                };
                if !camera.is_frame_pending()
                    || !camera.update_view_projection_buffer(device, pose, coordinate_system)
                {
                    continue;
                }

                let result = draw(device, camera);
                camera.end_frame();
                result?;
                drawn += 1;
            }
            Ok(drawn)
        })?;
        Ok(drawn.unwrap_or(0))
    }

    /// Presents `frame`, waiting for readiness first when required.
    pub fn present(&mut self, frame: &S::Frame) -> Result<PresentOutcome, DeviceError> {
        if self.availability.take_unavailable() {
            self.state.on_availability_changed(false);
        }

        if self.state.phase() == PresentPhase::Lost {
            // A previous recovery did not finish.
            self.handle_device_lost()?;
            return Ok(PresentOutcome::Recovered);
        }
        if let Some(fault) = self.device.device_fault() {
            return self.recover_from(fault);
        }

        let plan = self.state.plan_present();
        if plan.explicit_wait {
            let waited = self.space.wait_for_next_frame_ready(Duration::ZERO);
            match self.state.on_wait_complete(waited) {
                WaitStep::Proceed => {}
                WaitStep::Skip => return Ok(PresentOutcome::Skipped),
                WaitStep::Lost(fault) => return self.recover_from(fault),
            }
        }

        match self.state.on_present_result(frame.present(plan.behavior)) {
            PresentStep::Presented => Ok(PresentOutcome::Presented),
            PresentStep::ConnectionClosed => {
                log::debug!("present on a closed connection ignored");
                Ok(PresentOutcome::ConnectionClosed)
            }
            PresentStep::Lost(fault) => self.recover_from(fault),
        }
    }

    /// Recreates the device and every camera's back-buffer resources.
    ///
    /// Order: observers are told the device is lost, every camera releases
    /// its back buffer, the device is recreated on the runtime's preferred
    /// adapter and handed to the runtime, then observers are told it is back.
    /// Back buffers are rebuilt lazily by the next
    /// [`ensure_camera_resources`](Self::ensure_camera_resources).
    ///
    /// A loss reported while recovering restarts recovery. Any other failure
    /// is returned and leaves the coordinator lost; the next
    /// [`present`](Self::present) tries again. Observers see exactly one
    /// lost and one restored notification per loss either way.
    pub fn handle_device_lost(&mut self) -> Result<(), DeviceError> {
        if self.state.phase() != PresentPhase::Lost {
            self.state.on_device_lost(GpuFault::Removed);
        }
        if !self.loss_notified {
            self.device.notify_device_lost();
            self.loss_notified = true;
        }

        let mut attempt = 1;
        loop {
            match self.recreate_device() {
                Ok(()) => break,
                Err(err) if err.is_device_lost() && attempt < RECOVERY_ATTEMPTS => {
                    log::warn!("device lost again during recovery (attempt {attempt}): {err}");
                    attempt += 1;
                }
                Err(err) => {
                    log::error!("device recovery failed: {err}");
                    return Err(err);
                }
            }
        }

        self.state.on_recovered();
        self.loss_notified = false;
        self.device.notify_device_restored();
        Ok(())
    }

    /// Forwards the runtime's availability notification on the render thread.
    pub fn on_availability_changed(&mut self, available: bool) {
        self.state.on_availability_changed(available);
    }

    /// Forwards a "camera added" notification.
    pub fn on_camera_added(&self, camera: HolographicCamera) {
        self.cameras.add_camera(camera);
    }

    /// Forwards a "camera removed" notification.
    pub fn on_camera_removed(&self, camera: CameraId) {
        self.cameras.remove_camera(camera);
    }

    pub fn trim(&self) {
        self.device.trim();
    }

    /// Camera map, for the runtime's notification thread.
    pub fn cameras(&self) -> &Arc<CameraResourceMap> {
        &self.cameras
    }

    /// Availability signal, for the runtime's notification thread.
    pub fn availability_signal(&self) -> AvailabilitySignal {
        self.availability.clone()
    }

    pub fn device(&self) -> &DeviceResources<'n> {
        &self.device
    }

    pub fn space(&self) -> &S {
        &self.space
    }

    pub fn state(&self) -> &PresentationState {
        &self.state
    }

    pub fn phase(&self) -> PresentPhase {
        self.state.phase()
    }

    fn recover_from(&mut self, fault: GpuFault) -> Result<PresentOutcome, DeviceError> {
        log::warn!("present path reported {fault}; recovering");
        self.state.on_device_lost(fault);
        self.handle_device_lost()?;
        Ok(PresentOutcome::Recovered)
    }

    fn recreate_device(&mut self) -> Result<(), DeviceError> {
        let released = self.cameras.release_all();
        log::info!("device lost: released {released} camera(s); recreating device");

        self.device
            .create_device_resources(self.space.primary_adapter_id())?;
        self.apply_device_to_space()
    }

    fn apply_device_to_space(&self) -> Result<(), DeviceError> {
        let device = self.device.device().ok_or(DeviceError::NotCreated)?;
        let queue = self.device.context().ok_or(DeviceError::NotCreated)?;
        self.space.set_graphics_device(device, &queue)?;
        Ok(())
    }
}

mod content;
mod simulated;

use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, Result};

use holo_engine::camera::CameraResourceMap;
use holo_engine::device::{DeviceConfig, DeviceResources};
use holo_engine::holographic::{HolographicCamera, HolographicSpace};
use holo_engine::logging::{LoggingConfig, init_logging};
use holo_engine::present::{AvailabilitySignal, PresentOutcome, PresentationCoordinator};

use content::ClearRenderer;
use simulated::{CameraChange, STAGE, SimulatedSpace};

const FRAMES: u64 = 240;
const DEVICE_REMOVED_AT: u64 = 120;
const FRAME_TIME: Duration = Duration::from_millis(11);

const HEADSET: HolographicCamera = HolographicCamera {
    id: 1,
    is_stereo: true,
    is_opaque: true,
};

const SPECTATOR: HolographicCamera = HolographicCamera {
    id: 2,
    is_stereo: false,
    is_opaque: true,
};

#[derive(Debug, Default)]
struct Stats {
    presented: u64,
    skipped: u64,
    recovered: u64,
    cameras_drawn: usize,
}

fn main() -> Result<()> {
    init_logging(
        LoggingConfig::default().with_module("holo_engine::present", log::LevelFilter::Debug),
    );

    let content = ClearRenderer::new();
    let (changes, changes_rx) = mpsc::channel();

    let mut device = DeviceResources::new(DeviceConfig::default());
    device.register_device_notify(&content);

    let space = SimulatedSpace::new(changes_rx, Some(DEVICE_REMOVED_AT));
    let mut coordinator = PresentationCoordinator::new(device, space)
        .context("failed to create a GPU device for the simulated headset")?;

    let dispatch = spawn_dispatch(
        Arc::clone(coordinator.cameras()),
        coordinator.availability_signal(),
        changes,
    )?;

    let mut stats = Stats::default();
    for _ in 0..FRAMES {
        let frame = coordinator.space().create_next_frame();

        coordinator.ensure_camera_resources(&frame)?;
        stats.cameras_drawn += coordinator
            .render_cameras(&frame, &STAGE, |device, camera| content.draw(device, camera))?;

        match coordinator.present(&frame)? {
            PresentOutcome::Presented => stats.presented += 1,
            PresentOutcome::Skipped | PresentOutcome::ConnectionClosed => stats.skipped += 1,
            PresentOutcome::Recovered => stats.recovered += 1,
        }

        std::thread::sleep(FRAME_TIME);
    }

    coordinator.trim();
    dispatch
        .join()
        .map_err(|_| anyhow::anyhow!("runtime dispatch thread panicked"))?;

    log::info!(
        "done: {stats:?}, content generation {}",
        content.generation()
    );
    Ok(())
}

/// Plays the runtime's notification thread: cameras come and go and the
/// display briefly becomes unavailable, independent of the render loop.
fn spawn_dispatch(
    cameras: Arc<CameraResourceMap>,
    availability: AvailabilitySignal,
    changes: Sender<CameraChange>,
) -> Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("holo-dispatch".into())
        .spawn(move || {
            let tick = |frames: u64| std::thread::sleep(FRAME_TIME * frames as u32);
            let publish = |change| {
                if changes.send(change).is_err() {
                    log::debug!("render loop gone; dropping camera change");
                }
            };

            cameras.add_camera(HEADSET);
            publish(CameraChange::Added(HEADSET));

            tick(30);
            cameras.add_camera(SPECTATOR);
            publish(CameraChange::Added(SPECTATOR));

            tick(30);
            availability.notify(false);
            tick(5);
            availability.notify(true);

            tick(100);
            publish(CameraChange::Removed(SPECTATOR.id));
            cameras.remove_camera(SPECTATOR.id);
        })
        .context("failed to spawn the runtime dispatch thread")
}

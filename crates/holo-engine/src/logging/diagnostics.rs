/// Logs the adapter a device is about to be created on.
pub(crate) fn log_adapter(info: &wgpu::AdapterInfo, software: bool) {
    let kind = if software { "software" } else { "hardware" };
    log::info!(
        "{kind} adapter: {} ({:?}, {:?}) vendor={:#06x} device={:#06x} driver=\"{} {}\"",
        info.name,
        info.backend,
        info.device_type,
        info.vendor,
        info.device,
        info.driver,
        info.driver_info,
    );
}

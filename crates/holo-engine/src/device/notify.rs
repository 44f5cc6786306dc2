/// Observer of device loss and restoration.
///
/// Implemented by whichever component owns the [`DeviceResources`]
/// (typically the application's main object) so content renderers can drop
/// and rebuild their GPU objects.
///
/// [`DeviceResources`]: super::DeviceResources
pub trait DeviceNotify {
    /// The device is about to be torn down; release everything created on it.
    fn on_device_lost(&self);

    /// A new device is ready; recreate device-dependent resources.
    fn on_device_restored(&self);
}

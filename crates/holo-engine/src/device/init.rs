/// Capability tier requested from an adapter, highest first.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum FeatureLevel {
    /// Full WebGPU limits.
    Full,
    /// Downlevel limits (older desktop GPUs, software rasterizers).
    Downlevel,
    /// WebGL2-class limits; last resort.
    Compatibility,
}

impl FeatureLevel {
    /// Every level, in descending order of capability.
    pub const ALL: [FeatureLevel; 3] = [
        FeatureLevel::Full,
        FeatureLevel::Downlevel,
        FeatureLevel::Compatibility,
    ];

    pub fn limits(self) -> wgpu::Limits {
        match self {
            FeatureLevel::Full => wgpu::Limits::default(),
            FeatureLevel::Downlevel => wgpu::Limits::downlevel_defaults(),
            FeatureLevel::Compatibility => wgpu::Limits::downlevel_webgl2_defaults(),
        }
    }
}

/// Device creation parameters.
///
/// Defaults match a head-mounted display: high-performance adapter, all
/// feature levels, software fallback allowed.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Backends the instance may use.
    pub backends: wgpu::Backends,

    /// Adapter preference when the runtime names none.
    pub power_preference: wgpu::PowerPreference,

    /// Feature levels to try, in order. An empty list means
    /// [`FeatureLevel::ALL`].
    pub feature_levels: Vec<FeatureLevel>,

    /// Retry on a software adapter when no hardware device can be created.
    pub allow_software_fallback: bool,

    /// Request multiview (single-pass stereo without a geometry stage) when offered.
    pub request_vprt: bool,

    pub memory_hints: wgpu::MemoryHints,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            feature_levels: FeatureLevel::ALL.to_vec(),
            allow_software_fallback: true,
            request_vprt: true,
            memory_hints: wgpu::MemoryHints::Performance,
        }
    }
}

impl DeviceConfig {
    /// Levels device creation walks, highest first.
    pub fn levels(&self) -> &[FeatureLevel] {
        if self.feature_levels.is_empty() {
            &FeatureLevel::ALL
        } else {
            &self.feature_levels
        }
    }
}

use std::sync::Once;

use log::LevelFilter;

/// Logger setup for hosts embedding the engine.
///
/// Filter precedence: `env_filter`, then `RUST_LOG`, then `default_level`
/// with the GPU stack clamped to `gpu_stack_level`. `module_levels` are
/// applied last and always win.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub default_level: LevelFilter,
    pub gpu_stack_level: LevelFilter,
    pub module_levels: Vec<(String, LevelFilter)>,
    /// Millisecond timestamps help line up present and recovery events.
    pub millis: bool,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            default_level: LevelFilter::Info,
            gpu_stack_level: LevelFilter::Warn,
            module_levels: Vec::new(),
            millis: true,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

impl LoggingConfig {
    /// Sets the level for one module path (e.g. `holo_engine::present`).
    pub fn with_module(mut self, module: impl Into<String>, level: LevelFilter) -> Self {
        self.module_levels.push((module.into(), level));
        self
    }
}

/// wgpu and its shader compiler log heavily at info.
const GPU_STACK: [&str; 4] = ["wgpu", "wgpu_core", "wgpu_hal", "naga"];

static INIT: Once = Once::new();

/// Installs the global logger. Only the first call has an effect, and a
/// logger installed by the host beforehand is left in place.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let env = std::env::var("RUST_LOG").ok();
        let mut builder = builder_for(&config, env.as_deref());

        if builder.try_init().is_ok() {
            log::debug!("logging initialized");
        }
    });
}

fn builder_for(config: &LoggingConfig, env: Option<&str>) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();

    match config.env_filter.as_deref().or(env) {
        Some(filter) => {
            builder.parse_filters(filter);
        }
        None => {
            builder.filter_level(config.default_level);
            for module in GPU_STACK {
                builder.filter_module(module, config.gpu_stack_level);
            }
        }
    }

    for (module, level) in &config.module_levels {
        builder.filter_module(module, *level);
    }

    if config.millis {
        builder.format_timestamp_millis();
    }
    builder.write_style(config.write_style);
    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── default filters ───────────────────────────────────────────────────

    #[test]
    fn gpu_stack_is_quiet_by_default() {
        let logger = builder_for(&LoggingConfig::default(), None).build();
        assert_eq!(logger.filter(), LevelFilter::Info);

        let meta = log::MetadataBuilder::new()
            .target("wgpu_core::device")
            .level(log::Level::Info)
            .build();
        assert!(!log::Log::enabled(&logger, &meta));

        let warn = log::MetadataBuilder::new()
            .target("wgpu_core::device")
            .level(log::Level::Warn)
            .build();
        assert!(log::Log::enabled(&logger, &warn));
    }

    // ── precedence ────────────────────────────────────────────────────────

    #[test]
    fn explicit_filter_beats_environment() {
        let config = LoggingConfig {
            env_filter: Some("error".into()),
            ..LoggingConfig::default()
        };
        let logger = builder_for(&config, Some("trace")).build();
        assert_eq!(logger.filter(), LevelFilter::Error);
    }

    #[test]
    fn environment_used_when_no_explicit_filter() {
        let logger = builder_for(&LoggingConfig::default(), Some("debug")).build();
        assert_eq!(logger.filter(), LevelFilter::Debug);
    }

    #[test]
    fn module_override_applies_on_top() {
        let config = LoggingConfig::default().with_module("holo_engine::present", LevelFilter::Trace);
        let logger = builder_for(&config, None).build();

        let meta = log::MetadataBuilder::new()
            .target("holo_engine::present::coordinator")
            .level(log::Level::Trace)
            .build();
        assert!(log::Log::enabled(&logger, &meta));
    }
}

use std::io::Write as _;
use std::sync::Once;
use std::thread;

/// Logger configuration.
///
/// `env_filter` uses `env_logger` filter syntax, e.g.
/// "gpuview::surface=debug,wgpu=warn". Without it `RUST_LOG` applies, and
/// without that info level with wgpu capped at warn.
///
/// `worker_diagnostics` raises every `gpuview::*` area except
/// `gpuview::draw` to debug on top of the filter. `thread_names` prefixes
/// each line with the emitting thread (`gpu-worker-N` for workers).
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
    pub worker_diagnostics: bool,
    pub thread_names: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
            worker_diagnostics: false,
            thread_names: true,
        }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once; later calls are ignored.
///
/// Call it before creating a surface view so worker start-up is captured.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        apply_filters(&mut builder, &config);

        if config.thread_names {
            builder.format(|buf, record| {
                let current = thread::current();
                writeln!(
                    buf,
                    "[{} {:<5} {}] {}",
                    current.name().unwrap_or("<unnamed>"),
                    record.level(),
                    record.target(),
                    record.args()
                )
            });
        }

        builder.write_style(config.write_style);
        builder.init();

        log::debug!(target: super::THREADS, "logging initialized");
    });
}

fn apply_filters(builder: &mut env_logger::Builder, config: &LoggingConfig) {
    match config.env_filter.clone().or_else(|| std::env::var("RUST_LOG").ok()) {
        Some(filter) => {
            builder.parse_filters(&filter);
        }
        None => {
            builder
                .filter_level(log::LevelFilter::Info)
                .filter_module("wgpu_core", log::LevelFilter::Warn)
                .filter_module("wgpu_hal", log::LevelFilter::Warn);
        }
    }

    if config.worker_diagnostics {
        for target in [
            super::THREADS,
            super::PAUSE_RESUME,
            super::SURFACE,
            super::RENDERER,
            super::API,
            super::ATTACH,
        ] {
            builder.filter_module(target, log::LevelFilter::Debug);
        }
    }
}

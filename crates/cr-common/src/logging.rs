use std::panic;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const DEFAULT_FILTER: &str = "info";

/// Where and how the process logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `CR_LOG_DIR`: directory for daily-rotated `<app>.log` files. Stdout when unset.
    pub dir: Option<PathBuf>,
    /// `CR_LOG_INCLUDE_BACKTRACE`: also run the default panic hook after logging.
    pub include_backtrace: bool,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self {
            dir: std::env::var_os("CR_LOG_DIR")
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
            include_backtrace: std::env::var("CR_LOG_INCLUDE_BACKTRACE")
                .map(|value| is_truthy(&value))
                .unwrap_or(false),
        }
    }
}

fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes")
}

/// Routes panics through `tracing` with thread and source location. Installed once.
pub fn install_tracing_panic_hook(app_name: &'static str, include_backtrace: bool) {
    static INSTALLED: OnceLock<()> = OnceLock::new();

    INSTALLED.get_or_init(|| {
        let default_hook = panic::take_hook();

        panic::set_hook(Box::new(move |info| {
            let thread = std::thread::current();
            let thread_name = thread.name().unwrap_or("unknown");
            let location = info
                .location()
                .map(|loc| format!("{}:{}", loc.file(), loc.line()));
            let message = info
                .payload()
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| info.payload().downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".into());

            tracing::error!(
                application = app_name,
                %thread_name,
                location = location.as_deref().unwrap_or("unknown"),
                panic_message = %message,
                "panic captured"
            );

            if include_backtrace {
                default_hook(info);
            }
        }));
    });
}

fn file_writer(app_name: &'static str, dir: &Path) -> Option<BoxMakeWriter> {
    if let Err(err) = std::fs::create_dir_all(dir) {
        eprintln!("{app_name}: cannot create log dir {}: {err}; logging to stdout", dir.display());
        return None;
    }

    let appender = tracing_appender::rolling::daily(dir, format!("{app_name}.log"));
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    Some(BoxMakeWriter::new(non_blocking))
}

/// Installs the global subscriber (filtered by `RUST_LOG`, default `info`)
/// and the panic hook. Later calls are no-ops.
pub fn init_tracing_subscriber(app_name: &'static str, config: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);

    let writer = config
        .dir
        .as_ref()
        .and_then(|dir| file_writer(app_name, dir));
    let _ = match writer {
        Some(writer) => builder.with_ansi(false).with_writer(writer).try_init(),
        None => builder.try_init(),
    };

    install_tracing_panic_hook(app_name, config.include_backtrace);
}

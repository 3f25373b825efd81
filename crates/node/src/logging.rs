//! Logging setup of the ringlet binary.
use backtrace::Backtrace;
use clap::ValueEnum;
use tracing::Level;
use tracing_log::LogTracer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;
use tracing_subscriber::Registry;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(val: LogLevel) -> Self {
        match val {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Record panics as `ERROR` events, with the location and a backtrace.
pub fn set_panic_hook() {
    std::panic::set_hook(Box::new(|panic| {
        let backtrace = Backtrace::new();
        match panic.location() {
            Some(l) => tracing::error!(
                "{} at {}:{}:{}\n\n{:?}",
                panic,
                l.file(),
                l.line(),
                l.column(),
                backtrace
            ),
            None => tracing::error!("{}\n\n{:?}", panic, backtrace),
        }
    }));
}

/// Install the stderr subscriber. Safe to call more than once; only the
/// first call takes effect.
pub fn init_logging(level: LogLevel) {
    set_panic_hook();

    let subscriber = Registry::default().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(LevelFilter::from_level(level.into())),
    );

    // Route `log` records of dependencies through tracing.
    let _ = LogTracer::init();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

//! Log level handling. Components never touch global logger state: each one
//! takes a [`Span`] at construction and emits its events under it, and the
//! binary decides which subscriber (and level) receives them.

use tracing::{level_filters::LevelFilter, Span};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Silent,
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    /// Unknown names fall back to `Warn`; the flag tells the caller to say so.
    pub fn parse_lenient(name: &str) -> (Self, bool) {
        match name.trim().to_ascii_lowercase().as_str() {
            "silent" | "off" => (LogLevel::Silent, true),
            "error" => (LogLevel::Error, true),
            "warn" | "warning" => (LogLevel::Warn, true),
            "info" => (LogLevel::Info, true),
            "debug" => (LogLevel::Debug, true),
            _ => (LogLevel::Warn, false),
        }
    }

    pub fn filter(self) -> LevelFilter {
        match self {
            LogLevel::Silent => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
        }
    }
}

/// Subscriber for a binary: `RUST_LOG` wins when set, otherwise `level`.
pub fn subscriber(level: LogLevel) -> impl tracing::Subscriber + Send + Sync {
    let filter = EnvFilter::builder()
        .with_default_directive(level.filter().into())
        .from_env_lossy();
    Registry::default().with(filter).with(fmt::layer().with_target(false))
}

/// Logger handle for one pipeline component.
pub fn component_span(component: &'static str) -> Span {
    tracing::info_span!("gt", component)
}

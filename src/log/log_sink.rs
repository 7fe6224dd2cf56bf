use crate::log::log_level::LogLevel;

/// Anything that can accept a formatted log line.
///
/// Every server and client component holds an `Arc<dyn LogSink>`.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, msg: &str, target: &'static str);
}

use crate::log::{log_level::LogLevel, log_sink::LogSink};

/// Discards everything. Used by constructors that take no logger and by
/// tests that don't care about output.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogSink;

impl LogSink for NoopLogSink {
    #[inline]
    fn log(&self, _level: LogLevel, _msg: &str, _target: &'static str) {}
}

use crate::log::log_level::LogLevel;

/// A single log line travelling from a producer to the logger worker.
#[derive(Debug, Clone)]
pub struct LogMsg {
    pub level: LogLevel,
    /// Milliseconds since the UNIX epoch.
    pub ts_ms: u128,
    pub text: String,
    /// Usually `module_path!()` of the caller.
    pub target: &'static str,
}

impl LogMsg {
    pub fn new(
        level: LogLevel,
        text: impl Into<String>,
        target: &'static str,
        ts_ms: u128,
    ) -> Self {
        Self {
            level,
            ts_ms,
            text: text.into(),
            target,
        }
    }

    /// Line format used by the file writer.
    pub fn render(&self) -> String {
        format!(
            "[{}] {} | {} | {}",
            self.level, self.ts_ms, self.target, self.text
        )
    }
}

use std::sync::Mutex;

use crate::log::{log_level::LogLevel, log_msg::LogMsg, log_sink::LogSink, now_millis};

/// Keeps every line in memory. Meant for tests that assert on what got logged.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    lines: Mutex<Vec<LogMsg>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything logged so far.
    pub fn lines(&self) -> Vec<LogMsg> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// True if some line at `level` contains `needle`.
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.lines
            .lock()
            .map(|l| l.iter().any(|m| m.level == level && m.text.contains(needle)))
            .unwrap_or(false)
    }
}

impl LogSink for MemoryLogSink {
    fn log(&self, level: LogLevel, msg: &str, target: &'static str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(LogMsg::new(level, msg, target, now_millis()));
        }
    }
}

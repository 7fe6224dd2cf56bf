use crate::{
    config::Config,
    log::{log_level::LogLevel, log_msg::LogMsg, logger_handle::LoggerHandle},
};

use std::{
    fs::{self, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    sync::{
        Arc,
        mpsc::{self, TrySendError},
    },
    thread,
    time::{SystemTime, UNIX_EPOCH},
};

/// Flush every N lines when debugging, so a crash leaves a useful tail.
#[cfg(feature = "log-debug")]
const FLUSH_BATCH_SIZE: u32 = 100;

#[cfg(not(feature = "log-debug"))]
const FLUSH_BATCH_SIZE: u32 = 1_000;

const DEFAULT_SERVER_LOG_NAME: &str = "meshroom-server";

/// Bounded, non-blocking logger that writes to a per-process log file.
///
/// Producers enqueue through [`LoggerHandle`]s; a dedicated `logger-worker`
/// thread drains the queue, appends to the file, flushes in batches and
/// optionally mirrors every line to stderr. Warnings and errors are always
/// flushed immediately.
pub struct Logger {
    handle: LoggerHandle,
    _thread: Option<thread::JoinHandle<()>>,
    file_path: PathBuf,
}

impl Logger {
    /// Starts the server logger using the `[Logging]` section of `config`:
    /// `server_log_path`, `server_log_filename` and `stderr`.
    #[must_use]
    pub fn start_server(cap: usize, config: Arc<Config>) -> Self {
        let app_name = config
            .get_non_empty("Logging", "server_log_filename")
            .unwrap_or(DEFAULT_SERVER_LOG_NAME);
        let mirror = config
            .get_bool("Logging", "stderr")
            .ok()
            .flatten()
            .unwrap_or(true);

        let dir = config
            .get_non_empty("Logging", "server_log_path")
            .map(expand_path)
            .unwrap_or_else(|| exe_dir_fallback_cwd().join("logs"));

        Self::start_in_dir(dir, Some(app_name), cap, mirror)
    }

    /// Starts the logger in `dir`, creating it if missing.
    ///
    /// The file is named `<app_name>-<unix secs>-pid<pid>.log`.
    pub fn start_in_dir<D: AsRef<Path>>(
        dir: D,
        app_name: Option<&str>,
        cap: usize,
        mirror_stderr: bool,
    ) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let _ = fs::create_dir_all(&dir);

        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let pid = std::process::id();
        let fname = match app_name {
            Some(name) => format!("{name}-{secs}-pid{pid}.log"),
            None => format!("{secs}-pid{pid}.log"),
        };
        let file_path = dir.join(fname);

        let (tx, rx) = mpsc::sync_channel::<LogMsg>(cap.max(1));
        let handle = LoggerHandle { tx };
        let path_for_worker = file_path.clone();

        let _thread = thread::Builder::new()
            .name("logger-worker".into())
            .spawn(move || {
                // Target file -> temp file -> sink; the worker never panics.
                let writer: Box<dyn Write + Send> = match OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path_for_worker)
                {
                    Ok(f) => Box::new(f),
                    Err(_) => {
                        let fallback = std::env::temp_dir().join("meshroom-fallback.log");
                        match OpenOptions::new().create(true).append(true).open(&fallback) {
                            Ok(f) => Box::new(f),
                            Err(_) => Box::new(io::sink()),
                        }
                    }
                };
                let mut out = BufWriter::new(writer);
                let mut lines_written: u32 = 0;

                while let Ok(m) = rx.recv() {
                    let line = m.render();
                    let _ = writeln!(&mut out, "{line}");
                    if mirror_stderr {
                        eprintln!("{line}");
                    }

                    lines_written = lines_written.wrapping_add(1);
                    let urgent = matches!(m.level, LogLevel::Warn | LogLevel::Error);
                    if urgent || lines_written.is_multiple_of(FLUSH_BATCH_SIZE) {
                        let _ = out.flush();
                    }
                }

                let _ = out.flush();
            })
            .ok();

        Self {
            handle,
            _thread,
            file_path,
        }
    }

    /// Enqueues a line without blocking; dropped if the queue is full.
    pub fn try_log<S: Into<String>>(
        &self,
        level: LogLevel,
        text: S,
        target: &'static str,
    ) -> Result<(), TrySendError<LogMsg>> {
        self.handle.try_log(level, text, target)
    }

    /// Cloneable handle for passing into components as an `Arc<dyn LogSink>`.
    #[must_use]
    pub fn handle(&self) -> LoggerHandle {
        self.handle.clone()
    }

    #[must_use]
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

/// Directory of the running executable, or the current directory.
fn exe_dir_fallback_cwd() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Expands a leading `~` to the user's home directory.
fn expand_path(path_str: &str) -> PathBuf {
    if let Some(rest) = path_str.strip_prefix('~') {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .ok()
            .map(PathBuf::from);

        if let Some(mut home_path) = home {
            if rest.is_empty() {
                return home_path;
            }
            if let Some(tail) = rest.strip_prefix('/').or_else(|| rest.strip_prefix('\\')) {
                home_path.push(tail);
                return home_path;
            }
        }
    }
    PathBuf::from(path_str)
}

use std::sync::Arc;
use std::{env, io, process};

use meshroom::config::Config;
use meshroom::log::LogSink;
use meshroom::log::logger::Logger;
use meshroom::signaling::{SignalingServer, SignalingSettings};

const DEFAULT_CONFIG_PATH: &str = "server_meshroom.conf";
const LOG_QUEUE_CAP: usize = 4096;

fn main() -> io::Result<()> {
    // --- Parse CLI args ----------------------------------------------------
    //
    // Supported:
    //   meshroom-server                      -> ./server_meshroom.conf, or defaults
    //   meshroom-server my.conf              -> settings from my.conf
    //   meshroom-server my.conf 0.0.0.0:6000 -> same, overriding bind_addr
    let args: Vec<String> = env::args().collect();

    let (config_path, addr_override) = match args.len() {
        1 => (DEFAULT_CONFIG_PATH, None),
        2 => (args[1].as_str(), None),
        3 => (args[1].as_str(), Some(args[2].clone())),
        _ => {
            eprintln!("Usage:");
            eprintln!("  {}                  # ./{DEFAULT_CONFIG_PATH} or defaults", args[0]);
            eprintln!("  {} [CONFIG]         # e.g. server.conf", args[0]);
            eprintln!("  {} [CONFIG] [ADDR]  # e.g. server.conf 0.0.0.0:6000", args[0]);
            process::exit(2);
        }
    };

    let config = match Config::load(config_path) {
        Ok(c) => c,
        // a missing default config is fine; an explicit one must load
        Err(e) if args.len() == 1 => {
            eprintln!("[meshroom-server] {e}; using built-in defaults");
            Config::empty()
        }
        Err(e) => return Err(io::Error::other(e)),
    };

    let mut settings = SignalingSettings::from_config(&config).map_err(io::Error::other)?;
    if let Some(addr) = addr_override {
        settings.bind_addr = addr;
    }

    // --- Logging -------------------------------------------------------------
    let logger = Logger::start_server(LOG_QUEUE_CAP, Arc::new(config));
    let log_sink: Arc<dyn LogSink> = Arc::new(logger.handle());
    eprintln!(
        "[meshroom-server] starting on {} (log file {})",
        settings.bind_addr,
        logger.file_path().display()
    );

    // --- Run signaling server (blocks) -------------------------------------
    let server = SignalingServer::bind(&settings, log_sink)?;
    server.run()
}

use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, mpsc};
use std::{io, thread};

use rustls::ServerConfig;

use crate::log::{LogSink, NoopLogSink};
use crate::signaling::room_directory::RoomDirectory;
use crate::signaling::router::Router;
use crate::signaling::runtime::run_server_loop;
use crate::signaling::server_engine::ServerEngine;
use crate::signaling::server_event::ServerEvent;
use crate::signaling::settings::SignalingSettings;
use crate::signaling::stream_io::ConnectionIo;
use crate::signaling::tls::build_signaling_server_config;
use crate::signaling::transport::spawn_connection_threads;
use crate::signaling::types::ClientId;
use crate::{sink_info, sink_warn};

/// Top-level runtime object for the signaling service.
///
/// This owns:
/// - the bound listener
/// - logging sink
/// - room directory and session limit
/// - optional TLS config
///
/// and knows how to spin up the central Router+Engine loop plus
/// per-connection threads.
pub struct SignalingServer {
    listener: TcpListener,
    log: Arc<dyn LogSink>,
    max_sessions: usize,
    directory: Box<dyn RoomDirectory>,
    tls: Option<Arc<ServerConfig>>,
}

impl SignalingServer {
    /// Binds the listener and loads TLS material if configured.
    pub fn bind(settings: &SignalingSettings, log: Arc<dyn LogSink>) -> io::Result<Self> {
        let listener = TcpListener::bind(&settings.bind_addr)?;
        let tls = match &settings.tls {
            Some(t) => Some(build_signaling_server_config(&t.cert_path, &t.key_path)?),
            None => None,
        };
        Ok(Self {
            listener,
            log,
            max_sessions: settings.max_sessions,
            directory: settings.room_directory(),
            tls,
        })
    }

    /// Plain TCP on `addr`, default limits, no logging. Handy in tests.
    pub fn bind_plain(addr: &str) -> io::Result<Self> {
        let settings = SignalingSettings {
            bind_addr: addr.to_owned(),
            ..SignalingSettings::default()
        };
        Self::bind(&settings, Arc::new(NoopLogSink))
    }

    pub fn with_directory(mut self, directory: Box<dyn RoomDirectory>) -> Self {
        self.directory = directory;
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Blocking main loop: spawn the central server loop, accept clients.
    pub fn run(self) -> io::Result<()> {
        let Self {
            listener,
            log,
            max_sessions,
            directory,
            tls,
        } = self;

        // Events from all connections → central server loop
        let (server_tx, server_rx) = mpsc::channel::<ServerEvent>();

        {
            let log_for_loop = log.clone();
            let engine = ServerEngine::with_parts(log.clone(), max_sessions, directory);
            thread::Builder::new()
                .name("signaling-loop".into())
                .spawn(move || {
                    sink_info!(log_for_loop, "[signaling] server loop started");
                    run_server_loop(Router::with_engine(engine), log_for_loop, server_rx);
                })?;
        }

        let mut next_client_id: ClientId = 1;
        sink_info!(
            log,
            "signaling server listening on {} ({})",
            listener.local_addr()?,
            if tls.is_some() { "tls" } else { "plain tcp" }
        );

        for stream in listener.incoming() {
            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    sink_warn!(
                        log,
                        "incoming TCP accept failed: {:?} (continuing to accept)",
                        e
                    );
                    continue;
                }
            };

            let client_id = next_client_id;
            next_client_id += 1;

            let peer = stream
                .peer_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| "?".into());
            sink_info!(log, "accepted connection from {} as client_id={}", peer, client_id);

            match &tls {
                // the handshake can stall, so it runs off the accept loop
                Some(cfg) => {
                    let (cfg, server_tx, conn_log) = (cfg.clone(), server_tx.clone(), log.clone());
                    let spawned = thread::Builder::new()
                        .name(format!("conn-{client_id}-tls"))
                        .spawn(move || {
                            let res = ConnectionIo::server_tls(stream, cfg).and_then(|io| {
                                spawn_connection_threads(client_id, io, server_tx, conn_log.clone())
                            });
                            if let Err(e) = res {
                                sink_warn!(conn_log, "TLS setup for client {} failed: {}", client_id, e);
                            }
                        });
                    if let Err(e) = spawned {
                        sink_warn!(log, "failed to spawn TLS setup for client {}: {}", client_id, e);
                    }
                }
                None => {
                    let spawned = ConnectionIo::plain(stream).and_then(|io| {
                        spawn_connection_threads(client_id, io, server_tx.clone(), log.clone())
                    });
                    if let Err(e) = spawned {
                        sink_warn!(
                            log,
                            "failed to set up connection for client {}: {:?}",
                            client_id,
                            e
                        );
                    }
                }
            }
        }

        Ok(())
    }
}

use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::thread;

use crate::log::LogSink;
use crate::signaling::protocol::{FrameError, SignalingMsg, read_msg, write_msg};
use crate::signaling::server_event::ServerEvent;
use crate::signaling::stream_io::ConnectionIo;
use crate::signaling::types::ClientId;
use crate::{sink_debug, sink_warn};

/// Spawn reader + writer threads for a single client connection.
///
/// `server_tx` is the Sender<ServerEvent> that talks to the central server
/// loop. The writer closes the socket when the loop drops its sender, so a
/// client the loop refuses is disconnected without extra bookkeeping.
pub fn spawn_connection_threads(
    client_id: ClientId,
    io: ConnectionIo,
    server_tx: Sender<ServerEvent>,
    log: Arc<dyn LogSink>,
) -> std::io::Result<()> {
    let ConnectionIo {
        mut reader,
        mut writer,
        closer,
    } = io;
    let (to_client_tx, to_client_rx) = mpsc::channel::<SignalingMsg>();

    server_tx
        .send(ServerEvent::RegisterClient {
            client_id,
            to_client: to_client_tx,
        })
        .map_err(|_| std::io::Error::other("server loop is gone"))?;

    // READER THREAD: socket -> ServerEvent::MsgFromClient
    {
        let server_tx = server_tx.clone();
        let log = log.clone();
        thread::Builder::new()
            .name(format!("conn-{client_id}-rx"))
            .spawn(move || {
                loop {
                    match read_msg(&mut reader) {
                        Ok(msg) => {
                            if server_tx
                                .send(ServerEvent::MsgFromClient { client_id, msg })
                                .is_err()
                            {
                                break;
                            }
                        }
                        Err(e) if e.is_recoverable() => {
                            if server_tx
                                .send(ServerEvent::Malformed {
                                    client_id,
                                    error: e.to_string(),
                                })
                                .is_err()
                            {
                                break;
                            }
                        }
                        Err(e) => {
                            match &e {
                                FrameError::Io(io_e) => sink_debug!(
                                    log,
                                    "[conn {}] reader closed: {} (kind={:?})",
                                    client_id,
                                    io_e,
                                    io_e.kind()
                                ),
                                other => sink_warn!(
                                    log,
                                    "[conn {}] fatal frame error: {}",
                                    client_id,
                                    other
                                ),
                            }
                            let _ = server_tx.send(ServerEvent::Disconnected { client_id });
                            break;
                        }
                    }
                }
            })?;
    }

    // WRITER THREAD: to_client_rx -> socket
    {
        thread::Builder::new()
            .name(format!("conn-{client_id}-tx"))
            .spawn(move || {
                while let Ok(msg) = to_client_rx.recv() {
                    match write_msg(&mut writer, &msg) {
                        Ok(()) => {}
                        // nothing reached the socket; the stream is still usable
                        Err(FrameError::Proto(e)) => {
                            sink_warn!(
                                log,
                                "[conn {}] dropping unencodable {}: {}",
                                client_id,
                                msg.name(),
                                e
                            );
                        }
                        Err(e) => {
                            sink_warn!(log, "[conn {}] error sending {}: {}", client_id, msg.name(), e);
                            let _ = server_tx.send(ServerEvent::Disconnected { client_id });
                            break;
                        }
                    }
                }
                ConnectionIo::close(&closer);
            })?;
    }

    Ok(())
}

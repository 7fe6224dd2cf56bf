use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use rustls::ClientConfig;

use crate::log::{LogSink, NoopLogSink};
use crate::signaling::protocol::{FrameError, SignalingMsg, read_msg, write_msg};
use crate::signaling::stream_io::ConnectionIo;
use crate::signaling_client::signal_transport::SignalTransport;
use crate::signaling_client::signaling_command::SignalingCommand;
use crate::signaling_client::{SignalingClientError, SignalingEvent};
use crate::{sink_debug, sink_info, sink_warn};

/// Blocking-IO signaling client driven through channels.
///
/// A writer thread drains [`SignalingCommand`]s onto the socket and a reader
/// thread turns incoming frames into [`SignalingEvent`]s. Dropping the client
/// closes the connection.
pub struct SignalingClient {
    cmd_tx: Sender<SignalingCommand>,
    event_rx: Receiver<SignalingEvent>,
}

impl SignalingClient {
    /// Plain TCP connection to a signaling server.
    pub fn connect<A: ToSocketAddrs>(
        addr: A,
        log: Arc<dyn LogSink>,
    ) -> Result<Self, SignalingClientError> {
        let stream = TcpStream::connect(addr)?;
        Self::start(ConnectionIo::plain(stream)?, log)
    }

    /// TLS connection; `server_name` must match the server certificate.
    pub fn connect_tls<A: ToSocketAddrs>(
        addr: A,
        server_name: &str,
        config: Arc<ClientConfig>,
        log: Arc<dyn LogSink>,
    ) -> Result<Self, SignalingClientError> {
        let stream = TcpStream::connect(addr)?;
        Self::start(ConnectionIo::client_tls(stream, config, server_name)?, log)
    }

    /// Plain TCP with no logging.
    pub fn connect_no_log<A: ToSocketAddrs>(addr: A) -> Result<Self, SignalingClientError> {
        Self::connect(addr, Arc::new(NoopLogSink))
    }

    fn start(io: ConnectionIo, log: Arc<dyn LogSink>) -> Result<Self, SignalingClientError> {
        let ConnectionIo {
            mut reader,
            mut writer,
            closer,
        } = io;
        let (cmd_tx, cmd_rx) = mpsc::channel::<SignalingCommand>();
        let (event_tx, event_rx) = mpsc::channel::<SignalingEvent>();

        {
            let log = log.clone();
            thread::Builder::new()
                .name("signaling-client-rx".into())
                .spawn(move || {
                    loop {
                        let event = match read_msg(&mut reader) {
                            Ok(msg) => SignalingEvent::Msg(msg),
                            Err(e) if e.is_recoverable() => {
                                sink_warn!(log, "[signaling] bad frame from server: {}", e);
                                SignalingEvent::Error(e.to_string())
                            }
                            Err(e) => {
                                sink_debug!(log, "[signaling] reader stopped: {}", e);
                                let _ = event_tx.send(SignalingEvent::Disconnected);
                                break;
                            }
                        };
                        if event_tx.send(event).is_err() {
                            break;
                        }
                    }
                })?;
        }

        thread::Builder::new()
            .name("signaling-client-tx".into())
            .spawn(move || {
                while let Ok(cmd) = cmd_rx.recv() {
                    match cmd {
                        SignalingCommand::Send(msg) => match write_msg(&mut writer, &msg) {
                            Ok(()) => {}
                            Err(FrameError::Proto(e)) => {
                                sink_warn!(log, "[signaling] dropping unencodable {}: {}", msg.name(), e);
                            }
                            Err(e) => {
                                sink_warn!(log, "[signaling] failed to send {}: {}", msg.name(), e);
                                break;
                            }
                        },
                        SignalingCommand::Disconnect => {
                            sink_info!(log, "[signaling] disconnecting");
                            break;
                        }
                    }
                }
                ConnectionIo::close(&closer);
            })?;

        let client = Self { cmd_tx, event_rx };
        client.send(SignalingMsg::Hello {
            client_version: env!("CARGO_PKG_VERSION").to_owned(),
        })?;
        Ok(client)
    }

    pub fn send(&self, msg: SignalingMsg) -> Result<(), SignalingClientError> {
        self.cmd_tx
            .send(SignalingCommand::Send(msg))
            .map_err(|_| SignalingClientError::Disconnected)
    }

    pub fn try_recv(&self) -> Option<SignalingEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<SignalingEvent, SignalingClientError> {
        self.event_rx.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => SignalingClientError::Timeout,
            RecvTimeoutError::Disconnected => SignalingClientError::Disconnected,
        })
    }

    /// Asks the writer to close the connection. Pending sends go out first.
    pub fn disconnect(&self) {
        let _ = self.cmd_tx.send(SignalingCommand::Disconnect);
    }
}

impl SignalTransport for SignalingClient {
    fn send(&self, msg: SignalingMsg) -> Result<(), SignalingClientError> {
        SignalingClient::send(self, msg)
    }

    fn try_recv(&self) -> Option<SignalingEvent> {
        SignalingClient::try_recv(self)
    }
}

impl Drop for SignalingClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

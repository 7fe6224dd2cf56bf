use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender};

use crate::log::LogSink;
use crate::signaling::protocol::SignalingMsg;
use crate::signaling::router::Router;
use crate::signaling::server_event::ServerEvent;
use crate::signaling::types::ClientId;
use crate::{sink_debug, sink_info, sink_warn};

/// Central server loop: owns the Router and maps client_id -> Sender<SignalingMsg>.
///
/// Events are handled strictly one at a time, which is what keeps room
/// membership and notification order consistent across connections.
pub fn run_server_loop(mut router: Router, log: Arc<dyn LogSink>, rx: Receiver<ServerEvent>) {
    use ServerEvent::*;

    let mut clients: HashMap<ClientId, Sender<SignalingMsg>> = HashMap::new();

    while let Ok(ev) = rx.recv() {
        match ev {
            RegisterClient {
                client_id,
                to_client,
            } => {
                if let Err(e) = router.register_client(client_id) {
                    // dropping `to_client` closes the writer, which closes the socket
                    sink_warn!(log, "rejecting client {}: {}", client_id, e);
                    continue;
                }
                clients.insert(client_id, to_client);

                sink_info!(
                    log,
                    "registered client {} in server loop (now {} clients)",
                    client_id,
                    clients.len()
                );
            }

            MsgFromClient { client_id, msg } => {
                sink_debug!(log, "MsgFromClient from {}: {}", client_id, msg.name());
                router.handle_from_client(client_id, msg);
            }

            Malformed { client_id, error } => {
                router.handle_malformed(client_id, &error);
            }

            Disconnected { client_id } => {
                if clients.remove(&client_id).is_some() {
                    sink_info!(log, "client {} disconnected (transport)", client_id);
                }
                router.unregister_client(client_id);
            }
        }

        deliver(&mut router, &clients, &log);
    }

    sink_info!(
        log,
        "ServerEvent channel closed; server loop shutting down ({} clients left)",
        clients.len()
    );
}

fn deliver(router: &mut Router, clients: &HashMap<ClientId, Sender<SignalingMsg>>, log: &Arc<dyn LogSink>) {
    for (target, out_msg) in router.drain_all_outgoing() {
        match clients.get(&target) {
            Some(tx) => {
                if tx.send(out_msg).is_err() {
                    sink_warn!(
                        log,
                        "failed to deliver message to client {} (channel closed)",
                        target
                    );
                }
            }
            None => sink_warn!(log, "no client {} to deliver outgoing message", target),
        }
    }
}

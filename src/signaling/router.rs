use std::collections::HashMap;
use std::sync::Arc;

use crate::log::{LogSink, NoopLogSink};
use crate::signaling::errors::RegistryError;
use crate::signaling::protocol::SignalingMsg;
use crate::signaling::server_engine::ServerEngine;
use crate::signaling::types::{ClientId, OutgoingMsg};

/// Router glues the ServerEngine state machine to per-client outboxes.
pub struct Router {
    engine: ServerEngine,
    outboxes: HashMap<ClientId, Vec<SignalingMsg>>,
}

impl Router {
    pub fn new() -> Self {
        Self::with_log(Arc::new(NoopLogSink))
    }

    pub fn with_log(log: Arc<dyn LogSink>) -> Self {
        Self::with_engine(ServerEngine::with_log(log))
    }

    pub fn with_engine(engine: ServerEngine) -> Self {
        Self {
            engine,
            outboxes: HashMap::new(),
        }
    }

    /// Registers a new client: creates its outbox and queues its Welcome.
    pub fn register_client(&mut self, client_id: ClientId) -> Result<(), RegistryError> {
        let out_msgs = self.engine.handle_connect(client_id)?;
        self.outboxes.entry(client_id).or_default();
        for out_msg in out_msgs {
            self.enqueue(out_msg);
        }
        Ok(())
    }

    /// Unregisters a client:
    /// - removes its outbox
    /// - lets the engine clean up its session and notify its room.
    pub fn unregister_client(&mut self, client_id: ClientId) {
        self.outboxes.remove(&client_id);

        let out_msgs = self.engine.handle_disconnect(client_id);
        for out_msg in out_msgs {
            self.enqueue(out_msg);
        }
    }

    /// Main entrypoint: handle a message coming *from* a client.
    pub fn handle_from_client(&mut self, from_cid: ClientId, msg: SignalingMsg) {
        let out_msgs = self.engine.handle(from_cid, msg);
        for out_msg in out_msgs {
            self.enqueue(out_msg);
        }
    }

    pub fn handle_malformed(&mut self, from_cid: ClientId, error: &str) {
        self.engine.handle_malformed(from_cid, error);
    }

    /// Drain and return all outgoing messages for a given client.
    pub fn take_outgoing_for(&mut self, client_id: ClientId) -> Vec<SignalingMsg> {
        self.outboxes
            .get_mut(&client_id)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Drain all pending outgoing messages for all clients.
    ///
    /// Per-client order is preserved; order across clients is not.
    pub fn drain_all_outgoing(&mut self) -> Vec<(ClientId, SignalingMsg)> {
        let mut result = Vec::new();
        for (cid, msgs) in self.outboxes.iter_mut() {
            for m in msgs.drain(..) {
                result.push((*cid, m));
            }
        }
        result
    }

    pub fn engine(&self) -> &ServerEngine {
        &self.engine
    }

    fn enqueue(&mut self, out_msg: OutgoingMsg) {
        // no outbox means the client is already gone
        if let Some(queue) = self.outboxes.get_mut(&out_msg.client_id_target) {
            queue.push(out_msg.msg);
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

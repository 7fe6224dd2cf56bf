use std::sync::Arc;

use crate::log::{LogSink, NoopLogSink};
use crate::signaling::errors::RelayError;
use crate::signaling::protocol::{SignalEnvelope, SignalingMsg};
use crate::signaling::session_registry::SessionRegistry;
use crate::signaling::types::{ClientId, OutgoingMsg};
use crate::{sink_debug, sink_trace};

/// Forwards offer/answer/candidate envelopes between sessions.
///
/// The relay is stateless: it checks the addressing against the registry and
/// hands back the envelope unchanged. Room membership is not consulted, so a
/// late candidate for a peer that is still connected goes through even if
/// that peer already left the room.
pub struct SignalRelay {
    log: Arc<dyn LogSink>,
}

impl SignalRelay {
    pub fn new() -> Self {
        Self::with_log(Arc::new(NoopLogSink))
    }

    pub fn with_log(log: Arc<dyn LogSink>) -> Self {
        Self { log }
    }

    pub fn relay(
        &self,
        registry: &SessionRegistry,
        sender: ClientId,
        env: SignalEnvelope,
    ) -> Result<OutgoingMsg, RelayError> {
        let owner = registry
            .session_for_client(sender)
            .ok_or(RelayError::NotRegistered(sender))?;

        if env.from.is_empty() {
            return Err(RelayError::MalformedEnvelope("empty sender"));
        }
        if env.to.is_empty() {
            return Err(RelayError::MalformedEnvelope("empty target"));
        }
        if env.from != owner.session_id {
            return Err(RelayError::SpoofedSender {
                client: sender,
                claimed: env.from,
                actual: owner.session_id.clone(),
            });
        }

        let Some(target) = registry.lookup(&env.to) else {
            sink_debug!(
                self.log,
                "{} from {} to {} dropped: target not connected",
                env.kind.as_str(),
                env.from,
                env.to
            );
            return Err(RelayError::PeerUnreachable {
                kind: env.kind,
                target: env.to,
            });
        };

        sink_trace!(
            self.log,
            "relay {} {} -> {} ({} bytes)",
            env.kind.as_str(),
            env.from,
            env.to,
            env.payload.len()
        );
        Ok(OutgoingMsg::new(target.client_id, SignalingMsg::Signal(env)))
    }
}

impl Default for SignalRelay {
    fn default() -> Self {
        Self::new()
    }
}

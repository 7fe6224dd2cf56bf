use crate::peer::link_state::LinkState;
use crate::peer::media::RemoteStream;
use crate::peer::peer_connection::PeerConnection;
use crate::peer::peer_error::PeerError;
use crate::peer::role::Role;
use crate::signaling::protocol::SessionId;

/// One pairwise link to a remote session.
pub struct PeerLink {
    remote: SessionId,
    role: Role,
    state: LinkState,
    conn: Box<dyn PeerConnection>,
    /// Remote candidates that arrived before the remote description.
    pending_candidates: Vec<Vec<u8>>,
    /// Remote media that arrived before connectivity was confirmed.
    pending_stream: Option<RemoteStream>,
    sink_bound: bool,
}

impl PeerLink {
    pub fn new(remote: SessionId, role: Role, conn: Box<dyn PeerConnection>) -> Self {
        Self {
            remote,
            role,
            state: LinkState::New,
            conn,
            pending_candidates: Vec::new(),
            pending_stream: None,
            sink_bound: false,
        }
    }

    pub fn remote(&self) -> &SessionId {
        &self.remote
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn conn_mut(&mut self) -> &mut dyn PeerConnection {
        self.conn.as_mut()
    }

    pub fn advance(&mut self, next: LinkState) -> Result<(), PeerError> {
        if !self.state.can_transition_to(next) {
            return Err(PeerError::InvalidTransition {
                remote: self.remote.clone(),
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Applies the candidate now or keeps it until a remote description is set.
    pub fn add_remote_candidate(&mut self, candidate: Vec<u8>) -> Result<(), PeerError> {
        if self.state.has_remote_description() {
            self.conn.add_remote_candidate(&candidate)
        } else {
            self.pending_candidates.push(candidate);
            Ok(())
        }
    }

    pub fn flush_pending_candidates(&mut self) -> Result<(), PeerError> {
        for candidate in std::mem::take(&mut self.pending_candidates) {
            self.conn.add_remote_candidate(&candidate)?;
        }
        Ok(())
    }

    pub fn pending_candidates(&self) -> usize {
        self.pending_candidates.len()
    }

    pub fn set_pending_stream(&mut self, stream: RemoteStream) {
        self.pending_stream = Some(stream);
    }

    pub fn take_pending_stream(&mut self) -> Option<RemoteStream> {
        self.pending_stream.take()
    }

    pub fn is_sink_bound(&self) -> bool {
        self.sink_bound
    }

    pub fn set_sink_bound(&mut self, bound: bool) {
        self.sink_bound = bound;
    }

    /// Closes the platform connection. Returns `false` if already closed.
    pub fn close(&mut self) -> bool {
        if self.state.is_closed() {
            return false;
        }
        self.state = LinkState::Closed;
        self.pending_candidates.clear();
        self.pending_stream = None;
        self.conn.close();
        true
    }
}

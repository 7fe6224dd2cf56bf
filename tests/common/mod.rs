#![allow(dead_code, clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use meshroom::peer::{
    LinkState, LocalMedia, MediaCapture, MediaSinks, PeerConnection, PeerConnectionFactory,
    PeerError, PeerEventSender, PeerOrchestrator, PeerPlatform, RemoteStream, TrackKind,
};
use meshroom::signaling::protocol::SessionId;
use meshroom::signaling_client::SignalTransport;

/// What the fake platform saw, per client.
#[derive(Default)]
pub struct FakeState {
    pub senders: HashMap<SessionId, PeerEventSender>,
    pub applied_candidates: Vec<(SessionId, Vec<u8>)>,
    pub bound: Vec<SessionId>,
    pub closed: Vec<SessionId>,
    pub acquired: u32,
    pub released: u32,
}

pub type Shared = Arc<Mutex<FakeState>>;

struct FakeConn {
    remote: SessionId,
    events: PeerEventSender,
    state: Shared,
}

impl PeerConnection for FakeConn {
    fn add_local_media(&mut self, _media: &LocalMedia) -> Result<(), PeerError> {
        Ok(())
    }

    fn create_offer(&mut self) -> Result<Vec<u8>, PeerError> {
        self.events
            .local_candidate(format!("candidate toward {}", self.remote).into_bytes());
        Ok(b"v=0 offer".to_vec())
    }

    fn accept_offer(&mut self, offer: &[u8]) -> Result<Vec<u8>, PeerError> {
        if !offer.starts_with(b"v=0") {
            return Err(PeerError::Connection("not an sdp".into()));
        }
        self.events
            .local_candidate(format!("candidate toward {}", self.remote).into_bytes());
        Ok(b"v=0 answer".to_vec())
    }

    fn accept_answer(&mut self, _answer: &[u8]) -> Result<(), PeerError> {
        Ok(())
    }

    fn add_remote_candidate(&mut self, candidate: &[u8]) -> Result<(), PeerError> {
        self.state
            .lock()
            .unwrap()
            .applied_candidates
            .push((self.remote.clone(), candidate.to_vec()));
        Ok(())
    }

    fn close(&mut self) {
        self.state.lock().unwrap().closed.push(self.remote.clone());
    }
}

struct FakeFactory(Shared);

impl PeerConnectionFactory for FakeFactory {
    fn create(
        &mut self,
        remote: &SessionId,
        events: PeerEventSender,
    ) -> Result<Box<dyn PeerConnection>, PeerError> {
        self.0
            .lock()
            .unwrap()
            .senders
            .insert(remote.clone(), events.clone());
        Ok(Box::new(FakeConn {
            remote: remote.clone(),
            events,
            state: self.0.clone(),
        }))
    }
}

struct FakeCapture(Shared);

impl MediaCapture for FakeCapture {
    fn acquire(&mut self) -> Result<LocalMedia, PeerError> {
        self.0.lock().unwrap().acquired += 1;
        Ok(LocalMedia {
            id: "local".into(),
            tracks: vec![TrackKind::Audio, TrackKind::Video],
        })
    }

    fn release(&mut self, _media: LocalMedia) {
        self.0.lock().unwrap().released += 1;
    }
}

struct FakeSinks(Shared);

impl MediaSinks for FakeSinks {
    fn bind_local(&mut self, _media: &LocalMedia) {}

    fn unbind_local(&mut self) {}

    fn bind(&mut self, remote: &SessionId, _stream: RemoteStream) {
        self.0.lock().unwrap().bound.push(remote.clone());
    }

    fn unbind(&mut self, remote: &SessionId) {
        self.0.lock().unwrap().bound.retain(|r| r != remote);
    }
}

pub fn fake_platform() -> (PeerPlatform, Shared) {
    let state: Shared = Arc::default();
    let platform = PeerPlatform {
        connections: Box::new(FakeFactory(state.clone())),
        capture: Box::new(FakeCapture(state.clone())),
        sinks: Box::new(FakeSinks(state.clone())),
    };
    (platform, state)
}

/// Plays the platform finishing ICE for every link that has both
/// descriptions: remote media shows up, then connectivity is confirmed.
pub fn confirm_connectivity<T: SignalTransport>(orch: &PeerOrchestrator<T>, state: &Shared) {
    let senders = state.lock().unwrap().senders.clone();
    for remote in orch.remotes() {
        if orch.link_state(&remote) == Some(LinkState::RemoteDescriptionSet) {
            if let Some(tx) = senders.get(&remote) {
                tx.remote_stream(RemoteStream {
                    id: format!("stream-{remote}"),
                    tracks: vec![TrackKind::Video],
                });
                tx.connected();
            }
        }
    }
}

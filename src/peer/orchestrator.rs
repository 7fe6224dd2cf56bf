use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::log::{LogSink, NoopLogSink};
use crate::peer::link_state::LinkState;
use crate::peer::media::{LocalMedia, PeerPlatform, RemoteStream};
use crate::peer::peer_error::PeerError;
use crate::peer::peer_event::{PeerEvent, PeerEventSender};
use crate::peer::peer_link::PeerLink;
use crate::peer::role::Role;
use crate::peer::room_event::RoomEvent;
use crate::signaling::JoinErrorCode;
use crate::signaling::protocol::{
    Label, Participant, RoomId, Seq, SessionId, SignalEnvelope, SignalKind, SignalingMsg,
};
use crate::signaling_client::{SignalTransport, SignalingEvent};
use crate::{sink_debug, sink_info, sink_warn};

struct ActiveRoom {
    room_id: RoomId,
    label: Option<Label>,
    /// Our join-order position; known once the snapshot arrives.
    joined_at: Option<Seq>,
    /// `JoinRoom` has gone out.
    requested: bool,
}

/// Client-side mesh driver: one [`PeerLink`] per remote member of the room.
///
/// Signaling messages and platform callbacks are funneled through one
/// ordered queue and applied in [`poll`](Self::poll). Roles come from the
/// server's join order, so exactly one side of every pair sends the offer.
pub struct PeerOrchestrator<T: SignalTransport> {
    transport: T,
    platform: PeerPlatform,
    events_tx: Sender<PeerEvent>,
    events_rx: Receiver<PeerEvent>,
    session_id: Option<SessionId>,
    room: Option<ActiveRoom>,
    local_media: Option<LocalMedia>,
    links: HashMap<SessionId, PeerLink>,
    /// Remotes whose link was torn down; stale offers from them are ignored
    /// until they are announced again.
    closed: HashSet<SessionId>,
    out: Vec<RoomEvent>,
    log: Arc<dyn LogSink>,
}

impl<T: SignalTransport> PeerOrchestrator<T> {
    pub fn new(transport: T, platform: PeerPlatform, log: Arc<dyn LogSink>) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            transport,
            platform,
            events_tx,
            events_rx,
            session_id: None,
            room: None,
            local_media: None,
            links: HashMap::new(),
            closed: HashSet::new(),
            out: Vec::new(),
            log,
        }
    }

    pub fn without_log(transport: T, platform: PeerPlatform) -> Self {
        Self::new(transport, platform, Arc::new(NoopLogSink))
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub fn room_id(&self) -> Option<&RoomId> {
        self.room.as_ref().map(|r| &r.room_id)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// State of the link to `remote`; `Closed` for remotes we tore down.
    pub fn link_state(&self, remote: &str) -> Option<LinkState> {
        match self.links.get(remote) {
            Some(link) => Some(link.state()),
            None if self.closed.contains(remote) => Some(LinkState::Closed),
            None => None,
        }
    }

    pub fn role(&self, remote: &str) -> Option<Role> {
        self.links.get(remote).map(PeerLink::role)
    }

    /// Remotes with an open link, in no particular order.
    pub fn remotes(&self) -> Vec<SessionId> {
        self.links.keys().cloned().collect()
    }

    /// Sender for platform callbacks about `remote`.
    pub fn event_sender(&self, remote: &SessionId) -> PeerEventSender {
        PeerEventSender::new(self.events_tx.clone(), remote.clone())
    }

    /// Enters `room_id`. Local media is acquired on first use; the join
    /// request goes out as soon as the server has assigned our session.
    pub fn join(&mut self, room_id: impl Into<RoomId>, label: Option<Label>) -> Result<(), PeerError> {
        let room_id = room_id.into();
        if self.room.as_ref().is_some_and(|r| r.room_id == room_id) {
            return Ok(());
        }

        if self.local_media.is_none() {
            let media = self.platform.capture.acquire()?;
            self.platform.sinks.bind_local(&media);
            self.local_media = Some(media);
        }

        if let Some(old) = self.room.take() {
            self.close_all_links();
            self.closed.clear();
            // a refused join must not leave us listed in the old room
            if old.requested {
                self.transport.send(SignalingMsg::LeaveRoom)?;
            }
        }
        sink_info!(self.log, "joining room {}", room_id);
        self.room = Some(ActiveRoom {
            room_id,
            label,
            joined_at: None,
            requested: false,
        });
        self.send_join()
    }

    /// Closes every link, releases local media and leaves the room.
    pub fn leave(&mut self) -> Result<(), PeerError> {
        self.close_all_links();
        self.closed.clear();
        let requested = self.room.take().is_some_and(|r| r.requested);
        self.release_media();
        self.out.push(RoomEvent::Left);
        if requested {
            self.transport.send(SignalingMsg::LeaveRoom)?;
        }
        Ok(())
    }

    /// Applies everything that arrived since the last call and returns the
    /// resulting events for display, in order.
    pub fn poll(&mut self) -> Vec<RoomEvent> {
        while let Some(ev) = self.transport.try_recv() {
            if let SignalingEvent::Error(e) = &ev {
                sink_warn!(self.log, "signaling: {}", e);
            }
            if let Some(pe) = PeerEvent::from_signaling(ev) {
                // both ends live in self; cannot fail
                let _ = self.events_tx.send(pe);
            }
        }
        while let Ok(ev) = self.events_rx.try_recv() {
            self.handle_event(ev);
        }
        std::mem::take(&mut self.out)
    }

    fn handle_event(&mut self, ev: PeerEvent) {
        match ev {
            PeerEvent::Welcome { session_id } => {
                if self.session_id.is_some() {
                    return;
                }
                sink_info!(self.log, "assigned session {}", session_id);
                self.session_id = Some(session_id.clone());
                self.out.push(RoomEvent::Connected { session_id });
                if let Err(e) = self.send_join() {
                    self.report(None, e);
                }
            }
            PeerEvent::Snapshot {
                room_id,
                joined_at,
                members,
            } => self.on_snapshot(room_id, joined_at, members),
            PeerEvent::JoinRejected { code } => {
                sink_warn!(self.log, "join rejected with code {}", code);
                self.room = None;
                self.out.push(RoomEvent::JoinRejected {
                    code: JoinErrorCode::from_u16(code),
                });
            }
            PeerEvent::ParticipantJoined(p) => self.on_participant_joined(p),
            PeerEvent::ParticipantLeft { session_id } => {
                if self.in_room() {
                    self.out.push(RoomEvent::MemberLeft {
                        session_id: session_id.clone(),
                    });
                }
                self.teardown(&session_id);
            }
            PeerEvent::OfferReceived { from, sdp } => self.on_offer(from, sdp),
            PeerEvent::AnswerReceived { from, sdp } => self.on_answer(from, sdp),
            PeerEvent::CandidateReceived { from, candidate } => {
                self.on_remote_candidate(from, candidate)
            }
            PeerEvent::PeerUnreachable { session_id } => {
                self.out.push(RoomEvent::PeerUnreachable {
                    session_id: session_id.clone(),
                });
                self.teardown(&session_id);
            }
            PeerEvent::SignalingLost => {
                sink_warn!(self.log, "signaling connection lost");
                self.close_all_links();
                self.closed.clear();
                self.release_media();
                self.room = None;
                self.session_id = None;
                self.out.push(RoomEvent::Disconnected);
            }
            PeerEvent::LocalCandidate { remote, candidate } => {
                self.on_local_candidate(remote, candidate)
            }
            PeerEvent::ConnectivityConfirmed { remote } => self.on_connected(remote),
            PeerEvent::RemoteStream { remote, stream } => self.on_remote_stream(remote, stream),
            PeerEvent::RemoteEnded { remote } => {
                sink_info!(self.log, "platform dropped link to {}", remote);
                self.teardown(&remote);
            }
        }
    }

    fn release_media(&mut self) {
        if let Some(media) = self.local_media.take() {
            self.platform.sinks.unbind_local();
            self.platform.capture.release(media);
        }
    }

    fn in_room(&self) -> bool {
        self.room.as_ref().is_some_and(|r| r.joined_at.is_some())
    }

    fn send_join(&mut self) -> Result<(), PeerError> {
        let (Some(session_id), Some(room)) = (self.session_id.clone(), self.room.as_mut()) else {
            return Ok(());
        };
        if room.requested {
            return Ok(());
        }
        room.requested = true;
        let msg = SignalingMsg::JoinRoom {
            room_id: room.room_id.clone(),
            session_id,
            label: room.label.clone(),
        };
        self.transport.send(msg)?;
        Ok(())
    }

    fn on_snapshot(&mut self, room_id: RoomId, joined_at: Seq, members: Vec<Participant>) {
        let Some(room) = self.room.as_mut().filter(|r| r.room_id == room_id) else {
            sink_debug!(self.log, "snapshot for room {} we are not joining", room_id);
            return;
        };
        room.joined_at = Some(joined_at);
        sink_info!(
            self.log,
            "in room {} as #{} with {} members",
            room_id,
            joined_at,
            members.len()
        );
        self.out.push(RoomEvent::Joined {
            room_id,
            members: members.clone(),
        });

        for m in members {
            if self.session_id.as_ref() == Some(&m.session_id) {
                continue;
            }
            self.closed.remove(&m.session_id);
            self.open_link(&m.session_id, Role::from_join_order(joined_at, m.joined_at));
        }
    }

    fn on_participant_joined(&mut self, p: Participant) {
        let Some(local_joined_at) = self.room.as_ref().and_then(|r| r.joined_at) else {
            return;
        };
        if self.session_id.as_ref() == Some(&p.session_id) {
            return;
        }
        let remote = p.session_id.clone();
        let role = Role::from_join_order(local_joined_at, p.joined_at);
        self.closed.remove(&remote);
        self.out.push(RoomEvent::MemberJoined(p));
        self.open_link(&remote, role);
    }

    fn open_link(&mut self, remote: &SessionId, role: Role) {
        if self.links.contains_key(remote) {
            return;
        }
        let events = PeerEventSender::new(self.events_tx.clone(), remote.clone());
        let created = self
            .platform
            .connections
            .create(remote, events)
            .and_then(|mut conn| {
                if let Some(media) = &self.local_media {
                    conn.add_local_media(media)?;
                }
                Ok(conn)
            });

        match created {
            Ok(conn) => {
                sink_debug!(self.log, "link to {} created as {:?}", remote, role);
                self.links
                    .insert(remote.clone(), PeerLink::new(remote.clone(), role, conn));
                self.out.push(RoomEvent::LinkChanged {
                    remote: remote.clone(),
                    state: LinkState::New,
                });
                if role == Role::Initiator {
                    if let Err(e) = self.start_offer(remote) {
                        self.fail_link(remote, e);
                    }
                }
            }
            Err(e) => self.report(Some(remote.clone()), e),
        }
    }

    fn start_offer(&mut self, remote: &SessionId) -> Result<(), PeerError> {
        let Some(link) = self.links.get_mut(remote) else {
            return Ok(());
        };
        let offer = link.conn_mut().create_offer()?;
        link.advance(LinkState::LocalDescriptionSet)?;
        self.send_signal(SignalKind::Offer, remote, offer)?;
        self.out.push(RoomEvent::LinkChanged {
            remote: remote.clone(),
            state: LinkState::LocalDescriptionSet,
        });
        Ok(())
    }

    fn on_offer(&mut self, from: SessionId, sdp: Vec<u8>) {
        if self.closed.contains(&from) {
            sink_debug!(self.log, "discarding offer from closed remote {}", from);
            return;
        }
        if !self.in_room() {
            sink_debug!(self.log, "discarding offer from {}: not in a room", from);
            return;
        }
        // links only come from membership events, which precede any offer
        if !self.links.contains_key(&from) {
            sink_debug!(self.log, "discarding offer from {}: not a room member", from);
            return;
        }

        let expected = self
            .links
            .get(&from)
            .is_some_and(|l| l.role() == Role::Responder && l.state() == LinkState::New);
        if !expected {
            sink_debug!(self.log, "discarding unexpected offer from {}", from);
            return;
        }
        if let Err(e) = self.apply_offer(&from, &sdp) {
            self.fail_link(&from, e);
        }
    }

    fn apply_offer(&mut self, from: &SessionId, sdp: &[u8]) -> Result<(), PeerError> {
        let Some(link) = self.links.get_mut(from) else {
            return Ok(());
        };
        let answer = link.conn_mut().accept_offer(sdp)?;
        link.advance(LinkState::RemoteDescriptionSet)?;
        link.flush_pending_candidates()?;
        self.send_signal(SignalKind::Answer, from, answer)?;
        self.out.push(RoomEvent::LinkChanged {
            remote: from.clone(),
            state: LinkState::RemoteDescriptionSet,
        });
        Ok(())
    }

    fn on_answer(&mut self, from: SessionId, sdp: Vec<u8>) {
        let expected = self.links.get(&from).is_some_and(|l| {
            l.role() == Role::Initiator && l.state() == LinkState::LocalDescriptionSet
        });
        if !expected {
            sink_debug!(self.log, "discarding unexpected answer from {}", from);
            return;
        }
        if let Err(e) = self.apply_answer(&from, &sdp) {
            self.fail_link(&from, e);
        }
    }

    fn apply_answer(&mut self, from: &SessionId, sdp: &[u8]) -> Result<(), PeerError> {
        let Some(link) = self.links.get_mut(from) else {
            return Ok(());
        };
        link.conn_mut().accept_answer(sdp)?;
        link.advance(LinkState::RemoteDescriptionSet)?;
        link.flush_pending_candidates()?;
        self.out.push(RoomEvent::LinkChanged {
            remote: from.clone(),
            state: LinkState::RemoteDescriptionSet,
        });
        Ok(())
    }

    fn on_remote_candidate(&mut self, from: SessionId, candidate: Vec<u8>) {
        let Some(link) = self.links.get_mut(&from) else {
            return;
        };
        if let Err(e) = link.add_remote_candidate(candidate) {
            self.fail_link(&from, e);
        }
    }

    fn on_local_candidate(&mut self, remote: SessionId, candidate: Vec<u8>) {
        if !self.links.contains_key(&remote) {
            return;
        }
        if let Err(e) = self.send_signal(SignalKind::Candidate, &remote, candidate) {
            self.report(Some(remote), e);
        }
    }

    fn on_connected(&mut self, remote: SessionId) {
        let Some(link) = self.links.get_mut(&remote) else {
            return;
        };
        if link.state() != LinkState::RemoteDescriptionSet {
            return;
        }
        if let Err(e) = link.advance(LinkState::Connected) {
            self.fail_link(&remote, e);
            return;
        }
        let pending = link.take_pending_stream();
        sink_info!(self.log, "link to {} connected", remote);
        self.out.push(RoomEvent::LinkChanged {
            remote: remote.clone(),
            state: LinkState::Connected,
        });
        if let Some(stream) = pending {
            self.bind_remote(&remote, stream);
        }
    }

    fn on_remote_stream(&mut self, remote: SessionId, stream: RemoteStream) {
        let Some(link) = self.links.get_mut(&remote) else {
            return;
        };
        if link.state() == LinkState::Connected {
            self.bind_remote(&remote, stream);
        } else {
            link.set_pending_stream(stream);
        }
    }

    fn bind_remote(&mut self, remote: &SessionId, stream: RemoteStream) {
        if let Some(link) = self.links.get_mut(remote) {
            link.set_sink_bound(true);
            self.platform.sinks.bind(remote, stream);
        }
    }

    fn send_signal(
        &self,
        kind: SignalKind,
        to: &SessionId,
        payload: Vec<u8>,
    ) -> Result<(), PeerError> {
        let from = self.session_id.clone().ok_or(PeerError::NotConnected)?;
        self.transport.send(SignalingMsg::Signal(SignalEnvelope {
            kind,
            from,
            to: to.clone(),
            payload,
        }))?;
        Ok(())
    }

    /// Moves the link to `Closed` and forgets it. Later teardown signals for
    /// the same remote are no-ops.
    fn teardown(&mut self, remote: &SessionId) {
        let Some(mut link) = self.links.remove(remote) else {
            return;
        };
        self.closed.insert(remote.clone());
        link.close();
        if link.is_sink_bound() {
            self.platform.sinks.unbind(remote);
        }
        sink_info!(self.log, "link to {} closed", remote);
        self.out.push(RoomEvent::LinkChanged {
            remote: remote.clone(),
            state: LinkState::Closed,
        });
    }

    fn close_all_links(&mut self) {
        let remotes: Vec<SessionId> = self.links.keys().cloned().collect();
        for remote in remotes {
            self.teardown(&remote);
        }
    }

    fn fail_link(&mut self, remote: &SessionId, err: PeerError) {
        self.report(Some(remote.clone()), err);
        self.teardown(remote);
    }

    fn report(&mut self, remote: Option<SessionId>, err: PeerError) {
        sink_warn!(self.log, "peer error ({:?}): {}", remote, err);
        self.out.push(RoomEvent::Error {
            remote,
            message: err.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::peer::media::{MediaCapture, MediaSinks, TrackKind};
    use crate::peer::peer_connection::{PeerConnection, PeerConnectionFactory};
    use crate::signaling_client::{InProcessEndpoint, InProcessTransport};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Trace {
        calls: Vec<String>,
        senders: HashMap<SessionId, PeerEventSender>,
        bound: Vec<SessionId>,
    }

    type Shared = Arc<Mutex<Trace>>;

    struct FakeConn {
        remote: SessionId,
        trace: Shared,
    }

    impl PeerConnection for FakeConn {
        fn add_local_media(&mut self, media: &LocalMedia) -> Result<(), PeerError> {
            self.log(format!("media {}", media.id));
            Ok(())
        }
        fn create_offer(&mut self) -> Result<Vec<u8>, PeerError> {
            self.log("offer".into());
            Ok(format!("offer-for-{}", self.remote).into_bytes())
        }
        fn accept_offer(&mut self, _offer: &[u8]) -> Result<Vec<u8>, PeerError> {
            self.log("accept-offer".into());
            Ok(b"answer".to_vec())
        }
        fn accept_answer(&mut self, _answer: &[u8]) -> Result<(), PeerError> {
            self.log("accept-answer".into());
            Ok(())
        }
        fn add_remote_candidate(&mut self, c: &[u8]) -> Result<(), PeerError> {
            self.log(format!("cand {}", String::from_utf8_lossy(c)));
            Ok(())
        }
        fn close(&mut self) {
            self.log("close".into());
        }
    }

    impl FakeConn {
        fn log(&self, what: String) {
            self.trace
                .lock()
                .unwrap()
                .calls
                .push(format!("{}: {}", self.remote, what));
        }
    }

    struct FakeFactory(Shared);
    impl PeerConnectionFactory for FakeFactory {
        fn create(
            &mut self,
            remote: &SessionId,
            events: PeerEventSender,
        ) -> Result<Box<dyn PeerConnection>, PeerError> {
            self.0.lock().unwrap().senders.insert(remote.clone(), events);
            Ok(Box::new(FakeConn {
                remote: remote.clone(),
                trace: self.0.clone(),
            }))
        }
    }

    struct FakeCapture(Shared);
    impl MediaCapture for FakeCapture {
        fn acquire(&mut self) -> Result<LocalMedia, PeerError> {
            self.0.lock().unwrap().calls.push("acquire".into());
            Ok(LocalMedia {
                id: "cam".into(),
                tracks: vec![TrackKind::Audio, TrackKind::Video],
            })
        }
        fn release(&mut self, _media: LocalMedia) {
            self.0.lock().unwrap().calls.push("release".into());
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

    fn orchestrator() -> (PeerOrchestrator<InProcessTransport>, InProcessEndpoint, Shared) {
        let trace: Shared = Arc::default();
        let platform = PeerPlatform {
            connections: Box::new(FakeFactory(trace.clone())),
            capture: Box::new(FakeCapture(trace.clone())),
            sinks: Box::new(FakeSinks(trace.clone())),
        };
        let (transport, end) = InProcessTransport::pair();
        (PeerOrchestrator::without_log(transport, platform), end, trace)
    }

    fn deliver(end: &InProcessEndpoint, msg: SignalingMsg) {
        end.to_client.send(SignalingEvent::Msg(msg)).unwrap();
    }

    fn sent(end: &InProcessEndpoint) -> Vec<SignalingMsg> {
        end.from_client.try_iter().collect()
    }

    fn participant(id: &str, joined_at: Seq) -> Participant {
        Participant {
            session_id: id.into(),
            joined_at,
            label: None,
        }
    }

    /// Welcome as `me`, join R1 at position `joined_at` with `members`.
    fn enter(
        orch: &mut PeerOrchestrator<InProcessTransport>,
        end: &InProcessEndpoint,
        joined_at: Seq,
        members: Vec<Participant>,
    ) {
        orch.join("R1", Some("me".into())).unwrap();
        deliver(end, SignalingMsg::Welcome { session_id: "me".into() });
        orch.poll();
        deliver(
            end,
            SignalingMsg::ExistingMembers {
                room_id: "R1".into(),
                joined_at,
                members,
            },
        );
    }

    fn signal(kind: SignalKind, from: &str, payload: &[u8]) -> SignalingMsg {
        SignalingMsg::Signal(SignalEnvelope {
            kind,
            from: from.into(),
            to: "me".into(),
            payload: payload.to_vec(),
        })
    }

    #[test]
    fn join_waits_for_welcome_then_sends_join_room() {
        let (mut orch, end, trace) = orchestrator();
        orch.join("R1", None).unwrap();
        assert!(sent(&end).is_empty());
        assert_eq!(trace.lock().unwrap().calls, vec!["acquire"]);

        deliver(&end, SignalingMsg::Welcome { session_id: "me".into() });
        let events = orch.poll();
        assert_eq!(events, vec![RoomEvent::Connected { session_id: "me".into() }]);
        assert_eq!(
            sent(&end),
            vec![SignalingMsg::JoinRoom {
                room_id: "R1".into(),
                session_id: "me".into(),
                label: None
            }]
        );
    }

    #[test]
    fn newcomer_offers_to_every_existing_member() {
        let (mut orch, end, _trace) = orchestrator();
        enter(&mut orch, &end, 5, vec![participant("a", 1), participant("b", 3)]);
        orch.poll();

        let offers: Vec<SessionId> = sent(&end)
            .into_iter()
            .filter_map(|m| match m {
                SignalingMsg::Signal(env) if env.kind == SignalKind::Offer => Some(env.to),
                _ => None,
            })
            .collect();
        assert_eq!(offers, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(orch.role("a"), Some(Role::Initiator));
        assert_eq!(orch.link_state("b"), Some(LinkState::LocalDescriptionSet));
    }

    #[test]
    fn existing_member_responds_and_buffers_early_candidates() {
        let (mut orch, end, trace) = orchestrator();
        enter(&mut orch, &end, 1, Vec::new());
        deliver(
            &end,
            SignalingMsg::ParticipantJoined {
                participant: participant("z", 2),
            },
        );
        orch.poll();
        sent(&end);
        assert_eq!(orch.role("z"), Some(Role::Responder));
        assert_eq!(orch.link_state("z"), Some(LinkState::New));

        // a candidate overtaking the offer must wait for it
        deliver(&end, signal(SignalKind::Candidate, "z", b"c0"));
        deliver(&end, signal(SignalKind::Offer, "z", b"o"));
        orch.poll();

        let calls = trace.lock().unwrap().calls.clone();
        let accept = calls.iter().position(|c| c == "z: accept-offer").unwrap();
        let cand = calls.iter().position(|c| c == "z: cand c0").unwrap();
        assert!(accept < cand);
        assert!(matches!(
            &sent(&end)[..],
            [SignalingMsg::Signal(SignalEnvelope { kind: SignalKind::Answer, .. })]
        ));
        assert_eq!(orch.link_state("z"), Some(LinkState::RemoteDescriptionSet));
    }

    #[test]
    fn connectivity_binds_remote_media_and_teardown_releases_it() {
        let (mut orch, end, trace) = orchestrator();
        enter(&mut orch, &end, 4, vec![participant("a", 1)]);
        orch.poll();
        deliver(&end, signal(SignalKind::Answer, "a", b"ans"));
        orch.poll();

        let events = trace.lock().unwrap().senders["a"].clone();
        events.remote_stream(RemoteStream {
            id: "a-stream".into(),
            tracks: vec![TrackKind::Video],
        });
        events.connected();
        orch.poll();
        assert_eq!(orch.link_state("a"), Some(LinkState::Connected));
        assert_eq!(trace.lock().unwrap().bound, vec!["a".to_string()]);

        deliver(&end, SignalingMsg::ParticipantLeft { session_id: "a".into() });
        let evs = orch.poll();
        assert!(evs.contains(&RoomEvent::LinkChanged {
            remote: "a".into(),
            state: LinkState::Closed
        }));
        assert!(trace.lock().unwrap().bound.is_empty());

        // second teardown signal is a no-op
        events.ended();
        assert!(orch.poll().is_empty());
    }

    #[test]
    fn stale_offer_from_closed_remote_is_discarded_until_rejoin() {
        let (mut orch, end, _trace) = orchestrator();
        enter(&mut orch, &end, 1, Vec::new());
        deliver(
            &end,
            SignalingMsg::ParticipantJoined {
                participant: participant("z", 2),
            },
        );
        deliver(&end, SignalingMsg::ParticipantLeft { session_id: "z".into() });
        deliver(&end, signal(SignalKind::Offer, "z", b"late"));
        orch.poll();
        sent(&end);
        assert_eq!(orch.link_state("z"), Some(LinkState::Closed));

        deliver(
            &end,
            SignalingMsg::ParticipantJoined {
                participant: participant("z", 6),
            },
        );
        deliver(&end, signal(SignalKind::Offer, "z", b"fresh"));
        orch.poll();
        assert_eq!(orch.link_state("z"), Some(LinkState::RemoteDescriptionSet));
    }

    #[test]
    fn peer_unreachable_closes_the_link() {
        let (mut orch, end, _trace) = orchestrator();
        enter(&mut orch, &end, 3, vec![participant("gone", 1)]);
        orch.poll();
        deliver(&end, SignalingMsg::PeerUnreachable { session_id: "gone".into() });
        let evs = orch.poll();
        assert!(evs.contains(&RoomEvent::PeerUnreachable {
            session_id: "gone".into()
        }));
        assert_eq!(orch.link_state("gone"), Some(LinkState::Closed));
    }

    #[test]
    fn leave_closes_links_releases_media_and_notifies_server() {
        let (mut orch, end, trace) = orchestrator();
        enter(&mut orch, &end, 3, vec![participant("a", 1)]);
        orch.poll();
        sent(&end);

        orch.leave().unwrap();
        assert_eq!(sent(&end), vec![SignalingMsg::LeaveRoom]);
        let calls = trace.lock().unwrap().calls.clone();
        assert!(calls.contains(&"a: close".to_string()));
        assert_eq!(calls.last().map(String::as_str), Some("release"));
        assert_eq!(orch.room_id(), None);
        assert!(orch.poll().contains(&RoomEvent::Left));
    }

    #[test]
    fn local_media_is_acquired_once_and_attached_to_each_link() {
        let (mut orch, end, trace) = orchestrator();
        enter(&mut orch, &end, 9, vec![participant("a", 1), participant("b", 2)]);
        orch.poll();
        orch.join("R1", None).unwrap();

        let calls = trace.lock().unwrap().calls.clone();
        assert_eq!(calls.iter().filter(|c| *c == "acquire").count(), 1);
        assert!(calls.contains(&"a: media cam".to_string()));
        assert!(calls.contains(&"b: media cam".to_string()));
    }

    #[test]
    fn signaling_loss_closes_everything_and_releases_media() {
        let (mut orch, end, trace) = orchestrator();
        enter(&mut orch, &end, 3, vec![participant("a", 1)]);
        orch.poll();
        end.to_client.send(SignalingEvent::Disconnected).unwrap();
        let evs = orch.poll();
        assert!(evs.contains(&RoomEvent::LinkChanged {
            remote: "a".into(),
            state: LinkState::Closed
        }));
        assert_eq!(evs.last(), Some(&RoomEvent::Disconnected));
        assert_eq!(orch.session_id(), None);
        assert_eq!(orch.link_state("a"), None);

        let calls = trace.lock().unwrap().calls.clone();
        assert!(calls.contains(&"a: close".to_string()));
        assert_eq!(calls.last().map(String::as_str), Some("release"));
    }

    #[test]
    fn offer_from_session_outside_the_room_is_ignored() {
        let (mut orch, end, trace) = orchestrator();
        enter(&mut orch, &end, 1, Vec::new());
        orch.poll();
        sent(&end);

        deliver(&end, signal(SignalKind::Offer, "stranger", b"v=0 offer"));
        orch.poll();

        assert_eq!(orch.link_state("stranger"), None);
        assert!(sent(&end).is_empty());
        assert!(!trace.lock().unwrap().senders.contains_key("stranger"));
    }

    #[test]
    fn switching_rooms_leaves_the_old_one_first() {
        let (mut orch, end, _trace) = orchestrator();
        enter(&mut orch, &end, 2, vec![participant("a", 1)]);
        orch.poll();
        sent(&end);

        orch.join("R2", None).unwrap();
        assert_eq!(
            sent(&end),
            vec![
                SignalingMsg::LeaveRoom,
                SignalingMsg::JoinRoom {
                    room_id: "R2".into(),
                    session_id: "me".into(),
                    label: None
                }
            ]
        );
        assert_eq!(orch.link_state("a"), None);
    }

    #[test]
    fn join_rejection_decodes_the_code() {
        let (mut orch, end, _trace) = orchestrator();
        orch.join("R1", None).unwrap();
        deliver(&end, SignalingMsg::Welcome { session_id: "me".into() });
        deliver(&end, SignalingMsg::JoinErr { code: 20 });
        deliver(&end, SignalingMsg::JoinErr { code: 999 });
        let evs = orch.poll();

        assert!(evs.contains(&RoomEvent::JoinRejected {
            code: Some(JoinErrorCode::InvalidRoom)
        }));
        assert!(evs.contains(&RoomEvent::JoinRejected { code: None }));
        assert_eq!(orch.room_id(), None);
    }
}

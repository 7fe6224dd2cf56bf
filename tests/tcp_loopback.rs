#![allow(clippy::unwrap_used)]

mod common;

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use common::{confirm_connectivity, fake_platform};
use meshroom::log::NoopLogSink;
use meshroom::peer::{LinkState, PeerOrchestrator, Role, RoomEvent};
use meshroom::signaling::SignalingServer;
use meshroom::signaling::protocol::{SessionId, SignalEnvelope, SignalKind, SignalingMsg};
use meshroom::signaling::settings::{SignalingSettings, TlsSettings};
use meshroom::signaling::tls::build_signaling_client_config;
use meshroom::signaling_client::{SignalingClient, SignalingEvent};

const WAIT: Duration = Duration::from_secs(5);

fn start_server() -> SocketAddr {
    let server = SignalingServer::bind_plain("127.0.0.1:0").unwrap();
    let addr = server.local_addr().unwrap();
    thread::spawn(move || {
        let _ = server.run();
    });
    addr
}

fn next_msg(client: &SignalingClient) -> SignalingMsg {
    match client.recv_timeout(WAIT).unwrap() {
        SignalingEvent::Msg(msg) => msg,
        other => panic!("expected a message, got {other:?}"),
    }
}

fn welcome(client: &SignalingClient) -> SessionId {
    match next_msg(client) {
        SignalingMsg::Welcome { session_id } => session_id,
        other => panic!("expected Welcome, got {other:?}"),
    }
}

fn join(client: &SignalingClient, session_id: &SessionId, room: &str) {
    client
        .send(SignalingMsg::JoinRoom {
            room_id: room.into(),
            session_id: session_id.clone(),
            label: None,
        })
        .unwrap();
}

#[test]
fn join_relay_and_leave_over_tcp() {
    let addr = start_server();

    let c1 = SignalingClient::connect_no_log(addr).unwrap();
    let s1 = welcome(&c1);
    join(&c1, &s1, "R1");
    match next_msg(&c1) {
        SignalingMsg::ExistingMembers { room_id, members, .. } => {
            assert_eq!(room_id, "R1");
            assert!(members.is_empty());
        }
        other => panic!("unexpected {other:?}"),
    }

    let c2 = SignalingClient::connect_no_log(addr).unwrap();
    let s2 = welcome(&c2);
    assert_ne!(s1, s2);
    join(&c2, &s2, "R1");
    match next_msg(&c2) {
        SignalingMsg::ExistingMembers { members, joined_at, .. } => {
            assert_eq!(members.len(), 1);
            assert_eq!(members[0].session_id, s1);
            assert!(members[0].joined_at < joined_at);
        }
        other => panic!("unexpected {other:?}"),
    }
    match next_msg(&c1) {
        SignalingMsg::ParticipantJoined { participant } => assert_eq!(participant.session_id, s2),
        other => panic!("unexpected {other:?}"),
    }

    let env = SignalEnvelope {
        kind: SignalKind::Offer,
        from: s2.clone(),
        to: s1.clone(),
        payload: b"v=0 opaque".to_vec(),
    };
    c2.send(SignalingMsg::Signal(env.clone())).unwrap();
    assert_eq!(next_msg(&c1), SignalingMsg::Signal(env));

    c1.send(SignalingMsg::Ping { nonce: 7 }).unwrap();
    assert_eq!(next_msg(&c1), SignalingMsg::Pong { nonce: 7 });

    c2.disconnect();
    assert_eq!(
        next_msg(&c1),
        SignalingMsg::ParticipantLeft { session_id: s2 }
    );
}

#[test]
fn signal_to_unknown_session_is_bounced() {
    let addr = start_server();
    let c1 = SignalingClient::connect_no_log(addr).unwrap();
    let s1 = welcome(&c1);

    c1.send(SignalingMsg::Signal(SignalEnvelope {
        kind: SignalKind::Candidate,
        from: s1,
        to: "nobody".into(),
        payload: b"candidate".to_vec(),
    }))
    .unwrap();
    assert_eq!(
        next_msg(&c1),
        SignalingMsg::PeerUnreachable {
            session_id: "nobody".into()
        }
    );
}

type Orch = PeerOrchestrator<SignalingClient>;

/// Polls both orchestrators until `done` holds or the deadline passes.
fn pump_until(o1: &mut Orch, o2: &mut Orch, done: impl Fn(&Orch, &Orch) -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        o1.poll();
        o2.poll();
        if done(o1, o2) {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

fn linked(a: &Orch, b: &Orch, state: LinkState) -> bool {
    match (a.session_id(), b.session_id()) {
        (Some(ia), Some(ib)) => {
            a.link_state(ib) == Some(state) && b.link_state(ia) == Some(state)
        }
        _ => false,
    }
}

#[test]
fn orchestrators_negotiate_through_a_real_server() {
    let addr = start_server();
    let (p1, f1) = fake_platform();
    let (p2, f2) = fake_platform();
    let mut o1 = Orch::without_log(SignalingClient::connect_no_log(addr).unwrap(), p1);
    let mut o2 = Orch::without_log(SignalingClient::connect_no_log(addr).unwrap(), p2);

    o1.join("R1", None).unwrap();
    let mut o1_in_room = false;
    let deadline = Instant::now() + WAIT;
    while !o1_in_room && Instant::now() < deadline {
        o1_in_room = o1
            .poll()
            .iter()
            .any(|e| matches!(e, RoomEvent::Joined { .. }));
        thread::sleep(Duration::from_millis(5));
    }
    assert!(o1_in_room);

    o2.join("R1", None).unwrap();
    assert!(pump_until(&mut o1, &mut o2, |a, b| {
        linked(a, b, LinkState::RemoteDescriptionSet)
    }));
    let i1 = o1.session_id().cloned().unwrap();
    assert_eq!(o2.role(&i1), Some(Role::Initiator));

    confirm_connectivity(&o1, &f1);
    confirm_connectivity(&o2, &f2);
    assert!(pump_until(&mut o1, &mut o2, |a, b| linked(a, b, LinkState::Connected)));

    o2.leave().unwrap();
    assert!(pump_until(&mut o1, &mut o2, |a, _| {
        a.remotes().is_empty()
    }));
    assert_eq!(f2.lock().unwrap().released, 1);
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/tls")
        .join(name)
}

fn start_tls_server() -> SocketAddr {
    let settings = SignalingSettings {
        bind_addr: "127.0.0.1:0".into(),
        tls: Some(TlsSettings {
            cert_path: fixture("server.pem"),
            key_path: fixture("server.key"),
        }),
        ..SignalingSettings::default()
    };
    let server = SignalingServer::bind(&settings, Arc::new(NoopLogSink)).unwrap();
    let addr = server.local_addr().unwrap();
    thread::spawn(move || {
        let _ = server.run();
    });
    addr
}

fn connect_tls(addr: SocketAddr) -> SignalingClient {
    let config = build_signaling_client_config(&fixture("ca.pem")).unwrap();
    SignalingClient::connect_tls(addr, "localhost", config, Arc::new(NoopLogSink)).unwrap()
}

/// Forwards one connection to `upstream`, holding every chunk for `delay`
/// in each direction.
fn start_slow_proxy(upstream: SocketAddr, delay: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let Ok((down, _)) = listener.accept() else {
            return;
        };
        let Ok(up) = TcpStream::connect(upstream) else {
            return;
        };
        let pump = move |mut from: TcpStream, mut to: TcpStream| {
            thread::spawn(move || {
                let mut buf = [0u8; 16 * 1024];
                while let Ok(n) = from.read(&mut buf) {
                    if n == 0 {
                        break;
                    }
                    thread::sleep(delay);
                    if to.write_all(&buf[..n]).is_err() {
                        break;
                    }
                }
                let _ = to.shutdown(Shutdown::Write);
            });
        };
        pump(down.try_clone().unwrap(), up.try_clone().unwrap());
        pump(up, down);
    });
    addr
}

#[test]
fn tls_join_and_relay() {
    let addr = start_tls_server();

    let c1 = connect_tls(addr);
    let s1 = welcome(&c1);
    join(&c1, &s1, "R1");
    assert!(matches!(next_msg(&c1), SignalingMsg::ExistingMembers { .. }));

    let c2 = connect_tls(addr);
    let s2 = welcome(&c2);
    join(&c2, &s2, "R1");
    assert!(matches!(next_msg(&c2), SignalingMsg::ExistingMembers { .. }));
    assert!(matches!(next_msg(&c1), SignalingMsg::ParticipantJoined { .. }));

    let env = SignalEnvelope {
        kind: SignalKind::Answer,
        from: s1,
        to: s2,
        payload: b"v=0 answer".to_vec(),
    };
    c1.send(SignalingMsg::Signal(env.clone())).unwrap();
    assert_eq!(next_msg(&c2), SignalingMsg::Signal(env));
}

#[test]
fn tls_survives_round_trips_longer_than_the_read_slice() {
    let server = start_tls_server();
    let proxy = start_slow_proxy(server, Duration::from_millis(60));

    let c = connect_tls(proxy);
    let sid = welcome(&c);
    c.send(SignalingMsg::Ping { nonce: 42 }).unwrap();
    assert_eq!(next_msg(&c), SignalingMsg::Pong { nonce: 42 });
    join(&c, &sid, "slow");
    assert!(matches!(next_msg(&c), SignalingMsg::ExistingMembers { .. }));
}

//! The real transport: tokio sockets on loopback.

use std::io::{BufRead, BufReader, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cairn_core::{FlatTerrain, GameConfig};
use cairn_gameplay::Simulation;
use cairn_networking::{
    serve, spawn_client, ClientConfig, ClientInput, ClientState, GameClient, GameServer,
    ReconnectPolicy,
};
use cairn_shared::{ServerMessage, Vec3};
use tokio::net::TcpListener;
use tokio::runtime::Runtime;

const DT: f32 = 1.0 / 60.0;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

fn simulation(config: &GameConfig) -> Simulation {
    Simulation::new(config.clone(), Arc::new(FlatTerrain::new(1.0)))
}

/// Starts a server on an ephemeral port. Returns it and its address.
fn start_server(runtime: &Runtime, config: &GameConfig) -> (GameServer, String) {
    let server = GameServer::new(simulation(config));
    let listener = runtime.block_on(TcpListener::bind("127.0.0.1:0")).unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    runtime.spawn(serve(listener, server.clone()));
    (server, addr)
}

/// Polls `done` every few milliseconds for up to `limit`.
fn wait_until(limit: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn test_client_joins_and_leaves_over_tcp() {
    let runtime = runtime();
    let config = GameConfig::default();
    let (server, addr) = start_server(&runtime, &config);

    let (events_tx, events_rx) = crossbeam_channel::unbounded();
    let outbound = spawn_client(runtime.handle(), addr, ReconnectPolicy::default(), events_tx);
    let mut client = GameClient::new(
        ClientConfig {
            player_id: "tcp-1".into(),
            username: "tcp".into(),
            spawn: Vec3::new(0.0, 2.0, 0.0),
        },
        simulation(&config),
        events_rx,
        outbound,
    );

    let input = ClientInput::default();
    let joined = wait_until(Duration::from_secs(5), || {
        client.tick(&input, DT);
        server.tick(DT);
        client.state() == ClientState::Connected
            && client.store().clouds.len() == config.cloud.count
            && server.with_world(|w| w.store().players.contains("tcp-1"))
    });
    assert!(joined);
    assert_eq!(server.client_count(), 1);

    client.leave();
    let left = wait_until(Duration::from_secs(5), || {
        !server.with_world(|w| w.store().players.contains("tcp-1"))
    });
    assert!(left);
}

#[test]
fn test_raw_lines_and_disconnect() {
    let runtime = runtime();
    let (server, addr) = start_server(&runtime, &GameConfig::default());

    let mut stream = std::net::TcpStream::connect(&addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    stream.write_all(b"this is not json\n").unwrap();
    stream
        .write_all(
            br#"{"type":"join","playerId":"raw","username":"raw","position":{"x":0.0,"y":2.0,"z":0.0},"rotation":{"x":0.0,"y":0.0,"z":0.0}}"#,
        )
        .unwrap();
    stream.write_all(b"\n").unwrap();

    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut line = String::new();
    reader.read_line(&mut line).unwrap();
    let welcome = cairn_networking::codec::decode_server(line.trim_end()).unwrap();
    assert!(matches!(welcome, ServerMessage::Welcome { player_id, .. } if player_id == "raw"));

    drop(reader);
    drop(stream);
    let gone = wait_until(Duration::from_secs(5), || {
        server.client_count() == 0 && !server.with_world(|w| w.store().players.contains("raw"))
    });
    assert!(gone);
}

#[test]
fn test_unreachable_server_goes_offline() {
    let addr = {
        let vacant = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        vacant.local_addr().unwrap().to_string()
    };
    let runtime = runtime();
    let policy = ReconnectPolicy {
        max_attempts: 2,
        backoff: Duration::from_millis(10),
    };
    let config = GameConfig::default();
    let (events_tx, events_rx) = crossbeam_channel::unbounded();
    let outbound = spawn_client(runtime.handle(), addr, policy, events_tx);
    let mut client = GameClient::new(
        ClientConfig {
            player_id: "lonely".into(),
            username: "lonely".into(),
            spawn: Vec3::ZERO,
        },
        simulation(&config),
        events_rx,
        outbound,
    );

    let input = ClientInput::default();
    let offline = wait_until(Duration::from_secs(5), || {
        client.tick(&input, DT);
        client.state() == ClientState::Offline
    });
    assert!(offline);
    assert!(client.local_player().is_some());
}

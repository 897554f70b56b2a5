//! Drives a real server over WebSockets.

use duo_session::prelude::*;
use duo_session::server::{create_session_route, CALL_PATH};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const OFFER: &str = "v=0\r\nm=audio 9 UDP/TLS/RTP/SAVPF 111\r\n";

/// Starts a server on an ephemeral port with one-second timed phases.
async fn start_test_server() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let router = ProtocolRouter::new(
        Arc::new(MemoryDirectory::new()),
        Arc::new(LoopbackGateway::new()),
        Arc::new(StaticCatalog::default()),
        PhaseDurations::from_secs(1, 1, 1),
    );
    let app = create_session_route(router);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

async fn connect(addr: SocketAddr) -> Socket {
    let url = format!("ws://{addr}{CALL_PATH}");
    let (stream, _response) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("WebSocket connect failed");
    stream
}

async fn send(socket: &mut Socket, value: Value) {
    socket
        .send(Message::Text(value.to_string().into()))
        .await
        .unwrap();
}

async fn recv(socket: &mut Socket) -> Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for a message")
            .expect("stream ended")
            .unwrap();
        if message.is_text() {
            return serde_json::from_str(message.to_text().unwrap()).unwrap();
        }
    }
}

async fn register(addr: SocketAddr, name: &str) -> Socket {
    let mut socket = connect(addr).await;
    send(&mut socket, json!({"id": "register", "name": name})).await;
    assert_eq!(
        recv(&mut socket).await,
        json!({"id": "registerResult", "response": "accepted"})
    );
    socket
}

async fn pair(addr: SocketAddr) -> (Socket, Socket) {
    let mut alice = register(addr, "alice").await;
    let mut bob = register(addr, "bob").await;

    send(
        &mut alice,
        json!({"id": "initiatePairing", "to": "bob", "from": "alice", "sdpOffer": OFFER}),
    )
    .await;
    assert_eq!(
        recv(&mut bob).await,
        json!({"id": "incomingPairing", "from": "alice"})
    );

    send(
        &mut bob,
        json!({"id": "pairingResponse", "callResponse": "accept", "from": "alice", "sdpOffer": OFFER}),
    )
    .await;
    let media_start = recv(&mut bob).await;
    assert_eq!(media_start["id"], "mediaStart");
    assert!(media_start["sdpAnswer"].is_string());

    let result = recv(&mut alice).await;
    assert_eq!(result["id"], "pairingResult");
    assert_eq!(result["response"], "accepted");

    (alice, bob)
}

#[tokio::test]
async fn duplicate_name_is_rejected_over_the_wire() {
    let addr = start_test_server().await;
    let _bob = register(addr, "bob").await;

    let mut other = connect(addr).await;
    send(&mut other, json!({"id": "register", "name": "bob"})).await;
    assert_eq!(
        recv(&mut other).await,
        json!({
            "id": "registerResult",
            "response": "rejected",
            "message": "user 'bob' already registered"
        })
    );
}

#[tokio::test]
async fn malformed_and_unknown_messages_are_ignored() {
    let addr = start_test_server().await;
    let mut alice = register(addr, "alice").await;

    alice
        .send(Message::Text("not json".to_string().into()))
        .await
        .unwrap();
    send(&mut alice, json!({"id": "hideDescriberImage"})).await;
    send(
        &mut alice,
        json!({"id": "initiatePairing", "to": "nobody", "from": "alice", "sdpOffer": OFFER}),
    )
    .await;

    // the connection is still served and the first reply is the rejection
    assert_eq!(
        recv(&mut alice).await,
        json!({
            "id": "pairingResult",
            "response": "rejected",
            "message": "user 'nobody' is not registered"
        })
    );
}

#[tokio::test]
async fn round_over_websockets() {
    let addr = start_test_server().await;
    let (mut alice, mut bob) = pair(addr).await;

    send(&mut alice, json!({"id": "confirmMediaReady"})).await;
    send(&mut bob, json!({"id": "confirmMediaReady"})).await;
    assert_eq!(
        recv(&mut alice).await,
        json!({"id": "roleAssignment", "role": "describer"})
    );
    assert_eq!(
        recv(&mut bob).await,
        json!({"id": "roleAssignment", "role": "interrogator"})
    );

    send(&mut alice, json!({"id": "startRound"})).await;
    send(&mut bob, json!({"id": "startRound"})).await;
    assert_eq!(
        recv(&mut alice).await,
        json!({"id": "startReview", "src": "./img/Hat.png"})
    );
    assert_eq!(recv(&mut bob).await, json!({"id": "startReview"}));

    assert_eq!(recv(&mut alice).await, json!({"id": "startFirstQuery"}));
    assert_eq!(recv(&mut bob).await, json!({"id": "startFirstQuery"}));
    assert_eq!(recv(&mut bob).await, json!({"id": "getFirstDecision"}));

    send(&mut bob, json!({"id": "submitFirstDecision", "decision": "scarf"})).await;
    assert_eq!(
        recv(&mut bob).await,
        json!({"id": "hint", "hint": "article of clothing"})
    );
    assert_eq!(recv(&mut bob).await, json!({"id": "startSecondQuery"}));
    assert_eq!(recv(&mut alice).await, json!({"id": "startSecondQuery"}));
    assert_eq!(recv(&mut bob).await, json!({"id": "getSecondDecision"}));

    send(&mut bob, json!({"id": "submitSecondDecision", "decision": "hat"})).await;
    assert_eq!(recv(&mut alice).await, json!({"id": "startPostSession"}));
    assert_eq!(recv(&mut bob).await, json!({"id": "startPostSession"}));
}

#[tokio::test]
async fn closing_the_socket_stops_the_peer() {
    let addr = start_test_server().await;
    let (alice, mut bob) = pair(addr).await;

    drop(alice);
    assert_eq!(recv(&mut bob).await, json!({"id": "peerStopped"}));

    // the name is free again
    let _alice = register(addr, "alice").await;
}

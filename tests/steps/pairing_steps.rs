use crate::{PairingWorld, OFFER};
use cucumber::{given, then, when};
use duo_session::model::{CallResponse, Response};
use duo_session::prelude::*;

// ===== Given Steps =====

#[given(expr = "{string} is registered")]
async fn is_registered(world: &mut PairingWorld, name: String) {
    registers(world, name.clone()).await;
    assert_eq!(
        world.next_message(&name),
        Some(OutboundMessage::registration_accepted())
    );
}

#[given(expr = "{string} and {string} are paired")]
pub async fn are_paired(world: &mut PairingWorld, caller: String, callee: String) {
    is_registered(world, caller.clone()).await;
    is_registered(world, callee.clone()).await;
    asks_to_pair(world, caller.clone(), callee.clone()).await;
    accepts(world, callee.clone(), caller.clone()).await;
    world.drain(&caller);
    world.drain(&callee);
}

// ===== When Steps =====

#[when(expr = "{string} registers")]
async fn registers(world: &mut PairingWorld, name: String) {
    world
        .send(&name, InboundMessage::Register { name: name.clone() })
        .await;
}

#[when(expr = "another connection registers as {string}")]
async fn another_registers(world: &mut PairingWorld, name: String) {
    let alias = format!("{name}#2");
    world.send(&alias, InboundMessage::Register { name }).await;
}

#[when("a connection registers an empty name")]
async fn registers_empty(world: &mut PairingWorld) {
    world
        .send(
            "anonymous",
            InboundMessage::Register {
                name: String::new(),
            },
        )
        .await;
}

#[when(expr = "{string} asks {string} to pair")]
async fn asks_to_pair(world: &mut PairingWorld, caller: String, callee: String) {
    world
        .send(
            &caller,
            InboundMessage::InitiatePairing {
                to: callee,
                from: caller.clone(),
                sdp_offer: OFFER.to_string(),
            },
        )
        .await;
}

#[when(expr = "{string} accepts the pairing from {string}")]
async fn accepts(world: &mut PairingWorld, callee: String, caller: String) {
    world
        .send(
            &callee,
            InboundMessage::PairingResponse {
                call_response: CallResponse::Accept,
                from: caller,
                sdp_offer: Some(OFFER.to_string()),
            },
        )
        .await;
}

#[when(expr = "{string} declines the pairing from {string}")]
async fn declines(world: &mut PairingWorld, callee: String, caller: String) {
    world
        .send(
            &callee,
            InboundMessage::PairingResponse {
                call_response: CallResponse::Decline,
                from: caller,
                sdp_offer: None,
            },
        )
        .await;
}

#[when(expr = "{string} stops")]
pub async fn stops(world: &mut PairingWorld, name: String) {
    world.send(&name, InboundMessage::Stop).await;
}

// ===== Then Steps =====

#[then(expr = "{string} receives an incoming pairing from {string}")]
async fn receives_incoming(world: &mut PairingWorld, callee: String, caller: String) {
    assert_eq!(
        world.next_message(&callee),
        Some(OutboundMessage::IncomingPairing { from: caller })
    );
}

#[then(expr = "{string} receives an accepted pairing result")]
async fn receives_accepted(world: &mut PairingWorld, caller: String) {
    let message = world.next_message(&caller);
    assert!(
        matches!(
            message,
            Some(OutboundMessage::PairingResult {
                response: Response::Accepted,
                sdp_answer: Some(_),
                ..
            })
        ),
        "unexpected {message:?}"
    );
}

#[then(expr = "{string} receives a declined pairing result")]
async fn receives_declined(world: &mut PairingWorld, caller: String) {
    assert_eq!(
        world.next_message(&caller),
        Some(OutboundMessage::pairing_declined())
    );
}

#[then(expr = "{string} receives a media start")]
async fn receives_media_start(world: &mut PairingWorld, callee: String) {
    let message = world.next_message(&callee);
    assert!(
        matches!(message, Some(OutboundMessage::MediaStart { .. })),
        "unexpected {message:?}"
    );
}

#[then(expr = "{string} receives a peer stopped notice")]
async fn receives_peer_stopped(world: &mut PairingWorld, name: String) {
    assert_eq!(world.next_message(&name), Some(OutboundMessage::PeerStopped));
}

#[then(expr = "the second {string} is rejected with {string}")]
async fn second_rejected(world: &mut PairingWorld, name: String, reason: String) {
    let alias = format!("{name}#2");
    assert_rejected(world, &alias, &reason);
}

#[then(expr = "the empty name is rejected with {string}")]
async fn empty_rejected(world: &mut PairingWorld, reason: String) {
    assert_rejected(world, "anonymous", &reason);
}

#[then(expr = "{string} has a pairing rejected with {string}")]
async fn pairing_rejected(world: &mut PairingWorld, name: String, reason: String) {
    match world.next_message(&name) {
        Some(OutboundMessage::PairingResult {
            response: Response::Rejected,
            message: Some(message),
            ..
        }) => assert_eq!(message, reason),
        other => panic!("expected a pairing rejection, got {other:?}"),
    }
}

#[then(expr = "{string} is in phase {string}")]
pub async fn is_in_phase(world: &mut PairingWorld, name: String, phase: String) {
    let expected: Phase = serde_json::from_value(serde_json::Value::String(phase)).unwrap();
    assert_eq!(world.phase(&name).await, expected);
}

#[then(expr = "{string} receives nothing")]
pub async fn receives_nothing(world: &mut PairingWorld, name: String) {
    assert_eq!(world.drain(&name), Vec::new());
}

fn assert_rejected(world: &mut PairingWorld, name: &str, reason: &str) {
    match world.next_message(name) {
        Some(OutboundMessage::RegisterResult {
            response: Response::Rejected,
            message: Some(message),
        }) => assert_eq!(message, reason),
        other => panic!("expected a registration rejection, got {other:?}"),
    }
}

use super::pairing_steps::are_paired;
use crate::PairingWorld;
use cucumber::{given, then, when};
use duo_session::prelude::*;

#[given(expr = "{string} and {string} are in the review window")]
async fn in_review_window(world: &mut PairingWorld, first: String, second: String) {
    are_paired(world, first.clone(), second.clone()).await;
    for message in [InboundMessage::ConfirmMediaReady, InboundMessage::StartRound] {
        world.send(&first, message.clone()).await;
        world.send(&second, message).await;
    }
    assert_eq!(world.phase(&first).await, Phase::ReviewPrompt);
    world.drain(&first);
    world.drain(&second);
}

#[when(expr = "{string} confirms media is ready")]
async fn confirms_media(world: &mut PairingWorld, name: String) {
    world.send(&name, InboundMessage::ConfirmMediaReady).await;
}

#[when(expr = "{string} starts the round")]
async fn starts_round(world: &mut PairingWorld, name: String) {
    world.send(&name, InboundMessage::StartRound).await;
}

#[when(expr = "{string} submits the first decision {string}")]
async fn submits_first(world: &mut PairingWorld, name: String, decision: String) {
    world
        .send(&name, InboundMessage::SubmitFirstDecision { decision })
        .await;
}

#[when(expr = "{string} submits the second decision {string}")]
async fn submits_second(world: &mut PairingWorld, name: String, decision: String) {
    world
        .send(&name, InboundMessage::SubmitSecondDecision { decision })
        .await;
}

#[when("the timed window has passed")]
async fn window_passed(world: &mut PairingWorld) {
    let durations = world.router.synchronizer().durations();
    tokio::time::sleep((durations.review + durations.first_query) * 3).await;
}

#[when("the first query has closed")]
async fn first_query_closed(world: &mut PairingWorld) {
    let durations = world.router.synchronizer().durations();
    tokio::time::sleep((durations.review + durations.first_query) * 2).await;
}

#[then(expr = "{string} is assigned the role {string}")]
async fn assigned_role(world: &mut PairingWorld, name: String, role: String) {
    let expected: Role = serde_json::from_value(serde_json::Value::String(role)).unwrap();
    assert_eq!(
        world.next_message(&name),
        Some(OutboundMessage::RoleAssignment { role: expected })
    );
}

#[then(expr = "{string} sees the image {string}")]
async fn sees_image(world: &mut PairingWorld, name: String, image: String) {
    assert_eq!(
        world.next_message(&name),
        Some(OutboundMessage::StartReview { src: Some(image) })
    );
}

#[then(expr = "{string} gets a review cue without an image")]
async fn review_cue(world: &mut PairingWorld, name: String) {
    assert_eq!(
        world.next_message(&name),
        Some(OutboundMessage::StartReview { src: None })
    );
}

#[then(expr = "{string} is asked for the first decision")]
async fn asked_first(world: &mut PairingWorld, name: String) {
    let messages = world.drain(&name);
    assert_eq!(
        messages.last(),
        Some(&OutboundMessage::GetFirstDecision),
        "got {messages:?}"
    );
}

#[then(expr = "{string} receives the hint {string}")]
async fn receives_hint(world: &mut PairingWorld, name: String, hint: String) {
    assert_eq!(
        world.next_message(&name),
        Some(OutboundMessage::Hint { hint })
    );
}

#[then(expr = "{string} is told the second query started")]
async fn second_query_started(world: &mut PairingWorld, name: String) {
    let messages = world.drain(&name);
    assert!(
        messages.contains(&OutboundMessage::StartSecondQuery),
        "got {messages:?}"
    );
}

use futures_util::{SinkExt, StreamExt};
use parlor_server::{app, AppState};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message, MaybeTlsStream,
    WebSocketStream};

type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

async fn start_server() -> SocketAddr {
    let app = app(AppState::new());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

async fn send(ws: &mut WsClient, frame: Value) {
    ws.send(Message::Text(frame.to_string().into()))
        .await
        .expect("failed to send");
}

async fn recv_until(ws: &mut WsClient, event_type: &str) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {event_type}"))
            .expect("connection closed")
            .expect("transport error");
        if let Message::Text(text) = msg {
            let frame: Value = serde_json::from_str(&text).expect("invalid json frame");
            if frame["type"] == event_type {
                return frame;
            }
        }
    }
}

/// Connects, declares a name, joins the fireside room, and returns the
/// client plus its session id.
async fn seated_member(addr: SocketAddr, name: &str) -> (WsClient, String) {
    let (mut ws, _) = connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("failed to connect");
    let welcome = recv_until(&mut ws, "session.welcome").await;
    let id = welcome["id"].as_str().unwrap().to_string();
    send(&mut ws, json!({ "type": "hello", "name": name, "badge": "" })).await;
    send(&mut ws, json!({ "type": "room.join", "roomId": "fireside" })).await;
    recv_until(&mut ws, "room.state").await;
    (ws, id)
}

#[tokio::test]
async fn joiner_gets_peers_and_the_seated_get_new_peer() {
    let addr = start_server().await;
    let (mut ana, ana_id) = seated_member(addr, "ana").await;
    let (mut ben, ben_id) = seated_member(addr, "ben").await;

    send(
        &mut ana,
        json!({ "type": "voice.join", "roomId": "fireside", "channelId": "main" }),
    )
    .await;
    let peers = recv_until(&mut ana, "voice.peers").await;
    assert_eq!(peers["channelId"], "main");
    assert!(peers["peers"].as_array().unwrap().is_empty());

    send(
        &mut ben,
        json!({ "type": "voice.join", "roomId": "fireside", "channelId": "main" }),
    )
    .await;
    let peers = recv_until(&mut ben, "voice.peers").await;
    assert_eq!(peers["peers"].as_array().unwrap().len(), 1);
    assert_eq!(peers["peers"][0]["id"], ana_id.as_str());

    let new_peer = recv_until(&mut ana, "voice.new-peer").await;
    assert_eq!(new_peer["peer"]["id"], ben_id.as_str());
    assert_eq!(new_peer["peer"]["name"], "ben");

    let counts = recv_until(&mut ana, "voice.counts").await;
    let main = counts["counts"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == "main")
        .unwrap();
    assert_eq!(main["count"], 2);
}

#[tokio::test]
async fn signals_relay_between_co_members_and_forgeries_are_dropped() {
    let addr = start_server().await;
    let (mut ana, ana_id) = seated_member(addr, "ana").await;
    let (mut ben, ben_id) = seated_member(addr, "ben").await;
    let (mut mallory, _) = seated_member(addr, "mallory").await;

    send(
        &mut ana,
        json!({ "type": "voice.join", "roomId": "fireside", "channelId": "main" }),
    )
    .await;
    recv_until(&mut ana, "voice.peers").await;
    send(
        &mut ben,
        json!({ "type": "voice.join", "roomId": "fireside", "channelId": "main" }),
    )
    .await;
    recv_until(&mut ben, "voice.peers").await;

    // Mallory is in the room but not in the channel; her forged offer
    // must never reach ana.
    send(
        &mut mallory,
        json!({ "type": "voice.signal", "to": ana_id, "channelId": "main",
            "kind": "offer", "data": { "sdp": "forged" } }),
    )
    .await;
    send(
        &mut ben,
        json!({ "type": "voice.signal", "to": ana_id, "channelId": "main",
            "kind": "offer", "data": { "sdp": "legit" } }),
    )
    .await;

    let signal = recv_until(&mut ana, "voice.signal").await;
    assert_eq!(signal["from"], ben_id.as_str());
    assert_eq!(signal["kind"], "offer");
    assert_eq!(signal["data"]["sdp"], "legit");

    // The answer relays back.
    send(
        &mut ana,
        json!({ "type": "voice.signal", "to": ben_id, "channelId": "main",
            "kind": "answer", "data": { "sdp": "a" } }),
    )
    .await;
    let signal = recv_until(&mut ben, "voice.signal").await;
    assert_eq!(signal["from"], ana_id.as_str());
    assert_eq!(signal["kind"], "answer");
}

#[tokio::test]
async fn deafen_forces_mute_in_the_participant_list() {
    let addr = start_server().await;
    let (mut ana, ana_id) = seated_member(addr, "ana").await;
    send(
        &mut ana,
        json!({ "type": "voice.join", "roomId": "fireside", "channelId": "main" }),
    )
    .await;
    recv_until(&mut ana, "voice.peers").await;
    // Drain the participant list emitted by the join itself.
    recv_until(&mut ana, "voice.channel.participants").await;

    send(
        &mut ana,
        json!({ "type": "voice.state", "channelId": "main", "muted": false, "deafened": true }),
    )
    .await;
    let list = recv_until(&mut ana, "voice.channel.participants").await;
    let me = list["participants"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["id"] == ana_id.as_str())
        .unwrap();
    assert_eq!(me["muted"], true);
    assert_eq!(me["deafened"], true);
}

#[tokio::test]
async fn speaking_transitions_reach_the_whole_room() {
    let addr = start_server().await;
    let (mut ana, ana_id) = seated_member(addr, "ana").await;
    let (mut ben, _) = seated_member(addr, "ben").await;
    // Cara shares the room but holds no voice seat.
    let (mut cara, _) = seated_member(addr, "cara").await;
    send(
        &mut ana,
        json!({ "type": "voice.join", "roomId": "fireside", "channelId": "main" }),
    )
    .await;
    recv_until(&mut ana, "voice.peers").await;
    send(
        &mut ben,
        json!({ "type": "voice.join", "roomId": "fireside", "channelId": "main" }),
    )
    .await;
    recv_until(&mut ben, "voice.peers").await;

    send(
        &mut ana,
        json!({ "type": "voice.speaking", "channelId": "main", "speaking": true }),
    )
    .await;
    let speaking = recv_until(&mut ben, "voice.speaking").await;
    assert_eq!(speaking["id"], ana_id.as_str());
    assert_eq!(speaking["speaking"], true);

    // The idle room member sees the indicator as well.
    let speaking = recv_until(&mut cara, "voice.speaking").await;
    assert_eq!(speaking["id"], ana_id.as_str());
    assert_eq!(speaking["speaking"], true);
}

#[tokio::test]
async fn leaving_voice_notifies_remaining_peers() {
    let addr = start_server().await;
    let (mut ana, ana_id) = seated_member(addr, "ana").await;
    let (mut ben, _) = seated_member(addr, "ben").await;
    send(
        &mut ana,
        json!({ "type": "voice.join", "roomId": "fireside", "channelId": "main" }),
    )
    .await;
    recv_until(&mut ana, "voice.peers").await;
    send(
        &mut ben,
        json!({ "type": "voice.join", "roomId": "fireside", "channelId": "main" }),
    )
    .await;
    recv_until(&mut ben, "voice.peers").await;

    send(&mut ana, json!({ "type": "voice.leave", "roomId": "fireside" })).await;
    let left = recv_until(&mut ben, "voice.peer-left").await;
    assert_eq!(left["id"], ana_id.as_str());
    assert_eq!(left["channelId"], "main");
}

#[tokio::test]
async fn changing_rooms_evicts_from_voice() {
    let addr = start_server().await;
    let (mut ana, ana_id) = seated_member(addr, "ana").await;
    let (mut ben, _) = seated_member(addr, "ben").await;
    send(
        &mut ana,
        json!({ "type": "voice.join", "roomId": "fireside", "channelId": "main" }),
    )
    .await;
    recv_until(&mut ana, "voice.peers").await;
    send(
        &mut ben,
        json!({ "type": "voice.join", "roomId": "fireside", "channelId": "main" }),
    )
    .await;
    recv_until(&mut ben, "voice.peers").await;

    send(&mut ana, json!({ "type": "room.join", "roomId": "garden" })).await;
    let left = recv_until(&mut ben, "voice.peer-left").await;
    assert_eq!(left["id"], ana_id.as_str());

    let list = recv_until(&mut ben, "voice.channel.participants").await;
    assert_eq!(list["participants"].as_array().unwrap().len(), 1);
}

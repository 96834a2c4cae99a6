//! WebSocket API handler and connection management.
//!
//! Each connection gets one session in the directory and one bounded
//! outbound queue. Handlers lock the hub, mutate, and collect the
//! frames to deliver; delivery happens after the lock drops, so a slow
//! socket can never stall another session's event.

use crate::AppState;
use axum::{
    extract::{
        ws::{Message as AxumMessage, WebSocket},
        ConnectInfo, Extension, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use parlor_presence as presence;
use parlor_rooms::{Directory, Message, Reaction, RoomMeta};
use parlor_types::{
    ChannelCount, ChannelSummary, Identity, RoomSummary, RosterEntry, SessionId, SignalKind,
    VoiceParticipant,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// Outbound queue depth per connection. Beyond this the client is too
/// slow and frames are dropped.
const SESSION_QUEUE_DEPTH: usize = 256;

/// Manages active WebSocket connections.
#[derive(Clone, Default)]
pub struct ConnectionManager {
    /// Active sessions: session id -> outbound sender.
    sessions: Arc<RwLock<HashMap<SessionId, mpsc::Sender<String>>>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registers the outbound queue for a new session.
    pub async fn add_session(&self, session: SessionId, sender: mpsc::Sender<String>) {
        self.sessions.write().await.insert(session, sender);
    }

    /// Drops a session's outbound queue.
    pub async fn remove_session(&self, session: SessionId) {
        self.sessions.write().await.remove(&session);
    }

    /// Sends a frame to one session. Slow consumers have the frame
    /// dropped rather than queued without bound.
    pub async fn send(&self, session: SessionId, frame: String) {
        let sessions = self.sessions.read().await;
        if let Some(sender) = sessions.get(&session) {
            if let Err(e) = sender.try_send(frame) {
                tracing::warn!(
                    session = %session,
                    "dropping frame for slow consumer: {}",
                    e
                );
            }
        }
    }

    /// Sends one frame to a list of sessions.
    pub async fn send_many(&self, targets: &[SessionId], frame: &str) {
        let sessions = self.sessions.read().await;
        for target in targets {
            if let Some(sender) = sessions.get(target) {
                if let Err(e) = sender.try_send(frame.to_string()) {
                    tracing::warn!(
                        session = %target,
                        "dropping broadcast frame for slow consumer: {}",
                        e
                    );
                }
            }
        }
    }

    /// Sends one frame to every connected session.
    pub async fn send_all(&self, frame: &str) {
        let sessions = self.sessions.read().await;
        for (session, sender) in sessions.iter() {
            if let Err(e) = sender.try_send(frame.to_string()) {
                tracing::warn!(
                    session = %session,
                    "dropping global frame for slow consumer: {}",
                    e
                );
            }
        }
    }
}

/// Incoming WebSocket event types.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "hello")]
    Hello {
        #[serde(default)]
        name: String,
        #[serde(default)]
        badge: String,
    },
    #[serde(rename = "lobby.get")]
    LobbyGet,
    #[serde(rename = "room.join")]
    RoomJoin {
        #[serde(rename = "roomId")]
        room_id: String,
    },
    #[serde(rename = "room.create")]
    RoomCreate {
        name: String,
        id: Option<String>,
    },
    #[serde(rename = "typing.set")]
    TypingSet {
        #[serde(rename = "roomId")]
        room_id: String,
        #[serde(rename = "isTyping")]
        is_typing: bool,
    },
    #[serde(rename = "message.send")]
    MessageSend {
        #[serde(rename = "roomId")]
        room_id: String,
        text: String,
    },
    #[serde(rename = "message.react")]
    MessageReact {
        #[serde(rename = "roomId")]
        room_id: String,
        #[serde(rename = "msgId")]
        msg_id: String,
        emoji: String,
    },
    #[serde(rename = "voice.join")]
    VoiceJoin {
        #[serde(rename = "roomId")]
        room_id: String,
        #[serde(rename = "channelId")]
        channel_id: String,
    },
    #[serde(rename = "voice.leave")]
    VoiceLeave {
        #[serde(rename = "roomId")]
        room_id: String,
    },
    #[serde(rename = "voice.signal")]
    VoiceSignal {
        to: SessionId,
        #[serde(rename = "channelId")]
        channel_id: String,
        kind: SignalKind,
        data: Value,
    },
    #[serde(rename = "voice.state")]
    VoiceState {
        #[serde(rename = "channelId")]
        channel_id: String,
        muted: bool,
        deafened: bool,
    },
    #[serde(rename = "voice.speaking")]
    VoiceSpeaking {
        #[serde(rename = "channelId")]
        channel_id: String,
        speaking: bool,
    },
}

/// Outgoing WebSocket event types.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "session.welcome")]
    Welcome { id: SessionId, identity: Identity },
    #[serde(rename = "lobby.rooms")]
    LobbyRooms { rooms: Vec<RoomSummary> },
    #[serde(rename = "room.state")]
    RoomState {
        room: RoomMeta,
        roster: Vec<RosterEntry>,
        messages: Vec<Message>,
        #[serde(rename = "voiceChannels")]
        voice_channels: Vec<ChannelSummary>,
    },
    #[serde(rename = "room.roster")]
    RoomRoster {
        #[serde(rename = "roomId")]
        room_id: String,
        roster: Vec<RosterEntry>,
    },
    #[serde(rename = "typing.list")]
    TypingList {
        #[serde(rename = "roomId")]
        room_id: String,
        names: Vec<String>,
    },
    #[serde(rename = "message.new")]
    MessageNew { message: Message },
    #[serde(rename = "message.reactions")]
    MessageReactions {
        #[serde(rename = "roomId")]
        room_id: String,
        #[serde(rename = "msgId")]
        msg_id: String,
        reactions: BTreeMap<String, Reaction>,
    },
    #[serde(rename = "voice.peers")]
    VoicePeers {
        #[serde(rename = "channelId")]
        channel_id: String,
        peers: Vec<RosterEntry>,
    },
    #[serde(rename = "voice.new-peer")]
    VoiceNewPeer {
        #[serde(rename = "channelId")]
        channel_id: String,
        peer: RosterEntry,
    },
    #[serde(rename = "voice.peer-left")]
    VoicePeerLeft {
        #[serde(rename = "channelId")]
        channel_id: String,
        id: SessionId,
    },
    #[serde(rename = "voice.signal")]
    VoiceSignal {
        from: SessionId,
        #[serde(rename = "channelId")]
        channel_id: String,
        kind: SignalKind,
        data: Value,
    },
    #[serde(rename = "voice.speaking")]
    VoiceSpeaking {
        id: SessionId,
        #[serde(rename = "channelId")]
        channel_id: String,
        speaking: bool,
    },
    #[serde(rename = "voice.channel.participants")]
    VoiceParticipants {
        #[serde(rename = "channelId")]
        channel_id: String,
        participants: Vec<VoiceParticipant>,
    },
    #[serde(rename = "voice.counts")]
    VoiceCounts {
        #[serde(rename = "roomId")]
        room_id: String,
        counts: Vec<ChannelCount>,
    },
    #[serde(rename = "system.notice")]
    SystemNotice {
        kind: String,
        title: String,
        message: String,
    },
    #[serde(rename = "error")]
    Error { message: String },
}

/// Who a collected frame goes to.
#[derive(Debug)]
enum Audience {
    One(SessionId),
    Many(Vec<SessionId>),
    Everyone,
}

/// A frame collected under the hub lock, delivered after release.
#[derive(Debug)]
struct Outbound {
    audience: Audience,
    event: ServerEvent,
}

impl Outbound {
    fn to(session: SessionId, event: ServerEvent) -> Self {
        Self {
            audience: Audience::One(session),
            event,
        }
    }

    fn many(targets: Vec<SessionId>, event: ServerEvent) -> Self {
        Self {
            audience: Audience::Many(targets),
            event,
        }
    }

    fn everyone(event: ServerEvent) -> Self {
        Self {
            audience: Audience::Everyone,
            event,
        }
    }
}

/// Serializes and fans out a batch of collected frames.
async fn deliver(connections: &ConnectionManager, frames: Vec<Outbound>) {
    for frame in frames {
        let json = match serde_json::to_string(&frame.event) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("failed to serialize outbound frame: {}", e);
                continue;
            }
        };
        match frame.audience {
            Audience::One(session) => connections.send(session, json).await,
            Audience::Many(targets) => connections.send_many(&targets, &json).await,
            Audience::Everyone => connections.send_all(&json).await,
        }
    }
}

fn members_of(dir: &Directory, room_id: &str) -> Vec<SessionId> {
    dir.room(room_id)
        .map(|r| r.members.iter().copied().collect())
        .unwrap_or_default()
}

fn members_except(dir: &Directory, room_id: &str, excluded: SessionId) -> Vec<SessionId> {
    dir.room(room_id)
        .map(|r| {
            r.members
                .iter()
                .copied()
                .filter(|sid| *sid != excluded)
                .collect()
        })
        .unwrap_or_default()
}

fn channel_members(dir: &Directory, room_id: &str, channel_id: &str) -> Vec<SessionId> {
    dir.room(room_id)
        .and_then(|r| r.channel(channel_id))
        .map(|c| c.members.iter().copied().collect())
        .unwrap_or_default()
}

fn lobby_frame(dir: &Directory) -> Outbound {
    Outbound::everyone(ServerEvent::LobbyRooms {
        rooms: presence::lobby_summary(dir),
    })
}

/// Voice occupancy changed in one channel: refresh the participant
/// list and counts for the room that owns it.
fn voice_refresh(dir: &Directory, room_id: &str, channel_id: &str) -> Vec<Outbound> {
    let members = members_of(dir, room_id);
    vec![
        Outbound::many(
            members.clone(),
            ServerEvent::VoiceParticipants {
                channel_id: channel_id.to_string(),
                participants: presence::participants(dir, room_id, channel_id),
            },
        ),
        Outbound::many(
            members,
            ServerEvent::VoiceCounts {
                room_id: room_id.to_string(),
                counts: presence::channel_counts(dir, room_id),
            },
        ),
    ]
}

/// WebSocket handler: `GET /ws`.
///
/// Identity is self-declared after connect via a `hello` frame; the
/// upgrade itself is unauthenticated.
pub async fn ws_handler(
    Extension(state): Extension<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    tracing::debug!(remote_addr = %addr, "websocket connect");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handles the WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Bounded queue; slow consumers get frames dropped, never buffered
    // without limit.
    let (tx, mut rx) = mpsc::channel::<String>(SESSION_QUEUE_DEPTH);

    let session = state.hub.lock().await.connect();
    state.connections.add_session(session, tx).await;
    tracing::info!(session = %session, "session connected");

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(AxumMessage::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    // Initial frames: the assigned id, then the lobby.
    let initial = {
        let dir = state.hub.lock().await;
        let identity = dir
            .session(session)
            .map(|s| s.identity())
            .unwrap_or(Identity {
                id: session,
                name: String::new(),
                badge: String::new(),
            });
        vec![
            Outbound::to(
                session,
                ServerEvent::Welcome {
                    id: session,
                    identity,
                },
            ),
            Outbound::to(
                session,
                ServerEvent::LobbyRooms {
                    rooms: presence::lobby_summary(&dir),
                },
            ),
        ]
    };
    deliver(&state.connections, initial).await;

    while let Some(Ok(msg)) = receiver.next().await {
        if let AxumMessage::Text(text) = msg {
            match serde_json::from_str::<ClientEvent>(text.as_str()) {
                Ok(event) => dispatch(&state, session, event).await,
                Err(e) => {
                    // Out-of-invariant requests are silent no-ops, but a
                    // frame we cannot even parse gets an error back.
                    tracing::debug!(session = %session, "unparseable frame: {}", e);
                    deliver(
                        &state.connections,
                        vec![Outbound::to(
                            session,
                            ServerEvent::Error {
                                message: "unrecognized frame".to_string(),
                            },
                        )],
                    )
                    .await;
                }
            }
        }
    }

    let frames = {
        let mut dir = state.hub.lock().await;
        disconnect_frames(&mut dir, session)
    };
    state.connections.remove_session(session).await;
    deliver(&state.connections, frames).await;
    send_task.abort();
    tracing::info!(session = %session, "session disconnected");
}

async fn dispatch(state: &Arc<AppState>, session: SessionId, event: ClientEvent) {
    let frames = {
        let mut dir = state.hub.lock().await;
        match event {
            ClientEvent::Hello { name, badge } => on_hello(&mut dir, session, &name, &badge),
            ClientEvent::LobbyGet => vec![Outbound::to(
                session,
                ServerEvent::LobbyRooms {
                    rooms: presence::lobby_summary(&dir),
                },
            )],
            ClientEvent::RoomJoin { room_id } => on_room_join(&mut dir, session, &room_id),
            ClientEvent::RoomCreate { name, id } => {
                on_room_create(&mut dir, session, &name, id.as_deref())
            }
            ClientEvent::TypingSet { room_id, is_typing } => {
                on_typing_set(&mut dir, session, &room_id, is_typing)
            }
            ClientEvent::MessageSend { room_id, text } => {
                on_message_send(&mut dir, session, &room_id, &text)
            }
            ClientEvent::MessageReact {
                room_id,
                msg_id,
                emoji,
            } => on_message_react(&mut dir, session, &room_id, &msg_id, &emoji),
            ClientEvent::VoiceJoin {
                room_id,
                channel_id,
            } => on_voice_join(&mut dir, session, &room_id, &channel_id),
            ClientEvent::VoiceLeave { room_id } => on_voice_leave(&mut dir, session, &room_id),
            ClientEvent::VoiceSignal {
                to,
                channel_id,
                kind,
                data,
            } => on_voice_signal(&dir, session, to, &channel_id, kind, data),
            ClientEvent::VoiceState {
                channel_id,
                muted,
                deafened,
            } => on_voice_state(&mut dir, session, &channel_id, muted, deafened),
            ClientEvent::VoiceSpeaking {
                channel_id,
                speaking,
            } => on_voice_speaking(&mut dir, session, &channel_id, speaking),
        }
    };
    deliver(&state.connections, frames).await;
}

fn on_hello(dir: &mut Directory, session: SessionId, name: &str, badge: &str) -> Vec<Outbound> {
    let Some(identity) = dir.hello(session, name, badge) else {
        return Vec::new();
    };
    tracing::debug!(session = %session, name = %identity.name, "identity declared");

    // A rename is visible wherever the session already appears.
    let mut frames = Vec::new();
    if let Some(room_id) = dir.room_of(session).cloned() {
        frames.push(Outbound::many(
            members_of(dir, &room_id),
            ServerEvent::RoomRoster {
                room_id: room_id.clone(),
                roster: presence::roster(dir, &room_id),
            },
        ));
        if let Some(channel_id) = dir
            .session(session)
            .and_then(|s| s.voice_channel.clone())
        {
            frames.extend(voice_refresh(dir, &room_id, &channel_id));
        }
    }
    frames
}

fn on_room_join(dir: &mut Directory, session: SessionId, room_id: &str) -> Vec<Outbound> {
    let Some(outcome) = dir.join_room(session, room_id) else {
        return Vec::new();
    };
    let mut frames = Vec::new();

    // Presence updates for the room left behind.
    if let Some(left) = &outcome.left {
        if let Some(channel_id) = &left.voice_channel {
            frames.push(Outbound::many(
                channel_members(dir, &left.room_id, channel_id),
                ServerEvent::VoicePeerLeft {
                    channel_id: channel_id.clone(),
                    id: session,
                },
            ));
            frames.extend(voice_refresh(dir, &left.room_id, channel_id));
        }
        frames.push(Outbound::many(
            members_of(dir, &left.room_id),
            ServerEvent::RoomRoster {
                room_id: left.room_id.clone(),
                roster: presence::roster(dir, &left.room_id),
            },
        ));
        frames.push(Outbound::many(
            members_of(dir, &left.room_id),
            ServerEvent::TypingList {
                room_id: left.room_id.clone(),
                names: dir.typing_names(&left.room_id),
            },
        ));
        frames.push(Outbound::many(
            members_of(dir, &left.room_id),
            ServerEvent::SystemNotice {
                kind: "presence".to_string(),
                title: "Left room".to_string(),
                message: format!("{} stepped away.", outcome.identity.name),
            },
        ));
    }

    let room_name = outcome.snapshot.room.name.clone();
    frames.push(Outbound::many(
        members_of(dir, room_id),
        ServerEvent::SystemNotice {
            kind: "presence".to_string(),
            title: "Joined room".to_string(),
            message: format!("{} entered {}.", outcome.identity.name, room_name),
        },
    ));
    frames.push(Outbound::to(
        session,
        ServerEvent::RoomState {
            room: outcome.snapshot.room,
            roster: presence::roster(dir, room_id),
            messages: outcome.snapshot.messages,
            voice_channels: outcome.snapshot.channels,
        },
    ));
    frames.push(Outbound::many(
        members_of(dir, room_id),
        ServerEvent::RoomRoster {
            room_id: room_id.to_string(),
            roster: presence::roster(dir, room_id),
        },
    ));
    frames.push(lobby_frame(dir));
    frames
}

fn on_room_create(
    dir: &mut Directory,
    session: SessionId,
    name: &str,
    id: Option<&str>,
) -> Vec<Outbound> {
    let Some(room_id) = dir.create_room(name, id) else {
        return Vec::new();
    };
    let room_name = dir
        .room(&room_id)
        .map(|r| r.name.clone())
        .unwrap_or_default();
    vec![
        lobby_frame(dir),
        Outbound::to(
            session,
            ServerEvent::SystemNotice {
                kind: "info".to_string(),
                title: "Room created".to_string(),
                message: format!("{room_name} is open."),
            },
        ),
    ]
}

fn on_typing_set(
    dir: &mut Directory,
    session: SessionId,
    room_id: &str,
    is_typing: bool,
) -> Vec<Outbound> {
    if !dir.set_typing(session, room_id, is_typing) {
        return Vec::new();
    }
    vec![Outbound::many(
        members_except(dir, room_id, session),
        ServerEvent::TypingList {
            room_id: room_id.to_string(),
            names: dir.typing_names(room_id),
        },
    )]
}

fn on_message_send(
    dir: &mut Directory,
    session: SessionId,
    room_id: &str,
    text: &str,
) -> Vec<Outbound> {
    let Some(message) = dir.send_message(session, room_id, text) else {
        return Vec::new();
    };
    vec![
        Outbound::many(
            members_of(dir, room_id),
            ServerEvent::MessageNew { message },
        ),
        // Sending clears the author's typing flag.
        Outbound::many(
            members_except(dir, room_id, session),
            ServerEvent::TypingList {
                room_id: room_id.to_string(),
                names: dir.typing_names(room_id),
            },
        ),
    ]
}

fn on_message_react(
    dir: &mut Directory,
    session: SessionId,
    room_id: &str,
    msg_id: &str,
    emoji: &str,
) -> Vec<Outbound> {
    let Some((msg_id, reactions)) = dir.react(session, room_id, msg_id, emoji) else {
        return Vec::new();
    };
    vec![Outbound::many(
        members_of(dir, room_id),
        ServerEvent::MessageReactions {
            room_id: room_id.to_string(),
            msg_id,
            reactions,
        },
    )]
}

fn on_voice_join(
    dir: &mut Directory,
    session: SessionId,
    room_id: &str,
    channel_id: &str,
) -> Vec<Outbound> {
    let Some(join) = parlor_voice::join_voice(dir, session, room_id, channel_id) else {
        return Vec::new();
    };
    let mut frames = Vec::new();

    if let Some((evicted_room, evicted_channel)) = &join.evicted {
        frames.push(Outbound::many(
            channel_members(dir, evicted_room, evicted_channel),
            ServerEvent::VoicePeerLeft {
                channel_id: evicted_channel.clone(),
                id: session,
            },
        ));
        if evicted_room != room_id || evicted_channel != channel_id {
            frames.extend(voice_refresh(dir, evicted_room, evicted_channel));
        }
    }

    // The joiner initiates toward everyone already present.
    frames.push(Outbound::to(
        session,
        ServerEvent::VoicePeers {
            channel_id: channel_id.to_string(),
            peers: join.peers.clone(),
        },
    ));
    let others: Vec<SessionId> = channel_members(dir, room_id, channel_id)
        .into_iter()
        .filter(|sid| *sid != session)
        .collect();
    frames.push(Outbound::many(
        others,
        ServerEvent::VoiceNewPeer {
            channel_id: channel_id.to_string(),
            peer: RosterEntry {
                id: session,
                name: join.identity.name.clone(),
                badge: join.identity.badge.clone(),
            },
        },
    ));

    frames.extend(voice_refresh(dir, room_id, channel_id));
    frames.push(lobby_frame(dir));
    frames
}

fn on_voice_leave(dir: &mut Directory, session: SessionId, room_id: &str) -> Vec<Outbound> {
    let Some(leave) = parlor_voice::leave_voice(dir, session, room_id) else {
        return Vec::new();
    };
    let mut frames = vec![Outbound::many(
        leave.remaining.clone(),
        ServerEvent::VoicePeerLeft {
            channel_id: leave.channel.clone(),
            id: session,
        },
    )];
    frames.extend(voice_refresh(dir, room_id, &leave.channel));
    frames.push(lobby_frame(dir));
    frames
}

fn on_voice_signal(
    dir: &Directory,
    session: SessionId,
    to: SessionId,
    channel_id: &str,
    kind: SignalKind,
    data: Value,
) -> Vec<Outbound> {
    let Some(room_id) = dir.room_of(session) else {
        return Vec::new();
    };
    if !parlor_voice::authorize_relay(dir, session, to, room_id, channel_id) {
        // Dropped identically whether the target is absent or merely
        // seated elsewhere.
        tracing::debug!(session = %session, "unauthorized signal dropped");
        return Vec::new();
    }
    vec![Outbound::to(
        to,
        ServerEvent::VoiceSignal {
            from: session,
            channel_id: channel_id.to_string(),
            kind,
            data,
        },
    )]
}

fn on_voice_state(
    dir: &mut Directory,
    session: SessionId,
    channel_id: &str,
    muted: bool,
    deafened: bool,
) -> Vec<Outbound> {
    let Some(room_id) = dir.room_of(session).cloned() else {
        return Vec::new();
    };
    if !parlor_voice::set_state(dir, session, &room_id, channel_id, muted, deafened) {
        return Vec::new();
    }
    voice_refresh(dir, &room_id, channel_id)
}

fn on_voice_speaking(
    dir: &mut Directory,
    session: SessionId,
    channel_id: &str,
    speaking: bool,
) -> Vec<Outbound> {
    let Some(room_id) = dir.room_of(session).cloned() else {
        return Vec::new();
    };
    if !parlor_voice::set_speaking(dir, session, &room_id, channel_id, speaking) {
        return Vec::new();
    }
    // The whole room sees the indicator, not just the seated peers.
    // Hot path: only the one transition goes out, not a full list.
    let others = members_except(dir, &room_id, session);
    vec![Outbound::many(
        others,
        ServerEvent::VoiceSpeaking {
            id: session,
            channel_id: channel_id.to_string(),
            speaking,
        },
    )]
}

/// Frames for a closed connection: same presence updates as an
/// explicit room leave.
fn disconnect_frames(dir: &mut Directory, session: SessionId) -> Vec<Outbound> {
    let Some(departure) = dir.disconnect(session) else {
        return Vec::new();
    };
    let mut frames = Vec::new();
    if let Some(left) = departure.left {
        if let Some(channel_id) = &left.voice_channel {
            frames.push(Outbound::many(
                channel_members(dir, &left.room_id, channel_id),
                ServerEvent::VoicePeerLeft {
                    channel_id: channel_id.clone(),
                    id: session,
                },
            ));
            frames.extend(voice_refresh(dir, &left.room_id, channel_id));
        }
        frames.push(Outbound::many(
            members_of(dir, &left.room_id),
            ServerEvent::RoomRoster {
                room_id: left.room_id.clone(),
                roster: presence::roster(dir, &left.room_id),
            },
        ));
        frames.push(Outbound::many(
            members_of(dir, &left.room_id),
            ServerEvent::TypingList {
                room_id: left.room_id.clone(),
                names: dir.typing_names(&left.room_id),
            },
        ));
        frames.push(Outbound::many(
            members_of(dir, &left.room_id),
            ServerEvent::SystemNotice {
                kind: "presence".to_string(),
                title: "Left room".to_string(),
                message: format!("{} stepped away.", departure.identity.name),
            },
        ));
        frames.push(lobby_frame(dir));
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_events_parse_from_tagged_frames() {
        let frame = json!({ "type": "hello", "name": "ana", "badge": "Host" });
        let event: ClientEvent = serde_json::from_value(frame).unwrap();
        assert!(matches!(event, ClientEvent::Hello { ref name, .. } if name == "ana"));

        let frame = json!({ "type": "voice.signal", "to": SessionId::new(),
            "channelId": "main", "kind": "offer", "data": { "sdp": "x" } });
        let event: ClientEvent = serde_json::from_value(frame).unwrap();
        assert!(matches!(
            event,
            ClientEvent::VoiceSignal {
                kind: SignalKind::Offer,
                ..
            }
        ));

        let event: ClientEvent = serde_json::from_value(json!({ "type": "lobby.get" })).unwrap();
        assert!(matches!(event, ClientEvent::LobbyGet));
    }

    #[test]
    fn server_events_carry_dotted_type_tags() {
        let frame = serde_json::to_value(ServerEvent::VoicePeerLeft {
            channel_id: "main".to_string(),
            id: SessionId::new(),
        })
        .unwrap();
        assert_eq!(frame["type"], "voice.peer-left");
        assert_eq!(frame["channelId"], "main");

        let frame = serde_json::to_value(ServerEvent::TypingList {
            room_id: "fireside".to_string(),
            names: vec!["ana".to_string()],
        })
        .unwrap();
        assert_eq!(frame["type"], "typing.list");
        assert_eq!(frame["names"][0], "ana");
    }

    #[test]
    fn unknown_event_type_fails_to_parse() {
        let err = serde_json::from_value::<ClientEvent>(json!({ "type": "admin.shutdown" }));
        assert!(err.is_err());
    }
}

//! The process-wide registry of sessions and rooms.

use crate::message::{Message, Reaction};
use crate::room::{Room, RoomMeta, DEFAULT_ROOM_DESCRIPTION, SEED_ROOMS};
use crate::session::{truncate_chars, Session};
use parlor_types::{limits, ChannelId, ChannelSummary, Identity, RoomId, SessionId};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::{BTreeMap, HashMap};

/// What a session left behind when it changed rooms or disconnected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeftRoom {
    pub room_id: RoomId,
    /// The voice channel the session was evicted from, if it was in one.
    pub voice_channel: Option<ChannelId>,
}

/// Result of a successful room join.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    /// The joiner's identity at join time.
    pub identity: Identity,
    /// The room the session was removed from first, if any.
    pub left: Option<LeftRoom>,
    /// Full-state snapshot for the joining session only.
    pub snapshot: RoomSnapshot,
}

/// The initial view of a room sent to a joiner: metadata, the trailing
/// slice of the message log, and voice channel summaries. The roster is
/// projected separately (it is also broadcast to the whole room).
#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    pub room: RoomMeta,
    pub messages: Vec<Message>,
    pub channels: Vec<ChannelSummary>,
}

/// What a disconnecting session was torn out of.
#[derive(Debug, Clone)]
pub struct Departure {
    pub identity: Identity,
    pub left: Option<LeftRoom>,
}

/// Authoritative in-memory state: every live session, every room, and
/// the reverse membership index.
///
/// The directory itself is not synchronized; the server wraps it in a
/// single lock so each inbound event runs to completion against a
/// consistent view.
#[derive(Debug, Default)]
pub struct Directory {
    sessions: HashMap<SessionId, Session>,
    rooms: HashMap<RoomId, Room>,
    /// Lobby ordering: seed rooms first, then creation order.
    room_order: Vec<RoomId>,
    /// Reverse index: which room each session currently occupies.
    member_of: HashMap<SessionId, RoomId>,
    message_seq: u64,
}

impl Directory {
    /// An empty directory with no rooms.
    pub fn new() -> Self {
        Self::default()
    }

    /// A directory seeded with the default room list.
    pub fn seeded() -> Self {
        let mut dir = Self::new();
        for (id, name, description) in SEED_ROOMS {
            dir.insert_room(Room::new(id, name, description));
        }
        dir
    }

    // ---- session registry ----

    /// Registers a session for a new connection and returns its id.
    pub fn connect(&mut self) -> SessionId {
        let id = SessionId::new();
        self.sessions.insert(id, Session::new(id));
        id
    }

    /// Applies a self-declared identity to a session.
    pub fn hello(&mut self, session: SessionId, name: &str, badge: &str) -> Option<Identity> {
        let s = self.sessions.get_mut(&session)?;
        s.apply_hello(name, badge);
        Some(s.identity())
    }

    /// Tears a disconnecting session out of whatever it occupies and
    /// destroys the record. Returns what was left behind so the caller
    /// can emit the same presence events as an explicit leave.
    pub fn disconnect(&mut self, session: SessionId) -> Option<Departure> {
        let left = self.detach_from_room(session);
        let record = self.sessions.remove(&session)?;
        Some(Departure {
            identity: record.identity(),
            left,
        })
    }

    pub fn session(&self, session: SessionId) -> Option<&Session> {
        self.sessions.get(&session)
    }

    pub fn session_mut(&mut self, session: SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(&session)
    }

    /// The room a session is currently a member of.
    pub fn room_of(&self, session: SessionId) -> Option<&RoomId> {
        self.member_of.get(&session)
    }

    // ---- room store ----

    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn room_mut(&mut self, room_id: &str) -> Option<&mut Room> {
        self.rooms.get_mut(room_id)
    }

    /// Rooms in lobby order.
    pub fn rooms_in_order(&self) -> impl Iterator<Item = &Room> {
        self.room_order.iter().filter_map(|id| self.rooms.get(id))
    }

    /// Creates a room with the default voice channel template.
    ///
    /// Blank names and duplicate ids are silent no-ops. The id is the
    /// slugified form of `id` when given, otherwise generated.
    pub fn create_room(&mut self, name: &str, id: Option<&str>) -> Option<RoomId> {
        let name = truncate_chars(name.trim(), limits::MAX_ROOM_NAME_CHARS);
        if name.is_empty() {
            return None;
        }

        let slug = match id.map(slugify).filter(|s| !s.is_empty()) {
            Some(s) => s,
            None => generated_room_id(),
        };
        if self.rooms.contains_key(&slug) {
            tracing::debug!(room = %slug, "ignoring create for existing room id");
            return None;
        }

        self.insert_room(Room::new(&slug, &name, DEFAULT_ROOM_DESCRIPTION));
        tracing::info!(room = %slug, "room created");
        Some(slug)
    }

    /// Moves a session into `room_id`, evicting it from its previous
    /// room (and that room's voice channel) first.
    pub fn join_room(&mut self, session: SessionId, room_id: &str) -> Option<JoinOutcome> {
        if !self.rooms.contains_key(room_id) {
            return None;
        }
        let identity = self.sessions.get(&session)?.identity();

        let left = self.detach_from_room(session);

        let room = self.rooms.get_mut(room_id)?;
        room.members.insert(session);
        self.member_of.insert(session, room_id.to_string());

        let snapshot = RoomSnapshot {
            room: room.meta(),
            messages: room
                .messages
                .iter()
                .rev()
                .take(limits::SNAPSHOT_MESSAGES)
                .rev()
                .cloned()
                .collect(),
            channels: room
                .voice_channels
                .iter()
                .map(|c| ChannelSummary {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    count: c.members.len(),
                })
                .collect(),
        };

        Some(JoinOutcome {
            identity,
            left,
            snapshot,
        })
    }

    /// Flags or unflags a member as typing. Returns false (no-op) for
    /// non-members and unknown rooms.
    pub fn set_typing(&mut self, session: SessionId, room_id: &str, is_typing: bool) -> bool {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return false;
        };
        if !room.members.contains(&session) {
            return false;
        }
        if is_typing {
            room.typing.insert(session);
        } else {
            room.typing.remove(&session);
        }
        true
    }

    /// Display names of currently-typing members, capped for broadcast.
    pub fn typing_names(&self, room_id: &str) -> Vec<String> {
        let Some(room) = self.rooms.get(room_id) else {
            return Vec::new();
        };
        let mut names: Vec<String> = room
            .typing
            .iter()
            .filter_map(|sid| self.sessions.get(sid))
            .map(|s| s.name.clone())
            .collect();
        names.sort();
        names.truncate(limits::TYPING_LIST_LIMIT);
        names
    }

    /// Appends a message to a room's log, evicting the oldest past the
    /// cap, and clears the sender's typing flag. Empty text and
    /// non-members are silent no-ops.
    pub fn send_message(&mut self, session: SessionId, room_id: &str, text: &str) -> Option<Message> {
        let text = truncate_chars(text.trim(), limits::MAX_MESSAGE_CHARS);
        if text.is_empty() {
            return None;
        }
        let author = self.sessions.get(&session)?.identity();

        self.message_seq += 1;
        let ts = chrono::Utc::now().timestamp_millis();
        let id = format!("{:x}-{}", ts, self.message_seq);

        let room = self.rooms.get_mut(room_id)?;
        if !room.members.contains(&session) {
            return None;
        }

        let msg = Message {
            id,
            room_id: room_id.to_string(),
            author,
            text,
            ts,
            reactions: BTreeMap::new(),
        };
        room.messages.push_back(msg.clone());
        if room.messages.len() > limits::MESSAGE_LOG_CAP {
            room.messages.pop_front();
        }
        room.typing.remove(&session);

        Some(msg)
    }

    /// Toggles `session`'s vote on an emoji of a message. Returns the
    /// message id and its updated reaction map for broadcast.
    pub fn react(
        &mut self,
        session: SessionId,
        room_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> Option<(String, BTreeMap<String, Reaction>)> {
        let emoji = truncate_chars(emoji.trim(), limits::MAX_EMOJI_CHARS);
        if emoji.is_empty() {
            return None;
        }

        let room = self.rooms.get_mut(room_id)?;
        if !room.members.contains(&session) {
            return None;
        }
        let msg = room.message_mut(message_id)?;
        msg.toggle_reaction(session, &emoji);
        Some((msg.id.clone(), msg.reactions.clone()))
    }

    /// Clears a session's voice flags and channel bookkeeping. The
    /// companion to a channel eviction; membership sets are the
    /// caller's to update.
    pub fn clear_voice_flags(&mut self, session: SessionId) {
        if let Some(s) = self.sessions.get_mut(&session) {
            s.reset_voice();
        }
    }

    /// Removes a session from every voice channel anywhere, regardless
    /// of the reverse indexes. Returns `(room, channel)` for the seat it
    /// actually held. This is the defensive sweep run before a voice
    /// join; steady-state paths rely on the indexes instead.
    pub fn purge_voice_everywhere(&mut self, session: SessionId) -> Option<(RoomId, ChannelId)> {
        let mut seat = None;
        for room in self.rooms.values_mut() {
            if let Some(channel) = room.evict_from_voice(session) {
                seat = Some((room.id.clone(), channel));
            }
        }
        if let Some(s) = self.sessions.get_mut(&session) {
            s.reset_voice();
        }
        seat
    }

    fn insert_room(&mut self, room: Room) {
        self.room_order.push(room.id.clone());
        self.rooms.insert(room.id.clone(), room);
    }

    /// Removes a session from its current room's membership, typing set,
    /// and voice channel.
    fn detach_from_room(&mut self, session: SessionId) -> Option<LeftRoom> {
        let room_id = self.member_of.remove(&session)?;
        let room = self.rooms.get_mut(&room_id)?;
        room.members.remove(&session);
        room.typing.remove(&session);
        let voice_channel = room.evict_from_voice(session);
        if let Some(s) = self.sessions.get_mut(&session) {
            s.reset_voice();
        }
        Some(LeftRoom {
            room_id,
            voice_channel,
        })
    }
}

/// Normalizes a requested room id to the slug alphabet.
fn slugify(id: &str) -> String {
    id.trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-')
        .take(limits::MAX_ROOM_ID_CHARS)
        .collect()
}

fn generated_room_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect();
    format!("room-{suffix}")
}

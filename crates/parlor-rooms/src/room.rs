//! Rooms and their voice channel records.

use crate::message::Message;
use parlor_types::{ChannelId, RoomId, SessionId};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// Rooms created at startup: `(slug, name, description)`.
pub const SEED_ROOMS: &[(&str, &str, &str)] = &[
    ("fireside", "Fireside Lounge", "Warm, calm conversation."),
    ("garden", "Prayer Garden", "Quiet, supportive chat."),
    ("study", "Word Study", "Discussion, questions, and notes."),
    ("youth", "Youth Hangout", "Chill talk and encouragement."),
];

/// Voice channels cloned into every room: `(slug, name)`.
pub const VOICE_CHANNEL_TEMPLATE: &[(&str, &str)] = &[("main", "Main Voice"), ("huddle", "Huddle")];

/// Description given to rooms created at runtime.
pub(crate) const DEFAULT_ROOM_DESCRIPTION: &str = "A new community room.";

/// A room-scoped audio group. Holds only session ids; the sessions
/// themselves are owned by the [`Directory`](crate::Directory).
#[derive(Debug, Clone)]
pub struct VoiceChannel {
    pub id: ChannelId,
    pub name: String,
    pub members: HashSet<SessionId>,
}

/// Room metadata as sent in a room-state snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMeta {
    pub id: RoomId,
    pub name: String,
    pub description: String,
}

/// A named chat scope: membership, a bounded message log, a typing set,
/// and an ordered list of voice channels.
///
/// Rooms are never deleted during the process lifetime.
#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub description: String,
    pub members: HashSet<SessionId>,
    pub typing: HashSet<SessionId>,
    pub messages: VecDeque<Message>,
    pub voice_channels: Vec<VoiceChannel>,
}

impl Room {
    pub(crate) fn new(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            members: HashSet::new(),
            typing: HashSet::new(),
            messages: VecDeque::new(),
            voice_channels: VOICE_CHANNEL_TEMPLATE
                .iter()
                .map(|(cid, cname)| VoiceChannel {
                    id: (*cid).to_string(),
                    name: (*cname).to_string(),
                    members: HashSet::new(),
                })
                .collect(),
        }
    }

    pub fn meta(&self) -> RoomMeta {
        RoomMeta {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }

    pub fn channel(&self, channel_id: &str) -> Option<&VoiceChannel> {
        self.voice_channels.iter().find(|c| c.id == channel_id)
    }

    pub fn channel_mut(&mut self, channel_id: &str) -> Option<&mut VoiceChannel> {
        self.voice_channels.iter_mut().find(|c| c.id == channel_id)
    }

    pub fn message_mut(&mut self, message_id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == message_id)
    }

    /// Removes `session` from every voice channel of this room,
    /// returning the id of the channel it occupied, if any.
    pub fn evict_from_voice(&mut self, session: SessionId) -> Option<ChannelId> {
        for channel in &mut self.voice_channels {
            if channel.members.remove(&session) {
                return Some(channel.id.clone());
            }
        }
        None
    }
}

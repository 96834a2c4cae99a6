//! Read-only presence views over the room directory.
//!
//! Everything here is a projection: given the directory, produce the
//! snapshot a client renders. Mutation lives in `parlor-rooms` and
//! `parlor-voice`; this crate never changes state, so any caller
//! holding the directory lock can build a view at any point without
//! ordering concerns.
//!
//! All lists come back in a deterministic order so repeated snapshots
//! of unchanged state are byte-identical on the wire.

use parlor_rooms::Directory;
use parlor_types::{ChannelCount, ChannelSummary, RosterEntry, RoomSummary, VoiceParticipant};

/// The members of a room, sorted by display name (session id breaks
/// ties between duplicate names).
pub fn roster(dir: &Directory, room_id: &str) -> Vec<RosterEntry> {
    let Some(room) = dir.room(room_id) else {
        return Vec::new();
    };
    let mut entries: Vec<RosterEntry> = room
        .members
        .iter()
        .filter_map(|sid| dir.session(*sid))
        .map(|s| RosterEntry {
            id: s.id,
            name: s.name.clone(),
            badge: s.badge.clone(),
        })
        .collect();
    entries.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    entries
}

/// Lobby cards for every room, in creation order (seed rooms first).
pub fn lobby_summary(dir: &Directory) -> Vec<RoomSummary> {
    dir.rooms_in_order()
        .map(|room| RoomSummary {
            id: room.id.clone(),
            name: room.name.clone(),
            description: room.description.clone(),
            online: room.members.len(),
            voice: room
                .voice_channels
                .iter()
                .map(|c| ChannelCount {
                    id: c.id.clone(),
                    count: c.members.len(),
                })
                .collect(),
        })
        .collect()
}

/// The voice channel list of one room with live member counts, as
/// carried in the room-state snapshot.
pub fn channel_summaries(dir: &Directory, room_id: &str) -> Vec<ChannelSummary> {
    let Some(room) = dir.room(room_id) else {
        return Vec::new();
    };
    room.voice_channels
        .iter()
        .map(|c| ChannelSummary {
            id: c.id.clone(),
            name: c.name.clone(),
            count: c.members.len(),
        })
        .collect()
}

/// Per-channel member counts for one room, the compact form broadcast
/// whenever voice occupancy changes.
pub fn channel_counts(dir: &Directory, room_id: &str) -> Vec<ChannelCount> {
    let Some(room) = dir.room(room_id) else {
        return Vec::new();
    };
    room.voice_channels
        .iter()
        .map(|c| ChannelCount {
            id: c.id.clone(),
            count: c.members.len(),
        })
        .collect()
}

/// The occupants of one voice channel with their mute/deafen/speaking
/// flags, sorted like [`roster`].
pub fn participants(dir: &Directory, room_id: &str, channel_id: &str) -> Vec<VoiceParticipant> {
    let Some(channel) = dir.room(room_id).and_then(|r| r.channel(channel_id)) else {
        return Vec::new();
    };
    let mut list: Vec<VoiceParticipant> = channel
        .members
        .iter()
        .filter_map(|sid| dir.session(*sid))
        .map(|s| VoiceParticipant {
            id: s.id,
            name: s.name.clone(),
            badge: s.badge.clone(),
            muted: s.muted,
            deafened: s.deafened,
            speaking: s.speaking,
        })
        .collect();
    list.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_types::SessionId;

    fn member(dir: &mut Directory, name: &str, room: &str) -> SessionId {
        let sid = dir.connect();
        dir.hello(sid, name, "");
        dir.join_room(sid, room).expect("join");
        sid
    }

    #[test]
    fn roster_is_name_sorted() {
        let mut dir = Directory::seeded();
        member(&mut dir, "zoe", "fireside");
        member(&mut dir, "abe", "fireside");
        member(&mut dir, "mia", "fireside");

        let entries = roster(&dir, "fireside");
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["abe", "mia", "zoe"]);
    }

    #[test]
    fn duplicate_names_order_by_session_id() {
        let mut dir = Directory::seeded();
        let a = member(&mut dir, "twin", "fireside");
        let b = member(&mut dir, "twin", "fireside");
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };

        let ids: Vec<SessionId> = roster(&dir, "fireside").iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![lo, hi]);
    }

    #[test]
    fn unknown_room_yields_empty_views() {
        let dir = Directory::seeded();
        assert!(roster(&dir, "nowhere").is_empty());
        assert!(channel_summaries(&dir, "nowhere").is_empty());
        assert!(participants(&dir, "nowhere", "main").is_empty());
    }

    #[test]
    fn lobby_counts_follow_membership() {
        let mut dir = Directory::seeded();
        let sid = member(&mut dir, "abe", "garden");

        let lobby = lobby_summary(&dir);
        assert_eq!(lobby[0].id, "fireside");
        assert_eq!(lobby[1].id, "garden");
        assert_eq!(lobby[1].online, 1);
        assert!(lobby[1].voice.iter().all(|c| c.count == 0));

        dir.join_room(sid, "study").unwrap();
        let lobby = lobby_summary(&dir);
        assert_eq!(lobby[1].online, 0);
        assert_eq!(lobby[2].online, 1);
    }

    #[test]
    fn created_rooms_appear_after_seeds() {
        let mut dir = Directory::seeded();
        let id = dir.create_room("Night Owls", None).expect("create");
        let lobby = lobby_summary(&dir);
        assert_eq!(lobby.last().unwrap().id, id);
        assert_eq!(lobby.last().unwrap().name, "Night Owls");
    }

    #[test]
    fn participants_carry_voice_flags() {
        let mut dir = Directory::seeded();
        let sid = member(&mut dir, "abe", "fireside");
        seat_in_main(&mut dir, sid);

        dir.session_mut(sid).unwrap().muted = true;
        dir.session_mut(sid).unwrap().speaking = true;

        let list = participants(&dir, "fireside", "main");
        assert_eq!(list.len(), 1);
        assert!(list[0].muted);
        assert!(list[0].speaking);
        assert!(!list[0].deafened);
    }

    // Seats a session directly; the real join path lives in parlor-voice
    // which this crate does not depend on.
    fn seat_in_main(dir: &mut Directory, sid: SessionId) {
        dir.room_mut("fireside")
            .unwrap()
            .channel_mut("main")
            .unwrap()
            .members
            .insert(sid);
        dir.session_mut(sid).unwrap().voice_channel = Some("main".into());
    }
}

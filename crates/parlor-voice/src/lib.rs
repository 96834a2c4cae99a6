//! Voice channel coordination for the Parlor platform.
//!
//! The coordinator is a membership bookkeeper plus an authorized
//! router: it tracks which sessions occupy which room-scoped voice
//! channel, and it decides whether a peer-negotiation message may be
//! relayed between two sessions. No media ever touches the server, and
//! negotiation payloads are never inspected.
//!
//! Per session the voice state machine is: `Idle` until a successful
//! channel join, `Active(channel)` while seated, back to `Idle` on
//! leave, room change, or disconnect. Joining a second channel is an
//! atomic leave-then-join; a session is never seated in two channels.
//!
//! Policy: the *joining* side initiates negotiation toward every member
//! already present, so established members never race the newcomer with
//! a competing offer.

use parlor_rooms::Directory;
use parlor_types::{ChannelId, Identity, RoomId, RosterEntry, SessionId};

/// Result of a successful voice channel join.
#[derive(Debug, Clone)]
pub struct VoiceJoin {
    /// The joiner's identity, for new-peer notices to existing members.
    pub identity: Identity,
    /// A seat vacated elsewhere by the defensive sweep, if the session
    /// somehow still held one. The caller should refresh that channel's
    /// views too.
    pub evicted: Option<(RoomId, ChannelId)>,
    /// The members already present, sorted by name. The joiner is
    /// expected to initiate negotiation toward each of them.
    pub peers: Vec<RosterEntry>,
}

/// Result of a successful voice channel leave.
#[derive(Debug, Clone)]
pub struct VoiceLeave {
    pub identity: Identity,
    /// The channel that was left.
    pub channel: ChannelId,
    /// Members still seated, to be told this peer is gone.
    pub remaining: Vec<SessionId>,
}

/// Seats a session in a voice channel of the room it occupies.
///
/// No-op (`None`) when the session is not a member of `room_id` or the
/// channel does not exist there. Any voice seat held anywhere else is
/// released first, and the session's mute/deafen/speaking flags reset.
pub fn join_voice(
    dir: &mut Directory,
    session: SessionId,
    room_id: &str,
    channel_id: &str,
) -> Option<VoiceJoin> {
    if dir.room_of(session).map(String::as_str) != Some(room_id) {
        return None;
    }
    if dir.room(room_id)?.channel(channel_id).is_none() {
        return None;
    }
    let identity = dir.session(session)?.identity();

    let evicted = dir.purge_voice_everywhere(session);
    if let Some((ref r, ref c)) = evicted {
        tracing::debug!(session = %session, room = %r, channel = %c, "released stale voice seat");
    }

    let mut peers: Vec<RosterEntry> = {
        let room = dir.room(room_id)?;
        let channel = room.channel(channel_id)?;
        channel
            .members
            .iter()
            .filter_map(|sid| dir.session(*sid))
            .map(|s| RosterEntry {
                id: s.id,
                name: s.name.clone(),
                badge: s.badge.clone(),
            })
            .collect()
    };
    peers.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

    dir.room_mut(room_id)?
        .channel_mut(channel_id)?
        .members
        .insert(session);
    dir.session_mut(session)?.voice_channel = Some(channel_id.to_string());

    tracing::info!(session = %session, room = %room_id, channel = %channel_id, "joined voice");
    Some(VoiceJoin {
        identity,
        evicted,
        peers,
    })
}

/// Releases a session's voice seat in `room_id`.
///
/// No-op when the session holds no seat in a channel of that room.
pub fn leave_voice(dir: &mut Directory, session: SessionId, room_id: &str) -> Option<VoiceLeave> {
    if dir.room_of(session).map(String::as_str) != Some(room_id) {
        return None;
    }
    let identity = dir.session(session)?.identity();
    dir.session(session)?.voice_channel.as_ref()?;

    let channel = dir.room_mut(room_id)?.evict_from_voice(session)?;
    dir.clear_voice_flags(session);

    let remaining: Vec<SessionId> = dir
        .room(room_id)?
        .channel(&channel)?
        .members
        .iter()
        .copied()
        .collect();

    tracing::info!(session = %session, room = %room_id, channel = %channel, "left voice");
    Some(VoiceLeave {
        identity,
        channel,
        remaining,
    })
}

/// True when `session` is an active member of exactly that channel of
/// that room. The gate for state updates and relay authorization.
fn is_seated(dir: &Directory, session: SessionId, room_id: &str, channel_id: &str) -> bool {
    dir.room_of(session).map(String::as_str) == Some(room_id)
        && dir
            .room(room_id)
            .and_then(|r| r.channel(channel_id))
            .is_some_and(|c| c.members.contains(&session))
}

/// Updates a seated session's mute/deafen flags. Deafening forces
/// mute.
pub fn set_state(
    dir: &mut Directory,
    session: SessionId,
    room_id: &str,
    channel_id: &str,
    muted: bool,
    deafened: bool,
) -> bool {
    if !is_seated(dir, session, room_id, channel_id) {
        return false;
    }
    let Some(s) = dir.session_mut(session) else {
        return false;
    };
    s.deafened = deafened;
    s.muted = muted || deafened;
    true
}

/// Updates a seated session's speaking flag. This path is hot (it fires
/// on every detector transition), so the caller broadcasts only the one
/// transition rather than a full participant list.
pub fn set_speaking(
    dir: &mut Directory,
    session: SessionId,
    room_id: &str,
    channel_id: &str,
    speaking: bool,
) -> bool {
    if !is_seated(dir, session, room_id, channel_id) {
        return false;
    }
    let Some(s) = dir.session_mut(session) else {
        return false;
    };
    s.speaking = speaking;
    true
}

/// Decides whether a negotiation message from `from` may be delivered
/// to `to`: both must currently be seated in the same named channel of
/// the same room. Anything else is dropped with no error surfaced,
/// whether the target is absent or merely seated elsewhere.
pub fn authorize_relay(
    dir: &Directory,
    from: SessionId,
    to: SessionId,
    room_id: &str,
    channel_id: &str,
) -> bool {
    is_seated(dir, from, room_id, channel_id) && is_seated(dir, to, room_id, channel_id)
}

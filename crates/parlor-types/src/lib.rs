//! Shared types and constants for the Parlor platform.
//!
//! This crate provides the foundational types used across all Parlor
//! crates: session identifiers, display identity snapshots, the
//! wire-visible view structs fanned out to clients, and the protocol
//! limits every mutating operation enforces. It is the leaf of the
//! workspace: every other crate depends on it and it depends on no
//! sibling.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub mod limits;

/// Identifier of a room (a URL-safe slug, e.g. `"fireside"`).
pub type RoomId = String;

/// Identifier of a voice channel within a room (e.g. `"main"`).
pub type ChannelId = String;

/// Opaque identifier of one live connection.
///
/// A session id exists exactly as long as its connection: it is minted
/// when the socket is accepted and becomes meaningless on disconnect.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Mints a fresh random session id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Display snapshot of a session: who this connection claims to be.
///
/// Identity is self-declared (there is no authentication layer); the
/// snapshot is stamped onto messages at send time so later renames do
/// not rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// The session this identity belongs to.
    pub id: SessionId,
    /// Display name, trimmed to [`limits::MAX_NAME_CHARS`].
    pub name: String,
    /// Free-text badge, trimmed to [`limits::MAX_BADGE_CHARS`].
    pub badge: String,
}

/// The three kinds of peer-negotiation messages the server relays.
///
/// The payload attached to each kind is opaque to the server: it is
/// routed verbatim between exactly two co-members of a voice channel
/// and never inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    /// Session description offered by the link initiator.
    Offer,
    /// Session description answering an offer.
    Answer,
    /// A transport candidate for an in-progress negotiation.
    Ice,
}

/// One row of a room roster: a member's display identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: SessionId,
    pub name: String,
    pub badge: String,
}

/// Member count for a single voice channel, used in lobby and room views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelCount {
    pub id: ChannelId,
    pub count: usize,
}

/// Voice channel metadata with its live member count, sent in the
/// room-state snapshot so a joiner can render the channel list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub id: ChannelId,
    pub name: String,
    pub count: usize,
}

/// One room's lobby card: identity, blurb, and live occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub id: RoomId,
    pub name: String,
    pub description: String,
    pub online: usize,
    pub voice: Vec<ChannelCount>,
}

/// One participant of a voice channel with their visible flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceParticipant {
    pub id: SessionId,
    pub name: String,
    pub badge: String,
    pub muted: bool,
    pub deafened: bool,
    pub speaking: bool,
}

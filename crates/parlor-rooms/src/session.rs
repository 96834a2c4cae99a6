//! Per-connection session records.

use parlor_types::{limits, ChannelId, Identity, SessionId};
use rand::Rng;

/// Badge assigned to sessions that never declared one.
pub(crate) const DEFAULT_BADGE: &str = "Seeker";

/// State for one live connection.
///
/// A session is created when the connection is accepted and destroyed
/// on disconnect; rooms and channels only ever hold its id, never the
/// record itself.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub name: String,
    pub badge: String,
    /// The voice channel this session occupies, if any. The channel
    /// always belongs to the room the session is currently a member of.
    pub voice_channel: Option<ChannelId>,
    pub muted: bool,
    pub deafened: bool,
    pub speaking: bool,
}

impl Session {
    pub(crate) fn new(id: SessionId) -> Self {
        Self {
            id,
            name: guest_name(),
            badge: DEFAULT_BADGE.to_string(),
            voice_channel: None,
            muted: false,
            deafened: false,
            speaking: false,
        }
    }

    /// The display snapshot stamped onto rosters and messages.
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            name: self.name.clone(),
            badge: self.badge.clone(),
        }
    }

    /// Applies a self-declared identity, trimming to protocol limits.
    /// A blank name keeps (or regenerates) a guest name.
    pub(crate) fn apply_hello(&mut self, name: &str, badge: &str) {
        self.name = safe_name(name);
        let badge = truncate_chars(badge.trim(), limits::MAX_BADGE_CHARS);
        if !badge.is_empty() {
            self.badge = badge;
        }
    }

    /// Clears all voice flags and channel membership bookkeeping.
    pub(crate) fn reset_voice(&mut self) {
        self.voice_channel = None;
        self.muted = false;
        self.deafened = false;
        self.speaking = false;
    }
}

/// Trims and truncates a display name, substituting a generated guest
/// name when nothing usable remains.
pub(crate) fn safe_name(name: &str) -> String {
    let trimmed = truncate_chars(name.trim(), limits::MAX_NAME_CHARS);
    if trimmed.is_empty() {
        guest_name()
    } else {
        trimmed
    }
}

fn guest_name() -> String {
    format!("Guest{}", rand::thread_rng().gen_range(1000..10000))
}

/// Truncates to at most `max` Unicode scalar values.
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

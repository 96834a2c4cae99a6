//! Protocol limits.
//!
//! Every bound here is enforced server-side by trimming or truncation;
//! clients that exceed them are never rejected with an error, the
//! excess is simply discarded. Counts are in Unicode scalar values,
//! not bytes.

/// Maximum display-name length. Blank names get a generated guest name.
pub const MAX_NAME_CHARS: usize = 24;

/// Maximum badge length.
pub const MAX_BADGE_CHARS: usize = 18;

/// Maximum chat message length.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Maximum reaction emoji key length.
pub const MAX_EMOJI_CHARS: usize = 8;

/// Per-room message log cap; the oldest message is evicted first.
pub const MESSAGE_LOG_CAP: usize = 300;

/// How many trailing messages a room-state snapshot carries.
pub const SNAPSHOT_MESSAGES: usize = 50;

/// How many typing members are named in a typing broadcast.
pub const TYPING_LIST_LIMIT: usize = 4;

/// Maximum room display-name length.
pub const MAX_ROOM_NAME_CHARS: usize = 28;

/// Maximum room slug length. Slugs draw from `[a-z0-9_-]`.
pub const MAX_ROOM_ID_CHARS: usize = 18;

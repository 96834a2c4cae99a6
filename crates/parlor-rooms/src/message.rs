//! Chat messages and toggleable reactions.

use parlor_types::{Identity, RoomId, SessionId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One emoji's tally on a message.
///
/// Invariant: `count == voters.len()`, and a reaction with no voters is
/// removed from the message rather than kept at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub count: usize,
    pub voters: BTreeSet<SessionId>,
}

/// A chat message with its author snapshot and reaction map.
///
/// The author identity is captured at send time; renaming later does
/// not rewrite messages already sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub room_id: RoomId,
    pub author: Identity,
    pub text: String,
    /// Creation time, milliseconds since the Unix epoch.
    pub ts: i64,
    pub reactions: BTreeMap<String, Reaction>,
}

impl Message {
    /// Toggles `voter` in `emoji`'s voter set.
    ///
    /// A first vote adds the voter, a second removes it again; when the
    /// last voter leaves, the emoji key disappears entirely.
    pub fn toggle_reaction(&mut self, voter: SessionId, emoji: &str) {
        let entry = self.reactions.entry(emoji.to_string()).or_insert_with(|| Reaction {
            count: 0,
            voters: BTreeSet::new(),
        });

        if entry.voters.remove(&voter) {
            entry.count = entry.voters.len();
            if entry.voters.is_empty() {
                self.reactions.remove(emoji);
            }
        } else {
            entry.voters.insert(voter);
            entry.count = entry.voters.len();
        }
    }
}

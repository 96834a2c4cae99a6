//! Room membership and session registry for the Parlor platform.
//!
//! Implements the authoritative in-memory state the server coordinates:
//! per-connection sessions, named rooms with a bounded message log and
//! typing set, and the room-scoped voice channel records that
//! `parlor-voice` manages membership for.
//!
//! All state lives in a single [`Directory`] value. Mutation goes
//! through the operations on `Directory` (and the voice operations in
//! `parlor-voice`), never through ad-hoc field pokes; callers that hold
//! the directory behind one lock therefore get event-level atomicity
//! for free.
//!
//! Malformed or out-of-invariant requests (unknown room, non-member
//! acting on a room, blank text) are silent no-ops by design: the
//! operations return `None` or `false` and the caller simply emits
//! nothing.

mod directory;
mod message;
mod room;
mod session;

pub use directory::{Departure, Directory, JoinOutcome, LeftRoom, RoomSnapshot};
pub use message::{Message, Reaction};
pub use room::{Room, RoomMeta, VoiceChannel, SEED_ROOMS, VOICE_CHANNEL_TEMPLATE};
pub use session::Session;

use parlor_rooms::Directory;
use parlor_types::SessionId;
use parlor_voice::{authorize_relay, join_voice, leave_voice, set_speaking, set_state};

fn seated_member(dir: &mut Directory, name: &str, room: &str) -> SessionId {
    let sid = dir.connect();
    dir.hello(sid, name, "");
    dir.join_room(sid, room).expect("room join");
    sid
}

#[test]
fn joiner_receives_existing_peers_and_nothing_else() {
    let mut dir = Directory::seeded();
    let s1 = seated_member(&mut dir, "alice", "fireside");
    let s2 = seated_member(&mut dir, "bob", "fireside");

    let first = join_voice(&mut dir, s1, "fireside", "main").expect("s1 joins");
    assert!(first.peers.is_empty(), "empty channel has no peers");

    let second = join_voice(&mut dir, s2, "fireside", "main").expect("s2 joins");
    assert_eq!(second.peers.len(), 1);
    assert_eq!(second.peers[0].id, s1);
    assert_eq!(second.peers[0].name, "alice");
}

#[test]
fn join_requires_room_membership_and_known_channel() {
    let mut dir = Directory::seeded();
    let outsider = dir.connect();
    assert!(join_voice(&mut dir, outsider, "fireside", "main").is_none());

    let member = seated_member(&mut dir, "alice", "fireside");
    assert!(join_voice(&mut dir, member, "fireside", "no-such-channel").is_none());
    assert!(join_voice(&mut dir, member, "garden", "main").is_none());
}

#[test]
fn switching_channels_is_atomic_leave_then_join() {
    let mut dir = Directory::seeded();
    let sid = seated_member(&mut dir, "alice", "fireside");

    join_voice(&mut dir, sid, "fireside", "main").unwrap();
    join_voice(&mut dir, sid, "fireside", "huddle").unwrap();

    let room = dir.room("fireside").unwrap();
    assert!(!room.channel("main").unwrap().members.contains(&sid));
    assert!(room.channel("huddle").unwrap().members.contains(&sid));
    assert_eq!(
        dir.session(sid).unwrap().voice_channel.as_deref(),
        Some("huddle")
    );
}

#[test]
fn changing_rooms_clears_voice_membership() {
    let mut dir = Directory::seeded();
    let sid = seated_member(&mut dir, "alice", "fireside");
    join_voice(&mut dir, sid, "fireside", "main").unwrap();

    let outcome = dir.join_room(sid, "garden").unwrap();
    assert_eq!(
        outcome.left.as_ref().unwrap().voice_channel.as_deref(),
        Some("main")
    );
    assert!(dir.session(sid).unwrap().voice_channel.is_none());
    assert!(!dir
        .room("fireside")
        .unwrap()
        .channel("main")
        .unwrap()
        .members
        .contains(&sid));
}

#[test]
fn leave_reports_remaining_members() {
    let mut dir = Directory::seeded();
    let s1 = seated_member(&mut dir, "alice", "fireside");
    let s2 = seated_member(&mut dir, "bob", "fireside");
    join_voice(&mut dir, s1, "fireside", "main").unwrap();
    join_voice(&mut dir, s2, "fireside", "main").unwrap();

    let leave = leave_voice(&mut dir, s1, "fireside").expect("leave");
    assert_eq!(leave.channel, "main");
    assert_eq!(leave.remaining, vec![s2]);
    assert!(leave_voice(&mut dir, s1, "fireside").is_none(), "second leave is a no-op");
}

#[test]
fn leave_clears_the_session_seat_and_flags() {
    let mut dir = Directory::seeded();
    let s1 = seated_member(&mut dir, "alice", "fireside");
    join_voice(&mut dir, s1, "fireside", "main").unwrap();
    set_state(&mut dir, s1, "fireside", "main", true, true);
    set_speaking(&mut dir, s1, "fireside", "main", true);

    leave_voice(&mut dir, s1, "fireside").expect("leave");
    let session = dir.session(s1).unwrap();
    assert!(session.voice_channel.is_none());
    assert!(!session.muted && !session.deafened && !session.speaking);
}

#[test]
fn relay_requires_shared_channel() {
    let mut dir = Directory::seeded();
    let s1 = seated_member(&mut dir, "alice", "fireside");
    let s2 = seated_member(&mut dir, "bob", "fireside");
    let s3 = seated_member(&mut dir, "mallory", "fireside");

    join_voice(&mut dir, s1, "fireside", "main").unwrap();
    join_voice(&mut dir, s2, "fireside", "main").unwrap();
    join_voice(&mut dir, s3, "fireside", "huddle").unwrap();

    assert!(authorize_relay(&dir, s2, s1, "fireside", "main"));
    assert!(
        !authorize_relay(&dir, s3, s1, "fireside", "main"),
        "sender seated elsewhere must be dropped"
    );
    assert!(
        !authorize_relay(&dir, s1, s3, "fireside", "main"),
        "target seated elsewhere must be dropped"
    );
    assert!(!authorize_relay(&dir, s1, s2, "fireside", "huddle"));
}

#[test]
fn deafen_forces_mute() {
    let mut dir = Directory::seeded();
    let sid = seated_member(&mut dir, "alice", "fireside");
    join_voice(&mut dir, sid, "fireside", "main").unwrap();

    assert!(set_state(&mut dir, sid, "fireside", "main", false, true));
    let s = dir.session(sid).unwrap();
    assert!(s.muted && s.deafened);

    assert!(set_state(&mut dir, sid, "fireside", "main", false, false));
    let s = dir.session(sid).unwrap();
    assert!(!s.muted && !s.deafened);
}

#[test]
fn flags_reset_on_join() {
    let mut dir = Directory::seeded();
    let sid = seated_member(&mut dir, "alice", "fireside");
    join_voice(&mut dir, sid, "fireside", "main").unwrap();
    set_state(&mut dir, sid, "fireside", "main", true, true);
    set_speaking(&mut dir, sid, "fireside", "main", true);

    join_voice(&mut dir, sid, "fireside", "huddle").unwrap();
    let s = dir.session(sid).unwrap();
    assert!(!s.muted && !s.deafened && !s.speaking);
}

#[test]
fn state_updates_require_exact_seat() {
    let mut dir = Directory::seeded();
    let sid = seated_member(&mut dir, "alice", "fireside");
    join_voice(&mut dir, sid, "fireside", "main").unwrap();

    assert!(!set_state(&mut dir, sid, "fireside", "huddle", true, false));
    assert!(!set_speaking(&mut dir, sid, "garden", "main", true));
    assert!(set_speaking(&mut dir, sid, "fireside", "main", true));
    assert!(dir.session(sid).unwrap().speaking);
}

#[test]
fn disconnect_returns_session_to_idle_everywhere() {
    let mut dir = Directory::seeded();
    let s1 = seated_member(&mut dir, "alice", "fireside");
    let s2 = seated_member(&mut dir, "bob", "fireside");
    join_voice(&mut dir, s1, "fireside", "main").unwrap();
    join_voice(&mut dir, s2, "fireside", "main").unwrap();

    let departure = dir.disconnect(s1).unwrap();
    let left = departure.left.unwrap();
    assert_eq!(left.voice_channel.as_deref(), Some("main"));
    assert!(!dir
        .room("fireside")
        .unwrap()
        .channel("main")
        .unwrap()
        .members
        .contains(&s1));
    assert!(!authorize_relay(&dir, s1, s2, "fireside", "main"));
}

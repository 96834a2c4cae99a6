//! Client-side peer mesh manager.
//!
//! Each session in a voice channel holds one direct audio link per
//! other member. This crate owns that map and the per-link negotiation
//! state machine; the platform audio/transport layer is abstracted
//! behind [`LinkDriver`] so the mesh logic can run (and be tested)
//! without a real media stack.
//!
//! Negotiation policy: the side that joined last initiates. The mesh
//! therefore offers toward every peer listed in the join roster, and
//! waits in responder mode for every peer announced after it. All
//! negotiation payloads are opaque JSON handed through verbatim.
//!
//! Methods that touch the driver are async, but the peer map itself is
//! mutated synchronously between await points; the mesh expects to be
//! driven from a single task.

use std::collections::HashMap;

use parlor_types::{ChannelId, RosterEntry, SessionId, SignalKind};
use serde_json::Value;
use thiserror::Error;

mod detector;
mod link;

pub use detector::{SpeechDetector, SPEAKING_THRESHOLD};
pub use link::{LinkPhase, LinkRole, PeerLink};

/// Failures surfaced by the driver. None of these tear down the whole
/// mesh on their own; the caller decides whether to retry or leave.
#[derive(Debug, Error)]
pub enum MeshError {
    /// Microphone capture could not start, typically a permission
    /// denial. Surfaced to the user as a notice, never a panic.
    #[error("microphone capture failed: {0}")]
    Capture(String),
    /// A negotiation step failed for one peer link.
    #[error("peer negotiation failed: {0}")]
    Negotiation(String),
}

/// Platform audio and transport operations the mesh drives.
///
/// `Link` is the driver's handle for one peer connection; the mesh
/// stores it but never looks inside.
#[allow(async_fn_in_trait)]
pub trait LinkDriver {
    type Link;

    async fn create_link(&mut self, peer: SessionId) -> Result<Self::Link, MeshError>;
    async fn create_offer(&mut self, link: &mut Self::Link) -> Result<Value, MeshError>;
    async fn apply_offer(&mut self, link: &mut Self::Link, offer: &Value) -> Result<(), MeshError>;
    async fn create_answer(&mut self, link: &mut Self::Link) -> Result<Value, MeshError>;
    async fn apply_answer(&mut self, link: &mut Self::Link, answer: &Value)
        -> Result<(), MeshError>;
    async fn add_candidate(
        &mut self,
        link: &mut Self::Link,
        candidate: &Value,
    ) -> Result<(), MeshError>;
    /// Enables or disables the outgoing microphone track.
    async fn set_microphone_enabled(&mut self, enabled: bool);
    /// Enables or disables local playback of one peer's audio.
    async fn set_playback_enabled(&mut self, link: &mut Self::Link, enabled: bool);
    async fn close_link(&mut self, link: Self::Link);
    async fn start_capture(&mut self) -> Result<(), MeshError>;
    async fn stop_capture(&mut self);
}

/// A negotiation message the mesh wants sent to one peer through the
/// server relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundSignal {
    pub to: SessionId,
    pub kind: SignalKind,
    pub data: Value,
}

/// The peer link map for the voice channel the local session occupies.
pub struct PeerMesh<D: LinkDriver> {
    driver: D,
    channel: Option<ChannelId>,
    links: HashMap<SessionId, PeerLink<D::Link>>,
    user_muted: bool,
    deafened: bool,
    detector: SpeechDetector,
}

impl<D: LinkDriver> PeerMesh<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            channel: None,
            links: HashMap::new(),
            user_muted: false,
            deafened: false,
            detector: SpeechDetector::new(),
        }
    }

    /// The channel this mesh is active for, if any.
    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    /// Whether the outgoing track is disabled, either by the user's
    /// mute toggle or forced by deafen.
    pub fn is_muted(&self) -> bool {
        self.user_muted || self.deafened
    }

    pub fn is_deafened(&self) -> bool {
        self.deafened
    }

    pub fn peer_count(&self) -> usize {
        self.links.len()
    }

    /// Negotiation phase of the link to `peer`, if one exists.
    pub fn link_phase(&self, peer: SessionId) -> Option<LinkPhase> {
        self.links.get(&peer).map(PeerLink::phase)
    }

    /// Starts microphone capture and activates the mesh for `channel`.
    ///
    /// Any previous channel's links are torn down first. Mute and
    /// deafen reset to off, matching the server's flag reset on join.
    pub async fn join(&mut self, channel: &str) -> Result<(), MeshError> {
        if self.channel.is_some() {
            self.leave().await;
        }
        self.driver.start_capture().await?;
        self.driver.set_microphone_enabled(true).await;
        self.channel = Some(channel.to_string());
        self.user_muted = false;
        self.deafened = false;
        Ok(())
    }

    /// Handles the peer roster received on join: one link and one offer
    /// per member already present.
    pub async fn handle_peer_roster(
        &mut self,
        peers: &[RosterEntry],
    ) -> Result<Vec<OutboundSignal>, MeshError> {
        if self.channel.is_none() {
            return Ok(Vec::new());
        }
        let mut out = Vec::with_capacity(peers.len());
        for peer in peers {
            let mut link = self.driver.create_link(peer.id).await?;
            let offer = self.driver.create_offer(&mut link).await?;
            self.links
                .insert(peer.id, PeerLink::new(link, LinkRole::Initiator));
            out.push(OutboundSignal {
                to: peer.id,
                kind: SignalKind::Offer,
                data: offer,
            });
        }
        Ok(out)
    }

    /// Prepares a responder link for a freshly announced peer. No offer
    /// is sent; the newcomer initiates.
    pub async fn handle_new_peer(&mut self, peer: SessionId) -> Result<(), MeshError> {
        if self.channel.is_none() || self.links.contains_key(&peer) {
            return Ok(());
        }
        let link = self.driver.create_link(peer).await?;
        self.links
            .insert(peer, PeerLink::new(link, LinkRole::Responder));
        Ok(())
    }

    /// Applies one relayed negotiation message from `from`.
    ///
    /// Offers are answered (creating the link on demand if the offer
    /// outran the new-peer notice); answers and candidates apply only
    /// to known links and are dropped otherwise.
    pub async fn handle_signal(
        &mut self,
        from: SessionId,
        kind: SignalKind,
        data: &Value,
    ) -> Result<Option<OutboundSignal>, MeshError> {
        if self.channel.is_none() {
            return Ok(None);
        }
        match kind {
            SignalKind::Offer => {
                if !self.links.contains_key(&from) {
                    let link = self.driver.create_link(from).await?;
                    self.links
                        .insert(from, PeerLink::new(link, LinkRole::Responder));
                }
                let Some(entry) = self.links.get_mut(&from) else {
                    return Ok(None);
                };
                if entry.phase == LinkPhase::OfferSent {
                    // Glare: both sides believed they joined last. Take
                    // the responder role and answer rather than stall.
                    tracing::warn!(peer = %from, "offer received while one was pending");
                    entry.role = LinkRole::Responder;
                }
                self.driver.apply_offer(&mut entry.link, data).await?;
                let answer = self.driver.create_answer(&mut entry.link).await?;
                entry.phase = LinkPhase::AnswerSent;
                Ok(Some(OutboundSignal {
                    to: from,
                    kind: SignalKind::Answer,
                    data: answer,
                }))
            }
            SignalKind::Answer => {
                let Some(entry) = self.links.get_mut(&from) else {
                    tracing::debug!(peer = %from, "answer for unknown peer dropped");
                    return Ok(None);
                };
                self.driver.apply_answer(&mut entry.link, data).await?;
                entry.phase = LinkPhase::Connected;
                Ok(None)
            }
            SignalKind::Ice => {
                let Some(entry) = self.links.get_mut(&from) else {
                    tracing::debug!(peer = %from, "candidate for unknown peer dropped");
                    return Ok(None);
                };
                self.driver.add_candidate(&mut entry.link, data).await?;
                Ok(None)
            }
        }
    }

    /// Records that the transport for `peer` came up. Moves a responder
    /// link out of `AnswerSent`; initiators are already `Connected` by
    /// the time their answer applied.
    pub fn link_established(&mut self, peer: SessionId) {
        if let Some(entry) = self.links.get_mut(&peer) {
            if entry.phase != LinkPhase::Closed {
                entry.phase = LinkPhase::Connected;
            }
        }
    }

    /// Tears down the link to one departed peer.
    pub async fn handle_peer_left(&mut self, peer: SessionId) {
        if let Some(entry) = self.links.remove(&peer) {
            self.driver.close_link(entry.link).await;
        }
    }

    /// Leaves the channel unconditionally: closes every link, stops
    /// capture, and returns to idle, even mid-negotiation.
    pub async fn leave(&mut self) {
        for (_, entry) in self.links.drain() {
            self.driver.close_link(entry.link).await;
        }
        self.driver.stop_capture().await;
        self.channel = None;
        self.user_muted = false;
        self.deafened = false;
        self.detector.reset();
    }

    /// Records the user's mute toggle and applies it to the outgoing
    /// track. No link is renegotiated. While deafened the toggle is
    /// recorded but the track stays disabled until undeafen.
    pub async fn set_muted(&mut self, muted: bool) {
        self.user_muted = muted;
        self.driver.set_microphone_enabled(!self.is_muted()).await;
    }

    /// Toggles local playback of every remote link. Deafening forces
    /// mute; undeafening restores whatever the mute toggle last was.
    pub async fn set_deafened(&mut self, deafened: bool) {
        self.deafened = deafened;
        for entry in self.links.values_mut() {
            self.driver
                .set_playback_enabled(&mut entry.link, !deafened)
                .await;
        }
        self.driver.set_microphone_enabled(!self.is_muted()).await;
    }

    /// Feeds one microphone energy reading. Returns a speaking
    /// transition to forward to the server, or `None`. While muted or
    /// out of a channel the detector only ever reports the falling
    /// edge.
    pub fn sample_energy(&mut self, energy: f64) -> Option<bool> {
        if self.channel.is_none() || self.is_muted() {
            return self.detector.reset();
        }
        self.detector.sample(energy)
    }
}

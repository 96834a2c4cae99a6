//! Per-peer negotiation bookkeeping.

/// Which side of the negotiation this end plays for one peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRole {
    /// This end joined after the peer and sends the offer.
    Initiator,
    /// The peer joined after this end and will send the offer.
    Responder,
}

/// Where one link stands in its negotiation.
///
/// Initiators move `OfferSent -> Connected` when the answer lands.
/// Responders move `AwaitingOffer -> AnswerSent` when they answer an
/// offer, then `-> Connected` on the transport establishment notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPhase {
    OfferSent,
    AwaitingOffer,
    AnswerSent,
    Connected,
    Closed,
}

/// One entry of the peer map: the driver's link handle plus the
/// negotiation state the mesh tracks for it.
#[derive(Debug)]
pub struct PeerLink<L> {
    pub(crate) link: L,
    pub(crate) role: LinkRole,
    pub(crate) phase: LinkPhase,
}

impl<L> PeerLink<L> {
    pub(crate) fn new(link: L, role: LinkRole) -> Self {
        let phase = match role {
            LinkRole::Initiator => LinkPhase::OfferSent,
            LinkRole::Responder => LinkPhase::AwaitingOffer,
        };
        Self { link, role, phase }
    }

    pub fn role(&self) -> LinkRole {
        self.role
    }

    pub fn phase(&self) -> LinkPhase {
        self.phase
    }
}

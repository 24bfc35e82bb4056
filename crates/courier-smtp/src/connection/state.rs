//! Explicit SMTP session state machine.
//!
//! ```text
//! Opened → Connected → Greeted → [SecureUpgrade] → [Authenticated]
//!        → EnvelopeFrom → EnvelopeTo (repeats) → DataAnnounced → PayloadSent
//! ```
//!
//! Bracketed states are optional. Any state except `Closed` may move to `Closed`.

use crate::result::FailureKind;
use crate::types::ReplyCode;

/// Phase of an SMTP session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Transport open, greeting not yet read.
    Opened,
    /// 220 greeting received.
    Connected,
    /// EHLO (or HELO) accepted.
    Greeted,
    /// STARTTLS accepted and the stream upgraded.
    SecureUpgrade,
    /// AUTH succeeded.
    Authenticated,
    /// MAIL FROM accepted.
    EnvelopeFrom,
    /// At least one RCPT TO accepted.
    EnvelopeTo,
    /// DATA accepted with 354.
    DataAnnounced,
    /// Payload accepted by the relay.
    PayloadSent,
    /// QUIT issued or transport closed.
    Closed,
}

impl SessionState {
    /// Returns true if `next` may follow `self`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        use SessionState::{
            Authenticated, Closed, Connected, DataAnnounced, EnvelopeFrom, EnvelopeTo, Greeted,
            Opened, PayloadSent, SecureUpgrade,
        };

        match (self, next) {
            (Closed, _) => false,
            (_, Closed)
            | (Opened, Connected)
            | (Connected, Greeted)
            | (Greeted, SecureUpgrade | Authenticated | EnvelopeFrom)
            | (SecureUpgrade, Authenticated | EnvelopeFrom)
            | (Authenticated, EnvelopeFrom)
            | (EnvelopeFrom | EnvelopeTo, EnvelopeTo)
            | (EnvelopeTo, DataAnnounced)
            | (DataAnnounced, PayloadSent) => true,
            _ => false,
        }
    }

    /// Reply codes that let the session enter this state.
    #[must_use]
    pub const fn expected_replies(self) -> &'static [ReplyCode] {
        match self {
            Self::Opened => &[],
            Self::Connected | Self::SecureUpgrade => &[ReplyCode::SERVICE_READY],
            Self::Greeted | Self::EnvelopeFrom | Self::PayloadSent => &[ReplyCode::OK],
            Self::Authenticated => &[ReplyCode::AUTH_SUCCEEDED],
            Self::EnvelopeTo => &[ReplyCode::OK, ReplyCode::FORWARD],
            Self::DataAnnounced => &[ReplyCode::START_DATA],
            Self::Closed => &[ReplyCode::CLOSING],
        }
    }

    /// Failure reported when entering this state is refused.
    ///
    /// `None` for states whose failure does not end the session with a
    /// protocol error (`Opened` is never entered, `Closed` is best-effort).
    #[must_use]
    pub const fn failure_kind(self) -> Option<FailureKind> {
        match self {
            Self::Opened | Self::Closed => None,
            Self::Connected => Some(FailureKind::ConnectionRejected),
            Self::Greeted => Some(FailureKind::GreetingFailed),
            Self::SecureUpgrade => Some(FailureKind::TlsNegotiationFailed),
            Self::Authenticated => Some(FailureKind::AuthenticationRejected),
            Self::EnvelopeFrom => Some(FailureKind::SenderRejected),
            Self::EnvelopeTo => Some(FailureKind::RecipientRejected),
            Self::DataAnnounced => Some(FailureKind::DataPhaseRejected),
            Self::PayloadSent => Some(FailureKind::MessageRejected),
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Opened => "opened",
            Self::Connected => "connected",
            Self::Greeted => "greeted",
            Self::SecureUpgrade => "secure-upgrade",
            Self::Authenticated => "authenticated",
            Self::EnvelopeFrom => "envelope-from",
            Self::EnvelopeTo => "envelope-to",
            Self::DataAnnounced => "data-announced",
            Self::PayloadSent => "payload-sent",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

//! Outcome of a send: a status, a structured error, and the transcript.

use crate::connection::SessionState;
use crate::error::Error;
use crate::transcript::Transcript;
use std::fmt;

/// Status codes reported by [`SessionResult::status_code`].
///
/// Protocol failures report the server's reply code; the remaining classes
/// use codes outside the SMTP range.
pub mod status {
    /// The relay accepted the message.
    pub const SUCCESS: u16 = 0;
    /// Caller-supplied value rejected before connecting.
    pub const ARGUMENT: u16 = 901;
    /// Connection, TLS, or timeout failure.
    pub const TRANSPORT: u16 = 902;
    /// Message could not be rendered.
    pub const ENCODING: u16 = 903;
    /// Server reply could not be parsed, or a protocol failure without a
    /// reply code.
    pub const MALFORMED_REPLY: u16 = 904;
    /// Operation issued out of protocol order.
    pub const ILLEGAL_TRANSITION: u16 = 905;
}

/// Discriminated cause of a failed send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Invalid configuration, address, or message.
    Argument,
    /// Connection refused, DNS failure, TLS failure, or timeout.
    Transport,
    /// Attachment unreadable or message not renderable.
    Encoding,
    /// Server reply did not follow the reply grammar.
    MalformedReply,
    /// Session operation issued out of order.
    IllegalTransition,
    /// Greeting was not 220.
    ConnectionRejected,
    /// Both EHLO and HELO were rejected.
    GreetingFailed,
    /// STARTTLS was refused or the follow-up EHLO failed.
    TlsNegotiationFailed,
    /// AUTH exchange was refused.
    AuthenticationRejected,
    /// MAIL FROM was refused, or the message exceeds the SIZE limit.
    SenderRejected,
    /// A RCPT TO was refused.
    RecipientRejected,
    /// DATA was not answered with 354.
    DataPhaseRejected,
    /// The relay refused the payload.
    MessageRejected,
}

impl FailureKind {
    /// Returns true for failures reported by the server in a reply.
    #[must_use]
    pub const fn is_protocol(self) -> bool {
        self.internal_status().is_none()
    }

    /// Status code for failures that carry no SMTP reply code.
    #[must_use]
    pub const fn internal_status(self) -> Option<u16> {
        match self {
            Self::Argument => Some(status::ARGUMENT),
            Self::Transport => Some(status::TRANSPORT),
            Self::Encoding => Some(status::ENCODING),
            Self::MalformedReply => Some(status::MALFORMED_REPLY),
            Self::IllegalTransition => Some(status::ILLEGAL_TRANSITION),
            _ => None,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Argument => "argument",
            Self::Transport => "transport",
            Self::Encoding => "encoding",
            Self::MalformedReply => "malformed-reply",
            Self::IllegalTransition => "illegal-transition",
            Self::ConnectionRejected => "connection-rejected",
            Self::GreetingFailed => "greeting-failed",
            Self::TlsNegotiationFailed => "tls-negotiation-failed",
            Self::AuthenticationRejected => "authentication-rejected",
            Self::SenderRejected => "sender-rejected",
            Self::RecipientRejected => "recipient-rejected",
            Self::DataPhaseRejected => "data-phase-rejected",
            Self::MessageRejected => "message-rejected",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why and where a send failed.
#[derive(Debug, thiserror::Error)]
#[error(
    "{kind} at {state}{}: {source}",
    .address.as_ref().map(|a| format!(" ({a})")).unwrap_or_default()
)]
pub struct SessionError {
    kind: FailureKind,
    state: SessionState,
    command: Option<String>,
    code: Option<u16>,
    address: Option<String>,
    source: Error,
}

impl SessionError {
    /// Classifies `error`, raised while trying to enter `state`.
    #[must_use]
    pub fn new(error: Error, state: SessionState) -> Self {
        let protocol = state
            .failure_kind()
            .unwrap_or(FailureKind::MalformedReply);

        let (kind, code) = match &error {
            Error::InvalidAddress(_) | Error::InvalidConfig(_) => (FailureKind::Argument, None),
            Error::Mime(e) if e.is_argument() => (FailureKind::Argument, None),
            Error::Mime(_) => (FailureKind::Encoding, None),
            Error::Io(_) | Error::Tls(_) | Error::Timeout(_) => (FailureKind::Transport, None),
            Error::Protocol(_) => (FailureKind::MalformedReply, None),
            Error::InvalidState { .. } => (FailureKind::IllegalTransition, None),
            Error::SmtpError { code, .. } => (protocol, Some(*code)),
            Error::MessageTooLarge { .. } => (protocol, Some(552)),
            Error::NotSupported(_) => (protocol, None),
        };

        Self {
            kind,
            state,
            command: None,
            code,
            address: None,
            source: error,
        }
    }

    /// Attaches the (log-safe) command line that was rejected.
    #[must_use]
    pub fn with_command(mut self, command: Option<String>) -> Self {
        self.command = command;
        self
    }

    /// Attaches the address the failing command referred to.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Returns the failure kind.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Returns the state the session was trying to enter.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the rejected command, if one was sent.
    #[must_use]
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    /// Returns the server's reply code, if the server rejected something.
    #[must_use]
    pub const fn code(&self) -> Option<u16> {
        self.code
    }

    /// Returns the rejected address, for sender and recipient failures.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Returns the underlying error.
    #[must_use]
    pub const fn cause(&self) -> &Error {
        &self.source
    }

    /// Returns the status code for this failure.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.code
            .or_else(|| self.kind.internal_status())
            .unwrap_or(status::MALFORMED_REPLY)
    }
}

/// Result of one send, available whatever the outcome.
#[derive(Debug)]
pub struct SessionResult {
    outcome: std::result::Result<(), SessionError>,
    transcript: Transcript,
}

impl SessionResult {
    /// Creates a successful result.
    #[must_use]
    pub const fn success(transcript: Transcript) -> Self {
        Self {
            outcome: Ok(()),
            transcript,
        }
    }

    /// Creates a failed result.
    #[must_use]
    pub const fn failure(error: SessionError, transcript: Transcript) -> Self {
        Self {
            outcome: Err(error),
            transcript,
        }
    }

    /// Returns true if the relay accepted the message.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Returns 0 on success, otherwise the failing reply code or one of the
    /// internal codes in [`status`].
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match &self.outcome {
            Ok(()) => status::SUCCESS,
            Err(e) => e.status_code(),
        }
    }

    /// Returns the failure, if any.
    #[must_use]
    pub fn error(&self) -> Option<&SessionError> {
        self.outcome.as_ref().err()
    }

    /// Returns the transcript.
    #[must_use]
    pub const fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Splits the result into the outcome and the transcript.
    #[must_use]
    pub fn into_parts(self) -> (std::result::Result<(), SessionError>, Transcript) {
        (self.outcome, self.transcript)
    }

    /// Converts into a plain `Result`, dropping the transcript.
    ///
    /// # Errors
    ///
    /// Returns the session error if the send failed.
    pub fn into_result(self) -> std::result::Result<(), SessionError> {
        self.outcome
    }
}

//! One-shot message submission.

use crate::connection::{Config, Security, Session, SessionState, SmtpStream, connect};
use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::result::{SessionError, SessionResult};
use crate::transcript::Transcript;
use crate::types::Address;
use courier_mime::Message;

/// Sends messages to one relay, one session per message.
///
/// A `Mailer` holds no connection; each call to [`send`](Self::send) opens,
/// uses, and closes its own, so independent sends can run concurrently.
#[derive(Debug, Clone)]
pub struct Mailer {
    config: Config,
    credentials: Option<Credentials>,
}

/// Everything needed on the wire, computed before connecting.
#[derive(Debug)]
struct Envelope {
    from: Address,
    recipients: Vec<Address>,
    payload: Vec<u8>,
}

impl Mailer {
    /// Creates a mailer that does not authenticate.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self {
            config,
            credentials: None,
        }
    }

    /// Authenticates with `credentials` on every send.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Sends `message` over a new connection.
    ///
    /// Never fails outright: every error is folded into the returned
    /// [`SessionResult`], whose transcript holds whatever was exchanged.
    pub async fn send(&self, message: &Message) -> SessionResult {
        let envelope = match self.prepare(message) {
            Ok(envelope) => envelope,
            Err(e) => return Self::rejected_early(e),
        };

        tracing::debug!(
            host = %self.config.host,
            port = self.config.port,
            security = ?self.config.security,
            "Connecting"
        );
        let stream = match connect(&self.config).await {
            Ok(stream) => stream,
            Err(e) => {
                let error = SessionError::new(e, SessionState::Connected);
                tracing::warn!(kind = %error.kind(), %error, "Connection failed");
                return SessionResult::failure(error, Transcript::new());
            }
        };

        self.deliver(Session::new(stream), &envelope).await
    }

    /// Sends `message` over an already connected stream.
    ///
    /// The stream must be positioned before the server greeting. It is
    /// closed when the session ends.
    pub async fn send_with_stream(&self, stream: SmtpStream, message: &Message) -> SessionResult {
        match self.prepare(message) {
            Ok(envelope) => self.deliver(Session::new(stream), &envelope).await,
            Err(e) => {
                let mut stream = stream;
                stream.close().await;
                Self::rejected_early(e)
            }
        }
    }

    /// Blocking form of [`send`](Self::send).
    ///
    /// Runs the session on a private current-thread runtime, so it must
    /// not be called from within an async context.
    pub fn send_blocking(&self, message: &Message) -> SessionResult {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                let error = SessionError::new(Error::Io(e), SessionState::Opened);
                return SessionResult::failure(error, Transcript::new());
            }
        };

        runtime.block_on(self.send(message))
    }

    /// Validates the configuration, builds the envelope, and renders the
    /// payload.
    fn prepare(&self, message: &Message) -> Result<Envelope> {
        self.config.validate()?;

        let from = Address::from(message.from());
        let recipients: Vec<Address> = message.envelope_recipients().map(Address::from).collect();
        let payload = message.render()?;

        Ok(Envelope {
            from,
            recipients,
            payload,
        })
    }

    fn rejected_early(error: Error) -> SessionResult {
        let error = SessionError::new(error, SessionState::Opened);
        tracing::warn!(kind = %error.kind(), %error, "Message not sent");
        SessionResult::failure(error, Transcript::new())
    }

    async fn deliver(&self, mut session: Session, envelope: &Envelope) -> SessionResult {
        let outcome = self.run(&mut session, envelope).await;

        match &outcome {
            Ok(()) => {
                tracing::info!(
                    recipients = envelope.recipients.len(),
                    bytes = envelope.payload.len(),
                    "Message accepted"
                );
            }
            Err(error) => {
                tracing::warn!(
                    kind = %error.kind(),
                    status = error.status_code(),
                    %error,
                    "Send failed"
                );
            }
        }

        // The connection is only worth a QUIT if the server is still talking
        let polite = match &outcome {
            Ok(()) => true,
            Err(error) => error.kind().is_protocol(),
        };
        if polite {
            if let Err(e) = session.quit().await {
                tracing::debug!(%e, "QUIT not acknowledged");
            }
        } else {
            session.close().await;
        }

        let transcript = session.into_transcript();
        match outcome {
            Ok(()) => SessionResult::success(transcript),
            Err(error) => SessionResult::failure(error, transcript),
        }
    }

    async fn run(
        &self,
        session: &mut Session,
        envelope: &Envelope,
    ) -> std::result::Result<(), SessionError> {
        let client_name = self.config.client_name.as_str();

        let result = session.read_greeting().await;
        check(session, result, SessionState::Connected)?;

        let result = session.hello(client_name).await;
        check(session, result, SessionState::Greeted)?;

        if self.config.security == Security::StartTls {
            // Session::starttls refuses before writing when it was not advertised
            let result = session.starttls(&self.config.host, client_name).await;
            check(session, result, SessionState::SecureUpgrade)?;
        }

        if let Some(credentials) = &self.credentials {
            let result = session.authenticate(credentials).await;
            check(session, result, SessionState::Authenticated)?;
        }

        let result = session
            .mail_from(&envelope.from, Some(envelope.payload.len()))
            .await;
        check(session, result, SessionState::EnvelopeFrom)
            .map_err(|e| e.with_address(envelope.from.as_str()))?;

        for rcpt in &envelope.recipients {
            let result = session.rcpt_to(rcpt).await;
            check(session, result, SessionState::EnvelopeTo)
                .map_err(|e| e.with_address(rcpt.as_str()))?;
        }

        let result = session.data().await;
        check(session, result, SessionState::DataAnnounced)?;

        let result = session.send_payload(&envelope.payload).await;
        check(session, result, SessionState::PayloadSent)
    }
}

/// Wraps a failed step in a [`SessionError`], attaching the rejected
/// command when the server refused it.
fn check(
    session: &Session,
    result: Result<()>,
    state: SessionState,
) -> std::result::Result<(), SessionError> {
    result.map_err(|error| {
        let command = if matches!(error, Error::SmtpError { .. }) {
            session.last_command().map(str::to_string)
        } else {
            None
        };
        SessionError::new(error, state).with_command(command)
    })
}
